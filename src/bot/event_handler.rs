//! Gateway events outside of command dispatch.

use chrono::Utc;
use log::debug;
use log::warn;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::FullEvent;
use poise::serenity_prelude::Message;
use poise::serenity_prelude::MessageUpdateEvent;

use crate::bot::Data;
use crate::bot::Error;
use crate::bot::to_utc;
use crate::bot::whip;
use crate::model::DiscordMessageModel;
use crate::model::MemberActivityModel;

/// Messages that get the subscribe hint as a reply.
const HINT_TRIGGERS: [&str; 2] = ["#iAm Notifbud", "##iAm Notifbud"];

pub async fn handle(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    let logging = data.config.features.activity_logging;
    match event {
        FullEvent::Message { new_message } => {
            if logging {
                let clean = new_message.content_safe(&ctx.cache);
                let model = message_model(new_message, clean, false);
                if let Err(e) = data.services.activity.record_message(&model).await {
                    warn!("Failed to record message {}: {e}", new_message.id);
                }
            }
            subscribe_hint(ctx, new_message, data).await?;
            if data.config.features.whip {
                whip::on_message(ctx, new_message, data).await?;
            }
        }
        FullEvent::MessageUpdate { event, .. } if logging => {
            if let Some(model) = edit_model(event) {
                if let Err(e) = data.services.activity.record_message(&model).await {
                    warn!("Failed to record edit of message {}: {e}", event.id);
                }
            }
        }
        FullEvent::MessageDelete {
            deleted_message_id,
            ..
        } if logging => {
            if let Err(e) = data
                .services
                .activity
                .record_deletion(deleted_message_id.get())
                .await
            {
                warn!("Failed to record deletion of {deleted_message_id}: {e}");
            }
        }
        FullEvent::GuildMemberUpdate { event, .. } if logging => {
            let model = MemberActivityModel {
                member_id: event.user.id.get() as i64,
                time: Utc::now(),
                status: Some("member_update".to_string()),
                from_status: None,
                guild_id: event.guild_id.get() as i64,
                display_name: Some(
                    event
                        .nick
                        .clone()
                        .unwrap_or_else(|| event.user.display_name().to_string()),
                ),
            };
            if let Err(e) = data.services.activity.record_member_activity(&model).await {
                warn!("Failed to record member update of {}: {e}", event.user.id);
            }
        }
        FullEvent::PresenceUpdate { new_data } if logging => {
            let Some(guild_id) = new_data.guild_id else {
                return Ok(());
            };
            let model = MemberActivityModel {
                member_id: new_data.user.id.get() as i64,
                time: Utc::now(),
                status: Some(new_data.status.name().to_string()),
                from_status: None,
                guild_id: guild_id.get() as i64,
                display_name: new_data.user.name.clone(),
            };
            if let Err(e) = data.services.activity.record_member_activity(&model).await {
                warn!("Failed to record presence of {}: {e}", new_data.user.id);
            }
        }
        _ => {}
    }
    Ok(())
}

async fn subscribe_hint(ctx: &serenity::Context, message: &Message, data: &Data) -> Result<(), Error> {
    if !data
        .config
        .subscribe_hint_channels
        .contains(&message.channel_id.get())
        || !is_subscribe_hint(&message.content)
    {
        return Ok(());
    }
    let prefix = data
        .services
        .settings
        .prefix_for(message.guild_id.map(|id| id.get()));
    debug!("Sending subscribe hint in {}", message.channel_id);
    message
        .channel_id
        .say(&ctx.http, hint_text(&prefix))
        .await?;
    Ok(())
}

pub fn is_subscribe_hint(content: &str) -> bool {
    HINT_TRIGGERS.contains(&content.trim())
}

pub fn hint_text(prefix: &str) -> String {
    format!("Try `{prefix}sub`")
}

pub fn message_model(message: &Message, clean_content: String, is_edit: bool) -> DiscordMessageModel {
    DiscordMessageModel {
        message_id: message.id.get() as i64,
        sent: to_utc(message.edited_timestamp.unwrap_or(message.timestamp)),
        is_edit,
        deleted: false,
        author_id: message.author.id.get() as i64,
        channel_id: message.channel_id.get() as i64,
        guild_id: message.guild_id.map(|id| id.get() as i64),
        content: message.content.clone(),
        clean_content,
        embeds: serde_json::to_value(&message.embeds).ok(),
        webhook_id: message.webhook_id.map(|id| id.get() as i64),
        attachments: message.attachments.iter().map(|a| a.url.clone()).collect(),
    }
}

/// Row for an edit, `None` when the update carries no new content.
fn edit_model(event: &MessageUpdateEvent) -> Option<DiscordMessageModel> {
    let author = event.author.as_ref()?;
    let content = event.content.clone()?;
    Some(DiscordMessageModel {
        message_id: event.id.get() as i64,
        sent: event.edited_timestamp.map(to_utc).unwrap_or_else(Utc::now),
        is_edit: true,
        deleted: false,
        author_id: author.id.get() as i64,
        channel_id: event.channel_id.get() as i64,
        guild_id: event.guild_id.map(|id| id.get() as i64),
        clean_content: content.clone(),
        content,
        embeds: event
            .embeds
            .as_ref()
            .and_then(|embeds| serde_json::to_value(embeds).ok()),
        webhook_id: event.webhook_id.flatten().map(|id| id.get() as i64),
        attachments: event
            .attachments
            .as_ref()
            .map(|a| a.iter().map(|a| a.url.clone()).collect())
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_hint_triggers() {
        assert!(is_subscribe_hint("#iAm Notifbud"));
        assert!(is_subscribe_hint("##iAm Notifbud "));
        assert!(!is_subscribe_hint("#iAm notifbud please"));
        assert_eq!(hint_text("!"), "Try `!sub`");
    }
}
