//! Moderation and utility commands.

use std::time::Duration;

use log::debug;
use log::warn;
use poise::Command;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::ChannelId;
use poise::serenity_prelude::CreateEmbed;
use poise::serenity_prelude::CreateEmbedAuthor;
use poise::serenity_prelude::GetMessages;
use poise::serenity_prelude::Message;
use poise::serenity_prelude::MessageId;

use crate::bot::Data;
use crate::bot::checks;
use crate::bot::checks::Privilege;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::commands::colours::parse_colour;
use crate::bot::reply;
use crate::bot::reply::ReplyKind;

const PURGE_LIMIT: u8 = 100;
/// How long result notices of deleting commands stay up.
const NOTICE_TTL: Duration = Duration::from_secs(3);

/// Cog of moderation and utility commands.
pub struct UtilitiesCog;

impl UtilitiesCog {
    /// Repeat the given message
    #[poise::command(prefix_command, category = "Utilities")]
    pub async fn say(
        ctx: Context<'_>,
        #[description = "Message to repeat"]
        #[rest]
        message: String,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Mod).await?;
        ctx.say(message).await?;
        Ok(())
    }

    /// Create an embed from scratch
    #[poise::command(
        prefix_command,
        subcommands(
            "Self::error",
            "Self::info",
            "Self::warning",
            "Self::success",
            "Self::help"
        ),
        category = "Utilities"
    )]
    pub async fn embed(
        ctx: Context<'_>,
        title: Option<String>,
        content: Option<String>,
        colour: Option<String>,
        icon: Option<String>,
        image: Option<String>,
        thumbnail: Option<String>,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Mod).await?;

        let mut embed = CreateEmbed::new();
        match (title, icon) {
            (Some(title), Some(icon)) => {
                embed = embed.author(CreateEmbedAuthor::new(title).icon_url(icon));
            }
            (Some(title), None) => embed = embed.title(title),
            (None, Some(icon)) => {
                embed = embed.author(CreateEmbedAuthor::new("\u{200b}").icon_url(icon));
            }
            (None, None) => {}
        }
        if let Some(content) = content {
            embed = embed.description(content);
        }
        if let Some(colour) = colour.as_deref().and_then(parse_colour) {
            embed = embed.colour(colour);
        }
        if let Some(image) = image {
            embed = embed.image(image);
        }
        if let Some(thumbnail) = thumbnail {
            embed = embed.thumbnail(thumbnail);
        }
        reply::embed(ctx, embed).await?;
        Ok(())
    }

    /// Create a basic error embed
    #[poise::command(prefix_command, category = "Utilities")]
    pub async fn error(
        ctx: Context<'_>,
        title: String,
        #[rest] content: Option<String>,
    ) -> Result<(), Error> {
        kind_embed(ctx, ReplyKind::Error, title, content).await
    }

    /// Create a basic info embed
    #[poise::command(prefix_command, category = "Utilities")]
    pub async fn info(
        ctx: Context<'_>,
        title: String,
        #[rest] content: Option<String>,
    ) -> Result<(), Error> {
        kind_embed(ctx, ReplyKind::Info, title, content).await
    }

    /// Create a basic warning embed
    #[poise::command(prefix_command, category = "Utilities")]
    pub async fn warning(
        ctx: Context<'_>,
        title: String,
        #[rest] content: Option<String>,
    ) -> Result<(), Error> {
        kind_embed(ctx, ReplyKind::Warning, title, content).await
    }

    /// Create a basic success embed
    #[poise::command(prefix_command, category = "Utilities")]
    pub async fn success(
        ctx: Context<'_>,
        title: String,
        #[rest] content: Option<String>,
    ) -> Result<(), Error> {
        kind_embed(ctx, ReplyKind::Success, title, content).await
    }

    /// Create a basic help embed
    #[poise::command(prefix_command, category = "Utilities")]
    pub async fn help(
        ctx: Context<'_>,
        title: String,
        #[rest] content: Option<String>,
    ) -> Result<(), Error> {
        kind_embed(ctx, ReplyKind::Help, title, content).await
    }

    /// Delete the bot's own messages sent after a message
    #[poise::command(prefix_command, category = "Utilities")]
    pub async fn cleanup(
        ctx: Context<'_>,
        #[description = "Id of the message to start after"] after_msg_id: u64,
        #[description = "Channel to clean, defaults to this one"] channel: Option<ChannelId>,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Mod).await?;
        let channel = channel.unwrap_or_else(|| ctx.channel_id());
        let bot_id = ctx.cache().current_user().id;

        let messages: Vec<Message> = channel
            .messages(
                ctx.http(),
                GetMessages::new()
                    .after(MessageId::new(after_msg_id))
                    .limit(PURGE_LIMIT),
            )
            .await?
            .into_iter()
            .filter(|m| m.author.id == bot_id)
            .collect();

        let deleted = delete_messages(ctx, channel, &messages).await?;
        send_notice(ctx, &deleted_text(deleted)).await
    }

    /// Delete a number of messages from this channel (default 10, max 100)
    #[poise::command(prefix_command, guild_only, category = "Utilities")]
    pub async fn purge(
        ctx: Context<'_>,
        #[description = "Number of messages"] count: Option<u16>,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        let count = count.unwrap_or(10);
        if count > u16::from(PURGE_LIMIT) {
            reply::error(
                ctx,
                "No more than 100 messages can be purged at a time.",
                None,
            )
            .await?;
            return Ok(());
        }

        let channel = ctx.channel_id();
        let messages = channel
            .messages(ctx.http(), GetMessages::new().limit(count as u8))
            .await?;
        let deleted = delete_messages(ctx, channel, &messages).await?;
        send_notice(ctx, &deleted_text(deleted)).await
    }

    /// Delete messages of this channel by id
    #[poise::command(prefix_command, category = "Utilities")]
    pub async fn delete_msg(
        ctx: Context<'_>,
        #[description = "Message ids"] message_ids: Vec<u64>,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        let channel = ctx.channel_id();
        for id in message_ids {
            if let Err(e) = channel.delete_message(ctx.http(), MessageId::new(id)).await {
                debug!("Stopping at message {id}: {e}");
                return Ok(());
            }
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        if let poise::Context::Prefix(prefix_ctx) = ctx
            && let Err(e) = prefix_ctx.msg.delete(ctx.serenity_context()).await
        {
            debug!("Could not delete invocation message: {e}");
        }
        Ok(())
    }

    /// Show the avatar of a member
    ///
    /// The size is rounded down to a power of two between 16 and 1024.
    #[poise::command(prefix_command, aliases("avy"), category = "Utilities")]
    pub async fn avatar(
        ctx: Context<'_>,
        #[description = "Member to show"] member: Option<serenity::Member>,
        #[description = "Image size"] size: Option<u64>,
    ) -> Result<(), Error> {
        let size = bitround(size.unwrap_or(1024));
        let (name, face, colour) = match &member {
            Some(member) => (
                member.display_name().to_string(),
                member.face(),
                member.colour(ctx.cache()),
            ),
            None => (
                ctx.author().display_name().to_string(),
                ctx.author().face(),
                None,
            ),
        };

        let url = sized_avatar_url(&face, size);
        let mut embed = CreateEmbed::new()
            .title(format!("{name}'s Avatar"))
            .url(&url)
            .image(&url)
            .colour(ReplyKind::Info.colour());
        if let Some(colour) = colour {
            embed = embed.colour(colour);
        }
        reply::embed(ctx, embed).await?;
        Ok(())
    }

    /// Show the privilege level of a member
    ///
    /// Checking other members requires Mod.
    #[poise::command(prefix_command, aliases("priv", "privs"), category = "Utilities")]
    pub async fn privilege(
        ctx: Context<'_>,
        #[description = "Member to check"] member: Option<serenity::Member>,
    ) -> Result<(), Error> {
        let user = match &member {
            Some(member) => {
                if !checks::has_privilege(ctx, Privilege::Mod).await? {
                    reply::error(
                        ctx,
                        "Only mods can check other member's privilege level.",
                        None,
                    )
                    .await?;
                    return Ok(());
                }
                &member.user
            }
            None => ctx.author(),
        };

        let privilege = checks::privilege_of(ctx, user).await?;
        reply::info(ctx, &privilege.to_string(), None).await?;
        Ok(())
    }
}

impl Cog for UtilitiesCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![
            Self::say(),
            Self::embed(),
            Self::cleanup(),
            Self::purge(),
            Self::delete_msg(),
            Self::avatar(),
            Self::privilege(),
        ]
    }
}

async fn kind_embed(
    ctx: Context<'_>,
    kind: ReplyKind,
    title: String,
    content: Option<String>,
) -> Result<(), Error> {
    checks::require(ctx, Privilege::Mod).await?;
    reply::send_kind(ctx, kind, &title, content.as_deref()).await?;
    Ok(())
}

/// Bulk deletes when possible, one by one otherwise. Returns the count deleted.
async fn delete_messages(
    ctx: Context<'_>,
    channel: ChannelId,
    messages: &[Message],
) -> Result<usize, Error> {
    let ids: Vec<MessageId> = messages.iter().map(|m| m.id).collect();
    if ids.len() >= 2 {
        match channel.delete_messages(ctx.http(), &ids).await {
            Ok(()) => return Ok(ids.len()),
            Err(e) => warn!("Bulk delete in {channel} failed, deleting one by one: {e}"),
        }
    }

    let mut deleted = 0;
    for id in ids {
        match channel.delete_message(ctx.http(), id).await {
            Ok(()) => deleted += 1,
            Err(e) => debug!("Could not delete message {id}: {e}"),
        }
    }
    Ok(deleted)
}

/// Success notice that removes itself shortly after.
async fn send_notice(ctx: Context<'_>, text: &str) -> Result<(), Error> {
    let handle = reply::success(ctx, text, None).await?;
    tokio::time::sleep(NOTICE_TTL).await;
    if let Err(e) = handle.delete(ctx).await {
        debug!("Could not delete notice: {e}");
    }
    Ok(())
}

fn deleted_text(count: usize) -> String {
    let plural = if count > 1 { "s" } else { "" };
    format!("Deleted {count} message{plural}")
}

/// Largest power of two not above `size`, clamped to 16..=1024.
pub fn bitround(size: u64) -> u16 {
    let rounded = match size {
        0 => 0,
        n => 1u64 << (63 - n.leading_zeros()),
    };
    rounded.clamp(16, 1024) as u16
}

/// Avatar URL with the query replaced by the given size.
fn sized_avatar_url(url: &str, size: u16) -> String {
    let base = url.split('?').next().unwrap_or(url);
    format!("{base}?size={size}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitround() {
        assert_eq!(bitround(1024), 1024);
        assert_eq!(bitround(1000), 512);
        assert_eq!(bitround(4096), 1024);
        assert_eq!(bitround(17), 16);
        assert_eq!(bitround(3), 16);
        assert_eq!(bitround(0), 16);
    }

    #[test]
    fn test_deleted_text() {
        assert_eq!(deleted_text(1), "Deleted 1 message");
        assert_eq!(deleted_text(0), "Deleted 0 message");
        assert_eq!(deleted_text(12), "Deleted 12 messages");
    }

    #[test]
    fn test_sized_avatar_url() {
        assert_eq!(
            sized_avatar_url("https://cdn.discordapp.com/avatars/1/abc.webp?size=1024", 128),
            "https://cdn.discordapp.com/avatars/1/abc.webp?size=128"
        );
        assert_eq!(
            sized_avatar_url("https://cdn.discordapp.com/embed/avatars/0.png", 64),
            "https://cdn.discordapp.com/embed/avatars/0.png?size=64"
        );
    }
}
