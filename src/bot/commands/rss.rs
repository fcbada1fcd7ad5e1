//! Release feed settings, the feed monitor and series subscriptions.

use log::info;
use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::GuildId;
use poise::serenity_prelude::RoleId;

use crate::bot::Data;
use crate::bot::checks;
use crate::bot::checks::Privilege;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::bot::reply;
use crate::model::FeedSettingsChange;
use crate::model::FeedSettingsModel;
use crate::subscriber::entry_message_builder::EntryMessageBuilder;
use crate::subscriber::webhook_subscriber::WebhookTarget;

pub mod subscribe;

/// Cog of the release feed commands.
pub struct RssCog;

impl RssCog {
    /// Show the release feed status of a server
    ///
    /// Defaults to the current server. Use the subcommands to change the
    /// feed settings.
    #[poise::command(
        prefix_command,
        subcommands(
            "Self::resend",
            "Self::setdelay",
            "Self::setavatar",
            "Self::setrole",
            "Self::register",
            "Self::enable",
            "Self::disable",
            "Self::start",
            "Self::stop"
        ),
        category = "RSS"
    )]
    pub async fn rss(
        ctx: Context<'_>,
        #[description = "Server to show"] guild_id: Option<u64>,
    ) -> Result<(), Error> {
        let guild_id = match guild_id {
            Some(id) => GuildId::new(id),
            None => checks::guild_id(ctx)?,
        };
        ctx.defer_or_broadcast().await?;

        let guild_name = ctx.cache().guild(guild_id).map(|g| g.name.clone());
        let Some(guild_name) = guild_name else {
            reply::error(ctx, "Guild not found.", None).await?;
            return Ok(());
        };

        let data = ctx.data();
        let settings = data.services.settings.feed_settings(guild_id.get()).await?;
        let role_name = settings.sub_role_id.map(|id| {
            ctx.cache()
                .guild(guild_id)
                .and_then(|g| g.roles.get(&RoleId::new(id as u64)).map(|r| r.name.clone()))
        });
        let feed_up = matches!(data.services.feed_source.fetch_entries().await, Ok(Some(_)));
        let show_delay = checks::has_privilege(ctx, Privilege::Mod).await?;

        let status = FeedStatus {
            feed_up,
            role_name,
            default_avatar: data.services.feed_source.site().avatar_url.clone(),
            show_delay,
        };
        reply::info(ctx, &format!("RSS | {guild_name}"), Some(&status.lines(&settings))).await?;
        Ok(())
    }

    /// Resend the latest releases to this server's webhook
    #[poise::command(prefix_command, guild_only, category = "RSS")]
    pub async fn resend(
        ctx: Context<'_>,
        #[description = "Number of releases"] number: Option<usize>,
        #[description = "Mention the roles"] ping: Option<bool>,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        let guild_id = checks::guild_id(ctx)?.get();
        let data = ctx.data();

        let settings = data.services.settings.feed_settings(guild_id).await?;
        let default_avatar = &data.services.feed_source.site().avatar_url;
        let Some(target) = WebhookTarget::from_settings(&settings, default_avatar) else {
            reply::error(ctx, "No webhook registered.", None).await?;
            return Ok(());
        };

        let entries = data.services.feed.recent(number.unwrap_or(1).max(1)).await?;
        info!("Resending {} entries to guild {guild_id}", entries.len());
        for entry in &entries {
            data.dispatcher
                .send_entry(&target, entry, ping.unwrap_or(false))
                .await?;
        }
        reply::ok(ctx).await
    }

    /// Set the delay in seconds before this server's notifications are sent
    #[poise::command(prefix_command, guild_only, category = "RSS")]
    pub async fn setdelay(
        ctx: Context<'_>,
        #[description = "Delay in seconds"] seconds: i32,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Mod).await?;
        let change = FeedSettingsChange {
            delay: Some(seconds),
            ..Default::default()
        };
        update_settings(ctx, None, &change).await
    }

    /// Set the avatar of this server's notification webhook
    ///
    /// Without a URL the site's default avatar is used.
    #[poise::command(prefix_command, guild_only, category = "RSS")]
    pub async fn setavatar(
        ctx: Context<'_>,
        #[description = "Image URL"] avatar_url: Option<String>,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Mod).await?;
        let change = FeedSettingsChange {
            avatar: Some(avatar_url.as_deref().map(strip_angle_brackets)),
            ..Default::default()
        };
        update_settings(ctx, None, &change).await
    }

    /// Set the role mentioned by every notification
    ///
    /// Without a role no global role is mentioned.
    #[poise::command(prefix_command, guild_only, category = "RSS")]
    pub async fn setrole(
        ctx: Context<'_>,
        #[description = "Notification role"] role: Option<serenity::Role>,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Mod).await?;
        let change = FeedSettingsChange {
            sub_role_id: Some(role.map(|r| r.id.get() as i64)),
            ..Default::default()
        };
        update_settings(ctx, None, &change).await
    }

    /// Register this server's notification webhook and enable updates
    #[poise::command(prefix_command, guild_only, category = "RSS")]
    pub async fn register(
        ctx: Context<'_>,
        #[description = "Webhook URL"] webhook_url: Option<String>,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        let change = FeedSettingsChange {
            webhook_url: Some(webhook_url.as_deref().map(strip_angle_brackets)),
            enabled: Some(true),
            ..Default::default()
        };
        update_settings(ctx, None, &change).await
    }

    /// Enable release notifications
    ///
    /// Bot co-owners may pass another server's id.
    #[poise::command(prefix_command, category = "RSS")]
    pub async fn enable(
        ctx: Context<'_>,
        #[description = "Server id"] guild_id: Option<u64>,
    ) -> Result<(), Error> {
        set_enabled(ctx, guild_id, true).await
    }

    /// Disable release notifications
    ///
    /// Bot co-owners may pass another server's id.
    #[poise::command(prefix_command, category = "RSS")]
    pub async fn disable(
        ctx: Context<'_>,
        #[description = "Server id"] guild_id: Option<u64>,
    ) -> Result<(), Error> {
        set_enabled(ctx, guild_id, false).await
    }

    /// Start the feed monitor
    #[poise::command(prefix_command, category = "RSS")]
    pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
        checks::require(ctx, Privilege::CoOwner).await?;
        if ctx.data().monitor.start() {
            reply::ok(ctx).await?;
        } else {
            reply::warning(ctx, "The update task was already running.", None).await?;
        }
        Ok(())
    }

    /// Stop the feed monitor
    #[poise::command(prefix_command, category = "RSS")]
    pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
        checks::require(ctx, Privilege::CoOwner).await?;
        if ctx.data().monitor.stop() {
            reply::ok(ctx).await?;
        } else {
            reply::error(ctx, "There is no update task to stop.", None).await?;
        }
        Ok(())
    }

    /// Show the first page image of a chapter
    #[poise::command(prefix_command, hide_in_help, category = "RSS")]
    pub async fn firstpage(
        ctx: Context<'_>,
        #[description = "Chapter URL"] url: String,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::CoOwner).await?;
        let url = strip_angle_brackets(&url);
        let page = ctx.data().services.feed_source.first_page(&url).await?;
        ctx.say(page.unwrap_or_else(|| "Not published yet.".to_string()))
            .await?;
        Ok(())
    }

    /// Check on the feed monitor
    #[poise::command(prefix_command, category = "RSS")]
    pub async fn taskstatus(ctx: Context<'_>) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        let status = ctx.data().monitor.status();
        reply::codeblock(ctx, &status.to_string(), "").await?;
        Ok(())
    }

    /// Show the latest release, optionally filtered by title
    #[poise::command(prefix_command, category = "RSS")]
    pub async fn latest(
        ctx: Context<'_>,
        #[description = "Part of the title"]
        #[rest]
        title: Option<String>,
    ) -> Result<(), Error> {
        let data = ctx.data();
        let Some(entry) = data.services.feed.latest(title.as_deref()).await? else {
            reply::error(ctx, "Sorry, I couldn't find a match.", None).await?;
            return Ok(());
        };

        let embed = EntryMessageBuilder::new()
            .build(&entry, data.services.feed_source.site())
            .to_create_embed();
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Subscribe to release notifications
    ///
    /// Without a series, toggles the server's global notification role.
    /// `unsub all` removes every subscription.
    #[poise::command(
        prefix_command,
        guild_only,
        aliases("sub", "unsubscribe", "unsub"),
        category = "RSS"
    )]
    pub async fn subscribe(
        ctx: Context<'_>,
        #[description = "Series title or shortname"]
        #[rest]
        series: Option<String>,
    ) -> Result<(), Error> {
        let remove = matches!(ctx.invoked_command_name(), "unsub" | "unsubscribe");
        subscribe::run(ctx, series, remove).await
    }

    /// List the subscriptions of a member
    #[poise::command(prefix_command, guild_only, aliases("subs"), category = "RSS")]
    pub async fn subscriptions(
        ctx: Context<'_>,
        #[description = "Member to check"] member: Option<serenity::Member>,
    ) -> Result<(), Error> {
        subscribe::list(ctx, member).await
    }
}

impl Cog for RssCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![
            Self::rss(),
            Self::firstpage(),
            Self::taskstatus(),
            Self::latest(),
            Self::subscribe(),
            Self::subscriptions(),
        ]
    }
}

async fn update_settings(
    ctx: Context<'_>,
    guild_id: Option<u64>,
    change: &FeedSettingsChange,
) -> Result<(), Error> {
    let guild_id = match guild_id {
        Some(id) => id,
        None => checks::guild_id(ctx)?.get(),
    };
    ctx.data()
        .services
        .settings
        .update_feed_settings(guild_id, change)
        .await?;
    reply::ok(ctx).await
}

async fn set_enabled(ctx: Context<'_>, guild_id: Option<u64>, enabled: bool) -> Result<(), Error> {
    checks::require(ctx, Privilege::Admin).await?;
    if guild_id.is_some() && !checks::has_privilege(ctx, Privilege::CoOwner).await? {
        return Err(BotError::PermissionDenied(
            "Only bot co-owners can disable for specific guilds.".to_string(),
        )
        .into());
    }
    let change = FeedSettingsChange {
        enabled: Some(enabled),
        ..Default::default()
    };
    update_settings(ctx, guild_id, &change).await
}

fn strip_angle_brackets(url: &str) -> String {
    let url = url.trim();
    url.strip_prefix('<')
        .and_then(|u| u.strip_suffix('>'))
        .unwrap_or(url)
        .to_string()
}

/// What the status embed knows beyond the stored settings.
struct FeedStatus {
    feed_up: bool,
    /// `None` without a role, `Some(None)` when the role no longer exists.
    role_name: Option<Option<String>>,
    default_avatar: String,
    show_delay: bool,
}

impl FeedStatus {
    fn lines(&self, settings: &FeedSettingsModel) -> String {
        let registered = settings.webhook_url.as_deref().is_some_and(|u| !u.is_empty());
        let role = match &self.role_name {
            None => "***No Role***".to_string(),
            Some(None) => "***Invalid Role***".to_string(),
            Some(Some(name)) => name.clone(),
        };
        let avatar = match settings.avatar.as_deref().filter(|a| !a.is_empty()) {
            Some(url) => format!("[Set]({url})"),
            None => format!("[Default]({})", self.default_avatar),
        };

        let mut lines = vec![
            format!("**Online Feed:** {}", if self.feed_up { "Up" } else { "***Down***" }),
            format!(
                "**Webhook:** {}",
                if registered { "Registered" } else { "***Not Registered***" }
            ),
            format!(
                "**Updates:** {}",
                if settings.enabled { "Enabled" } else { "***Disabled***" }
            ),
            format!("**Role:** {role}"),
            format!("**Avatar:** {avatar}"),
        ];
        if self.show_delay {
            lines.push(format!("**Delay:** {}", settings.delay));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_angle_brackets() {
        assert_eq!(strip_angle_brackets("<https://a.png>"), "https://a.png");
        assert_eq!(strip_angle_brackets("https://a.png"), "https://a.png");
        assert_eq!(strip_angle_brackets("<https://a.png"), "<https://a.png");
    }

    #[test]
    fn test_status_lines_defaults() {
        let settings = FeedSettingsModel::with_defaults(1);
        let status = FeedStatus {
            feed_up: false,
            role_name: None,
            default_avatar: "https://i.imgur.com/HZ27mE7.png".to_string(),
            show_delay: false,
        };
        assert_eq!(
            status.lines(&settings),
            "**Online Feed:** ***Down***\n\
             **Webhook:** ***Not Registered***\n\
             **Updates:** ***Disabled***\n\
             **Role:** ***No Role***\n\
             **Avatar:** [Default](https://i.imgur.com/HZ27mE7.png)"
        );
    }

    #[test]
    fn test_status_lines_configured() {
        let mut settings = FeedSettingsModel::with_defaults(1);
        settings.webhook_url = Some("https://discord.com/api/webhooks/1/x".to_string());
        settings.enabled = true;
        settings.avatar = Some("https://a.png".to_string());
        settings.delay = 30;
        let status = FeedStatus {
            feed_up: true,
            role_name: Some(None),
            default_avatar: String::new(),
            show_delay: true,
        };
        let lines = status.lines(&settings);
        assert!(lines.contains("**Online Feed:** Up"));
        assert!(lines.contains("**Webhook:** Registered"));
        assert!(lines.contains("**Role:** ***Invalid Role***"));
        assert!(lines.contains("**Avatar:** [Set](https://a.png)"));
        assert!(lines.ends_with("**Delay:** 30"));
    }
}
