//! Discord operations needed by the notification fan-out.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use log::info;
use poise::serenity_prelude::EditRole;
use poise::serenity_prelude::ExecuteWebhook;
use poise::serenity_prelude::GuildId;
use poise::serenity_prelude::Http;
use poise::serenity_prelude::Role;
use poise::serenity_prelude::Webhook;

use crate::service::series_service::SeriesService;
use crate::subscriber::entry_message_builder::EntryEmbed;

/// A message to post through a webhook.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookMessage {
    pub content: String,
    pub embed: EntryEmbed,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait DiscordGateway: Send + Sync {
    /// Id of the role of the series matching `series_title` in a guild.
    ///
    /// Missing roles are created. `None` when the title matches no series.
    async fn series_role_id(&self, guild_id: u64, series_title: &str) -> Result<Option<u64>>;

    async fn execute_webhook(&self, webhook_url: &str, message: &WebhookMessage) -> Result<()>;
}

/// [`DiscordGateway`] backed by the bot's HTTP client.
pub struct SerenityGateway {
    http: Arc<Http>,
    series: Arc<SeriesService>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>, series: Arc<SeriesService>) -> Self {
        Self { http, series }
    }

    /// The role named after the shortname of the series matching `term`.
    ///
    /// With `create_missing`, a mentionable role is created when the guild
    /// has none.
    pub async fn series_role(
        &self,
        guild_id: GuildId,
        term: &str,
        create_missing: bool,
    ) -> Result<Option<Role>> {
        let Some(found) = self.series.match_series(term).await? else {
            return Ok(None);
        };
        let shortname = self
            .series
            .shortname_map()
            .await?
            .into_iter()
            .find_map(|(shortname, title)| (title == found.title).then_some(shortname));
        let Some(shortname) = shortname else {
            return Ok(None);
        };

        let http: &Http = &self.http;
        if let Some(role) = guild_id
            .roles(http)
            .await?
            .into_values()
            .find(|role| role.name == shortname)
        {
            return Ok(Some(role));
        }

        if !create_missing {
            return Ok(None);
        }

        info!("Creating series role {shortname} in guild {guild_id}");
        let role = guild_id
            .create_role(
                http,
                EditRole::new()
                    .name(&shortname)
                    .mentionable(true)
                    .audit_log_reason("Series Subscription Role for Updates"),
            )
            .await?;
        Ok(Some(role))
    }
}

#[async_trait]
impl DiscordGateway for SerenityGateway {
    async fn series_role_id(&self, guild_id: u64, series_title: &str) -> Result<Option<u64>> {
        Ok(self
            .series_role(GuildId::new(guild_id), series_title, true)
            .await?
            .map(|role| role.id.get()))
    }

    async fn execute_webhook(&self, webhook_url: &str, message: &WebhookMessage) -> Result<()> {
        let http: &Http = &self.http;
        let webhook = Webhook::from_url(http, webhook_url).await?;

        let mut builder = ExecuteWebhook::new()
            .content(&message.content)
            .embed(message.embed.to_create_embed());
        if let Some(username) = &message.username {
            builder = builder.username(username);
        }
        if let Some(avatar_url) = &message.avatar_url {
            builder = builder.avatar_url(avatar_url);
        }

        webhook.execute(http, false, builder).await?;
        debug!("Executed webhook {}", webhook.id);
        Ok(())
    }
}
