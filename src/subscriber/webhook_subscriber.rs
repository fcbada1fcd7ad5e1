//! Fans new feed entries out to every enabled guild webhook.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use derive_builder::Builder;
use log::debug;
use log::error;
use log::info;
use log::warn;

use crate::config::FeedConfig;
use crate::event::Event;
use crate::event::FeedUpdateEvent;
use crate::feed::FeedEntry;
use crate::feed::FeedSource;
use crate::model::FeedSettingsModel;
use crate::service::settings_service::SettingsService;
use crate::subscriber::Subscriber;
use crate::subscriber::discord_gateway::DiscordGateway;
use crate::subscriber::discord_gateway::WebhookMessage;
use crate::subscriber::entry_message_builder::EntryMessageBuilder;

/// Timing of the publish check and the webhook sends.
#[derive(Builder, Clone, Debug)]
#[builder(pattern = "immutable")]
pub struct DispatchOptions {
    #[builder(default = "Duration::from_secs(30)")]
    pub publish_check_interval: Duration,
    #[builder(default = "60")]
    pub publish_check_attempts: u32,
    #[builder(default = "3")]
    pub send_retries: u32,
    #[builder(default = "Duration::from_secs(1)")]
    pub message_interval: Duration,
}

impl From<&FeedConfig> for DispatchOptions {
    fn from(config: &FeedConfig) -> Self {
        Self {
            publish_check_interval: config.publish_check_interval,
            publish_check_attempts: config.publish_check_attempts,
            send_retries: config.webhook_send_retries,
            message_interval: config.webhook_message_interval,
        }
    }
}

/// A guild webhook that should receive notifications.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookTarget {
    pub guild_id: u64,
    pub webhook_url: String,
    pub sub_role_id: Option<u64>,
    pub avatar_url: String,
    pub delay: Duration,
    pub ping: bool,
}

impl WebhookTarget {
    /// `None` for guilds without a webhook.
    pub fn from_settings(settings: &FeedSettingsModel, default_avatar: &str) -> Option<Self> {
        let webhook_url = settings.webhook_url.clone().filter(|u| !u.is_empty())?;
        Some(Self {
            guild_id: settings.guild_id as u64,
            webhook_url,
            sub_role_id: settings.sub_role_id.map(|id| id as u64),
            avatar_url: settings
                .avatar
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| default_avatar.to_string()),
            delay: Duration::from_secs(settings.delay.max(0) as u64),
            ping: settings.ping,
        })
    }
}

/// Sends entry notifications to webhook targets.
pub struct NotificationDispatcher {
    source: Arc<dyn FeedSource>,
    gateway: Arc<dyn DiscordGateway>,
    builder: EntryMessageBuilder,
    options: DispatchOptions,
}

impl NotificationDispatcher {
    pub fn new(
        source: Arc<dyn FeedSource>,
        gateway: Arc<dyn DiscordGateway>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            source,
            gateway,
            builder: EntryMessageBuilder::new(),
            options,
        }
    }

    /// Notifies every target concurrently. Returns the number of targets that failed.
    pub async fn notify_all(&self, targets: &[WebhookTarget], entries: &[FeedEntry]) -> usize {
        info!("Sending {} entries to {} webhooks", entries.len(), targets.len());
        let results =
            futures::future::join_all(targets.iter().map(|t| self.notify(t, entries))).await;

        results
            .into_iter()
            .zip(targets)
            .filter_map(|(result, target)| result.err().map(|e| (e, target)))
            .inspect(|(e, target)| {
                error!("Webhook notification for guild {} failed: {e:?}", target.guild_id)
            })
            .count()
    }

    /// Waits for the target's delay, then sends each entry in order.
    pub async fn notify(&self, target: &WebhookTarget, entries: &[FeedEntry]) -> Result<()> {
        info!(
            "{} new webhook notifications for guild {}, delaying for {}s",
            entries.len(),
            target.guild_id,
            target.delay.as_secs()
        );
        tokio::time::sleep(target.delay).await;

        for (idx, entry) in entries.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.options.message_interval).await;
            }
            self.send_entry(target, entry, target.ping).await?;
        }
        Ok(())
    }

    /// Sends a single entry once its chapter is published.
    pub async fn send_entry(&self, target: &WebhookTarget, entry: &FeedEntry, ping: bool) -> Result<()> {
        let content = if ping {
            self.mention_text(target, entry).await
        } else {
            String::new()
        };

        self.wait_until_published(entry).await;

        let message = WebhookMessage {
            content,
            embed: self.builder.build(entry, self.source.site()),
            username: None,
            avatar_url: Some(target.avatar_url.clone()),
        };

        let mut attempt = 0;
        loop {
            match self.gateway.execute_webhook(&target.webhook_url, &message).await {
                Ok(()) => {
                    info!("Pushed update {} to guild {}", entry.item_id, target.guild_id);
                    return Ok(());
                }
                Err(e) if attempt < self.options.send_retries => {
                    attempt += 1;
                    warn!(
                        "Webhook send for guild {} failed (attempt {attempt}): {e}",
                        target.guild_id
                    );
                    tokio::time::sleep(self.options.message_interval * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Mentions of the guild's global role and the entry's series role.
    pub async fn mention_text(&self, target: &WebhookTarget, entry: &FeedEntry) -> String {
        let series_title = entry.series_title();
        let series_mention = match self.gateway.series_role_id(target.guild_id, series_title).await {
            Ok(Some(role_id)) => format!("<@&{role_id}>"),
            Ok(None) => format!("@{series_title} (New?)"),
            Err(e) => {
                warn!("Failed to resolve series role of `{series_title}`: {e}");
                format!("@{series_title} (New?)")
            }
        };

        match target.sub_role_id {
            Some(role_id) => format!("<@&{role_id}> {series_mention}"),
            None => series_mention,
        }
    }

    /// Polls the chapter page until it shows content or the attempts run out.
    ///
    /// Returns whether the chapter was seen as published.
    pub async fn wait_until_published(&self, entry: &FeedEntry) -> bool {
        for attempt in 1..=self.options.publish_check_attempts {
            match self.source.first_page(&entry.item_id).await {
                Ok(Some(page)) => {
                    debug!("Published: {page}");
                    return true;
                }
                Ok(None) => debug!(
                    "{} not published yet (check {attempt}/{})",
                    entry.item_id, self.options.publish_check_attempts
                ),
                Err(e) => warn!("Publish check of {} failed: {e}", entry.item_id),
            }
            if attempt < self.options.publish_check_attempts {
                tokio::time::sleep(self.options.publish_check_interval).await;
            }
        }
        warn!("Giving up waiting for {} to be published", entry.item_id);
        false
    }
}

/// Subscriber that notifies guild webhooks of new feed entries.
pub struct WebhookSubscriber {
    settings: Arc<SettingsService>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl WebhookSubscriber {
    pub fn new(settings: Arc<SettingsService>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        debug!("Initializing WebhookSubscriber.");
        Self {
            settings,
            dispatcher,
        }
    }
}

#[async_trait::async_trait]
impl Subscriber<FeedUpdateEvent> for WebhookSubscriber {
    async fn callback(&self, event: FeedUpdateEvent) -> Result<()> {
        debug!("Received event `{}`", event.event_name());
        let default_avatar = self.dispatcher.source.site().avatar_url.clone();
        let targets: Vec<WebhookTarget> = self
            .settings
            .enabled_webhooks()
            .await?
            .iter()
            .filter_map(|s| WebhookTarget::from_settings(s, &default_avatar))
            .collect();

        let failed = self.dispatcher.notify_all(&targets, &event.entries).await;
        if failed > 0 {
            warn!("{failed} of {} webhooks failed", targets.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_settings() {
        let mut settings = FeedSettingsModel::with_defaults(42);
        assert_eq!(WebhookTarget::from_settings(&settings, "avatar.png"), None);

        settings.webhook_url = Some("https://discord.com/api/webhooks/1/abc".to_string());
        settings.sub_role_id = Some(7);
        settings.delay = 15;
        let target = WebhookTarget::from_settings(&settings, "avatar.png").unwrap();
        assert_eq!(target.guild_id, 42);
        assert_eq!(target.avatar_url, "avatar.png");
        assert_eq!(target.sub_role_id, Some(7));
        assert_eq!(target.delay, Duration::from_secs(15));
        assert!(target.ping);
    }

    #[test]
    fn test_dispatch_options_defaults() {
        let options = DispatchOptionsBuilder::default().build().unwrap();
        assert_eq!(options.publish_check_attempts, 60);
        assert_eq!(options.send_retries, 3);
    }
}
