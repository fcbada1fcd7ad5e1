//! Tests for the webhook notification fan-out.

mod common;

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use manibot::feed::FeedEntry;
use manibot::feed::FeedSource;
use manibot::feed::SeriesPage;
use manibot::feed::SiteInfo;
use manibot::feed::error::FeedError;
use manibot::subscriber::discord_gateway::DiscordGateway;
use manibot::subscriber::discord_gateway::WebhookMessage;
use manibot::subscriber::webhook_subscriber::DispatchOptions;
use manibot::subscriber::webhook_subscriber::DispatchOptionsBuilder;
use manibot::subscriber::webhook_subscriber::NotificationDispatcher;
use manibot::subscriber::webhook_subscriber::WebhookTarget;
use mockall::mock;
use mockall::predicate::eq;

mock! {
    pub Gateway {}

    #[async_trait]
    impl DiscordGateway for Gateway {
        async fn series_role_id(&self, guild_id: u64, series_title: &str) -> Result<Option<u64>>;
        async fn execute_webhook(&self, webhook_url: &str, message: &WebhookMessage) -> Result<()>;
    }
}

mock! {
    pub Source {}

    #[async_trait]
    impl FeedSource for Source {
        fn site(&self) -> &SiteInfo;
        async fn fetch_entries(&self) -> Result<Option<Vec<FeedEntry>>, FeedError>;
        async fn first_page(&self, chapter_url: &str) -> Result<Option<String>, FeedError>;
        async fn test_chapter(&self, chapter_url: &str) -> Result<bool, FeedError>;
        async fn series_page(&self, url: &str) -> Result<Option<SeriesPage>, FeedError>;
    }
}

fn options() -> DispatchOptions {
    DispatchOptionsBuilder::default()
        .publish_check_interval(Duration::from_millis(1))
        .publish_check_attempts(3)
        .send_retries(2)
        .message_interval(Duration::from_millis(1))
        .build()
        .unwrap()
}

fn published_source() -> MockSource {
    let mut source = MockSource::new();
    source.expect_site().return_const(common::site("http://hatigarmscans.net"));
    source
        .expect_first_page()
        .returning(|url| Ok(Some(format!("{url}/01.jpg"))));
    source
}

fn target(guild_id: u64, sub_role_id: Option<u64>) -> WebhookTarget {
    WebhookTarget {
        guild_id,
        webhook_url: format!("https://discord.com/api/webhooks/{guild_id}/token"),
        sub_role_id,
        avatar_url: "https://i.imgur.com/HZ27mE7.png".to_string(),
        delay: Duration::ZERO,
        ping: true,
    }
}

#[tokio::test]
async fn test_mentions_global_and_series_roles() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_series_role_id()
        .with(eq(1), eq("Kingdom"))
        .returning(|_, _| Ok(Some(77)));
    gateway
        .expect_series_role_id()
        .with(eq(1), eq("Hero Killer"))
        .returning(|_, _| Ok(None));

    let dispatcher = NotificationDispatcher::new(
        Arc::new(published_source()),
        Arc::new(gateway),
        options(),
    );

    let with_role = dispatcher
        .mention_text(&target(1, Some(5)), &common::entry("Kingdom", "596"))
        .await;
    assert_eq!(with_role, "<@&5> <@&77>");

    let unknown = dispatcher
        .mention_text(&target(1, None), &common::entry("Hero Killer", "12"))
        .await;
    assert_eq!(unknown, "@Hero Killer (New?)");
}

#[tokio::test]
async fn test_notify_sends_entries_in_order() {
    let sent: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = sent.clone();

    let mut gateway = MockGateway::new();
    gateway.expect_series_role_id().returning(|_, _| Ok(Some(9)));
    gateway
        .expect_execute_webhook()
        .times(2)
        .returning(move |_, message| {
            recorded.lock().unwrap().push(message.embed.description.clone());
            Ok(())
        });

    let dispatcher = NotificationDispatcher::new(
        Arc::new(published_source()),
        Arc::new(gateway),
        options(),
    );
    let entries = vec![common::entry("Kingdom", "595"), common::entry("Kingdom", "596")];
    dispatcher.notify(&target(1, None), &entries).await.unwrap();

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("595"));
    assert!(sent[1].contains("596"));
}

#[tokio::test]
async fn test_send_retries_then_fails() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_execute_webhook()
        .times(3)
        .returning(|_, _| Err(anyhow::anyhow!("webhook gone")));

    let dispatcher = NotificationDispatcher::new(
        Arc::new(published_source()),
        Arc::new(gateway),
        options(),
    );
    let result = dispatcher
        .send_entry(&target(1, None), &common::entry("Kingdom", "596"), false)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_notify_all_counts_failures() {
    let mut gateway = MockGateway::new();
    gateway.expect_series_role_id().returning(|_, _| Ok(None));
    gateway
        .expect_execute_webhook()
        .returning(|url, _| {
            if url.contains("/2/") {
                Err(anyhow::anyhow!("unknown webhook"))
            } else {
                Ok(())
            }
        });

    let dispatcher = NotificationDispatcher::new(
        Arc::new(published_source()),
        Arc::new(gateway),
        options(),
    );
    let failed = dispatcher
        .notify_all(
            &[target(1, None), target(2, None), target(3, None)],
            &[common::entry("Kingdom", "596")],
        )
        .await;
    assert_eq!(failed, 1);
}

#[tokio::test]
async fn test_wait_until_published_gives_up() {
    let mut source = MockSource::new();
    source.expect_site().return_const(common::site("http://hatigarmscans.net"));
    source.expect_first_page().times(3).returning(|_| Ok(None));

    let dispatcher =
        NotificationDispatcher::new(Arc::new(source), Arc::new(MockGateway::new()), options());
    assert!(!dispatcher.wait_until_published(&common::entry("Kingdom", "597")).await);
}
