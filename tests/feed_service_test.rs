//! Tests for feed entry deduplication and the monitor's poll.

mod common;

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use manibot::event::FeedUpdateEvent;
use manibot::event::event_bus::EventBus;
use manibot::feed::FeedEntry;
use manibot::feed::FeedSource;
use manibot::feed::SeriesPage;
use manibot::feed::SiteInfo;
use manibot::feed::error::FeedError;
use manibot::model::FeedEntryModel;
use manibot::repository::error::DatabaseError;
use manibot::repository::table::FeedStore;
use manibot::service::feed_service::FeedService;
use manibot::task::feed_monitor::FeedMonitor;
use manibot::task::feed_monitor::MonitorStatus;
use manibot::task::feed_monitor::PollOutcome;
use mockall::mock;

mock! {
    pub Store {}

    #[async_trait]
    impl FeedStore for Store {
        async fn exists(&self, item_id: &str) -> Result<bool, DatabaseError>;
        async fn insert(&self, entry: &FeedEntryModel) -> Result<bool, DatabaseError>;
        async fn latest(&self, filter: Option<String>) -> Result<Option<FeedEntryModel>, DatabaseError>;
        async fn recent(&self, count: i64) -> Result<Vec<FeedEntryModel>, DatabaseError>;
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

/// Store that already holds the entries with the given ids.
fn store_with(known: &[&str]) -> MockStore {
    let known: Vec<String> = known.iter().map(|s| s.to_string()).collect();
    let mut store = MockStore::new();
    store
        .expect_exists()
        .returning(move |id| Ok(known.iter().any(|k| k.as_str() == id)));
    store.expect_insert().returning(|_| Ok(true));
    store
}

/// Newest first, as the feed lists them.
fn feed() -> Vec<FeedEntry> {
    vec![
        common::entry("Kingdom", "597"),
        common::entry("Kingdom", "596"),
        common::entry("Kingdom", "595"),
    ]
}

#[tokio::test]
async fn test_new_entries_oldest_first() {
    let known = common::entry("Kingdom", "595").item_id;
    let service = FeedService::new(Arc::new(store_with(&[&known])));

    let new_entries = service.get_new_entries(&feed()).await.unwrap();
    let chapters: Vec<&str> = new_entries.iter().map(|e| e.chapter()).collect();
    assert_eq!(chapters, vec!["596", "597"]);
}

#[tokio::test]
async fn test_walk_stops_at_first_known_entry() {
    // 596 is known, so 595 is assumed known without being checked.
    let known = common::entry("Kingdom", "596").item_id;
    let mut store = MockStore::new();
    let checked = Arc::new(Mutex::new(Vec::new()));
    let record = checked.clone();
    store.expect_exists().returning(move |id| {
        record.lock().unwrap().push(id.to_string());
        Ok(id == known)
    });
    store.expect_insert().times(1).returning(|_| Ok(true));

    let service = FeedService::new(Arc::new(store));
    let new_entries = service.get_new_entries(&feed()).await.unwrap();

    assert_eq!(new_entries.len(), 1);
    assert_eq!(checked.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrently_stored_entry_is_skipped() {
    let mut store = MockStore::new();
    store.expect_exists().returning(|_| Ok(false));
    store
        .expect_insert()
        .returning(|entry| Ok(!entry.item_id.ends_with("/596")));

    let service = FeedService::new(Arc::new(store));
    let new_entries = service.get_new_entries(&feed()).await.unwrap();
    let chapters: Vec<&str> = new_entries.iter().map(|e| e.chapter()).collect();
    assert_eq!(chapters, vec!["595", "597"]);
}

#[tokio::test]
async fn test_recent_is_oldest_first() {
    let mut store = MockStore::new();
    store.expect_recent().returning(|count| {
        Ok(feed()
            .iter()
            .take(count as usize)
            .map(FeedEntryModel::from)
            .collect())
    });

    let service = FeedService::new(Arc::new(store));
    let recent = service.recent(2).await.unwrap();
    let chapters: Vec<&str> = recent.iter().map(|e| e.chapter()).collect();
    assert_eq!(chapters, vec!["596", "597"]);
}

fn monitor_with(entries: Option<Vec<FeedEntry>>, known: &[&str]) -> (Arc<FeedMonitor>, Arc<EventBus>) {
    let mut source = MockSource::new();
    source
        .expect_fetch_entries()
        .returning(move || Ok(entries.clone()));
    let event_bus = Arc::new(EventBus::new());
    let feed = Arc::new(FeedService::new(Arc::new(store_with(known))));
    let monitor = FeedMonitor::new(
        Arc::new(source),
        feed,
        event_bus.clone(),
        Duration::from_secs(3600),
    );
    (monitor, event_bus)
}

#[tokio::test]
async fn test_poll_publishes_new_entries() {
    let (monitor, event_bus) = monitor_with(Some(feed()), &[]);
    let received: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let record = received.clone();
    event_bus.register_callback(move |event: FeedUpdateEvent| {
        let record = record.clone();
        async move {
            record.lock().unwrap().push(event.entries.len());
            Ok(())
        }
    });

    let outcome = monitor.poll_once().await.unwrap();
    assert_eq!(outcome, PollOutcome::Published(3));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*received.lock().unwrap(), vec![3]);
}

#[tokio::test]
async fn test_poll_without_data() {
    let (monitor, _) = monitor_with(None, &[]);
    assert_eq!(monitor.poll_once().await.unwrap(), PollOutcome::NoData);

    let (monitor, _) = monitor_with(Some(Vec::new()), &[]);
    assert_eq!(monitor.poll_once().await.unwrap(), PollOutcome::NoEntries);

    let newest = common::entry("Kingdom", "597").item_id;
    let (monitor, _) = monitor_with(Some(feed()), &[&newest]);
    assert_eq!(monitor.poll_once().await.unwrap(), PollOutcome::NoNewEntries);
}

#[tokio::test]
async fn test_monitor_start_stop() {
    let (monitor, _) = monitor_with(Some(Vec::new()), &[]);
    assert_eq!(monitor.status(), MonitorStatus::NotRunning);

    assert!(monitor.start());
    assert!(!monitor.start());
    assert_eq!(monitor.status(), MonitorStatus::Running);

    assert!(monitor.stop());
    assert!(!monitor.stop());
}
