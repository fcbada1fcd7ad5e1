//! Common test utilities.

use std::sync::Arc;

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use manibot::feed::FeedEntry;
use manibot::feed::SiteInfo;
use manibot::repository::Repository;

/// Connects to the database named by `TEST_DATABASE_URL` and empties it.
///
/// Returns `None` when the variable is unset, so database tests are skipped.
#[allow(dead_code)]
pub async fn setup_db() -> Option<Arc<Repository>> {
    let Ok(db_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    };

    let db = Repository::new(&db_url, 4).expect("Failed to create database pool");
    db.run_migrations().await.expect("Failed to run migrations");
    db.delete_all_tables().await.expect("Failed to clear tables");
    Some(Arc::new(db))
}

#[allow(dead_code)]
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 6, day, hour, 0, 0).unwrap()
}

/// Entry for chapter `chapter` of `series`, with the chapter URL as id.
#[allow(dead_code)]
pub fn entry(series: &str, chapter: &str) -> FeedEntry {
    let slug = series.to_lowercase().replace(' ', "-");
    let link = format!("http://hatigarmscans.net/manga/{slug}/{chapter}");
    FeedEntry {
        item_id: link.clone(),
        title: format!("{series} #{chapter}"),
        link,
        author: None,
        summary: None,
        content: None,
        updated: at(1, 10),
    }
}

#[allow(dead_code)]
pub fn site(base_url: &str) -> SiteInfo {
    SiteInfo {
        name: "Hatigarm Scans".to_string(),
        feed_url: format!("{base_url}/feed"),
        uploads_url: format!("{base_url}/uploads"),
        avatar_url: "https://i.imgur.com/HZ27mE7.png".to_string(),
    }
}
