//! Release feed entries and the source they are fetched from.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::feed::error::FeedError;
use crate::model::FeedEntryModel;

pub mod error;
pub mod rss_source;

const POSTER_SUFFIX: &str = "/cover/cover_250x350.jpg";

/// Static description of the site the feed belongs to.
#[derive(Clone, Debug)]
pub struct SiteInfo {
    /// Display name, e.g. "Hatigarm Scans".
    pub name: String,
    pub feed_url: String,
    /// Base of the cover image URLs, without a trailing slash.
    pub uploads_url: String,
    /// Default avatar of notification webhooks.
    pub avatar_url: String,
}

/// One release parsed out of the feed.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedEntry {
    /// Entry id, usually the chapter URL. Used for deduplication.
    pub item_id: String,
    pub title: String,
    pub link: String,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub updated: DateTime<Utc>,
}

impl FeedEntry {
    /// Series part of a `"<series> #<chapter>"` title.
    pub fn series_title(&self) -> &str {
        match self.title.rfind('#') {
            Some(idx) => self.title[..idx].trim(),
            None => self.title.trim(),
        }
    }

    /// Chapter part of the title, falling back to the last path segment of the id.
    pub fn chapter(&self) -> &str {
        match self.title.rfind('#') {
            Some(idx) => self.title[idx + 1..].trim(),
            None => self
                .item_id
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default(),
        }
    }

    /// Cover image of the entry's series.
    pub fn poster_url(&self, uploads_url: &str) -> String {
        let path = url_path(self.item_id.trim_end_matches('/'));
        let series_path = path.rsplit_once('/').map(|(head, _)| head).unwrap_or("");
        format!("{uploads_url}{series_path}{POSTER_SUFFIX}")
    }
}

/// Cover image of a series given its page URL.
pub fn series_poster_url(uploads_url: &str, series_link: &str) -> String {
    let path = url_path(series_link.trim_end_matches('/'));
    format!("{uploads_url}{path}{POSTER_SUFFIX}")
}

/// Path component of an absolute URL, without query or fragment.
fn url_path(url: &str) -> &str {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = after_scheme
        .find('/')
        .map(|idx| &after_scheme[idx..])
        .unwrap_or("");
    path.split(['?', '#']).next().unwrap_or_default()
}

impl From<FeedEntryModel> for FeedEntry {
    fn from(model: FeedEntryModel) -> Self {
        Self {
            item_id: model.item_id,
            title: model.title,
            link: model.link,
            author: model.author,
            summary: model.summary,
            content: model.content,
            updated: model.updated,
        }
    }
}

impl From<&FeedEntry> for FeedEntryModel {
    fn from(entry: &FeedEntry) -> Self {
        Self {
            item_id: entry.item_id.clone(),
            title: entry.title.clone(),
            link: entry.link.clone(),
            updated: entry.updated,
            author: entry.author.clone(),
            summary: entry.summary.clone(),
            content: entry.content.clone(),
        }
    }
}

/// Scraped details of a series page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeriesPage {
    pub title: String,
    /// `(label, value)` pairs of the info table, in page order.
    pub fields: Vec<(String, String)>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    /// `(name, url)` of the listed chapters, newest first.
    pub chapters: Vec<(String, String)>,
}

/// A site that publishes releases through a feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn site(&self) -> &SiteInfo;

    /// Fetches and parses the feed. `None` when the feed did not answer with 200.
    async fn fetch_entries(&self) -> Result<Option<Vec<FeedEntry>>, FeedError>;

    /// URL of the first page image of a chapter, `None` if not published yet.
    async fn first_page(&self, chapter_url: &str) -> Result<Option<String>, FeedError>;

    /// Whether the first page of a chapter answers with 200.
    async fn test_chapter(&self, chapter_url: &str) -> Result<bool, FeedError>;

    /// Scrapes a series page. `None` when the page did not answer with 200.
    async fn series_page(&self, url: &str) -> Result<Option<SeriesPage>, FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, item_id: &str) -> FeedEntry {
        FeedEntry {
            item_id: item_id.to_string(),
            title: title.to_string(),
            link: item_id.to_string(),
            author: None,
            summary: None,
            content: None,
            updated: Utc::now(),
        }
    }

    #[test]
    fn test_series_title_and_chapter() {
        let e = entry(
            "Kingdom #595",
            "http://hatigarmscans.net/manga/kingdom/595",
        );
        assert_eq!(e.series_title(), "Kingdom");
        assert_eq!(e.chapter(), "595");
    }

    #[test]
    fn test_title_with_several_hashes() {
        let e = entry("Girl #1 Fan #12.5", "http://example.com/manga/girl/12.5");
        assert_eq!(e.series_title(), "Girl #1 Fan");
        assert_eq!(e.chapter(), "12.5");
    }

    #[test]
    fn test_chapter_falls_back_to_item_id() {
        let e = entry("Kingdom", "http://hatigarmscans.net/manga/kingdom/596/");
        assert_eq!(e.series_title(), "Kingdom");
        assert_eq!(e.chapter(), "596");
    }

    #[test]
    fn test_poster_url() {
        let e = entry(
            "Kingdom #595",
            "http://hatigarmscans.net/manga/kingdom/595",
        );
        assert_eq!(
            e.poster_url("http://hatigarmscans.net/uploads"),
            "http://hatigarmscans.net/uploads/manga/kingdom/cover/cover_250x350.jpg"
        );
    }

    #[test]
    fn test_series_poster_url() {
        assert_eq!(
            series_poster_url(
                "http://hatigarmscans.net/uploads",
                "https://hatigarmscans.net/manga/kingdom/"
            ),
            "http://hatigarmscans.net/uploads/manga/kingdom/cover/cover_250x350.jpg"
        );
    }
}
