//! RSS/Atom release feed of a scanlation site.

use std::num::NonZeroU32;

use async_trait::async_trait;
use chrono::Utc;
use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use log::debug;
use log::info;
use log::warn;
use scraper::ElementRef;
use scraper::Html;
use scraper::Selector;

use crate::feed::FeedEntry;
use crate::feed::FeedSource;
use crate::feed::SeriesPage;
use crate::feed::SiteInfo;
use crate::feed::error::FeedError;

const REQUESTS_PER_SECOND: NonZeroU32 = NonZeroU32::new(2).unwrap();

/// Feed source backed by an RSS or Atom document.
pub struct RssSource {
    site: SiteInfo,
    client: wreq::Client,
    limiter: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
}

impl RssSource {
    /// Creates a new source with rate limiting.
    pub fn new(site: SiteInfo) -> Result<Self, FeedError> {
        let client = wreq::Client::builder()
            .emulation(wreq_util::Emulation::Chrome137)
            .build()?;
        let limiter = RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND));

        Ok(Self {
            site,
            client,
            limiter,
        })
    }

    async fn send(&self, request: wreq::RequestBuilder) -> Result<wreq::Response, wreq::Error> {
        if self.limiter.check().is_err() {
            info!("Source {} is ratelimited. Waiting...", self.site.name);
        }
        self.limiter.until_ready().await;

        let req = request.build()?;
        debug!("Making request to: {}", req.url());
        self.client.execute(req).await
    }

    /// GETs `url` and returns the body if the response is a 200.
    async fn get_text(&self, url: &str) -> Result<Option<String>, FeedError> {
        let response = self.send(self.client.get(url)).await?;
        let status = response.status();
        if status.as_u16() != 200 {
            debug!("GET {url} answered with {status}");
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }

    /// Raw feed document, `None` if the feed host did not answer with 200.
    pub async fn fetch_feed(&self) -> Result<Option<String>, FeedError> {
        let text = self.get_text(&self.site.feed_url).await?;
        if text.is_none() {
            warn!("Feed {} is not reachable", self.site.feed_url);
        }
        Ok(text)
    }
}

#[async_trait]
impl FeedSource for RssSource {
    fn site(&self) -> &SiteInfo {
        &self.site
    }

    async fn fetch_entries(&self) -> Result<Option<Vec<FeedEntry>>, FeedError> {
        match self.fetch_feed().await? {
            Some(text) => Ok(Some(parse_entries(&text)?)),
            None => Ok(None),
        }
    }

    async fn first_page(&self, chapter_url: &str) -> Result<Option<String>, FeedError> {
        match self.get_text(chapter_url).await? {
            Some(html) => parse_first_page(&html),
            None => Ok(None),
        }
    }

    async fn test_chapter(&self, chapter_url: &str) -> Result<bool, FeedError> {
        let url = format!("{}/1", chapter_url.trim_end_matches('/'));
        let response = self.send(self.client.get(&url)).await?;
        Ok(response.status().as_u16() == 200)
    }

    async fn series_page(&self, url: &str) -> Result<Option<SeriesPage>, FeedError> {
        match self.get_text(url).await? {
            Some(html) => parse_series_page(&html),
            None => Ok(None),
        }
    }
}

/// Parses an RSS or Atom document into entries, in document order.
pub fn parse_entries(text: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let feed = feed_rs::parser::parse(text.as_bytes())?;

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_else(|| entry.id.clone());
            FeedEntry {
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                author: entry.authors.first().map(|p| p.name.clone()),
                summary: entry.summary.map(|t| t.content),
                content: entry.content.and_then(|c| c.body),
                updated: entry.updated.or(entry.published).unwrap_or_else(Utc::now),
                item_id: entry.id,
                link,
            }
        })
        .collect())
}

fn selector(css: &'static str) -> Result<Selector, FeedError> {
    Selector::parse(css).map_err(|e| FeedError::PageParseFailed {
        message: format!("invalid selector `{css}`: {e}"),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `data-src` of the first image in the reader container.
pub fn parse_first_page(html: &str) -> Result<Option<String>, FeedError> {
    let document = Html::parse_document(html);
    let images = selector("div#all img")?;

    Ok(document
        .select(&images)
        .next()
        .and_then(|img| img.value().attr("data-src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty()))
}

/// Extracts the title, info table and chapter list of a series page.
pub fn parse_series_page(html: &str) -> Result<Option<SeriesPage>, FeedError> {
    let document = Html::parse_document(html);
    let title_sel = selector("h2.widget-title")?;
    let dt_sel = selector("dt")?;
    let dd_sel = selector("dd")?;
    let link_sel = selector("a")?;
    let chapter_sel = selector("h5.chapter-title-rtl a")?;

    let Some(title) = document.select(&title_sel).next().map(element_text) else {
        return Ok(None);
    };

    let mut page = SeriesPage {
        title,
        ..Default::default()
    };

    for (dt, dd) in document.select(&dt_sel).zip(document.select(&dd_sel)) {
        let label = element_text(dt).trim_end_matches(':').trim().to_string();
        match label.as_str() {
            "Categories" | "Tags" => {
                let values: Vec<String> = dd
                    .select(&link_sel)
                    .map(element_text)
                    .filter(|v| !v.is_empty())
                    .collect();
                if label == "Categories" {
                    page.categories = values;
                } else {
                    page.tags = values;
                }
            }
            _ => page.fields.push((label, element_text(dd))),
        }
    }

    page.chapters = document
        .select(&chapter_sel)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            Some((element_text(a), href.to_string()))
        })
        .collect();

    Ok(Some(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Hatigarm Scans</title>
    <link>https://www.hatigarmscans.net</link>
    <description>Latest releases</description>
    <item>
      <title>Kingdom #596</title>
      <link>http://hatigarmscans.net/manga/kingdom/596</link>
      <guid>http://hatigarmscans.net/manga/kingdom/596</guid>
      <description>The battle continues</description>
      <pubDate>Sat, 01 Jun 2019 10:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Kingdom #595</title>
      <link>http://hatigarmscans.net/manga/kingdom/595</link>
      <guid>http://hatigarmscans.net/manga/kingdom/595</guid>
      <pubDate>Fri, 31 May 2019 10:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_entries_keeps_feed_order() {
        let entries = parse_entries(FEED).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].item_id, "http://hatigarmscans.net/manga/kingdom/596");
        assert_eq!(entries[0].chapter(), "596");
        assert_eq!(entries[0].summary.as_deref(), Some("The battle continues"));
        assert!(entries[0].updated > entries[1].updated);
    }

    #[test]
    fn test_parse_entries_rejects_garbage() {
        assert!(parse_entries("definitely not xml").is_err());
    }

    #[test]
    fn test_parse_first_page() {
        let html = r#"<html><body>
            <div id="all">
              <img class="img-responsive" data-src=" https://cdn.example.com/kingdom/596/01.jpg " />
              <img class="img-responsive" data-src="https://cdn.example.com/kingdom/596/02.jpg" />
            </div>
        </body></html>"#;
        assert_eq!(
            parse_first_page(html).unwrap().as_deref(),
            Some("https://cdn.example.com/kingdom/596/01.jpg")
        );
    }

    #[test]
    fn test_parse_first_page_unpublished() {
        assert_eq!(parse_first_page("<html><body><p>Soon</p></body></html>").unwrap(), None);
        assert_eq!(
            parse_first_page(r#"<div id="all"><img src="a.jpg"></div>"#).unwrap(),
            None
        );
    }

    #[test]
    fn test_parse_series_page() {
        let html = r#"<html><body>
            <h2 class="widget-title">Kingdom</h2>
            <dl>
              <dt>Status</dt><dd><span>Ongoing</span></dd>
              <dt>Categories</dt><dd><a href="/c/action">Action</a>, <a href="/c/historical">Historical</a></dd>
              <dt>Tags</dt><dd><a href="/t/war">war</a></dd>
            </dl>
            <h5 class="chapter-title-rtl"><a href="http://example.com/manga/kingdom/596">Kingdom 596</a></h5>
            <h5 class="chapter-title-rtl"><a href="http://example.com/manga/kingdom/595">Kingdom 595</a></h5>
        </body></html>"#;
        let page = parse_series_page(html).unwrap().unwrap();
        assert_eq!(page.title, "Kingdom");
        assert_eq!(page.fields, vec![("Status".to_string(), "Ongoing".to_string())]);
        assert_eq!(page.categories, vec!["Action", "Historical"]);
        assert_eq!(page.tags, vec!["war"]);
        assert_eq!(page.chapters.len(), 2);
        assert_eq!(page.chapters[0].0, "Kingdom 596");
    }
}
