//! Tests for the RSS source against a mock feed host.

mod common;

use httpmock::Method::GET;
use httpmock::MockServer;
use manibot::feed::FeedSource;
use manibot::feed::rss_source::RssSource;

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
      <pubDate>Sat, 01 Jun 2019 10:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Hero Killer #12.5</title>
      <link>http://hatigarmscans.net/manga/hero-killer/12.5</link>
      <guid>http://hatigarmscans.net/manga/hero-killer/12.5</guid>
      <pubDate>Fri, 31 May 2019 10:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

const READER: &str = r#"<html><body>
<div id="all">
  <img class="img-responsive" data-src=" http://hatigarmscans.net/uploads/manga/kingdom/chapters/596/01.jpg " />
  <img class="img-responsive" data-src="http://hatigarmscans.net/uploads/manga/kingdom/chapters/596/02.jpg" />
</div>
</body></html>"#;

const SERIES_PAGE: &str = r#"<html><body>
<h2 class="widget-title">Kingdom</h2>
<dl class="dl-horizontal">
  <dt>Type</dt><dd>Manga</dd>
  <dt>Status</dt><dd>Ongoing</dd>
  <dt>Categories</dt><dd><a href="/c/action">Action</a>, <a href="/c/history">Historical</a></dd>
  <dt>Tags</dt><dd><a href="/t/war">war</a></dd>
</dl>
<ul class="chapters">
  <li><h5 class="chapter-title-rtl"><a href="http://hatigarmscans.net/manga/kingdom/596">Kingdom #596</a></h5></li>
  <li><h5 class="chapter-title-rtl"><a href="http://hatigarmscans.net/manga/kingdom/595">Kingdom #595</a></h5></li>
</ul>
</body></html>"#;

#[tokio::test]
async fn test_fetch_entries() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/feed");
        then.status(200)
            .header("content-type", "application/rss+xml")
            .body(FEED);
    });

    let source = RssSource::new(common::site(&server.base_url())).unwrap();
    let entries = source
        .fetch_entries()
        .await
        .expect("Failed to fetch feed")
        .expect("Feed should answer");

    mock.assert();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].series_title(), "Kingdom");
    assert_eq!(entries[0].chapter(), "596");
    assert_eq!(entries[1].series_title(), "Hero Killer");
    assert_eq!(entries[1].chapter(), "12.5");
    assert!(entries[0].updated > entries[1].updated);
}

#[tokio::test]
async fn test_fetch_entries_unavailable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/feed");
        then.status(503);
    });

    let source = RssSource::new(common::site(&server.base_url())).unwrap();
    let entries = source.fetch_entries().await.expect("Non-200 is not an error");
    assert!(entries.is_none());
}

#[tokio::test]
async fn test_first_page() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/manga/kingdom/596");
        then.status(200).body(READER);
    });
    server.mock(|when, then| {
        when.method(GET).path("/manga/kingdom/597");
        then.status(200).body("<html><body><div id=\"all\"></div></body></html>");
    });

    let source = RssSource::new(common::site(&server.base_url())).unwrap();

    let page = source
        .first_page(&server.url("/manga/kingdom/596"))
        .await
        .unwrap();
    assert_eq!(
        page.as_deref(),
        Some("http://hatigarmscans.net/uploads/manga/kingdom/chapters/596/01.jpg")
    );

    let unpublished = source
        .first_page(&server.url("/manga/kingdom/597"))
        .await
        .unwrap();
    assert!(unpublished.is_none());
}

#[tokio::test]
async fn test_test_chapter() {
    let server = MockServer::start();
    let ok = server.mock(|when, then| {
        when.method(GET).path("/manga/kingdom/596/1");
        then.status(200);
    });
    server.mock(|when, then| {
        when.method(GET).path("/manga/kingdom/597/1");
        then.status(404);
    });

    let source = RssSource::new(common::site(&server.base_url())).unwrap();
    assert!(source.test_chapter(&server.url("/manga/kingdom/596/")).await.unwrap());
    assert!(!source.test_chapter(&server.url("/manga/kingdom/597")).await.unwrap());
    ok.assert();
}

#[tokio::test]
async fn test_series_page() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/manga/kingdom");
        then.status(200).body(SERIES_PAGE);
    });

    let source = RssSource::new(common::site(&server.base_url())).unwrap();
    let page = source
        .series_page(&server.url("/manga/kingdom"))
        .await
        .unwrap()
        .expect("Page should parse");

    assert_eq!(page.title, "Kingdom");
    assert_eq!(
        page.fields,
        vec![
            ("Type".to_string(), "Manga".to_string()),
            ("Status".to_string(), "Ongoing".to_string()),
        ]
    );
    assert_eq!(page.categories, vec!["Action", "Historical"]);
    assert_eq!(page.tags, vec!["war"]);
    assert_eq!(page.chapters.len(), 2);
    assert_eq!(page.chapters[0].0, "Kingdom #596");
}
