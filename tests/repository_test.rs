//! Database tests. They run against `TEST_DATABASE_URL` and are skipped without it.

mod common;

use std::sync::Arc;

use chrono::Duration;
use manibot::model::DiscordMessageModel;
use manibot::model::FeedSettingsChange;
use manibot::model::MessageStatsOptBuilder;
use manibot::model::SeriesChange;
use manibot::model::SeriesModel;
use manibot::service::activity_service::ActivityService;
use manibot::service::colour_service::ColourService;
use manibot::service::feed_service::FeedService;
use manibot::service::osu_service::OsuService;
use manibot::service::series_service::EXACT_SCORE;
use manibot::service::series_service::SeriesService;
use manibot::service::settings_service::SettingsService;
use serial_test::serial;

macro_rules! db_test {
    ($name:ident, |$db:ident| $body:block) => {
        #[tokio::test]
        #[serial]
        async fn $name() {
            let Some($db) = common::setup_db().await else {
                return;
            };
            $body
        }
    };
}

fn message(message_id: i64, author_id: i64, hour: u32) -> DiscordMessageModel {
    DiscordMessageModel {
        message_id,
        sent: common::at(1, hour),
        is_edit: false,
        deleted: false,
        author_id,
        channel_id: 10,
        guild_id: Some(1),
        content: "hello".to_string(),
        clean_content: "hello".to_string(),
        embeds: None,
        webhook_id: None,
        attachments: Vec::new(),
    }
}

db_test!(test_feed_entries_deduplicate, |db| {
    let feed = FeedService::new(db.feed_data.clone());
    let entries = vec![common::entry("Kingdom", "596"), common::entry("Kingdom", "595")];

    let first = feed.get_new_entries(&entries).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].chapter(), "595");

    let again = feed.get_new_entries(&entries).await.unwrap();
    assert!(again.is_empty());

    let latest = feed.latest(Some("Kingdom")).await.unwrap().unwrap();
    assert!(latest.title.starts_with("Kingdom #"));
    assert!(feed.latest(Some("Hero Killer")).await.unwrap().is_none());
});

db_test!(test_series_crud_and_match, |db| {
    let series = SeriesService::new(db.clone());
    let mut model = SeriesModel::new("kd".to_string(), "Kingdom".to_string());
    model.genres = vec!["Action".to_string(), "Historical".to_string()];
    series.add(&model).await.unwrap();
    series
        .add(&SeriesModel::new("hk".to_string(), "Hero Killer".to_string()))
        .await
        .unwrap();

    let exact = series.match_series("kd").await.unwrap().unwrap();
    assert_eq!(exact.title, "Kingdom");
    assert_eq!(exact.score, EXACT_SCORE);

    let fuzzy = series.match_series("kingdon").await.unwrap().unwrap();
    assert_eq!(fuzzy.title, "Kingdom");

    let change = SeriesChange {
        status: Some(Some("Ongoing".to_string())),
        ..Default::default()
    };
    series.edit_by_title("Kingdom", &change).await.unwrap();
    let kingdom = series.get("Kingdom").await.unwrap().unwrap();
    assert_eq!(kingdom.status.as_deref(), Some("Ongoing"));

    let action = series.search_genre("action").await.unwrap();
    assert_eq!(action.len(), 1);
    assert_eq!(action[0].shortname, "kd");

    let applied = series
        .apply_entry(&common::entry("Kingdom", "596"))
        .await
        .unwrap();
    assert!(applied);
    let kingdom = series.get_by_shortname("kd").await.unwrap().unwrap();
    assert_eq!(kingdom.latest_chapter.as_deref(), Some("596"));

    assert!(series.apply_entry(&common::entry("KD", "597")).await.unwrap());
    let kingdom = series.get_by_shortname("kd").await.unwrap().unwrap();
    assert_eq!(kingdom.latest_chapter.as_deref(), Some("597"));

    assert!(!series.apply_entry(&common::entry("Unknown", "1")).await.unwrap());
    assert!(series.match_series("One Piece").await.unwrap().is_none());
});

db_test!(test_settings_prefix_and_feed, |db| {
    let settings = SettingsService::new(db.clone(), "!");
    assert_eq!(settings.prefix_for(Some(1)), "!");

    settings.set_prefix(1, "m.").await.unwrap();
    assert_eq!(settings.prefix_for(Some(1)), "m.");
    assert_eq!(settings.prefix_for(None), "!");

    let reloaded = SettingsService::new(db.clone(), "!");
    assert_eq!(reloaded.load_prefixes().await.unwrap(), 1);
    assert_eq!(reloaded.prefix_for(Some(1)), "m.");

    settings.reset_prefix(1).await.unwrap();
    assert_eq!(settings.prefix_for(Some(1)), "!");

    let change = FeedSettingsChange {
        webhook_url: Some(Some("https://discord.com/api/webhooks/1/abc".to_string())),
        delay: Some(30),
        enabled: Some(true),
        ..Default::default()
    };
    let updated = settings.update_feed_settings(1, &change).await.unwrap();
    assert_eq!(updated.delay, 30);
    assert!(updated.enabled);
    assert_eq!(settings.enabled_webhooks().await.unwrap().len(), 1);

    let negative = FeedSettingsChange {
        delay: Some(-1),
        ..Default::default()
    };
    assert!(settings.update_feed_settings(1, &negative).await.is_err());

    settings.set_config(1, "mod_role", "55").await.unwrap();
    assert_eq!(
        settings.get_config(1, "mod_role").await.unwrap().as_deref(),
        Some("55")
    );
    assert!(settings.delete_config(1, "mod_role").await.unwrap());
    assert!(!settings.delete_config(1, "mod_role").await.unwrap());
});

db_test!(test_message_stats, |db| {
    let activity = ActivityService::new(db.clone());
    for (id, author, hour) in [(1, 100, 1), (2, 100, 2), (3, 200, 3), (4, 100, 4)] {
        activity.record_message(&message(id, author, hour)).await.unwrap();
    }
    activity.record_deletion(4).await.unwrap();

    let counts = activity.message_counts(1).await.unwrap();
    assert_eq!(counts[0].author_id, 100);
    assert_eq!(counts[0].count, 3);
    assert_eq!(counts[1].author_id, 200);

    let opt = MessageStatsOptBuilder::default()
        .guild_id(1)
        .author_id(Some(100))
        .since(Some(common::at(1, 2) - Duration::minutes(1)))
        .build()
        .unwrap();
    let times = activity.message_times(&opt).await.unwrap();
    assert_eq!(times, vec![common::at(1, 2), common::at(1, 4)]);
});

db_test!(test_osu_and_colour_links, |db| {
    let osu = OsuService::new(db.clone());
    assert!(osu.username(5).await.unwrap().is_none());
    osu.link(5, "Cookiezi").await.unwrap();
    osu.link(5, "WhiteCat").await.unwrap();
    assert_eq!(osu.username(5).await.unwrap().as_deref(), Some("WhiteCat"));
    assert!(osu.unlink(5).await.unwrap());
    assert!(!osu.unlink(5).await.unwrap());

    let colour = Arc::new(ColourService::new(db.clone()));
    colour.assign(1, 5, 900).await.unwrap();
    colour.assign(1, 6, 901).await.unwrap();
    assert_eq!(colour.role_of(1, 5).await.unwrap(), Some(900));
    assert_eq!(colour.list(1).await.unwrap().len(), 2);
    assert!(colour.remove(1, 5).await.unwrap());
    assert_eq!(colour.role_of(1, 5).await.unwrap(), None);
});
