use std::sync::Arc;

use crate::feed::FeedSource;
use crate::repository::Repository;
use crate::service::activity_service::ActivityService;
use crate::service::colour_service::ColourService;
use crate::service::feed_service::FeedService;
use crate::service::osu_service::OsuService;
use crate::service::series_service::SeriesService;
use crate::service::settings_service::SettingsService;

pub mod activity_service;
pub mod colour_service;
pub mod error;
pub mod feed_service;
pub mod fuzzy;
pub mod osu_service;
pub mod series_service;
pub mod settings_service;

pub struct Services {
    pub feed_source: Arc<dyn FeedSource>,
    pub feed: Arc<FeedService>,
    pub series: Arc<SeriesService>,
    pub settings: Arc<SettingsService>,
    pub activity: Arc<ActivityService>,
    pub osu: Arc<OsuService>,
    pub colour: Arc<ColourService>,
}

impl Services {
    pub async fn new(
        db: Arc<Repository>,
        feed_source: Arc<dyn FeedSource>,
        default_prefix: &str,
    ) -> anyhow::Result<Self> {
        let settings = Arc::new(SettingsService::new(db.clone(), default_prefix));
        settings.load_prefixes().await?;

        Ok(Self {
            feed_source,
            feed: Arc::new(FeedService::new(db.feed_data.clone())),
            series: Arc::new(SeriesService::new(db.clone())),
            settings,
            activity: Arc::new(ActivityService::new(db.clone())),
            osu: Arc::new(OsuService::new(db.clone())),
            colour: Arc::new(ColourService::new(db)),
        })
    }
}
