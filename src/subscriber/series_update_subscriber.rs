use std::sync::Arc;

use anyhow::Result;
use log::debug;
use log::error;

use crate::event::Event;
use crate::event::FeedUpdateEvent;
use crate::service::series_service::SeriesService;
use crate::subscriber::Subscriber;

/// Records each new entry as the latest release of its series.
pub struct SeriesUpdateSubscriber {
    series: Arc<SeriesService>,
}

impl SeriesUpdateSubscriber {
    pub fn new(series: Arc<SeriesService>) -> Self {
        debug!("Initializing SeriesUpdateSubscriber.");
        Self { series }
    }
}

#[async_trait::async_trait]
impl Subscriber<FeedUpdateEvent> for SeriesUpdateSubscriber {
    async fn callback(&self, event: FeedUpdateEvent) -> Result<()> {
        debug!("Received event `{}`", event.event_name());
        for entry in event.entries.iter() {
            if let Err(e) = self.series.apply_entry(entry).await {
                error!("Failed to update series of {}: {e:?}", entry.item_id);
            }
        }
        Ok(())
    }
}
