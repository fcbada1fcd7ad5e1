use std::sync::Arc;

use crate::feed::FeedEntry;

pub mod event_bus;

/// Marker trait for events that can be dispatched through the event bus.
pub trait Event: std::any::Any + Send + Sync + Clone + 'static {
    /// Name of the event type, for logs.
    fn event_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// New entries found by one poll of the release feed, oldest first.
#[derive(Clone, Debug)]
pub struct FeedUpdateEvent {
    pub entries: Arc<Vec<FeedEntry>>,
}

impl FeedUpdateEvent {
    pub fn new(entries: Vec<FeedEntry>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl Event for FeedUpdateEvent {}
