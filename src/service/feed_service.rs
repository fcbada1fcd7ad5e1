//! Deduplication and history of release feed entries.

use std::sync::Arc;

use log::debug;

use crate::feed::FeedEntry;
use crate::model::FeedEntryModel;
use crate::repository::table::FeedStore;
use crate::service::error::ServiceError;

pub struct FeedService {
    store: Arc<dyn FeedStore>,
}

impl FeedService {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    /// Stores the entries not seen before and returns them oldest first.
    ///
    /// `entries` must be in feed order (newest first). The walk stops at the
    /// first entry that is already stored, so anything older than it is
    /// assumed to be known.
    ///
    /// # Performance
    /// * DB calls: up to 2 per new entry, plus 1
    pub async fn get_new_entries(
        &self,
        entries: &[FeedEntry],
    ) -> Result<Vec<FeedEntry>, ServiceError> {
        let mut new_entries = Vec::new();
        for entry in entries {
            if self.store.exists(&entry.item_id).await? {
                break;
            }
            if self.store.insert(&FeedEntryModel::from(entry)).await? {
                new_entries.push(entry.clone());
            } else {
                debug!("Entry {} was stored concurrently", entry.item_id);
            }
        }
        new_entries.reverse();
        Ok(new_entries)
    }

    /// Most recent stored entry, optionally filtered by title.
    pub async fn latest(&self, filter: Option<&str>) -> Result<Option<FeedEntry>, ServiceError> {
        let filter = filter.map(str::trim).filter(|f| !f.is_empty()).map(String::from);
        Ok(self.store.latest(filter).await?.map(FeedEntry::from))
    }

    /// The `count` most recent stored entries, oldest first.
    pub async fn recent(&self, count: usize) -> Result<Vec<FeedEntry>, ServiceError> {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        let mut entries: Vec<FeedEntry> = self
            .store
            .recent(count)
            .await?
            .into_iter()
            .map(FeedEntry::from)
            .collect();
        entries.reverse();
        Ok(entries)
    }
}
