//! Background task polling the release feed.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use futures::FutureExt;
use log::debug;
use log::error;
use log::info;
use log::warn;
use tokio::task::JoinHandle;

use crate::event::FeedUpdateEvent;
use crate::event::event_bus::EventBus;
use crate::feed::FeedSource;
use crate::service::feed_service::FeedService;

/// State of the monitor task, as shown by `taskstatus`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MonitorStatus {
    NotRunning,
    Running,
    Finished,
    Failed(String),
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::NotRunning => write!(f, "No Running Update Task"),
            MonitorStatus::Running => write!(f, "Feed monitor is running"),
            MonitorStatus::Finished => write!(f, "Feed monitor finished"),
            MonitorStatus::Failed(msg) => write!(f, "Feed monitor failed\n\nException:\n{msg}"),
        }
    }
}

/// What a single poll found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    NoData,
    NoEntries,
    NoNewEntries,
    Published(usize),
}

#[derive(Default)]
struct TaskState {
    handle: Option<JoinHandle<()>>,
    failure: Option<String>,
}

pub struct FeedMonitor {
    source: Arc<dyn FeedSource>,
    feed: Arc<FeedService>,
    event_bus: Arc<EventBus>,
    poll_interval: Duration,
    state: Arc<Mutex<TaskState>>,
}

impl FeedMonitor {
    pub fn new(
        source: Arc<dyn FeedSource>,
        feed: Arc<FeedService>,
        event_bus: Arc<EventBus>,
        poll_interval: Duration,
    ) -> Arc<Self> {
        info!("Initializing FeedMonitor with poll interval {poll_interval:?}");
        Arc::new(Self {
            source,
            feed,
            event_bus,
            poll_interval,
            state: Arc::new(Mutex::new(TaskState::default())),
        })
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Starts the polling loop. Returns `false` if it is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut state = self.lock_state();
        if state.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            info!("Feed monitor task already running");
            return false;
        }

        info!("Starting feed monitor task");
        state.failure = None;
        let monitor = self.clone();
        let task_state = self.state.clone();
        state.handle = Some(tokio::spawn(async move {
            let result = AssertUnwindSafe(monitor.run_loop()).catch_unwind().await;
            if let Err(panic) = result {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Feed monitor task panicked: {msg}");
                task_state
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .failure = Some(msg);
            }
        }));
        true
    }

    /// Stops the polling loop. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let mut state = self.lock_state();
        match state.handle.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                info!("Feed monitor task stopped");
                true
            }
            _ => {
                info!("Feed monitor task not running");
                false
            }
        }
    }

    pub fn status(&self) -> MonitorStatus {
        let state = self.lock_state();
        match (&state.handle, &state.failure) {
            (None, _) => MonitorStatus::NotRunning,
            (Some(h), _) if !h.is_finished() => MonitorStatus::Running,
            (Some(_), Some(msg)) => MonitorStatus::Failed(msg.clone()),
            (Some(_), None) => MonitorStatus::Finished,
        }
    }

    async fn run_loop(self: Arc<Self>) {
        loop {
            match self.poll_once().await {
                Ok(outcome) => debug!("Feed poll finished: {outcome:?}"),
                Err(e) => error!("Feed poll failed: {e:?}"),
            }
            debug!("Sleeping {:?} until next update", self.poll_interval);
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Fetches the feed once and publishes any new entries.
    pub async fn poll_once(&self) -> anyhow::Result<PollOutcome> {
        info!("Update starting");
        let Some(entries) = self.source.fetch_entries().await? else {
            warn!("No feed data");
            return Ok(PollOutcome::NoData);
        };

        if entries.is_empty() {
            error!("No entries found in feed");
            return Ok(PollOutcome::NoEntries);
        }

        let new_entries = self.feed.get_new_entries(&entries).await?;
        if new_entries.is_empty() {
            info!("No new entries");
            return Ok(PollOutcome::NoNewEntries);
        }

        let count = new_entries.len();
        info!("Publishing {count} new entries");
        self.event_bus.publish(FeedUpdateEvent::new(new_entries));
        Ok(PollOutcome::Published(count))
    }
}
