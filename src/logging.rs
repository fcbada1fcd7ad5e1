//! Logging setup and configuration.
//!
//! Console and rolling-file output are installed at start-up. WARN and ERROR
//! events are additionally queued for the `bot_logs` table and written once
//! [`spawn_db_log_drain`] is given a repository.

use std::fmt;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::Event;
use tracing::Level;
use tracing::field::Field;
use tracing::field::Visit;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::model::BotLogModel;
use crate::repository::Repository;

/// Target of the drain's own diagnostics. Never forwarded to the database.
pub const DB_LOG_TARGET: &str = "manibot::db_log";

/// A log event captured for persistence.
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub created: DateTime<Utc>,
    pub target: String,
    pub level: Level,
    pub module: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub message: String,
}

impl LogRecord {
    pub fn into_model(self) -> BotLogModel {
        BotLogModel {
            log_id: Uuid::new_v4(),
            created: self.created,
            logger_name: self.target,
            level_name: self.level.to_string(),
            file_path: self.file,
            func_name: None,
            line_no: self.line.and_then(|l| i32::try_from(l).ok()),
            module: self.module,
            message: self.message,
            traceback: None,
        }
    }
}

pub type LogReceiver = mpsc::UnboundedReceiver<LogRecord>;

#[derive(Default)]
struct RecordVisitor {
    message: Option<String>,
    target: Option<String>,
    module: Option<String>,
    file: Option<String>,
    line: Option<u32>,
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "log.target" => self.target = Some(value.to_string()),
            "log.module_path" => self.module = Some(value.to_string()),
            "log.file" => self.file = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "log.line" {
            self.line = u32::try_from(value).ok();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

/// Forwards WARN and ERROR events to a channel.
pub struct DbLogLayer {
    sender: mpsc::UnboundedSender<LogRecord>,
}

impl DbLogLayer {
    pub fn new() -> (Self, LogReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl<S: tracing::Subscriber> Layer<S> for DbLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > Level::WARN {
            return;
        }

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let target = visitor
            .target
            .unwrap_or_else(|| metadata.target().to_string());
        if target.starts_with(DB_LOG_TARGET) {
            return;
        }

        let record = LogRecord {
            created: Utc::now(),
            target,
            level: *metadata.level(),
            module: visitor.module.or_else(|| metadata.module_path().map(String::from)),
            file: visitor.file.or_else(|| metadata.file().map(String::from)),
            line: visitor.line.or(metadata.line()),
            message: visitor.message.unwrap_or_default(),
        };
        // The receiver only goes away on shutdown.
        let _ = self.sender.send(record);
    }
}

/// Sets up logging with console, file and database output.
///
/// Returns the receiving end of the database queue, to be handed to
/// [`spawn_db_log_drain`] once the database is reachable.
pub fn setup_logging(config: &Config) -> Result<LogReceiver, AppError> {
    std::fs::create_dir_all(&config.logs_path).map_err(|e| AppError::ConfigurationError {
        msg: format!(
            "Failed to create logs directory '{}': {}",
            config.logs_path.to_string_lossy(),
            e
        ),
    })?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("manibot")
        .filename_suffix("log")
        .max_log_files(7)
        .build(&config.logs_path)
        .map_err(|e| AppError::ConfigurationError {
            msg: format!(
                "Failed to initialize rolling file appender at '{}': {}",
                config.logs_path.to_string_lossy(),
                e
            ),
        })?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Lives for the whole process.
    std::mem::forget(guard);

    let default_directive = if config.debug {
        "manibot=debug"
    } else {
        "manibot=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let (db_layer, receiver) = DbLogLayer::new();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_fmt::layer().with_writer(std::io::stdout).with_ansi(true))
        .with(tracing_fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(db_layer)
        .try_init()
        .map_err(|e| AppError::ConfigurationError {
            msg: format!("Failed to install log subscriber: {e}"),
        })?;

    Ok(receiver)
}

/// Writes queued log records to `bot_logs` until the queue closes.
pub fn spawn_db_log_drain(
    mut receiver: LogReceiver,
    repository: Arc<Repository>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(record) = receiver.recv().await {
            if let Err(e) = repository.bot_logs.insert(&record.into_model()).await {
                log::warn!(target: DB_LOG_TARGET, "Failed to persist log record: {e}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    #[test]
    fn test_layer_forwards_warnings_only() {
        let (layer, mut receiver) = DbLogLayer::new();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("not persisted");
            tracing::warn!("feed unreachable");
            tracing::error!(target: DB_LOG_TARGET, "drain failure");
            tracing::error!("webhook failed");
        });

        let first = receiver.try_recv().unwrap();
        assert_eq!(first.level, Level::WARN);
        assert_eq!(first.message, "feed unreachable");

        let second = receiver.try_recv().unwrap();
        assert_eq!(second.level, Level::ERROR);
        assert_eq!(second.message, "webhook failed");

        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_record_into_model() {
        let record = LogRecord {
            created: Utc::now(),
            target: "manibot::task".to_string(),
            level: Level::ERROR,
            module: Some("manibot::task::feed_monitor".to_string()),
            file: Some("src/task/feed_monitor.rs".to_string()),
            line: Some(42),
            message: "boom".to_string(),
        };
        let model = record.into_model();
        assert_eq!(model.level_name, "ERROR");
        assert_eq!(model.line_no, Some(42));
        assert_eq!(model.logger_name, "manibot::task");
    }
}
