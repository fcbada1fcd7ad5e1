//! Application-level errors.

use log::error;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Assertion error: {msg}")]
    AssertionError { msg: String },

    #[error("Missing config with key \"{key}\"")]
    MissingConfig { key: String },

    #[error("Configuration error: {msg}")]
    ConfigurationError { msg: String },

    #[error("Internal error (ref: {ref_id}): {msg}")]
    InternalError { msg: String, ref_id: Uuid },
}

impl AppError {
    /// Creates an internal error with a fresh reference id and logs it.
    pub fn internal_with_ref(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let ref_id = Uuid::new_v4();
        error!("Internal error (ref: {ref_id}): {msg}");
        Self::InternalError { msg, ref_id }
    }

    /// Logs an arbitrary error under a new reference id and returns the id.
    ///
    /// The id is what gets shown to Discord users, so a report from a user
    /// can be matched with the log line.
    pub fn log_with_ref(err: &(dyn std::error::Error + Send + Sync)) -> Uuid {
        let ref_id = Uuid::new_v4();
        error!("Unhandled error (ref: {ref_id}): {err:?}");
        ref_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_with_ref_keeps_message() {
        match AppError::internal_with_ref("broken pipe") {
            AppError::InternalError { msg, .. } => assert_eq!(msg, "broken pipe"),
            other => panic!("Unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn test_missing_config_display() {
        let err = AppError::MissingConfig {
            key: "DISCORD_TOKEN".to_string(),
        };
        assert_eq!(err.to_string(), "Missing config with key \"DISCORD_TOKEN\"");
    }
}
