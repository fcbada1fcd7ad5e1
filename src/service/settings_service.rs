//! Guild settings: feed notifications, key/value config and command prefixes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use log::debug;

use crate::model::FeedSettingsChange;
use crate::model::FeedSettingsModel;
use crate::model::GuildConfigModel;
use crate::model::PrefixModel;
use crate::repository::Repository;
use crate::service::error::ServiceError;

pub const MAX_PREFIX_LEN: usize = 10;

/// Config key of the role that grants moderator privileges.
pub const MOD_ROLE_KEY: &str = "mod_role";
/// Config key of the role that grants administrator privileges.
pub const ADMIN_ROLE_KEY: &str = "admin_role";

/// Service for managing guild settings.
pub struct SettingsService {
    db: Arc<Repository>,
    default_prefix: String,
    prefixes: RwLock<HashMap<u64, String>>,
}

impl SettingsService {
    pub fn new(db: Arc<Repository>, default_prefix: impl Into<String>) -> Self {
        Self {
            db,
            default_prefix: default_prefix.into(),
            prefixes: RwLock::new(HashMap::new()),
        }
    }

    /// Fills the prefix cache from the database.
    pub async fn load_prefixes(&self) -> Result<usize, ServiceError> {
        let rows = self.db.prefix.select_all().await?;
        let mut cache = self.prefixes.write().unwrap_or_else(|p| p.into_inner());
        cache.clear();
        for row in rows {
            cache.insert(row.guild_id as u64, row.prefix);
        }
        debug!("Loaded {} guild prefixes", cache.len());
        Ok(cache.len())
    }

    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    /// Prefix in effect for a guild. DMs use the default.
    pub fn prefix_for(&self, guild_id: Option<u64>) -> String {
        guild_id
            .and_then(|id| {
                self.prefixes
                    .read()
                    .unwrap_or_else(|p| p.into_inner())
                    .get(&id)
                    .cloned()
            })
            .unwrap_or_else(|| self.default_prefix.clone())
    }

    pub async fn set_prefix(&self, guild_id: u64, prefix: &str) -> Result<(), ServiceError> {
        validate_prefix(prefix)?;
        self.db
            .prefix
            .set(&PrefixModel {
                guild_id: guild_id as i64,
                prefix: prefix.to_string(),
            })
            .await?;
        self.prefixes
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(guild_id, prefix.to_string());
        Ok(())
    }

    /// Reverts a guild to the default prefix.
    pub async fn reset_prefix(&self, guild_id: u64) -> Result<(), ServiceError> {
        self.db.prefix.delete(guild_id as i64).await?;
        self.prefixes
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&guild_id);
        Ok(())
    }

    /// Feed settings of a guild, defaults if it never configured any.
    pub async fn feed_settings(&self, guild_id: u64) -> Result<FeedSettingsModel, ServiceError> {
        Ok(self
            .db
            .feed_settings
            .select(guild_id as i64)
            .await?
            .unwrap_or_else(|| FeedSettingsModel::with_defaults(guild_id as i64)))
    }

    pub async fn update_feed_settings(
        &self,
        guild_id: u64,
        change: &FeedSettingsChange,
    ) -> Result<FeedSettingsModel, ServiceError> {
        if let Some(delay) = change.delay
            && delay < 0
        {
            return Err(ServiceError::InvalidInput {
                message: "Delay cannot be negative.".to_string(),
            });
        }
        Ok(self
            .db
            .feed_settings
            .upsert_change(guild_id as i64, change)
            .await?)
    }

    /// Every enabled guild with a webhook.
    pub async fn enabled_webhooks(&self) -> Result<Vec<FeedSettingsModel>, ServiceError> {
        Ok(self.db.feed_settings.select_enabled_webhooks().await?)
    }

    pub async fn get_config(&self, guild_id: u64, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.db.guild_config.get(guild_id as i64, key).await?)
    }

    pub async fn all_config(&self, guild_id: u64) -> Result<Vec<(String, String)>, ServiceError> {
        Ok(self
            .db
            .guild_config
            .select_all(guild_id as i64)
            .await?
            .into_iter()
            .map(|row| (row.config_name, row.config_value))
            .collect())
    }

    pub async fn set_config(&self, guild_id: u64, key: &str, value: &str) -> Result<(), ServiceError> {
        let key = normalize_key(key)?;
        self.db
            .guild_config
            .set(&GuildConfigModel {
                guild_id: guild_id as i64,
                config_name: key,
                config_value: value.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Returns `false` if the key was not set.
    pub async fn delete_config(&self, guild_id: u64, key: &str) -> Result<bool, ServiceError> {
        let key = normalize_key(key)?;
        Ok(self.db.guild_config.delete(guild_id as i64, &key).await?)
    }

    /// A role id stored under `key`, ignoring values that are not ids.
    pub async fn config_role(&self, guild_id: u64, key: &str) -> Result<Option<u64>, ServiceError> {
        Ok(self
            .get_config(guild_id, key)
            .await?
            .and_then(|v| parse_role_id(&v)))
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ServiceError> {
    if prefix.is_empty() || prefix.chars().count() > MAX_PREFIX_LEN {
        return Err(ServiceError::InvalidInput {
            message: format!("Prefix must be 1 to {MAX_PREFIX_LEN} characters long."),
        });
    }
    if prefix.chars().any(char::is_whitespace) {
        return Err(ServiceError::InvalidInput {
            message: "Prefix cannot contain spaces.".to_string(),
        });
    }
    Ok(())
}

fn normalize_key(key: &str) -> Result<String, ServiceError> {
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        return Err(ServiceError::InvalidInput {
            message: "Setting name cannot be empty.".to_string(),
        });
    }
    Ok(key)
}

/// Accepts a bare id or a `<@&id>` role mention.
pub fn parse_role_id(value: &str) -> Option<u64> {
    let value = value.trim();
    let value = value
        .strip_prefix("<@&")
        .and_then(|v| v.strip_suffix('>'))
        .unwrap_or(value);
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_prefix() {
        assert!(validate_prefix("!").is_ok());
        assert!(validate_prefix("mb.").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("a b").is_err());
        assert!(validate_prefix("way-too-long-prefix").is_err());
    }

    #[test]
    fn test_parse_role_id() {
        assert_eq!(parse_role_id("123"), Some(123));
        assert_eq!(parse_role_id("<@&456>"), Some(456));
        assert_eq!(parse_role_id("moderators"), None);
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(" Mod_Role ").unwrap(), "mod_role");
        assert!(normalize_key("  ").is_err());
    }
}
