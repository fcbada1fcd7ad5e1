//! Message, command and presence history used by the statistics commands.

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use crate::model::CommandLogModel;
use crate::model::DiscordMessageModel;
use crate::model::MemberActivityModel;
use crate::model::MemberMessageCount;
use crate::model::MessageStatsOpt;
use crate::repository::Repository;
use crate::service::error::ServiceError;

pub struct ActivityService {
    db: Arc<Repository>,
}

impl ActivityService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Stores a new message or, with `is_edit` set, a new revision of one.
    pub async fn record_message(&self, message: &DiscordMessageModel) -> Result<(), ServiceError> {
        Ok(self.db.discord_messages.insert(message).await?)
    }

    pub async fn record_deletion(&self, message_id: u64) -> Result<(), ServiceError> {
        self.db.discord_messages.mark_deleted(message_id as i64).await?;
        Ok(())
    }

    pub async fn record_command(&self, command: &CommandLogModel) -> Result<(), ServiceError> {
        Ok(self.db.command_log.insert(command).await?)
    }

    pub async fn record_member_activity(
        &self,
        activity: &MemberActivityModel,
    ) -> Result<(), ServiceError> {
        Ok(self.db.member_activity.insert(activity).await?)
    }

    /// Send times of the messages matching `opt`, oldest first.
    pub async fn message_times(&self, opt: &MessageStatsOpt) -> Result<Vec<DateTime<Utc>>, ServiceError> {
        Ok(self.db.discord_messages.sent_times(opt).await?)
    }

    /// Per-member message counts of a guild, highest first.
    pub async fn message_counts(&self, guild_id: u64) -> Result<Vec<MemberMessageCount>, ServiceError> {
        Ok(self.db.discord_messages.message_counts(guild_id as i64).await?)
    }
}
