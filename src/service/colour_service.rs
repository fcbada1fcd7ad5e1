//! Members allowed to recolour a personal role.

use std::sync::Arc;

use crate::model::ColourRoleModel;
use crate::repository::Repository;
use crate::service::error::ServiceError;

pub struct ColourService {
    db: Arc<Repository>,
}

impl ColourService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// The colour role assigned to a member, if any.
    pub async fn role_of(&self, guild_id: u64, member_id: u64) -> Result<Option<u64>, ServiceError> {
        Ok(self
            .db
            .colour_roles
            .get(guild_id as i64, member_id as i64)
            .await?
            .map(|id| id as u64))
    }

    pub async fn assign(&self, guild_id: u64, member_id: u64, role_id: u64) -> Result<(), ServiceError> {
        self.db
            .colour_roles
            .set(&ColourRoleModel {
                guild_id: guild_id as i64,
                member_id: member_id as i64,
                role_id: role_id as i64,
            })
            .await?;
        Ok(())
    }

    /// Returns `false` if the member had no assignment.
    pub async fn remove(&self, guild_id: u64, member_id: u64) -> Result<bool, ServiceError> {
        Ok(self
            .db
            .colour_roles
            .delete(guild_id as i64, member_id as i64)
            .await?)
    }

    /// `(member_id, role_id)` of every assignment in a guild.
    pub async fn list(&self, guild_id: u64) -> Result<Vec<(u64, u64)>, ServiceError> {
        Ok(self
            .db
            .colour_roles
            .select_all(guild_id as i64)
            .await?
            .into_iter()
            .map(|row| (row.member_id as u64, row.role_id as u64))
            .collect())
    }
}
