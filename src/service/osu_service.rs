//! Links between Discord members and osu! accounts.

use std::sync::Arc;

use crate::model::OsuMemberModel;
use crate::repository::Repository;
use crate::service::error::ServiceError;

pub const OSU_ICON: &str = "https://s.ppy.sh/apple-touch-icon.png";
const OSU_SIGNATURE: &str = "https://lemmmy.pw/osusig/sig.php";

pub struct OsuService {
    db: Arc<Repository>,
}

impl OsuService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    pub async fn username(&self, member_id: u64) -> Result<Option<String>, ServiceError> {
        Ok(self.db.osu_members.get(member_id as i64).await?)
    }

    pub async fn link(&self, member_id: u64, username: &str) -> Result<(), ServiceError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ServiceError::InvalidInput {
                message: "Username cannot be empty.".to_string(),
            });
        }
        self.db
            .osu_members
            .set(&OsuMemberModel {
                member_id: member_id as i64,
                osu_username: username.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Returns `false` if the member had no linked account.
    pub async fn unlink(&self, member_id: u64) -> Result<bool, ServiceError> {
        Ok(self.db.osu_members.delete(member_id as i64).await?)
    }
}

/// Profile signature image of an osu! user.
///
/// `nocache` keeps Discord from serving a stale copy of the image.
pub fn signature_url(username: &str, nocache: u64) -> String {
    format!(
        "{OSU_SIGNATURE}?colour=hex214ed8&uname={}&pp=1&xpbar&nocache={nocache}",
        encode_component(username)
    )
}

fn encode_component(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_url() {
        assert_eq!(
            signature_url("Cookiezi", 7),
            "https://lemmmy.pw/osusig/sig.php?colour=hex214ed8&uname=Cookiezi&pp=1&xpbar&nocache=7"
        );
    }

    #[test]
    fn test_signature_url_escapes_name() {
        assert!(signature_url("[Toy] x", 1).contains("uname=%5BToy%5D%20x&"));
    }
}
