//! Replies to "whip" in configured guilds with a random picture.

use std::path::Path;
use std::path::PathBuf;

use log::debug;
use log::warn;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::CreateAttachment;
use poise::serenity_prelude::CreateMessage;
use poise::serenity_prelude::Message;
use rand::seq::SliceRandom;

use crate::bot::Data;
use crate::bot::Error;
use crate::config::WhipConfig;

const TRIGGER: &str = "whip";

/// Which picture folder a message author draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WhipFolder {
    Master,
    Staff,
}

impl WhipFolder {
    fn dir_name(self) -> &'static str {
        match self {
            WhipFolder::Master => "master",
            WhipFolder::Staff => "staff",
        }
    }
}

/// `None` when the message should be ignored.
pub fn classify(
    config: &WhipConfig,
    guild_id: Option<u64>,
    author_id: u64,
    author_roles: &[u64],
    content: &str,
) -> Option<WhipFolder> {
    let guild_id = guild_id?;
    if !config.guild_ids.contains(&guild_id) || !content.to_lowercase().contains(TRIGGER) {
        return None;
    }
    if config.master_ids.contains(&author_id) {
        return Some(WhipFolder::Master);
    }
    config
        .staff_role_id
        .filter(|role| author_roles.contains(role))
        .map(|_| WhipFolder::Staff)
}

pub async fn on_message(
    ctx: &serenity::Context,
    message: &Message,
    data: &Data,
) -> Result<(), Error> {
    if message.author.bot {
        return Ok(());
    }

    let roles: Vec<u64> = message
        .member
        .as_ref()
        .map(|m| m.roles.iter().map(|r| r.get()).collect())
        .unwrap_or_default();
    let Some(folder) = classify(
        &data.config.whip,
        message.guild_id.map(|id| id.get()),
        message.author.id.get(),
        &roles,
        &message.content,
    ) else {
        return Ok(());
    };

    let dir = data.config.data_path.join("whip").join(folder.dir_name());
    let Some(path) = pick_file(&dir) else {
        warn!("No whip pictures found in {}", dir.display());
        return Ok(());
    };

    debug!("Whipping {} with {}", message.author.id, path.display());
    let attachment = CreateAttachment::path(&path).await?;
    message
        .channel_id
        .send_message(ctx, CreateMessage::new().add_file(attachment))
        .await?;
    Ok(())
}

fn pick_file(dir: &Path) -> Option<PathBuf> {
    let files: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.choose(&mut rand::thread_rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WhipConfig {
        WhipConfig {
            guild_ids: vec![10],
            master_ids: vec![1],
            staff_role_id: Some(500),
        }
    }

    #[test]
    fn test_classify_master_and_staff() {
        let config = config();
        assert_eq!(
            classify(&config, Some(10), 1, &[], "WHIP them"),
            Some(WhipFolder::Master)
        );
        assert_eq!(
            classify(&config, Some(10), 2, &[400, 500], "whipping time"),
            Some(WhipFolder::Staff)
        );
    }

    #[test]
    fn test_classify_ignored() {
        let config = config();
        assert_eq!(classify(&config, Some(10), 2, &[400], "whip"), None);
        assert_eq!(classify(&config, Some(11), 1, &[], "whip"), None);
        assert_eq!(classify(&config, None, 1, &[], "whip"), None);
        assert_eq!(classify(&config, Some(10), 1, &[], "hello"), None);
    }

    #[test]
    fn test_pick_file_missing_dir() {
        assert_eq!(pick_file(Path::new("/nonexistent/whip/dir")), None);
    }
}
