//! Database row models.

use chrono::DateTime;
use chrono::Utc;
use derive_builder::Builder;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::repository::schema::bot_logs;
use crate::repository::schema::colour_roles;
use crate::repository::schema::command_log;
use crate::repository::schema::discord_messages;
use crate::repository::schema::feed_data;
use crate::repository::schema::feed_settings;
use crate::repository::schema::guild_config;
use crate::repository::schema::member_activity;
use crate::repository::schema::osu_members;
use crate::repository::schema::prefix;
use crate::repository::schema::series;

/// A feed entry that has already been seen and announced.
#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug, PartialEq)]
#[diesel(table_name = feed_data)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FeedEntryModel {
    pub item_id: String,
    pub title: String,
    pub link: String,
    pub updated: DateTime<Utc>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
}

/// Per-guild notification settings for the release feed.
#[derive(Queryable, Selectable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = feed_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FeedSettingsModel {
    pub guild_id: i64,
    pub webhook_url: Option<String>,
    pub sub_role_id: Option<i64>,
    pub avatar: Option<String>,
    /// Seconds to wait before the guild's webhook starts sending.
    pub delay: i32,
    pub ping: bool,
    pub enabled: bool,
}

impl FeedSettingsModel {
    /// Settings of a guild that has never configured anything.
    pub fn with_defaults(guild_id: i64) -> Self {
        Self {
            guild_id,
            webhook_url: None,
            sub_role_id: None,
            avatar: None,
            delay: 60,
            ping: true,
            enabled: false,
        }
    }
}

/// Partial update of [`FeedSettingsModel`]. `Some(None)` clears a column.
#[derive(AsChangeset, Default, Clone, Debug)]
#[diesel(table_name = feed_settings)]
pub struct FeedSettingsChange {
    pub webhook_url: Option<Option<String>>,
    pub sub_role_id: Option<Option<i64>>,
    pub avatar: Option<Option<String>>,
    pub delay: Option<i32>,
    pub ping: Option<bool>,
    pub enabled: Option<bool>,
}

impl FeedSettingsChange {
    pub fn is_empty(&self) -> bool {
        self.webhook_url.is_none()
            && self.sub_role_id.is_none()
            && self.avatar.is_none()
            && self.delay.is_none()
            && self.ping.is_none()
            && self.enabled.is_none()
    }
}

#[derive(
    Queryable, QueryableByName, Selectable, Insertable, Serialize, Clone, Debug, PartialEq,
)]
#[diesel(table_name = series)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SeriesModel {
    pub shortname: String,
    pub title: String,
    pub link: Option<String>,
    pub series_type: Option<String>,
    pub latest_chapter: Option<String>,
    pub updated: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub priority: Option<i32>,
    pub genres: Vec<String>,
}

impl SeriesModel {
    pub fn new(shortname: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            shortname: shortname.into(),
            title: title.into(),
            link: None,
            series_type: None,
            latest_chapter: None,
            updated: None,
            status: None,
            priority: None,
            genres: Vec::new(),
        }
    }
}

/// Partial update of [`SeriesModel`]. `Some(None)` clears a column.
#[derive(AsChangeset, Default, Clone, Debug)]
#[diesel(table_name = series)]
pub struct SeriesChange {
    pub shortname: Option<String>,
    pub title: Option<String>,
    pub link: Option<Option<String>>,
    pub series_type: Option<Option<String>>,
    pub latest_chapter: Option<Option<String>>,
    pub updated: Option<Option<DateTime<Utc>>>,
    pub status: Option<Option<String>>,
    pub priority: Option<Option<i32>>,
    pub genres: Option<Vec<String>>,
}

impl SeriesChange {
    pub fn is_empty(&self) -> bool {
        self.shortname.is_none()
            && self.title.is_none()
            && self.link.is_none()
            && self.series_type.is_none()
            && self.latest_chapter.is_none()
            && self.updated.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.genres.is_none()
    }
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = guild_config)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GuildConfigModel {
    pub guild_id: i64,
    pub config_name: String,
    pub config_value: String,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = prefix)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PrefixModel {
    pub guild_id: i64,
    #[diesel(column_name = prefix_)]
    pub prefix: String,
}

/// A WARN or ERROR log line persisted for later inspection.
#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = bot_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BotLogModel {
    pub log_id: Uuid,
    pub created: DateTime<Utc>,
    pub logger_name: String,
    pub level_name: String,
    pub file_path: Option<String>,
    pub module: Option<String>,
    pub func_name: Option<String>,
    pub line_no: Option<i32>,
    pub message: String,
    pub traceback: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = discord_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DiscordMessageModel {
    pub message_id: i64,
    pub sent: DateTime<Utc>,
    pub is_edit: bool,
    pub deleted: bool,
    pub author_id: i64,
    pub channel_id: i64,
    pub guild_id: Option<i64>,
    pub content: String,
    pub clean_content: String,
    pub embeds: Option<serde_json::Value>,
    pub webhook_id: Option<i64>,
    pub attachments: Vec<String>,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = command_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CommandLogModel {
    pub message_id: i64,
    pub sent: DateTime<Utc>,
    pub author_id: i64,
    pub channel_id: i64,
    pub guild_id: Option<i64>,
    pub prefix: String,
    pub command: String,
    pub invoked_with: String,
    pub invoked_subcommand: Option<String>,
    pub subcommand_passed: Option<String>,
    pub command_failed: bool,
    pub cog: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = member_activity)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MemberActivityModel {
    pub member_id: i64,
    pub time: DateTime<Utc>,
    pub status: Option<String>,
    pub from_status: Option<String>,
    pub guild_id: i64,
    pub display_name: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = osu_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OsuMemberModel {
    pub member_id: i64,
    pub osu_username: String,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = colour_roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ColourRoleModel {
    pub guild_id: i64,
    pub member_id: i64,
    pub role_id: i64,
}

/// Filter for message statistics queries.
#[derive(Builder, Clone, Debug)]
#[builder(pattern = "immutable")]
pub struct MessageStatsOpt {
    pub guild_id: i64,
    #[builder(default)]
    pub author_id: Option<i64>,
    #[builder(default)]
    pub since: Option<DateTime<Utc>>,
    #[builder(default)]
    pub until: Option<DateTime<Utc>>,
}

/// Number of messages a member sent in a guild.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MemberMessageCount {
    pub author_id: i64,
    pub count: i64,
}
