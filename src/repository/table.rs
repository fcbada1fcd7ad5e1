//! Database table operations and implementations.

use chrono::DateTime;
use chrono::Utc;
use diesel::dsl::count_star;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::upsert::excluded;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl;
use diesel_async::pooled_connection::deadpool::Object;
use diesel_async::pooled_connection::deadpool::Pool;

use crate::model::BotLogModel;
use crate::model::ColourRoleModel;
use crate::model::CommandLogModel;
use crate::model::DiscordMessageModel;
use crate::model::FeedEntryModel;
use crate::model::FeedSettingsChange;
use crate::model::FeedSettingsModel;
use crate::model::GuildConfigModel;
use crate::model::MemberActivityModel;
use crate::model::MemberMessageCount;
use crate::model::MessageStatsOpt;
use crate::model::OsuMemberModel;
use crate::model::PrefixModel;
use crate::model::SeriesChange;
use crate::model::SeriesModel;
use crate::repository::error::DatabaseError;
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

pub type DbPool = Pool<AsyncPgConnection>;

/// Base table struct providing database pool access.
#[derive(Clone)]
pub struct BaseTable {
    pub pool: DbPool,
}

impl BaseTable {
    /// Creates a new base table with the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Checks a connection out of the pool.
    pub async fn conn(&self) -> Result<Object<AsyncPgConnection>, DatabaseError> {
        self.pool.get().await.map_err(|e| DatabaseError::PoolError {
            message: e.to_string(),
        })
    }
}

/// Base trait for table operations.
#[async_trait::async_trait]
pub trait TableBase {
    /// Deletes all rows from the table.
    async fn delete_all(&self) -> Result<(), DatabaseError>;
}

macro_rules! impl_table {
    ($struct_name:ident, $table:path) => {
        #[derive(Clone)]
        pub struct $struct_name {
            base: BaseTable,
        }

        impl $struct_name {
            pub fn new(pool: DbPool) -> Self {
                Self {
                    base: BaseTable::new(pool),
                }
            }
        }

        #[async_trait::async_trait]
        impl TableBase for $struct_name {
            async fn delete_all(&self) -> Result<(), DatabaseError> {
                let mut conn = self.base.conn().await?;
                diesel::delete($table).execute(&mut conn).await?;
                Ok(())
            }
        }
    };
}

// ============================================================================
// FeedDataTable
// ============================================================================

/// Storage of already-seen feed entries.
#[async_trait::async_trait]
pub trait FeedStore: Send + Sync {
    /// Whether an entry with this id has been stored.
    async fn exists(&self, item_id: &str) -> Result<bool, DatabaseError>;
    /// Stores an entry. Returns `false` if it was already there.
    async fn insert(&self, entry: &FeedEntryModel) -> Result<bool, DatabaseError>;
    /// Most recent entry, optionally only those whose title contains `filter`.
    async fn latest(&self, filter: Option<String>) -> Result<Option<FeedEntryModel>, DatabaseError>;
    /// The `count` most recent entries, newest first.
    async fn recent(&self, count: i64) -> Result<Vec<FeedEntryModel>, DatabaseError>;
}

impl_table!(FeedDataTable, feed_data::table);

#[async_trait::async_trait]
impl FeedStore for FeedDataTable {
    async fn exists(&self, item_id: &str) -> Result<bool, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(
            diesel::select(exists(feed_data::table.filter(feed_data::item_id.eq(item_id))))
                .get_result(&mut conn)
                .await?,
        )
    }

    async fn insert(&self, entry: &FeedEntryModel) -> Result<bool, DatabaseError> {
        let mut conn = self.base.conn().await?;
        let inserted = diesel::insert_into(feed_data::table)
            .values(entry)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;
        Ok(inserted == 1)
    }

    async fn latest(&self, filter: Option<String>) -> Result<Option<FeedEntryModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        let mut query = feed_data::table
            .select(FeedEntryModel::as_select())
            .order(feed_data::updated.desc())
            .into_boxed();
        if let Some(filter) = filter {
            query = query.filter(feed_data::title.ilike(format!("%{filter}%")));
        }
        Ok(query.first(&mut conn).await.optional()?)
    }

    async fn recent(&self, count: i64) -> Result<Vec<FeedEntryModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(feed_data::table
            .select(FeedEntryModel::as_select())
            .order(feed_data::updated.desc())
            .limit(count)
            .load(&mut conn)
            .await?)
    }
}

// ============================================================================
// FeedSettingsTable
// ============================================================================

impl_table!(FeedSettingsTable, feed_settings::table);

impl FeedSettingsTable {
    pub async fn select(&self, guild_id: i64) -> Result<Option<FeedSettingsModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(feed_settings::table
            .find(guild_id)
            .select(FeedSettingsModel::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    /// Every enabled guild that has a webhook registered.
    pub async fn select_enabled_webhooks(&self) -> Result<Vec<FeedSettingsModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(feed_settings::table
            .filter(feed_settings::enabled.eq(true))
            .filter(feed_settings::webhook_url.is_not_null())
            .select(FeedSettingsModel::as_select())
            .load(&mut conn)
            .await?)
    }

    /// Creates the guild row with defaults if missing, then applies `change`.
    pub async fn upsert_change(
        &self,
        guild_id: i64,
        change: &FeedSettingsChange,
    ) -> Result<FeedSettingsModel, DatabaseError> {
        let mut conn = self.base.conn().await?;
        diesel::insert_into(feed_settings::table)
            .values(FeedSettingsModel::with_defaults(guild_id))
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;

        if !change.is_empty() {
            diesel::update(feed_settings::table.find(guild_id))
                .set(change)
                .execute(&mut conn)
                .await?;
        }

        Ok(feed_settings::table
            .find(guild_id)
            .select(FeedSettingsModel::as_select())
            .first(&mut conn)
            .await?)
    }
}

// ============================================================================
// SeriesTable
// ============================================================================

impl_table!(SeriesTable, series::table);

impl SeriesTable {
    pub async fn select_all(&self) -> Result<Vec<SeriesModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(series::table
            .select(SeriesModel::as_select())
            .order(series::title.asc())
            .load(&mut conn)
            .await?)
    }

    pub async fn select(&self, shortname: &str) -> Result<Option<SeriesModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(series::table
            .find(shortname)
            .select(SeriesModel::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    pub async fn select_by_title(&self, title: &str) -> Result<Option<SeriesModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(series::table
            .filter(series::title.eq(title))
            .select(SeriesModel::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    pub async fn insert(&self, model: &SeriesModel) -> Result<(), DatabaseError> {
        let mut conn = self.base.conn().await?;
        diesel::insert_into(series::table)
            .values(model)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Applies `change` to the series with this shortname. Returns the number of updated rows.
    pub async fn update(&self, shortname: &str, change: &SeriesChange) -> Result<usize, DatabaseError> {
        if change.is_empty() {
            return Ok(0);
        }
        let mut conn = self.base.conn().await?;
        Ok(diesel::update(series::table.find(shortname))
            .set(change)
            .execute(&mut conn)
            .await?)
    }

    /// Applies `change` to the series with this title. Returns the number of updated rows.
    pub async fn update_by_title(&self, title: &str, change: &SeriesChange) -> Result<usize, DatabaseError> {
        if change.is_empty() {
            return Ok(0);
        }
        let mut conn = self.base.conn().await?;
        Ok(diesel::update(series::table.filter(series::title.eq(title)))
            .set(change)
            .execute(&mut conn)
            .await?)
    }

    pub async fn delete(&self, shortname: &str) -> Result<bool, DatabaseError> {
        let mut conn = self.base.conn().await?;
        let deleted = diesel::delete(series::table.find(shortname))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    pub async fn titles(&self) -> Result<Vec<String>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(series::table
            .select(series::title)
            .order(series::title.asc())
            .load(&mut conn)
            .await?)
    }

    /// `(shortname, title)` of every series.
    pub async fn shortnames(&self) -> Result<Vec<(String, String)>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(series::table
            .select((series::shortname, series::title))
            .load(&mut conn)
            .await?)
    }

    /// Series that have at least one genre containing `genre`, case-insensitively.
    pub async fn search_genre(&self, genre: &str) -> Result<Vec<SeriesModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(diesel::sql_query(
            r#"
            SELECT * FROM series
            WHERE EXISTS (
                SELECT 1 FROM unnest(genres) AS g WHERE g ILIKE $1
            )
            ORDER BY title
            "#,
        )
        .bind::<Text, _>(format!("%{genre}%"))
        .load::<SeriesModel>(&mut conn)
        .await?)
    }
}

// ============================================================================
// GuildConfigTable
// ============================================================================

impl_table!(GuildConfigTable, guild_config::table);

impl GuildConfigTable {
    pub async fn get(&self, guild_id: i64, name: &str) -> Result<Option<String>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(guild_config::table
            .find((guild_id, name))
            .select(guild_config::config_value)
            .first(&mut conn)
            .await
            .optional()?)
    }

    pub async fn select_all(&self, guild_id: i64) -> Result<Vec<GuildConfigModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(guild_config::table
            .filter(guild_config::guild_id.eq(guild_id))
            .select(GuildConfigModel::as_select())
            .order(guild_config::config_name.asc())
            .load(&mut conn)
            .await?)
    }

    pub async fn set(&self, model: &GuildConfigModel) -> Result<(), DatabaseError> {
        let mut conn = self.base.conn().await?;
        diesel::insert_into(guild_config::table)
            .values(model)
            .on_conflict((guild_config::guild_id, guild_config::config_name))
            .do_update()
            .set(guild_config::config_value.eq(excluded(guild_config::config_value)))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, guild_id: i64, name: &str) -> Result<bool, DatabaseError> {
        let mut conn = self.base.conn().await?;
        let deleted = diesel::delete(guild_config::table.find((guild_id, name)))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }
}

// ============================================================================
// PrefixTable
// ============================================================================

impl_table!(PrefixTable, prefix::table);

impl PrefixTable {
    pub async fn select_all(&self) -> Result<Vec<PrefixModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(prefix::table
            .select(PrefixModel::as_select())
            .load(&mut conn)
            .await?)
    }

    pub async fn get(&self, guild_id: i64) -> Result<Option<String>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(prefix::table
            .find(guild_id)
            .select(prefix::prefix_)
            .first(&mut conn)
            .await
            .optional()?)
    }

    pub async fn set(&self, model: &PrefixModel) -> Result<(), DatabaseError> {
        let mut conn = self.base.conn().await?;
        diesel::insert_into(prefix::table)
            .values(model)
            .on_conflict(prefix::guild_id)
            .do_update()
            .set(prefix::prefix_.eq(excluded(prefix::prefix_)))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, guild_id: i64) -> Result<bool, DatabaseError> {
        let mut conn = self.base.conn().await?;
        let deleted = diesel::delete(prefix::table.find(guild_id))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }
}

// ============================================================================
// BotLogsTable
// ============================================================================

impl_table!(BotLogsTable, bot_logs::table);

impl BotLogsTable {
    pub async fn insert(&self, model: &BotLogModel) -> Result<(), DatabaseError> {
        let mut conn = self.base.conn().await?;
        diesel::insert_into(bot_logs::table)
            .values(model)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// The `count` newest rows with the given level, newest first.
    pub async fn recent_by_level(
        &self,
        level: &str,
        count: i64,
    ) -> Result<Vec<BotLogModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(bot_logs::table
            .filter(bot_logs::level_name.eq(level))
            .order(bot_logs::created.desc())
            .limit(count)
            .select(BotLogModel::as_select())
            .load(&mut conn)
            .await?)
    }
}

// ============================================================================
// DiscordMessagesTable
// ============================================================================

impl_table!(DiscordMessagesTable, discord_messages::table);

impl DiscordMessagesTable {
    pub async fn insert(&self, model: &DiscordMessageModel) -> Result<(), DatabaseError> {
        let mut conn = self.base.conn().await?;
        diesel::insert_into(discord_messages::table)
            .values(model)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Flags every stored version of a message as deleted.
    pub async fn mark_deleted(&self, message_id: i64) -> Result<usize, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(
            diesel::update(discord_messages::table.filter(discord_messages::message_id.eq(message_id)))
                .set(discord_messages::deleted.eq(true))
                .execute(&mut conn)
                .await?,
        )
    }

    /// Send times of original (non-edit) messages matching `opt`.
    pub async fn sent_times(&self, opt: &MessageStatsOpt) -> Result<Vec<DateTime<Utc>>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        let mut query = discord_messages::table
            .filter(discord_messages::guild_id.eq(opt.guild_id))
            .filter(discord_messages::is_edit.eq(false))
            .select(discord_messages::sent)
            .order(discord_messages::sent.asc())
            .into_boxed();
        if let Some(author_id) = opt.author_id {
            query = query.filter(discord_messages::author_id.eq(author_id));
        }
        if let Some(since) = opt.since {
            query = query.filter(discord_messages::sent.ge(since));
        }
        if let Some(until) = opt.until {
            query = query.filter(discord_messages::sent.lt(until));
        }
        Ok(query.load(&mut conn).await?)
    }

    /// Per-author message counts in a guild, highest first.
    pub async fn message_counts(&self, guild_id: i64) -> Result<Vec<MemberMessageCount>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        let rows: Vec<(i64, i64)> = discord_messages::table
            .filter(discord_messages::guild_id.eq(guild_id))
            .filter(discord_messages::is_edit.eq(false))
            .group_by(discord_messages::author_id)
            .select((discord_messages::author_id, count_star()))
            .load(&mut conn)
            .await?;

        let mut counts: Vec<MemberMessageCount> = rows
            .into_iter()
            .map(|(author_id, count)| MemberMessageCount { author_id, count })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.author_id.cmp(&b.author_id)));
        Ok(counts)
    }
}

// ============================================================================
// CommandLogTable
// ============================================================================

impl_table!(CommandLogTable, command_log::table);

impl CommandLogTable {
    pub async fn insert(&self, model: &CommandLogModel) -> Result<(), DatabaseError> {
        let mut conn = self.base.conn().await?;
        diesel::insert_into(command_log::table)
            .values(model)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}

// ============================================================================
// MemberActivityTable
// ============================================================================

impl_table!(MemberActivityTable, member_activity::table);

impl MemberActivityTable {
    pub async fn insert(&self, model: &MemberActivityModel) -> Result<(), DatabaseError> {
        let mut conn = self.base.conn().await?;
        diesel::insert_into(member_activity::table)
            .values(model)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}

// ============================================================================
// OsuMembersTable
// ============================================================================

impl_table!(OsuMembersTable, osu_members::table);

impl OsuMembersTable {
    pub async fn get(&self, member_id: i64) -> Result<Option<String>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(osu_members::table
            .find(member_id)
            .select(osu_members::osu_username)
            .first(&mut conn)
            .await
            .optional()?)
    }

    pub async fn set(&self, model: &OsuMemberModel) -> Result<(), DatabaseError> {
        let mut conn = self.base.conn().await?;
        diesel::insert_into(osu_members::table)
            .values(model)
            .on_conflict(osu_members::member_id)
            .do_update()
            .set(osu_members::osu_username.eq(excluded(osu_members::osu_username)))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, member_id: i64) -> Result<bool, DatabaseError> {
        let mut conn = self.base.conn().await?;
        let deleted = diesel::delete(osu_members::table.find(member_id))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }
}

// ============================================================================
// ColourRolesTable
// ============================================================================

impl_table!(ColourRolesTable, colour_roles::table);

impl ColourRolesTable {
    pub async fn get(&self, guild_id: i64, member_id: i64) -> Result<Option<i64>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(colour_roles::table
            .find((guild_id, member_id))
            .select(colour_roles::role_id)
            .first(&mut conn)
            .await
            .optional()?)
    }

    pub async fn select_all(&self, guild_id: i64) -> Result<Vec<ColourRoleModel>, DatabaseError> {
        let mut conn = self.base.conn().await?;
        Ok(colour_roles::table
            .filter(colour_roles::guild_id.eq(guild_id))
            .select(ColourRoleModel::as_select())
            .load(&mut conn)
            .await?)
    }

    pub async fn set(&self, model: &ColourRoleModel) -> Result<(), DatabaseError> {
        let mut conn = self.base.conn().await?;
        diesel::insert_into(colour_roles::table)
            .values(model)
            .on_conflict((colour_roles::guild_id, colour_roles::member_id))
            .do_update()
            .set(colour_roles::role_id.eq(excluded(colour_roles::role_id)))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, guild_id: i64, member_id: i64) -> Result<bool, DatabaseError> {
        let mut conn = self.base.conn().await?;
        let deleted = diesel::delete(colour_roles::table.find((guild_id, member_id)))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }
}
