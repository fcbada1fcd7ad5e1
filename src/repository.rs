//! Database module with PostgreSQL storage via diesel-async.

use std::sync::Arc;

use diesel::Connection;
use diesel::PgConnection;
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_migrations::EmbeddedMigrations;
use diesel_migrations::MigrationHarness;
use diesel_migrations::embed_migrations;
use log::debug;
use log::info;

use crate::repository::table::BotLogsTable;
use crate::repository::table::ColourRolesTable;
use crate::repository::table::CommandLogTable;
use crate::repository::table::DiscordMessagesTable;
use crate::repository::table::FeedDataTable;
use crate::repository::table::FeedSettingsTable;
use crate::repository::table::GuildConfigTable;
use crate::repository::table::MemberActivityTable;
use crate::repository::table::OsuMembersTable;
use crate::repository::table::PrefixTable;
use crate::repository::table::SeriesTable;
use crate::repository::table::TableBase;

pub mod error;
pub mod schema;
pub mod table;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Main database struct containing all table handlers.
pub struct Repository {
    db_url: String,
    pub feed_data: Arc<FeedDataTable>,
    pub feed_settings: FeedSettingsTable,
    pub series: SeriesTable,
    pub guild_config: GuildConfigTable,
    pub prefix: PrefixTable,
    pub bot_logs: BotLogsTable,
    pub discord_messages: DiscordMessagesTable,
    pub command_log: CommandLogTable,
    pub member_activity: MemberActivityTable,
    pub osu_members: OsuMembersTable,
    pub colour_roles: ColourRolesTable,
}

impl Repository {
    /// Creates a connection pool and initializes table handlers.
    ///
    /// No connection is opened until the first query.
    pub fn new(db_url: &str, pool_size: usize) -> anyhow::Result<Self> {
        debug!("Creating database pool (max {pool_size} connections)...");
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(db_url);
        let pool = Pool::builder(manager).max_size(pool_size).build()?;

        Ok(Self {
            db_url: db_url.to_string(),
            feed_data: Arc::new(FeedDataTable::new(pool.clone())),
            feed_settings: FeedSettingsTable::new(pool.clone()),
            series: SeriesTable::new(pool.clone()),
            guild_config: GuildConfigTable::new(pool.clone()),
            prefix: PrefixTable::new(pool.clone()),
            bot_logs: BotLogsTable::new(pool.clone()),
            discord_messages: DiscordMessagesTable::new(pool.clone()),
            command_log: CommandLogTable::new(pool.clone()),
            member_activity: MemberActivityTable::new(pool.clone()),
            osu_members: OsuMembersTable::new(pool.clone()),
            colour_roles: ColourRolesTable::new(pool),
        })
    }

    /// Runs the embedded migrations on a dedicated blocking connection.
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        let db_url = self.db_url.clone();
        let applied = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let mut conn = PgConnection::establish(&db_url)?;
            let versions = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
            Ok(versions.len())
        })
        .await??;

        if applied > 0 {
            info!("Applied {applied} database migration(s).");
        }
        Ok(())
    }

    /// Deletes all data from all tables. Use with caution!
    pub async fn delete_all_tables(&self) -> anyhow::Result<()> {
        self.feed_data.delete_all().await?;
        self.feed_settings.delete_all().await?;
        self.series.delete_all().await?;
        self.guild_config.delete_all().await?;
        self.prefix.delete_all().await?;
        self.bot_logs.delete_all().await?;
        self.discord_messages.delete_all().await?;
        self.command_log.delete_all().await?;
        self.member_activity.delete_all().await?;
        self.osu_members.delete_all().await?;
        self.colour_roles.delete_all().await?;
        Ok(())
    }
}
