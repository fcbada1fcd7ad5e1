pub mod checks;
pub mod commands;
pub mod error;
pub mod error_handler;
pub mod event_handler;
pub mod prompt;
pub mod reply;
pub mod whip;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use chrono::DateTime;
use chrono::Utc;
use log::debug;
use log::error;
use log::info;
use log::warn;
use poise::Framework;
use poise::FrameworkOptions;
use poise::serenity_prelude::Client;
use poise::serenity_prelude::ClientBuilder;
use poise::serenity_prelude::GatewayIntents;
use poise::serenity_prelude::Http;
use poise::serenity_prelude::Timestamp;
use poise::serenity_prelude::UserId;

pub use crate::bot::commands::Context;
pub use crate::bot::commands::Error;
use crate::bot::commands::Cog;
use crate::bot::commands::Cogs;
use crate::bot::commands::dev::console::EvalConsole;
use crate::bot::error_handler::ErrorHandler;
use crate::config::Config;
use crate::model::CommandLogModel;
use crate::repository::Repository;
use crate::service::Services;
use crate::subscriber::discord_gateway::SerenityGateway;
use crate::subscriber::webhook_subscriber::DispatchOptions;
use crate::subscriber::webhook_subscriber::NotificationDispatcher;
use crate::task::feed_monitor::FeedMonitor;

pub struct Data {
    pub config: Arc<Config>,
    pub db: Arc<Repository>,
    pub services: Arc<Services>,
    pub gateway: Arc<SerenityGateway>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub monitor: Arc<FeedMonitor>,
    pub console: EvalConsole,
    pub start_time: Instant,
}

pub struct Bot {
    pub http: Arc<Http>,
    pub gateway: Arc<SerenityGateway>,
    pub dispatcher: Arc<NotificationDispatcher>,
    client: Option<Client>,
}

impl Bot {
    pub async fn new(
        config: Arc<Config>,
        db: Arc<Repository>,
        services: Arc<Services>,
        monitor: Arc<FeedMonitor>,
    ) -> Result<Self> {
        info!("Initializing bot...");

        let http = Arc::new(Http::new(&config.discord_token));
        let gateway = Arc::new(SerenityGateway::new(http.clone(), services.series.clone()));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            services.feed_source.clone(),
            gateway.clone(),
            DispatchOptions::from(&config.feed),
        ));

        let data = Data {
            config: config.clone(),
            db,
            services,
            gateway: gateway.clone(),
            dispatcher: dispatcher.clone(),
            monitor,
            console: EvalConsole::new(),
            start_time: Instant::now(),
        };

        let framework = Self::create_framework(&config, data);
        let client = ClientBuilder::new(&config.discord_token, Self::intents())
            .framework(framework)
            .await?;

        Ok(Self {
            http,
            gateway,
            dispatcher,
            client: Some(client),
        })
    }

    /// Connects to Discord in the background. Returns `false` if already started.
    pub fn start(&mut self) -> bool {
        let Some(mut client) = self.client.take() else {
            warn!("Bot client already started");
            return false;
        };

        info!("Starting bot client...");
        tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!("Bot client stopped: {e}");
            }
        });
        true
    }

    fn intents() -> GatewayIntents {
        GatewayIntents::non_privileged()
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_PRESENCES
    }

    fn create_framework(config: &Config, data: Data) -> Framework<Data, Error> {
        let mut owners = HashSet::from([UserId::new(config.owner_id)]);
        owners.extend(config.co_owner_ids.iter().map(|id| UserId::new(*id)));

        let options = FrameworkOptions::<Data, Error> {
            commands: Cogs.commands(),
            on_error: |error| Box::pin(ErrorHandler::handle(error)),
            post_command: |ctx| Box::pin(log_command(ctx, false)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler::handle(ctx, event, framework, data))
            },
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.default_prefix.clone()),
                dynamic_prefix: Some(|ctx| {
                    Box::pin(async move {
                        let guild_id = ctx.guild_id.map(|id| id.get());
                        Ok(Some(ctx.data.services.settings.prefix_for(guild_id)))
                    })
                }),
                mention_as_prefix: true,
                edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                    Duration::from_secs(3600),
                ))),
                ..Default::default()
            },
            owners,
            initialize_owners: false,
            ..Default::default()
        };

        poise::Framework::builder()
            .options(options)
            .setup(move |_ctx, ready, _framework| {
                Box::pin(async move {
                    info!("Bot connected to Discord as {}.", ready.user.name);
                    Ok(data)
                })
            })
            .build()
    }
}

/// Writes an invocation to `command_log`. Failures are only logged.
pub async fn log_command(ctx: Context<'_>, failed: bool) {
    let poise::Context::Prefix(prefix_ctx) = ctx else {
        return;
    };

    let command = ctx.command();
    let invoked_subcommand = command
        .qualified_name
        .contains(' ')
        .then(|| command.name.clone());
    let subcommand_passed = Some(prefix_ctx.args.trim())
        .filter(|args| !args.is_empty())
        .map(str::to_string);

    let record = CommandLogModel {
        message_id: prefix_ctx.msg.id.get() as i64,
        sent: to_utc(prefix_ctx.msg.timestamp),
        author_id: ctx.author().id.get() as i64,
        channel_id: ctx.channel_id().get() as i64,
        guild_id: ctx.guild_id().map(|id| id.get() as i64),
        prefix: prefix_ctx.prefix.to_string(),
        command: command.qualified_name.clone(),
        invoked_with: prefix_ctx.invoked_command_name.to_string(),
        invoked_subcommand,
        subcommand_passed,
        command_failed: failed,
        cog: command.category.as_deref().map(str::to_string),
    };

    debug!("Command `{}` by {} finished", record.command, record.author_id);
    if let Err(e) = ctx.data().services.activity.record_command(&record).await {
        warn!("Failed to log command `{}`: {e}", record.command);
    }
}

pub fn to_utc(timestamp: Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.unix_timestamp(), 0).unwrap_or_else(Utc::now)
}
