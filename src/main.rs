//! Application entry point for manibot.
//!
//! Initializes all components and starts the Discord bot.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use dotenv::dotenv;
use log::debug;
use log::info;

use manibot::bot::Bot;
use manibot::config::Config;
use manibot::event::FeedUpdateEvent;
use manibot::event::event_bus::EventBus;
use manibot::feed::FeedSource;
use manibot::feed::SiteInfo;
use manibot::feed::rss_source::RssSource;
use manibot::logging::LogReceiver;
use manibot::logging::setup_logging;
use manibot::logging::spawn_db_log_drain;
use manibot::repository::Repository;
use manibot::service::Services;
use manibot::subscriber::series_update_subscriber::SeriesUpdateSubscriber;
use manibot::subscriber::webhook_subscriber::WebhookSubscriber;
use manibot::task::feed_monitor::FeedMonitor;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let (config, log_receiver) = load_config()?;

    let db = setup_database(&config, log_receiver, init_start).await?;
    let source = setup_feed_source(&config)?;
    let services = setup_services(&config, db.clone(), source.clone()).await?;

    let event_bus = Arc::new(EventBus::new());
    let monitor = FeedMonitor::new(
        source,
        services.feed.clone(),
        event_bus.clone(),
        config.feed.poll_interval,
    );

    let bot = setup_bot(&config, db, services.clone(), monitor.clone(), init_start).await?;
    setup_subscribers(&event_bus, &services, &bot);
    setup_monitor(&config, &monitor, init_start);

    run(init_start).await
}

fn load_config() -> Result<(Arc<Config>, LogReceiver)> {
    debug!("Loading configuration...");
    let mut config = Config::new();
    config.load()?;
    let log_receiver = setup_logging(&config)?;
    info!("Starting manibot...");
    Ok((Arc::new(config), log_receiver))
}

async fn setup_database(
    config: &Config,
    log_receiver: LogReceiver,
    init_start: Instant,
) -> Result<Arc<Repository>> {
    debug!("Setting up Database...");
    let db = Arc::new(Repository::new(&config.db_url, config.db_pool_size)?);

    info!("Running database migrations...");
    db.run_migrations().await?;
    spawn_db_log_drain(log_receiver, db.clone());
    info!(
        "Database setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(db)
}

fn setup_feed_source(config: &Config) -> Result<Arc<dyn FeedSource>> {
    debug!("Setting up feed source {}...", config.feed.feed_url);
    let site = SiteInfo {
        name: config.feed.site_name.clone(),
        feed_url: config.feed.feed_url.clone(),
        uploads_url: config.feed.uploads_url.clone(),
        avatar_url: config.feed.avatar_url.clone(),
    };
    Ok(Arc::new(RssSource::new(site)?))
}

async fn setup_services(
    config: &Config,
    db: Arc<Repository>,
    source: Arc<dyn FeedSource>,
) -> Result<Arc<Services>> {
    debug!("Setting up Services...");
    Ok(Arc::new(
        Services::new(db, source, &config.default_prefix).await?,
    ))
}

async fn setup_bot(
    config: &Arc<Config>,
    db: Arc<Repository>,
    services: Arc<Services>,
    monitor: Arc<FeedMonitor>,
    init_start: Instant,
) -> Result<Bot> {
    info!("Starting bot...");
    let mut bot = Bot::new(config.clone(), db, services, monitor).await?;

    bot.start();
    info!(
        "Bot setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(bot)
}

fn setup_subscribers(event_bus: &EventBus, services: &Services, bot: &Bot) {
    debug!("Setting up Subscribers...");

    let series_subscriber = Arc::new(SeriesUpdateSubscriber::new(services.series.clone()));
    let webhook_subscriber = Arc::new(WebhookSubscriber::new(
        services.settings.clone(),
        bot.dispatcher.clone(),
    ));

    event_bus
        .register_subscriber::<FeedUpdateEvent, _>(series_subscriber)
        .register_subscriber::<FeedUpdateEvent, _>(webhook_subscriber);
}

fn setup_monitor(config: &Config, monitor: &Arc<FeedMonitor>, init_start: Instant) {
    if !config.features.feed_monitor {
        info!("Feed monitor disabled.");
        return;
    }
    monitor.start();
    info!(
        "Feed monitor setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );
}

async fn run(init_start: Instant) -> Result<()> {
    info!(
        "manibot is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down.");

    Ok(())
}
