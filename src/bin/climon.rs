use std::sync::Arc;

use clap::Parser;
use climate_monitoring::{
    actors::{messages::ObservationEvent, monitor::MonitorHandle, storage::StorageHandle},
    alerts::AlertManager,
    api::{ApiState, spawn_api_server},
    config::{Config, StorageConfig, read_config_file},
    providers::{FallbackResolver, build_providers},
    ratelimit::RateLimiter,
    reports::ReportWriter,
    storage::build_store,
    telegram::TelegramManager,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Climate monitoring hub: scheduled sampling, aggregation, and read API")]
struct Args {
    /// Config file (JSON). Defaults apply for every omitted section.
    #[arg(short)]
    file: Option<String>,

    /// Run a single monitoring cycle and exit.
    #[arg(long)]
    manual: bool,

    /// Probe each provider once and exit.
    #[arg(long)]
    probe: bool,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("climate_monitoring", LevelFilter::TRACE),
        ("climon", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    dotenv::dotenv().ok();

    let args = Args::parse();
    trace!("started with args: {args:?}");

    let mut config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };
    config.apply_env();

    let location = config.location.to_location();
    let providers = build_providers(&config);
    let resolver = Arc::new(FallbackResolver::new(providers));

    if args.probe {
        return probe_providers(&config, &resolver).await;
    }

    let telegram = match (&config.telegram.token, &config.telegram.chat_id) {
        (Some(token), Some(chat_id)) => {
            info!("Telegram alerts enabled");
            Some(TelegramManager::new(token, chat_id))
        }
        _ => {
            info!("Telegram alerts disabled (missing TELEGRAM_TOKEN or TELEGRAM_CHAT_ID)");
            None
        }
    };
    let alert_manager = AlertManager::new(config.thresholds, location.name.clone(), telegram);
    let report_writer = ReportWriter::new(&config.reports);

    let store = build_store(&config.storage).await?;
    let retention_days = match &config.storage {
        StorageConfig::Sqlite { retention_days, .. } => Some(*retention_days),
        StorageConfig::None => None,
    };

    let (observation_tx, _) = broadcast::channel::<ObservationEvent>(64);

    let storage = StorageHandle::spawn(store, observation_tx.subscribe(), retention_days);
    let monitor = MonitorHandle::spawn(
        location.clone(),
        config.schedule,
        config.sample_weeks_back,
        resolver.clone(),
        alert_manager,
        report_writer,
        observation_tx.clone(),
    );

    if args.manual {
        info!("running manual collection cycle");
        let success = monitor.run_cycle().await?;
        storage.flush().await?;
        monitor.shutdown().await?;
        storage.shutdown().await?;

        if !success {
            error!("manual collection failed");
            std::process::exit(1);
        }
        info!("manual collection completed successfully");
        return Ok(());
    }

    let limiter = Arc::new(RateLimiter::new(config.rate_limit));
    let api_state = ApiState {
        monitor: monitor.clone(),
        storage: storage.clone(),
        resolver: resolver.clone(),
        limiter,
        location: location.clone(),
        thresholds: config.thresholds,
        weekdays: config.schedule.weekdays,
    };
    let api_addr = spawn_api_server(&config.api, api_state).await?;

    info!(
        "continuous monitoring started for {} ({}-{}), API on {api_addr}",
        location.name, config.schedule.start_year, config.schedule.end_year
    );
    info!("data sources: {}", resolver.provider_names().join(", "));

    // Run an initial cycle immediately, like any fresh deployment wants.
    if let Ok(success) = monitor.run_cycle().await {
        debug!("initial cycle finished (success: {success})");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    monitor.shutdown().await?;
    storage.shutdown().await?;

    Ok(())
}

/// Try each provider once, concurrently, and report which ones answer.
async fn probe_providers(config: &Config, resolver: &FallbackResolver) -> anyhow::Result<()> {
    use futures::future::join_all;

    let location = config.location.to_location();

    info!("probing providers for {}", location.name);
    info!("chain: {}", resolver.provider_names().join(" -> "));

    let probes = build_providers(config).into_iter().map(|provider| {
        let location = location.clone();
        async move {
            let label = provider.id().to_string();
            if !provider.is_configured() {
                return (label, Ok(None));
            }
            match provider.fetch_current(&location).await {
                Ok(observation) => (label, Ok(Some(observation))),
                Err(e) => (label, Err(e)),
            }
        }
    });

    for (label, result) in join_all(probes).await {
        match result {
            Ok(Some(observation)) => info!(
                "{label}: OK (temperature {:?})",
                observation.temperature.mean
            ),
            Ok(None) => info!("{label}: not configured"),
            Err(e) => error!("{label}: FAILED ({e})"),
        }
    }

    Ok(())
}
