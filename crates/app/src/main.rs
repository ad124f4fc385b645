use std::{process::ExitCode, sync::Arc, time::Duration};

use engine::{Engine, RateCache, SqlStore, TreasuryClient};
use migration::{Migrator, MigratorTrait};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use error::AppError;
use settings::{LogFormat, Settings};

mod error;
mod settings;

const DATA_DIR: &str = "./data";
const DATABASE_FILE: &str = "transactions.db";

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings.app);

    match run(settings).await {
        Ok(()) => {
            tracing::info!("server stopped");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(app: &settings::App) {
    let filter = EnvFilter::new(format!(
        "fxconv={level},server={level},engine={level},migration={level}",
        level = app.level
    ));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match app.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

async fn run(settings: Settings) -> Result<(), AppError> {
    std::fs::create_dir_all(DATA_DIR).map_err(|source| AppError::DataDir {
        path: DATA_DIR.to_string(),
        source,
    })?;
    let db = connect_database().await?;

    let feed = TreasuryClient::new(settings.feed.feed_config())?;
    tracing::info!(
        base_url = %settings.feed.base_url,
        timeout_secs = settings.feed.timeout_secs,
        max_attempts = settings.feed.max_attempts,
        "rate feed configured"
    );

    let cache = Arc::new(RateCache::with_ttl(Duration::from_secs(
        settings.cache.ttl_secs,
    )));
    let engine = Engine::builder()
        .store(Arc::new(SqlStore::new(db.clone())))
        .feed(Arc::new(feed))
        .cache(cache.clone())
        .build()?;

    let purge = tokio::spawn(purge_rate_cache(
        cache,
        Duration::from_secs(settings.cache.purge_interval_secs),
    ));

    let addr = format!("{}:{}", settings.server.bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| AppError::Bind { addr, source })?;

    let served = server::run_with_listener(Arc::new(engine), listener, shutdown_signal()).await;

    purge.abort();
    db.close().await?;
    served.map_err(AppError::Serve)
}

async fn connect_database() -> Result<sea_orm::DatabaseConnection, AppError> {
    let url = format!("sqlite:{DATA_DIR}/{DATABASE_FILE}?mode=rwc");
    tracing::info!(%url, "opening database");

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

/// Evicts expired rates every `every`; the cache only ever grows otherwise.
async fn purge_rate_cache(cache: Arc<RateCache>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let evicted = cache.purge();
        tracing::debug!(evicted, remaining = cache.len(), "rate cache purged");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received terminate signal, shutting down"),
    }
}
