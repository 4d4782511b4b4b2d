mod config;
mod wiring;

use std::{error::Error, fs, path::Path, sync::Arc};

use api::AppState;
use runtime::{
    event_channel,
    logging::{init_tracing, DEFAULT_LOG_FILTER},
    metrics::JobMetrics,
    JobScheduler, SystemClock,
};
use store::Store;
use tokio::net::TcpListener;
use tracing::info;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing(DEFAULT_LOG_FILTER);
    let config = config::Config::from_env()?;

    ensure_parent_dir(&config.db_path)?;
    let store = Store::open(&config.db_path)?;
    info!(path = %config.db_path.display(), "database ready");

    let events_tx = event_channel(EVENT_CHANNEL_CAPACITY);
    let clock = Arc::new(SystemClock);
    let metrics = Arc::new(JobMetrics::new());

    let mut scheduler = JobScheduler::new(clock.clone());
    wiring::spawn_jobs(&mut scheduler, &config, &store, &events_tx, metrics.clone());

    let state = AppState::new(store, events_tx, clock, config.starting_cash);
    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "trading server listening");

    axum::serve(listener, wiring::build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let tasks = scheduler.shutdown().await;
    info!(stopped = tasks.len(), "background jobs stopped");
    wiring::log_job_summary(&metrics);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::ensure_parent_dir;

    #[test]
    fn creates_missing_database_directory() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let root = std::env::temp_dir().join(format!("trading-server-db-{unique}"));
        let db_path = root.join("nested").join("trading.db");

        ensure_parent_dir(&db_path).unwrap();

        assert!(root.join("nested").is_dir());
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn memory_path_needs_no_directory() {
        ensure_parent_dir(std::path::Path::new(":memory:")).unwrap();
    }
}
