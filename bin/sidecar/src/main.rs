//! Stacks event sidecar.
//!
//! Listens for the block notifications a Stacks node pushes to its event
//! observers and applies each one, in arrival order, to a data store.
//!
//! # Usage
//!
//! ```bash
//! # Postgres store
//! STACKS_EVENT_HOST=0.0.0.0 STACKS_EVENT_PORT=3700 \
//!     DATABASE_URL=postgres://localhost/stacks_sidecar sidecar
//!
//! # In-memory store, no database needed
//! sidecar --host 127.0.0.1 --port 3700 --store memory
//! ```

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::{EnvFilter, fmt};

use sidecar_core::metrics::init_metrics;
use sidecar_core::ports::DataStore;
use sidecar_core::services::{MessageApplier, SerialQueue};
use sidecar_observer::{EventObserver, ObserverConfig};
use sidecar_stacks::StacksTransactionDecoder;
use sidecar_storage::{Database, DatabaseConfig, InMemoryStore, PgStore};

const OBSERVER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const QUEUE_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Where applied records go.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StoreBackend {
    /// Keep records in memory (lost on exit).
    Memory,
    /// PostgreSQL at `--database-url`.
    Postgres,
}

/// Stacks event sidecar CLI.
#[derive(Parser, Debug)]
#[command(name = "sidecar")]
#[command(about = "Applies Stacks node event notifications to a store, one block at a time")]
#[command(version)]
struct Cli {
    /// Address to listen on for node notifications.
    #[arg(long, env = "STACKS_EVENT_HOST")]
    host: Option<String>,

    /// Port to listen on for node notifications.
    #[arg(long, env = "STACKS_EVENT_PORT")]
    port: Option<u16>,

    /// Store backend.
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = StoreBackend::Postgres)]
    store: StoreBackend,

    /// PostgreSQL database URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/stacks_sidecar"
    )]
    database_url: String,

    /// Largest accepted notification body, in bytes (default 64 MiB).
    #[arg(long, env = "MAX_MESSAGE_BYTES")]
    max_message_bytes: Option<usize>,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Purge all derived data from the database and exit.
    ///
    /// This deletes all blocks, transactions, contracts and events.
    /// Schema/migrations are preserved.
    #[arg(long)]
    purge: bool,

    /// Skip confirmation prompt for destructive operations (like --purge).
    #[arg(long, short = 'y')]
    yes: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled = match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>() {
        Ok(metrics_addr) => {
            match PrometheusBuilder::new()
                .with_http_listener(metrics_addr)
                .install()
            {
                Ok(()) => {
                    init_metrics();
                    true
                }
                Err(e) => {
                    warn!("⚠️  Failed to start metrics exporter: {}. Continuing without metrics.", e);
                    false
                }
            }
        }
        Err(e) => {
            warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
            false
        }
    };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Stacks event sidecar");
    debug!(store = ?cli.store, "Store backend");

    let mode = startup_mode(&cli)?;

    match cli.store {
        StoreBackend::Memory => {
            let StartupMode::Serve(config) = mode else {
                bail!("--migrate-only and --purge require the postgres store");
            };
            warn!("⚠️  In-memory store: applied data is lost on exit");
            run(Arc::new(InMemoryStore::new()), &config, &cli, metrics_enabled).await?;
        }
        StoreBackend::Postgres => {
            debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");

            // ─────────────────────────────────────────────────────────────────
            // 🗄️ DATABASE
            // ─────────────────────────────────────────────────────────────────
            info!("🗄️  Connecting to database...");
            let db = Database::connect(&DatabaseConfig::for_sidecar(&cli.database_url))
                .await
                .context("Failed to connect to database")?;

            db.migrate().await.context("Failed to run migrations")?;
            info!("🗄️  Database ready (migrations applied)");

            match mode {
                StartupMode::MigrateOnly => {
                    info!("🛑 --migrate-only flag set, exiting");
                    return Ok(());
                }
                StartupMode::Purge => return handle_purge(&db, cli.yes).await,
                StartupMode::Serve(config) => {
                    let store = Arc::new(PgStore::new(&db));
                    let result = run(store, &config, &cli, metrics_enabled).await;
                    db.close().await;
                    result?;
                }
            }
        }
    }

    info!("🛑 Shutdown complete");
    Ok(())
}

/// What the process does once the store is ready.
#[derive(Debug)]
enum StartupMode {
    MigrateOnly,
    Purge,
    Serve(ObserverConfig),
}

/// Resolve the startup mode, rejecting a bad observer endpoint before any
/// database work.
fn startup_mode(cli: &Cli) -> Result<StartupMode> {
    if cli.migrate_only {
        Ok(StartupMode::MigrateOnly)
    } else if cli.purge {
        Ok(StartupMode::Purge)
    } else {
        observer_config(cli).map(StartupMode::Serve)
    }
}

fn observer_config(cli: &Cli) -> Result<ObserverConfig> {
    ObserverConfig::from_parts(cli.host.clone(), cli.port, cli.max_message_bytes)
        .context("Invalid event observer configuration (set --host/STACKS_EVENT_HOST and --port/STACKS_EVENT_PORT)")
}

/// Serve node notifications into `store` until a shutdown signal.
async fn run<S>(
    store: Arc<S>,
    config: &ObserverConfig,
    cli: &Cli,
    metrics_enabled: bool,
) -> Result<()>
where
    S: DataStore + 'static,
{
    let applier = Arc::new(MessageApplier::new(
        store,
        Arc::new(StacksTransactionDecoder::new()),
    ));
    let (queue, worker) = SerialQueue::start();

    let observer = EventObserver::bind(config, queue, applier)
        .await
        .context("Failed to start event observer")?;
    let addr = observer.local_addr()?;

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVICES START
    // ─────────────────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let observer_handle = tokio::spawn(
        async move {
            if let Err(e) = observer.run(shutdown_rx).await {
                error!(error = ?e, "❌ Event observer error");
            }
        }
        .instrument(info_span!("observer")),
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ Sidecar ready");
    info!("   📡 Observer: {}", addr);
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    shutdown_signal().await;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(OBSERVER_SHUTDOWN_TIMEOUT, observer_handle).await {
        Ok(_) => debug!("Observer stopped"),
        Err(_) => warn!("⚠️  Observer shutdown timed out"),
    }

    match tokio::time::timeout(QUEUE_DRAIN_TIMEOUT, worker.shutdown()).await {
        Ok(Ok(())) => debug!("Queue drained"),
        Ok(Err(e)) => warn!(error = %e, "⚠️  Queue worker failed"),
        Err(_) => warn!("⚠️  Queue drain timed out, pending messages dropped"),
    }

    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "❌ Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "❌ Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Handle the --purge command.
async fn handle_purge(db: &Database, skip_confirmation: bool) -> Result<()> {
    warn!("⚠️  PURGE MODE: This will delete ALL applied data!");
    warn!("   - All blocks, transactions, contracts and events");
    warn!("   - Schema and migrations will be preserved");

    if !skip_confirmation {
        print!("\n🔴 Are you sure you want to purge all data? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            info!("❌ Purge cancelled");
            return Ok(());
        }
    }

    info!("🗑️  Purging database...");
    let stats = db.purge().await.context("Failed to purge database")?;

    info!("✅ Database purged successfully");
    info!("   📦 Blocks removed: {}", stats.blocks_removed);
    info!("   📝 Transactions removed: {}", stats.transactions_removed);
    info!("   📜 Contracts removed: {}", stats.contracts_removed);
    info!("   📣 Events removed: {}", stats.events_removed);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_database_password() {
        assert_eq!(
            mask_password("postgres://sidecar:hunter2@db:5432/stacks"),
            "postgres://sidecar:****@db:5432/stacks"
        );
        assert_eq!(
            mask_password("postgres://localhost/stacks"),
            "postgres://localhost/stacks"
        );
    }

    #[test]
    fn test_host_and_port_come_from_flags() {
        let cli = Cli::parse_from(["sidecar", "--host", "127.0.0.1", "--port", "3700", "--store", "memory"]);
        assert_eq!(cli.store, StoreBackend::Memory);

        let config = observer_config(&cli).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:3700");
    }

    // Must fail before a database connection is attempted
    #[test]
    fn test_missing_endpoint_rejected_at_startup() {
        let cli = Cli::parse_from(["sidecar", "--port", "3700", "--database-url", "postgres://unreachable:1/x"]);
        assert_eq!(cli.store, StoreBackend::Postgres);

        let err = startup_mode(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("host"));
    }

    #[test]
    fn test_maintenance_modes_skip_endpoint_check() {
        let cli = Cli::parse_from(["sidecar", "--migrate-only"]);
        assert!(matches!(startup_mode(&cli), Ok(StartupMode::MigrateOnly)));

        let cli = Cli::parse_from(["sidecar", "--purge", "-y"]);
        assert!(matches!(startup_mode(&cli), Ok(StartupMode::Purge)));
    }
}
