//! # zkbalance Node
//!
//! Entry point for the `zkbalance-node` binary. Parses CLI arguments,
//! initializes logging and metrics, prepares the key pair, and serves the
//! HTTP API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the HTTP service
//! - `keygen`  — run setup once and persist the key pair
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;

use zkbalance_protocol::config::{PROTOCOL_VERSION, RELATION_VERSION};
use zkbalance_protocol::service::ProofService;
use zkbalance_protocol::store::BalanceStore;
use zkbalance_protocol::zkp::{KeyManager, KeyStore, SledKeyStore, ThresholdRelation};

use cli::{Commands, ZkBalanceCli};
use logging::LogFormat;
use metrics::NodeMetrics;

/// Subdirectory of the data dir holding the sled key database.
const KEY_DB_DIR: &str = "keys";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ZkBalanceCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Keygen(args) => keygen(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn key_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(KEY_DB_DIR)
}

/// Builds the key manager, persistent when `data_dir` is given.
fn build_key_manager(
    relation: Arc<ThresholdRelation>,
    data_dir: Option<&Path>,
) -> Result<KeyManager> {
    match data_dir {
        Some(dir) => {
            let path = key_db_path(dir);
            std::fs::create_dir_all(&path)
                .with_context(|| format!("failed to create key directory: {}", path.display()))?;
            let store = SledKeyStore::open(&path)
                .with_context(|| format!("failed to open key store at {}", path.display()))?;
            tracing::info!(path = %path.display(), "key store opened");
            Ok(KeyManager::with_store(
                relation,
                Arc::new(store) as Arc<dyn KeyStore>,
            ))
        }
        None => {
            tracing::warn!("no data directory given; keys will not survive a restart");
            Ok(KeyManager::new(relation))
        }
    }
}

/// Loads or generates the key pair off the async runtime.
async fn warm_keys(keys: Arc<KeyManager>) -> Result<String> {
    let pair = tokio::task::spawn_blocking(move || keys.get_or_create_keys())
        .await
        .context("key setup task failed")?
        .context("key setup failed")?;
    Ok(pair.id().to_hex())
}

/// Starts the HTTP API and the metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        &args.log_level,
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        listen = %args.listen,
        metrics_port = args.metrics_port,
        data_dir = ?args.data_dir,
        "starting zkbalance-node"
    );

    // --- Relation and keys ---
    let relation = Arc::new(ThresholdRelation::new().context("failed to build relation")?);
    tracing::info!(
        relation_hash = %relation.hash(),
        constraints = relation.shape().constraints,
        "relation ready"
    );

    let keys = Arc::new(build_key_manager(
        Arc::clone(&relation),
        args.data_dir.as_deref(),
    )?);
    let key_id = warm_keys(Arc::clone(&keys)).await?;
    tracing::info!(key_id = %key_id, "key pair ready");

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Application state ---
    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        service: Arc::new(ProofService::new(Arc::new(BalanceStore::new()), keys)),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind API listener on {}", args.listen))?;
    tracing::info!("API server listening on {}", args.listen);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = SocketAddr::new(args.listen.ip(), args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("zkbalance-node stopped");
    Ok(())
}

/// Runs setup (or loads existing keys) and persists the pair in `data_dir`.
async fn keygen(args: cli::KeygenArgs) -> Result<()> {
    logging::init_logging("zkbalance_node=info,zkbalance_protocol=info", LogFormat::Pretty);

    let relation = Arc::new(ThresholdRelation::new().context("failed to build relation")?);
    let relation_hash = relation.hash().to_hex();
    let keys = Arc::new(build_key_manager(relation, Some(&args.data_dir))?);
    let key_id = warm_keys(keys).await?;

    println!("Key pair ready.");
    println!("  Key store     : {}", key_db_path(&args.data_dir).display());
    println!("  Relation hash : {}", relation_hash);
    println!("  Key id        : {}", key_id);

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("zkbalance-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", PROTOCOL_VERSION);
    println!("relation       v{}", RELATION_VERSION);
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
