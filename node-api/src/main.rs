//! NodeAPI binary: the peer-facing HTTP surface for a single ledger node.
//!
//! Exposes the three endpoints peers use to replicate state:
//!
//! - `POST /broadcast-tnx`
//! - `POST /broadcast-block`
//! - `GET /chain`
//!
//! This is deliberately not the human-facing web UI (registration, login,
//! wallet dashboard) — that is an external collaborator's concern.

mod config;
mod routes;
mod state;

use std::sync::{Arc, RwLock};

use axum::{
    routing::{get, post},
    Router,
};
use tokio::signal;

use ledger::{HttpReplicator, Ledger, SqlUserDirectory, SqliteStore};

use config::NodeConfig;
use routes::{broadcast_block::broadcast_block, broadcast_tnx::broadcast_tnx, chain::chain};
use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "node_api=info,ledger=info".to_string()))
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let node_cfg = NodeConfig::from_env();

    std::fs::create_dir_all(&node_cfg.data_dir)
        .map_err(|e| format!("failed to create data dir {}: {e}", node_cfg.data_dir.display()))?;

    let ledger_db_path = node_cfg.data_dir.join(format!("{}.db", node_cfg.node_id));
    let ledger_store = Arc::new(
        SqliteStore::open(&ledger_db_path).map_err(|e| format!("failed to open ledger store: {e}"))?,
    );

    let users_store = Arc::new(
        SqliteStore::open(&node_cfg.users_database_url)
            .map_err(|e| format!("failed to open users store: {e}"))?,
    );
    let user_dir = Arc::new(SqlUserDirectory::new(users_store));
    user_dir.ensure_schema().map_err(|e| format!("failed to prepare users table: {e}"))?;

    let own_node_url = format!("http://{}", node_cfg.listen_addr);
    let replicator = Arc::new(HttpReplicator::new(own_node_url, node_cfg.peer_http_timeout));

    let ledger: Ledger<SqliteStore, SqlUserDirectory<SqliteStore>, HttpReplicator> = Ledger::new(
        node_cfg.host.clone(),
        node_cfg.difficulty,
        ledger_store,
        user_dir,
        replicator,
    )
    .map_err(|e| format!("failed to initialise ledger: {e}"))?;

    let listen_addr = node_cfg.listen_addr;
    let app_state: state::SharedState = Arc::new(AppState {
        ledger: RwLock::new(ledger),
        config: node_cfg,
    });

    let app = Router::new()
        .route("/broadcast-tnx", post(broadcast_tnx))
        .route("/broadcast-block", post(broadcast_block))
        .route("/chain", get(chain))
        .with_state(app_state);

    tracing::info!("node-api listening on http://{listen_addr}");

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .map_err(|e| format!("failed to bind {listen_addr}: {e}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("node-api server error: {e}"))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
