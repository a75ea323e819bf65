//! Shared application state.

use std::sync::{Arc, RwLock};

use ledger::{HttpReplicator, Ledger, SqlUserDirectory, SqliteStore};

use crate::config::NodeConfig;

/// The concrete ledger stack this binary runs: SQLite storage, a SQLite-backed
/// user directory, and a real blocking-HTTP peer client.
pub type NodeLedger = Ledger<SqliteStore, SqlUserDirectory<SqliteStore>, HttpReplicator>;

/// Shared state held by HTTP handlers and passed in via Axum's `State` extractor.
///
/// `ledger` is a `std::sync::RwLock` rather than `tokio::sync::Mutex`: every
/// mutating call goes through `tokio::task::spawn_blocking` anyway (mining
/// is CPU-bound proof-of-work, and the peer HTTP client is blocking), so an
/// async-aware lock buys nothing and a synchronous one is simpler to reason
/// about under `spawn_blocking`.
///
/// This binary exposes only the three peer-facing replication endpoints
/// (`broadcast-tnx`, `broadcast-block`, `chain`); none of them originate a
/// transaction or a mined block, so none needs this node's own peer list —
/// that lookup belongs to whatever surface originates those calls.
pub struct AppState {
    pub ledger: RwLock<NodeLedger>,
    pub config: NodeConfig,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
