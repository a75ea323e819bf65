//! Top-level configuration for a ledger node.
//!
//! A single `LedgerConfig` aggregates everything a node needs to start:
//! where to listen, who it is, and the tuning knobs for mining and peer
//! calls. Every field has a hardcoded default and can be overridden by
//! an environment variable, matching the ambient pattern of small Rust
//! services that ship a `Default` impl plus env overrides rather than a
//! config-file parser.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_DIFFICULTY: usize = crate::ledger::DEFAULT_DIFFICULTY;
const DEFAULT_MINING_REWARD: f64 = crate::ledger::MINING_REWARD;
const DEFAULT_PEER_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DATA_DIR: &str = "./data";

/// Configuration for a single ledger node.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Address the NodeAPI binds to.
    pub listen_addr: SocketAddr,
    /// Stable per-node identifier, used for the key file path and the
    /// database file path. Replaces port-derived naming so a node keeps
    /// its identity across a port change.
    pub node_id: String,
    /// Email identifying the user who owns this node.
    pub host: String,
    /// Required count of leading `'0'` hex characters in a mined hash.
    pub difficulty: usize,
    /// Amount credited to `host` by the reward transaction of every mined block.
    pub mining_reward: f64,
    /// Per-call timeout used by the peer HTTP client.
    pub peer_http_timeout: Duration,
    /// Directory holding this node's SQLite database and private key file.
    pub data_dir: PathBuf,
    /// Path to the shared user-directory database; may coincide with
    /// `data_dir` in a single-host demo.
    pub users_database_url: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR
                .parse()
                .expect("hard-coded listen address should parse"),
            node_id: "node-1".to_string(),
            host: "node-1@example.com".to_string(),
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
            peer_http_timeout: Duration::from_secs(DEFAULT_PEER_TIMEOUT_SECS),
            users_database_url: data_dir.join("users.db"),
            data_dir,
        }
    }
}

impl LedgerConfig {
    /// Applies environment-variable overrides on top of [`Default`].
    /// Unset or unparsable variables are left at their current value.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("LEDGER_LISTEN_ADDR") {
            if let Ok(addr) = v.parse() {
                config.listen_addr = addr;
            }
        }
        if let Ok(v) = std::env::var("LEDGER_NODE_ID") {
            config.node_id = v;
        }
        if let Ok(v) = std::env::var("LEDGER_HOST") {
            config.host = v;
        }
        if let Ok(v) = std::env::var("LEDGER_DIFFICULTY") {
            if let Ok(d) = v.parse() {
                config.difficulty = d;
            }
        }
        if let Ok(v) = std::env::var("LEDGER_MINING_REWARD") {
            if let Ok(r) = v.parse() {
                config.mining_reward = r;
            }
        }
        if let Ok(v) = std::env::var("LEDGER_PEER_HTTP_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                config.peer_http_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LEDGER_USERS_DATABASE_URL") {
            config.users_database_url = PathBuf::from(v);
        }

        config
    }
}
