//! Ledger core crate.
//!
//! This crate provides the building blocks for a replicated
//! proof-of-work ledger node:
//!
//! - strongly-typed domain types (`types`),
//! - canonical block hashing (`hashing`),
//! - the chain + open-transaction state machine (`ledger`),
//! - RSA keypair management (`keystore`),
//! - transaction signing and verification (`signer`),
//! - tabular persistence (`store`),
//! - user/identity lookups (`user_directory`),
//! - the peer-replication HTTP client (`replicator`),
//! - and a top-level node configuration (`config`).
//!
//! `node-api` composes these pieces behind an HTTP surface.

pub mod config;
pub mod hashing;
pub mod keystore;
pub mod ledger;
pub mod replicator;
pub mod signer;
pub mod store;
pub mod types;
pub mod user_directory;

pub use config::LedgerConfig;
pub use keystore::{KeyStore, KeyStoreError};
pub use ledger::{Ledger, LedgerError, DEFAULT_DIFFICULTY, MINING_REWARD};
pub use replicator::{BroadcastOutcome, HttpReplicator, Replicator, DEFAULT_PEER_TIMEOUT};
pub use signer::SignerError;
pub use store::{MemoryStore, SqliteStore, Store, StoreError, Value};
pub use types::{Block, Transaction, GENESIS_PREVIOUS_HASH, REWARD_SENDER};
pub use user_directory::{SqlUserDirectory, UserDirectory};
