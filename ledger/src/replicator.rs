//! Peer HTTP client: the three replication endpoints consumed by the
//! Ledger (`broadcast-tnx`, `broadcast-block`, `chain`).
//!
//! [`HttpReplicator`] wraps a blocking `reqwest` client, mirroring the
//! blocking-client-inside-a-sync-trait-method idiom the rest of this
//! workspace uses for outbound calls from otherwise-synchronous core
//! logic. Connection errors are swallowed into [`BroadcastOutcome::Unreachable`]
//! / `None`, never propagated as hard failures — peers are best-effort.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{Block, Transaction};

/// Default per-call timeout when a caller doesn't override it.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BroadcastOutcome {
    /// HTTP 200: the peer applied the broadcast.
    Accepted,
    /// HTTP 400/500: the peer rejected the payload.
    Rejected,
    /// HTTP 409: the peer considers the chains out of sync.
    Conflict,
    /// Connection error or timeout; peer presumed offline.
    Unreachable,
}

/// Thin HTTP client wrapping the three peer endpoints.
pub trait Replicator: Send + Sync {
    fn broadcast_transaction(&self, peer: &str, transaction: &Transaction) -> BroadcastOutcome;
    fn broadcast_block(&self, peer: &str, block: &Block) -> BroadcastOutcome;
    fn fetch_chain(&self, peer: &str) -> Option<Vec<Block>>;
}

#[derive(Serialize)]
struct BroadcastTransactionRequest<'a> {
    transaction: &'a Transaction,
    node: &'a str,
}

#[derive(Serialize)]
struct BroadcastBlockRequest<'a> {
    block: &'a Block,
    node: &'a str,
}

#[derive(Serialize)]
struct ChainRequest<'a> {
    node: &'a str,
}

/// Blocking-`reqwest`-backed [`Replicator`] used outside of tests.
pub struct HttpReplicator {
    client: reqwest::blocking::Client,
    own_node_url: String,
}

impl HttpReplicator {
    pub fn new(own_node_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .expect("HTTP client configuration should always be valid");
        Self { client, own_node_url: own_node_url.into() }
    }

    fn endpoint(peer: &str, path: &str) -> String {
        format!("{}/{}", peer.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

impl Replicator for HttpReplicator {
    fn broadcast_transaction(&self, peer: &str, transaction: &Transaction) -> BroadcastOutcome {
        let url = Self::endpoint(peer, "broadcast-tnx");
        let body = BroadcastTransactionRequest { transaction, node: &self.own_node_url };
        let outcome = match self.client.post(&url).json(&body).send() {
            Ok(resp) => match resp.status().as_u16() {
                200 => BroadcastOutcome::Accepted,
                400 | 500 => BroadcastOutcome::Rejected,
                _ => BroadcastOutcome::Rejected,
            },
            Err(_) => BroadcastOutcome::Unreachable,
        };
        match outcome {
            BroadcastOutcome::Accepted => debug!(peer, "broadcast_transaction: peer accepted"),
            BroadcastOutcome::Unreachable => warn!(peer, "broadcast_transaction: peer unreachable"),
            _ => warn!(peer, ?outcome, "broadcast_transaction: peer rejected"),
        }
        outcome
    }

    fn broadcast_block(&self, peer: &str, block: &Block) -> BroadcastOutcome {
        let url = Self::endpoint(peer, "broadcast-block");
        let body = BroadcastBlockRequest { block, node: &self.own_node_url };
        let outcome = match self.client.post(&url).json(&body).send() {
            Ok(resp) => match resp.status().as_u16() {
                200 => BroadcastOutcome::Accepted,
                409 => BroadcastOutcome::Conflict,
                _ => BroadcastOutcome::Rejected,
            },
            Err(_) => BroadcastOutcome::Unreachable,
        };
        match outcome {
            BroadcastOutcome::Accepted => debug!(peer, index = block.index, "broadcast_block: peer accepted"),
            BroadcastOutcome::Unreachable => warn!(peer, index = block.index, "broadcast_block: peer unreachable"),
            _ => warn!(peer, index = block.index, ?outcome, "broadcast_block: peer rejected"),
        }
        outcome
    }

    fn fetch_chain(&self, peer: &str) -> Option<Vec<Block>> {
        let url = Self::endpoint(peer, "chain");
        let body = ChainRequest { node: &self.own_node_url };
        let resp = match self.client.get(&url).json(&body).send() {
            Ok(resp) => resp,
            Err(_) => {
                warn!(peer, "fetch_chain: peer unreachable");
                return None;
            }
        };
        if !resp.status().is_success() {
            warn!(peer, status = resp.status().as_u16(), "fetch_chain: peer returned error status");
            return None;
        }
        let chain = resp.json::<Vec<Block>>().ok();
        debug!(peer, found = chain.is_some(), "fetch_chain: response decoded");
        chain
    }
}
