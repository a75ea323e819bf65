//! `POST /broadcast-block` — a peer mined a block and is pushing it here.
//!
//! The incoming index must equal `local_chain.len() + 1`; anything else
//! means this node is out of sync and the caller is expected to notice
//! the 409 and run its own `resolve` rather than have this endpoint do it.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use ledger::Block;

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct BroadcastBlockRequest {
    pub block: Block,
    #[allow(dead_code)]
    pub node: String,
}

#[derive(Debug, Serialize)]
pub struct BroadcastBlockResponse {
    pub msg: &'static str,
}

pub async fn broadcast_block(
    State(state): State<SharedState>,
    Json(body): Json<BroadcastBlockRequest>,
) -> (StatusCode, Json<BroadcastBlockResponse>) {
    let block = body.block;
    let state_for_task = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let expected_index = {
            let guard = state_for_task.ledger.read().expect("ledger lock poisoned");
            guard.chain.len() as u64 + 1
        };
        if block.index != expected_index {
            return (StatusCode::CONFLICT, "Blockchains not in sync !");
        }
        let applied = {
            let mut guard = state_for_task.ledger.write().expect("ledger lock poisoned");
            guard.add_block(block)
        };
        if applied {
            (StatusCode::OK, "block added")
        } else {
            (StatusCode::CONFLICT, "Block validation failed !")
        }
    })
    .await
    .expect("broadcast-block worker task panicked");

    if outcome.0 == StatusCode::CONFLICT {
        warn!(msg = outcome.1, "broadcast-block: rejected");
    }
    (outcome.0, Json(BroadcastBlockResponse { msg: outcome.1 }))
}
