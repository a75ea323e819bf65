//! `POST /broadcast-tnx` — a peer is forwarding a transaction it already
//! accepted into its own open pool.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use ledger::Transaction;

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct BroadcastTnxRequest {
    pub transaction: Transaction,
    #[allow(dead_code)]
    pub node: String,
}

#[derive(Debug, Serialize)]
pub struct BroadcastTnxResponse {
    pub msg: &'static str,
}

pub async fn broadcast_tnx(
    State(state): State<SharedState>,
    Json(body): Json<BroadcastTnxRequest>,
) -> (StatusCode, Json<BroadcastTnxResponse>) {
    let tx = body.transaction;
    let accepted = {
        let state = state.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = state.ledger.write().expect("ledger lock poisoned");
            guard.add_transaction(&tx.sender, &tx.recipient, tx.amount, &tx.signature, &[], false)
        })
        .await
        .expect("broadcast-tnx worker task panicked")
    };

    if accepted {
        (StatusCode::OK, Json(BroadcastTnxResponse { msg: "transaction added" }))
    } else {
        warn!("broadcast-tnx: rejected, signature did not verify");
        (StatusCode::BAD_REQUEST, Json(BroadcastTnxResponse { msg: "invalid transaction" }))
    }
}
