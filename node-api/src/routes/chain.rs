//! `GET /chain` — full chain dump, consumed by a peer's `resolve`.

use axum::{extract::State, Json};
use serde::Deserialize;

use ledger::Block;

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ChainRequest {
    #[allow(dead_code)]
    pub node: String,
}

pub async fn chain(State(state): State<SharedState>, Json(_body): Json<ChainRequest>) -> Json<Vec<Block>> {
    let state = state.clone();
    let chain = tokio::task::spawn_blocking(move || {
        state.ledger.read().expect("ledger lock poisoned").chain.clone()
    })
    .await
    .expect("chain worker task panicked");
    Json(chain)
}
