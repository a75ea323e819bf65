//! Core domain types: [`Transaction`] and [`Block`].
//!
//! These are plain structs with stable field order, serialized as JSON at
//! the wire and storage boundary and re-encoded into a fixed textual form
//! only by [`crate::hashing`] for digest computation.

pub mod block;
pub mod transaction;

pub use block::{Block, GENESIS_PREVIOUS_HASH};
pub use transaction::{Transaction, REWARD_SENDER};
