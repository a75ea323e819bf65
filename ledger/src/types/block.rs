//! Block type and the genesis sentinel.
//!
//! Hashing is not done here: [`crate::hashing`] owns the canonical encoding
//! so that the Ledger and the wire format always agree on what `hash_of`
//! means for a given block.

use serde::{Deserialize, Serialize};

use super::Transaction;

/// Fixed `previous_hash` carried by the first block of any chain.
pub const GENESIS_PREVIOUS_HASH: &str =
    "00000000000000000000000000000000000000000000000000000000000000x0";

/// A committed group of transactions, linked to its predecessor by hash.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: String,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    pub hash: String,
}

impl Block {
    /// Builds a candidate block with `hash` left empty; the caller is
    /// expected to run proof-of-work and set `hash` once the difficulty
    /// predicate is met.
    pub fn candidate(index: u64, previous_hash: String, timestamp: String, transactions: Vec<Transaction>) -> Self {
        Self {
            index,
            previous_hash,
            timestamp,
            transactions,
            nonce: 0,
            hash: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_previous_hash_is_64_characters() {
        assert_eq!(GENESIS_PREVIOUS_HASH.len(), 64);
        assert!(GENESIS_PREVIOUS_HASH.starts_with(&"0".repeat(62)));
    }

    #[test]
    fn candidate_block_starts_with_zero_nonce_and_no_hash() {
        let block = Block::candidate(1, GENESIS_PREVIOUS_HASH.to_string(), "0".to_string(), vec![]);
        assert_eq!(block.nonce, 0);
        assert_eq!(block.hash, "");
    }
}
