//! Canonical block hashing.
//!
//! `hash_of` must produce byte-identical output on every peer for the same
//! logical block, since `previous_hash` links and the proof-of-work
//! predicate both depend on it. We fix a deterministic, field-ordered
//! textual encoding rather than relying on a generic serializer's field
//! order guarantees.

use sha2::{Digest, Sha256};

use crate::types::{Block, Transaction};

/// Renders an amount the same way everywhere it is hashed or signed, so
/// two peers never disagree on whether `3.0` is `"3"` or `"3.0"`.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.is_finite() {
        format!("{amount:.1}")
    } else {
        format!("{amount}")
    }
}

fn canonical_transaction(tx: &Transaction) -> String {
    format!(
        "{{'sender': '{}', 'recipient': '{}', 'amount': {}, 'signature': '{}'}}",
        tx.sender,
        tx.recipient,
        format_amount(tx.amount),
        tx.signature,
    )
}

fn canonical_block(block: &Block) -> String {
    let transactions: Vec<String> = block.transactions.iter().map(canonical_transaction).collect();
    format!(
        "{{'index': {}, 'previous_hash': '{}', 'nonce': {}, 'timestamp': '{}', 'transactions': [{}]}}",
        block.index,
        block.previous_hash,
        block.nonce,
        block.timestamp,
        transactions.join(", "),
    )
}

/// Lowercase hex SHA-256 digest of `block`'s canonical form, with the
/// `hash` field excluded and transactions normalized to
/// `sender, recipient, amount, signature` field order.
pub fn hash_of(block: &Block) -> String {
    let canonical = canonical_block(block);
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)
}

/// Whether `hash` meets the proof-of-work predicate for `difficulty`.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.as_bytes().iter().take(difficulty).all(|&b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block::candidate(
            1,
            crate::types::GENESIS_PREVIOUS_HASH.to_string(),
            "1700000000.0".to_string(),
            vec![Transaction::reward(1, "alice@x", 10.0)],
        )
    }

    #[test]
    fn hash_of_is_deterministic() {
        let block = sample_block();
        assert_eq!(hash_of(&block), hash_of(&block));
    }

    #[test]
    fn hash_of_ignores_the_hash_field() {
        let mut block = sample_block();
        block.hash = "whatever-was-here-before".to_string();
        let h1 = hash_of(&block);
        block.hash = "something-else-entirely".to_string();
        let h2 = hash_of(&block);
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_of_changes_when_nonce_changes() {
        let mut block = sample_block();
        let h1 = hash_of(&block);
        block.nonce += 1;
        let h2 = hash_of(&block);
        assert_ne!(h1, h2);
    }

    #[test]
    fn meets_difficulty_checks_leading_zero_count() {
        assert!(meets_difficulty("0000abcd", 4));
        assert!(!meets_difficulty("000abcd1", 4));
        assert!(meets_difficulty("anything", 0));
    }

    #[test]
    fn format_amount_is_stable_for_whole_and_fractional_values() {
        assert_eq!(format_amount(3.0), "3.0");
        assert_eq!(format_amount(3.5), "3.5");
    }
}
