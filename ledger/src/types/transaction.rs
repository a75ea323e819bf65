//! Transaction type: the atomic unit of value movement.

use serde::{Deserialize, Serialize};

/// Reserved sender identity used for mining-reward transactions.
///
/// Transactions with this sender are exempt from signature verification
/// (see [`crate::signer::verify`]) and credit the mining host.
pub const REWARD_SENDER: &str = "Jiocoin";

/// A signed (or reward) value transfer between two account identifiers.
///
/// `index` is assigned within the current open pool, starting at 1, and
/// resets whenever a mine commits the pool and clears it. `amount` is
/// non-negative. `signature` is hex-encoded and empty only for reward
/// transactions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub index: u64,
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    pub signature: String,
}

impl Transaction {
    pub fn new(index: u64, sender: impl Into<String>, recipient: impl Into<String>, amount: f64, signature: impl Into<String>) -> Self {
        Self {
            index,
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            signature: signature.into(),
        }
    }

    /// Builds the reward transaction appended at the end of every mined block.
    pub fn reward(index: u64, host: &str, reward: f64) -> Self {
        Self::new(index, REWARD_SENDER, host, reward, "")
    }

    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }

    /// Whether `other` refers to the same logical transaction, by the
    /// `(index, sender, recipient, amount, signature)` tuple equality the
    /// ledger uses to dedupe open transactions against a committed block.
    pub fn same_as(&self, other: &Transaction) -> bool {
        self.index == other.index
            && self.sender == other.sender
            && self.recipient == other.recipient
            && self.amount == other.amount
            && self.signature == other.signature
    }
}
