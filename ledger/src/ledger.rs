//! The Ledger state machine: chain + open-transaction pool, balance
//! accounting, block validation, and proof-of-work mining.
//!
//! Mirrors `original_source/blockchain.py::Blockchain` method-for-method,
//! including the two behaviors `DESIGN.md` records as deliberately
//! preserved (mine-block conflict semantics, broadcast-failure return
//! value) and the two it records as deliberately fixed (stable per-node
//! identifier instead of port-derived naming, strictly-longest-chain
//! resolve).

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::hashing::{hash_of, meets_difficulty};
use crate::replicator::{BroadcastOutcome, Replicator};
use crate::signer;
use crate::store::{ColumnDef, SqlType, Store, StoreError, Value};
use crate::types::{Block, Transaction, GENESIS_PREVIOUS_HASH};
use crate::user_directory::UserDirectory;

pub const DEFAULT_DIFFICULTY: usize = 4;
pub const MINING_REWARD: f64 = 10.0;

const BLOCKCHAIN_TABLE: &str = "blockchain";
const OPEN_TRANSACTIONS_TABLE: &str = "open_transactions";

pub fn blockchain_schema() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("id", SqlType::Integer).unique(),
        ColumnDef::new("hash", SqlType::Text).unique(),
        ColumnDef::new("previous_hash", SqlType::Text).unique(),
        ColumnDef::new("nonce", SqlType::Integer),
        ColumnDef::new("timestamp", SqlType::Text),
        ColumnDef::new("transactions", SqlType::Text),
    ]
}

pub fn open_transactions_schema() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("id", SqlType::Integer).unique(),
        ColumnDef::new("sender", SqlType::Text),
        ColumnDef::new("recipient", SqlType::Text),
        ColumnDef::new("amount", SqlType::Real),
        ColumnDef::new("signature", SqlType::Text),
    ]
}

#[derive(Debug)]
pub enum LedgerError {
    Store(StoreError),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Store(e) => write!(f, "ledger storage error: {e}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        LedgerError::Store(e)
    }
}

fn now_timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock should be after the Unix epoch")
        .as_secs_f64();
    format!("{secs}")
}

/// Chain + open-transaction pool for a single node, generic over its
/// storage, user-directory, and peer-replication backends.
pub struct Ledger<S: Store, U: UserDirectory, R: Replicator> {
    pub chain: Vec<Block>,
    pub open_transactions: Vec<Transaction>,
    host: String,
    difficulty: usize,
    mining_reward: f64,
    store: Arc<S>,
    user_dir: Arc<U>,
    replicator: Arc<R>,
}

impl<S: Store, U: UserDirectory, R: Replicator> Ledger<S, U, R> {
    pub fn new(
        host: impl Into<String>,
        difficulty: usize,
        store: Arc<S>,
        user_dir: Arc<U>,
        replicator: Arc<R>,
    ) -> Result<Self, LedgerError> {
        store.ensure_table(BLOCKCHAIN_TABLE, &blockchain_schema())?;
        store.ensure_table(OPEN_TRANSACTIONS_TABLE, &open_transactions_schema())?;
        let mut ledger = Self {
            chain: Vec::new(),
            open_transactions: Vec::new(),
            host: host.into(),
            difficulty,
            mining_reward: MINING_REWARD,
            store,
            user_dir,
            replicator,
        };
        ledger.load_data()?;
        Ok(ledger)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Reloads `chain` and `open_transactions` from the Store, so a node
    /// can crash and recover.
    pub fn load_data(&mut self) -> Result<(), LedgerError> {
        let mut block_rows = self.store.get_all(BLOCKCHAIN_TABLE)?;
        block_rows.sort_by_key(|row| row.get("id").and_then(Value::as_i64).unwrap_or(0));
        self.chain = block_rows
            .into_iter()
            .map(|row| {
                let transactions_json = row
                    .get("transactions")
                    .and_then(Value::as_str)
                    .unwrap_or("[]")
                    .to_string();
                Block {
                    index: row.get("id").and_then(Value::as_i64).unwrap_or(0) as u64,
                    hash: row.get("hash").and_then(Value::as_str).unwrap_or_default().to_string(),
                    previous_hash: row.get("previous_hash").and_then(Value::as_str).unwrap_or_default().to_string(),
                    nonce: row.get("nonce").and_then(Value::as_i64).unwrap_or(0) as u64,
                    timestamp: row.get("timestamp").and_then(Value::as_str).unwrap_or_default().to_string(),
                    transactions: serde_json::from_str(&transactions_json).unwrap_or_default(),
                }
            })
            .collect();

        let mut tx_rows = self.store.get_all(OPEN_TRANSACTIONS_TABLE)?;
        tx_rows.sort_by_key(|row| row.get("id").and_then(Value::as_i64).unwrap_or(0));
        self.open_transactions = tx_rows
            .into_iter()
            .map(|row| Transaction {
                index: row.get("id").and_then(Value::as_i64).unwrap_or(0) as u64,
                sender: row.get("sender").and_then(Value::as_str).unwrap_or_default().to_string(),
                recipient: row.get("recipient").and_then(Value::as_str).unwrap_or_default().to_string(),
                amount: row.get("amount").and_then(Value::as_f64).unwrap_or(0.0),
                signature: row.get("signature").and_then(Value::as_str).unwrap_or_default().to_string(),
            })
            .collect();
        Ok(())
    }

    fn save_chain(&self) -> Result<(), LedgerError> {
        self.store.truncate(BLOCKCHAIN_TABLE)?;
        for block in &self.chain {
            let transactions_json =
                serde_json::to_string(&block.transactions).expect("transactions always serialize");
            self.store.insert(
                BLOCKCHAIN_TABLE,
                &[
                    ("id", Value::Integer(block.index as i64)),
                    ("hash", Value::Text(block.hash.clone())),
                    ("previous_hash", Value::Text(block.previous_hash.clone())),
                    ("nonce", Value::Integer(block.nonce as i64)),
                    ("timestamp", Value::Text(block.timestamp.clone())),
                    ("transactions", Value::Text(transactions_json)),
                ],
            )?;
        }
        Ok(())
    }

    fn save_open_transactions(&self) -> Result<(), LedgerError> {
        self.store.truncate(OPEN_TRANSACTIONS_TABLE)?;
        for tx in &self.open_transactions {
            self.store.insert(
                OPEN_TRANSACTIONS_TABLE,
                &[
                    ("id", Value::Integer(tx.index as i64)),
                    ("sender", Value::Text(tx.sender.clone())),
                    ("recipient", Value::Text(tx.recipient.clone())),
                    ("amount", Value::Real(tx.amount)),
                    ("signature", Value::Text(tx.signature.clone())),
                ],
            )?;
        }
        Ok(())
    }

    /// Sum of `+amount` where `identifier` is recipient and `-amount`
    /// where sender, across every committed block, minus pending debits
    /// in the open pool. Pending credits are not counted.
    pub fn balance_of(&self, identifier: &str) -> f64 {
        let mut balance = 0.0;
        for block in &self.chain {
            for tx in &block.transactions {
                if tx.recipient == identifier {
                    balance += tx.amount;
                } else if tx.sender == identifier {
                    balance -= tx.amount;
                }
            }
        }
        for tx in &self.open_transactions {
            if tx.sender == identifier {
                balance -= tx.amount;
            }
        }
        balance
    }

    pub fn add_transaction(
        &mut self,
        sender: &str,
        recipient: &str,
        amount: f64,
        signature: &str,
        peers: &[String],
        broadcast: bool,
    ) -> bool {
        let index = self.open_transactions.len() as u64 + 1;
        let transaction = Transaction::new(index, sender, recipient, amount, signature);
        if !signer::verify(&transaction, self.user_dir.as_ref()) {
            warn!(sender, recipient, amount, "add_transaction: signature verification failed");
            return false;
        }

        self.open_transactions.push(transaction.clone());
        if let Err(err) = self.save_open_transactions() {
            tracing::error!(%err, "add_transaction: failed to persist open transactions");
        }

        if broadcast {
            for peer in peers {
                match self.replicator.broadcast_transaction(peer, &transaction) {
                    BroadcastOutcome::Rejected => {
                        warn!(peer, "add_transaction: peer rejected broadcast, local append retained");
                        return false;
                    }
                    BroadcastOutcome::Unreachable => continue,
                    BroadcastOutcome::Accepted | BroadcastOutcome::Conflict => {}
                }
            }
        }

        info!(sender, recipient, amount, "add_transaction: accepted");
        true
    }

    /// Runs proof-of-work to mine the open pool into a new block, then
    /// broadcasts it. Returns `true` iff a quorum of peers reports the
    /// chains are out of sync (a conflict), not whether mining succeeded
    /// — mining itself always succeeds locally. See `DESIGN.md` Open
    /// Question 1.
    pub fn mine_block(&mut self, peers: &[String]) -> bool {
        let mut survivors = Vec::with_capacity(self.open_transactions.len());
        for tx in self.open_transactions.drain(..) {
            if signer::verify(&tx, self.user_dir.as_ref()) {
                survivors.push(tx);
            } else {
                warn!(index = tx.index, "mine_block: dropping open transaction with invalid signature");
            }
        }
        self.open_transactions = survivors;

        let reward_index = self.open_transactions.len() as u64 + 1;
        self.open_transactions.push(Transaction::reward(reward_index, &self.host, self.mining_reward));

        let transactions = self.open_transactions.clone();
        let previous_hash = self
            .chain
            .last()
            .map(|b| b.hash.clone())
            .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string());
        let index = self.chain.len() as u64 + 1;

        let mut block = Block::candidate(index, previous_hash, now_timestamp(), transactions);
        let mut attempts: u64 = 0;
        loop {
            let hash = hash_of(&block);
            if meets_difficulty(&hash, self.difficulty) {
                block.hash = hash;
                break;
            }
            block.nonce += 1;
            block.timestamp = now_timestamp();
            attempts += 1;
        }
        debug!(index = block.index, nonce = block.nonce, attempts, "mine_block: proof-of-work found");

        self.chain.push(block.clone());
        self.open_transactions.clear();
        if let Err(err) = self.save_chain() {
            tracing::error!(%err, "mine_block: failed to persist chain");
        }
        if let Err(err) = self.save_open_transactions() {
            tracing::error!(%err, "mine_block: failed to persist open transactions");
        }

        if peers.is_empty() {
            info!(index = block.index, "mine_block: committed, no peers to broadcast to");
            return false;
        }

        let mut conflicts = 0usize;
        for peer in peers {
            if self.replicator.broadcast_block(peer, &block) == BroadcastOutcome::Conflict {
                conflicts += 1;
            }
        }
        let has_conflict = 2 * conflicts >= peers.len();
        info!(index = block.index, conflicts, has_conflict, "mine_block: committed");
        has_conflict
    }

    /// Applies an externally-broadcast block. See `add_block` caller
    /// policy in `SPEC_FULL.md` §4.6.5 for the NodeAPI-level index check
    /// layered on top of this.
    pub fn add_block(&mut self, block: Block) -> bool {
        let valid = if block.index == 1 {
            meets_difficulty(&hash_of(&block), self.difficulty)
        } else {
            match self.chain.last() {
                Some(prev) => block.previous_hash == hash_of(prev) && meets_difficulty(&hash_of(&block), self.difficulty),
                None => false,
            }
        };
        if !valid {
            warn!(index = block.index, "add_block: validation failed");
            return false;
        }

        let incoming = block.transactions.clone();
        self.chain.push(block);
        self.open_transactions.retain(|open_tx| !incoming.iter().any(|in_tx| open_tx.same_as(in_tx)));

        if let Err(err) = self.save_chain() {
            tracing::error!(%err, "add_block: failed to persist chain");
        }
        if let Err(err) = self.save_open_transactions() {
            tracing::error!(%err, "add_block: failed to persist open transactions");
        }
        info!(chain_len = self.chain.len(), "add_block: appended");
        true
    }

    /// For block 0: the proof-of-work predicate on its hash. For every
    /// later block: `previous_hash` equals the recomputed hash of its
    /// predecessor AND the predicate on its own hash.
    pub fn is_valid_chain(chain: &[Block], difficulty: usize) -> bool {
        for (i, block) in chain.iter().enumerate() {
            if !meets_difficulty(&hash_of(block), difficulty) {
                return false;
            }
            if i > 0 && block.previous_hash != hash_of(&chain[i - 1]) {
                return false;
            }
        }
        true
    }

    /// Adopts the strictly-longest valid chain seen across all peers (see
    /// `DESIGN.md` Open Question 4 for why this differs from the
    /// reference's replace-immediately walk).
    pub fn resolve(&mut self, peers: &[String]) -> bool {
        let mut best: Option<Vec<Block>> = None;
        for peer in peers {
            let Some(candidate) = self.replicator.fetch_chain(peer) else {
                continue;
            };
            let current_best_len = best.as_ref().map(Vec::len).unwrap_or(0);
            if candidate.len() > self.chain.len()
                && candidate.len() > current_best_len
                && Self::is_valid_chain(&candidate, self.difficulty)
            {
                best = Some(candidate);
            }
        }

        let Some(new_chain) = best else {
            return false;
        };
        self.chain = new_chain;
        self.open_transactions.clear();
        if let Err(err) = self.save_chain() {
            tracing::error!(%err, "resolve: failed to persist chain");
        }
        if let Err(err) = self.save_open_transactions() {
            tracing::error!(%err, "resolve: failed to persist open transactions");
        }
        info!(chain_len = self.chain.len(), "resolve: adopted a longer valid peer chain");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replicator::tests::RecordingReplicator;
    use crate::store::MemoryStore;
    use crate::user_directory::tests::MemoryUserDirectory;

    fn new_ledger(host: &str) -> Ledger<MemoryStore, MemoryUserDirectory, RecordingReplicator> {
        let store = Arc::new(MemoryStore::new());
        let user_dir = Arc::new(MemoryUserDirectory::new());
        let replicator = Arc::new(RecordingReplicator::new());
        Ledger::new(host, DEFAULT_DIFFICULTY, store, user_dir, replicator).unwrap()
    }

    fn signed_transfer(
        ledger: &mut Ledger<MemoryStore, MemoryUserDirectory, RecordingReplicator>,
        sender_key: &rsa::RsaPrivateKey,
        sender: &str,
        recipient: &str,
        amount: f64,
    ) -> bool {
        let sig = signer::sign(sender_key, sender, recipient, amount).unwrap();
        ledger.add_transaction(sender, recipient, amount, &sig, &[], false)
    }

    fn registered_keypair(user_dir: &MemoryUserDirectory, email: &str, node: &str) -> rsa::RsaPrivateKey {
        use rand::rngs::OsRng;
        use rsa::pkcs8::EncodePublicKey;
        let mut rng = OsRng;
        let private_key = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = rsa::RsaPublicKey::from(&private_key);
        let pem = public_key.to_public_key_pem(rsa::pkcs8::LineEnding::LF).unwrap();
        user_dir.register(email, node, &pem);
        private_key
    }

    #[test]
    fn s1_genesis_mine_produces_one_block_with_reward() {
        let mut ledger = new_ledger("alice@x");
        let conflict = ledger.mine_block(&[]);
        assert!(!conflict);
        assert_eq!(ledger.chain.len(), 1);
        let block = &ledger.chain[0];
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.transactions[0].sender, "Jiocoin");
        assert_eq!(block.transactions[0].recipient, "alice@x");
        assert_eq!(block.transactions[0].amount, 10.0);
        assert!(block.hash.starts_with("0000"));
        assert_eq!(ledger.balance_of("alice@x"), 10.0);
    }

    #[test]
    fn s2_valid_signed_transfer_reserves_sender_balance() {
        let user_dir = MemoryUserDirectory::new();
        let alice_key = registered_keypair(&user_dir, "alice@x", "http://127.0.0.1:5001");
        user_dir.register("bob@x", "http://127.0.0.1:5002", "");

        let mut ledger = Ledger::new(
            "alice@x",
            DEFAULT_DIFFICULTY,
            Arc::new(MemoryStore::new()),
            Arc::new(user_dir),
            Arc::new(RecordingReplicator::new()),
        )
        .unwrap();
        ledger.mine_block(&[]);

        let ok = signed_transfer(&mut ledger, &alice_key, "alice@x", "bob@x", 3.0);
        assert!(ok);
        assert_eq!(ledger.open_transactions.len(), 1);
        assert_eq!(ledger.balance_of("alice@x"), 7.0);
        assert_eq!(ledger.balance_of("bob@x"), 0.0);
    }

    #[test]
    fn s3_mine_commits_transfer_and_updates_balances() {
        let user_dir = MemoryUserDirectory::new();
        let alice_key = registered_keypair(&user_dir, "alice@x", "http://127.0.0.1:5001");
        user_dir.register("bob@x", "http://127.0.0.1:5002", "");

        let mut ledger = Ledger::new(
            "alice@x",
            DEFAULT_DIFFICULTY,
            Arc::new(MemoryStore::new()),
            Arc::new(user_dir),
            Arc::new(RecordingReplicator::new()),
        )
        .unwrap();
        ledger.mine_block(&[]);
        assert!(signed_transfer(&mut ledger, &alice_key, "alice@x", "bob@x", 3.0));

        ledger.mine_block(&[]);

        assert_eq!(ledger.chain.len(), 2);
        assert!(ledger.open_transactions.is_empty());
        assert_eq!(ledger.balance_of("alice@x"), 17.0);
        assert_eq!(ledger.balance_of("bob@x"), 3.0);
    }

    #[test]
    fn s4_tampering_with_a_committed_amount_invalidates_the_chain() {
        let mut ledger = new_ledger("alice@x");
        ledger.mine_block(&[]);
        ledger.mine_block(&[]);
        assert!(Ledger::<MemoryStore, MemoryUserDirectory, RecordingReplicator>::is_valid_chain(
            &ledger.chain,
            DEFAULT_DIFFICULTY
        ));

        ledger.chain[1].transactions[0].amount = 300.0;
        assert!(!Ledger::<MemoryStore, MemoryUserDirectory, RecordingReplicator>::is_valid_chain(
            &ledger.chain,
            DEFAULT_DIFFICULTY
        ));
    }

    #[test]
    fn s5_forged_signature_is_rejected_and_pool_unchanged() {
        let mut ledger = new_ledger("alice@x");
        ledger.mine_block(&[]);
        let ok = ledger.add_transaction("alice@x", "bob@x", 1.0, "deadbeef", &[], false);
        assert!(!ok);
        assert!(ledger.open_transactions.is_empty());
    }

    #[test]
    fn s6_resolve_adopts_the_longest_valid_peer_chain() {
        let mut node_a = new_ledger("alice@x");
        node_a.mine_block(&[]);
        node_a.mine_block(&[]);
        assert_eq!(node_a.chain.len(), 2);

        let mut node_b = new_ledger("bob@x");
        for _ in 0..4 {
            node_b.mine_block(&[]);
        }
        assert_eq!(node_b.chain.len(), 4);

        let replicator = RecordingReplicator::new();
        replicator.set_chain("http://node-b", node_b.chain.clone());
        let store = Arc::new(MemoryStore::new());
        let user_dir = Arc::new(MemoryUserDirectory::new());
        let mut resolvable = Ledger::new("alice@x", DEFAULT_DIFFICULTY, store, user_dir, Arc::new(replicator)).unwrap();
        resolvable.chain = node_a.chain.clone();

        let updated = resolvable.resolve(&["http://node-b".to_string()]);
        assert!(updated);
        assert_eq!(resolvable.chain.len(), 4);
        assert_eq!(resolvable.chain, node_b.chain);
        assert!(resolvable.open_transactions.is_empty());
    }

    #[test]
    fn resolve_ignores_shorter_or_invalid_candidates() {
        let mut ledger = new_ledger("alice@x");
        ledger.mine_block(&[]);
        ledger.mine_block(&[]);
        ledger.mine_block(&[]);

        let mut shorter_chain = ledger.chain[..1].to_vec();
        shorter_chain[0].hash = "not-a-real-hash".to_string();

        let replicator = RecordingReplicator::new();
        replicator.set_chain("http://short-peer", shorter_chain);
        let store = Arc::new(MemoryStore::new());
        let user_dir = Arc::new(MemoryUserDirectory::new());
        let mut copy = Ledger::new("alice@x", DEFAULT_DIFFICULTY, store, user_dir, Arc::new(replicator)).unwrap();
        copy.chain = ledger.chain.clone();

        let updated = copy.resolve(&["http://short-peer".to_string()]);
        assert!(!updated);
        assert_eq!(copy.chain.len(), 3);
    }

    #[test]
    fn add_block_rejects_index_one_block_that_fails_proof_of_work() {
        let mut ledger = new_ledger("alice@x");
        let unmined = Block::candidate(1, GENESIS_PREVIOUS_HASH.to_string(), now_timestamp(), vec![]);
        assert!(!ledger.add_block(unmined));
        assert!(ledger.chain.is_empty());
    }

    #[test]
    fn add_block_dedupes_matching_open_transactions() {
        let mut ledger = new_ledger("alice@x");
        ledger.mine_block(&[]);

        let tx = Transaction::new(1, "alice@x", "bob@x", 1.0, "sig");
        ledger.open_transactions.push(tx.clone());

        let mut candidate = Block::candidate(
            2,
            ledger.chain[0].hash.clone(),
            now_timestamp(),
            vec![tx.clone(), Transaction::reward(2, "alice@x", MINING_REWARD)],
        );
        loop {
            let hash = hash_of(&candidate);
            if meets_difficulty(&hash, DEFAULT_DIFFICULTY) {
                candidate.hash = hash;
                break;
            }
            candidate.nonce += 1;
        }

        assert!(ledger.add_block(candidate));
        assert!(ledger.open_transactions.is_empty());
    }

    #[test]
    fn mine_block_reports_conflict_when_quorum_of_peers_rejects() {
        let replicator = RecordingReplicator::new();
        replicator.set_block_outcome("http://peer-1", BroadcastOutcome::Conflict);
        replicator.set_block_outcome("http://peer-2", BroadcastOutcome::Conflict);
        let store = Arc::new(MemoryStore::new());
        let user_dir = Arc::new(MemoryUserDirectory::new());
        let mut conflicted = Ledger::new("alice@x", DEFAULT_DIFFICULTY, store, user_dir, Arc::new(replicator)).unwrap();

        let has_conflict = conflicted.mine_block(&["http://peer-1".to_string(), "http://peer-2".to_string()]);
        assert!(has_conflict);
        // Mining always succeeds locally even when a conflict is reported.
        assert_eq!(conflicted.chain.len(), 1);
    }

    #[test]
    fn balance_of_unaffected_identifier_is_unchanged_by_an_unrelated_mine() {
        let mut ledger = new_ledger("alice@x");
        ledger.mine_block(&[]);
        let before = ledger.balance_of("carol@x");
        ledger.mine_block(&[]);
        let after = ledger.balance_of("carol@x");
        assert_eq!(before, after);
        assert_eq!(before, 0.0);
    }
}
