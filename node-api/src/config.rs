//! NodeAPI configuration.
//!
//! Listen address and every ledger tuning parameter live in a single
//! [`ledger::LedgerConfig`]; this crate has nothing of its own to add.

pub use ledger::LedgerConfig as NodeConfig;
