pub mod broadcast_block;
pub mod broadcast_tnx;
pub mod chain;
