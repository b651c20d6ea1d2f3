//! Projects Gro protocol event logs into users, transactions and per-user
//! totals.
//!
//! Each log flows through [`decoder`] → [`classifier`] → (optionally)
//! [`correlator`] → [`writer`], driven one log at a time by [`pipeline`].

pub mod abi;
pub mod amount;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod correlator;
pub mod db;
pub mod decoder;
pub mod error;
pub mod indexer;
pub mod models;
pub mod pipeline;
pub mod rpc;
pub mod store;
pub mod writer;
