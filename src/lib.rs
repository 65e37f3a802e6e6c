pub mod approval;
pub mod client;
pub mod config;
pub mod contracts;
pub mod error;
pub mod executor;
pub mod history;
pub mod quote;
pub mod registry;
pub mod rpc;
pub mod session;
pub mod types;
pub mod units;

#[cfg(test)]
pub(crate) mod testutil;

pub use approval::{ApprovalGate, ApprovalTicket};
pub use client::{ChainClient, RouterCall, SwapEventLog, TxOutcome};
pub use config::EngineConfig;
pub use error::SwapError;
pub use executor::SwapExecutor;
pub use history::HistoryFetcher;
pub use quote::QuoteEngine;
pub use registry::TokenRegistry;
pub use rpc::{connect_provider, RpcChainClient};
pub use session::{SessionState, SwapSession};
pub use types::{
    FeeTier, HistoryEntry, Quote, RouterVersion, SwapRequest, SwapStatus, SwapTransaction, Token,
};
