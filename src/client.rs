use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::error::SwapError;
use crate::types::RouterVersion;

/// The router call variant, selected structurally from which side of the
/// pair is the native asset. Native input rides along as transaction value.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterCall {
    NativeToToken {
        token_out: Address,
        min_amount_out: U256,
        version: RouterVersion,
        value: U256,
    },
    TokenToNative {
        token_in: Address,
        amount_in: U256,
        min_amount_out: U256,
        version: RouterVersion,
    },
    TokenToToken {
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        min_amount_out: U256,
        version: RouterVersion,
    },
}

/// Terminal receipt state for a broadcast transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TxOutcome {
    pub success: bool,
    pub revert_reason: Option<String>,
}

/// A decoded `Swap` event straight off the log, not yet resolved against
/// the token registry.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapEventLog {
    pub tx_hash: B256,
    pub block_number: u64,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee: U256,
    pub router_version: u8,
}

/// Remote read/call/submit/log primitives the engine is built on. The
/// production implementation is alloy-backed; tests substitute an in-memory
/// mock. Every method is a suspension point.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Simulated exact-input single-hop quote at one fee tier.
    async fn quote_exact_input_single(
        &self,
        token_in: Address,
        token_out: Address,
        fee_bps: u32,
        amount_in: U256,
    ) -> Result<U256, SwapError>;

    /// The router's own simplified quote path, independent of the quoter.
    async fn router_quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<U256, SwapError>;

    async fn allowance(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
    ) -> Result<U256, SwapError>;

    /// Submit an ERC-20 approve; resolves with the transaction hash once
    /// broadcast, not once mined.
    async fn approve(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<B256, SwapError>;

    /// Submit a swap; resolves with the hash once broadcast.
    async fn submit_swap(&self, owner: Address, call: RouterCall) -> Result<B256, SwapError>;

    /// Wait for the receipt of a broadcast transaction.
    async fn wait_for_receipt(&self, hash: B256) -> Result<TxOutcome, SwapError>;

    /// Native balance for `Address::ZERO`, ERC-20 balance otherwise.
    async fn balance_of(&self, owner: Address, token: Address) -> Result<U256, SwapError>;

    async fn block_number(&self) -> Result<u64, SwapError>;

    /// `Swap` events emitted for `user`, from `from_block` to the tip,
    /// oldest first.
    async fn swap_logs(
        &self,
        user: Address,
        from_block: u64,
    ) -> Result<Vec<SwapEventLog>, SwapError>;

    async fn block_timestamp(&self, block: u64) -> Result<u64, SwapError>;
}
