//! In-memory [`ChainClient`] for unit tests, plus shared test fixtures.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::client::{ChainClient, RouterCall, SwapEventLog, TxOutcome};
use crate::config::EngineConfig;
use crate::error::SwapError;
use crate::registry::TokenRegistry;
use crate::types::Token;

pub fn test_config() -> EngineConfig {
    EngineConfig {
        rpc_endpoints: vec![],
        ..EngineConfig::default()
    }
}

/// Named tokens from the mainnet registry, cloned for test requests.
pub mod tokens {
    use super::*;

    fn named(symbol: &str) -> Token {
        TokenRegistry::base_mainnet()
            .by_symbol(symbol)
            .cloned()
            .unwrap()
    }

    pub fn eth() -> Token {
        named("ETH")
    }

    pub fn usdc() -> Token {
        named("USDC")
    }

    pub fn talent() -> Token {
        named("TALENT")
    }
}

/// Scriptable chain stand-in. Every remote interaction is recorded so tests
/// can assert on call counts and arguments, and every outcome can be
/// pre-programmed per call site.
#[derive(Default)]
pub struct MockChain {
    // quoting
    tier_quotes: Mutex<HashMap<u32, Result<U256, SwapError>>>,
    tiers_attempted: Mutex<Vec<u32>>,
    last_quote_pair: Mutex<Option<(Address, Address)>>,
    router_quote: Mutex<U256>,

    // allowances and approvals
    allowance_schedule: Mutex<VecDeque<U256>>,
    allowance_reads: AtomicU32,
    approve_error: Mutex<Option<SwapError>>,

    // submission and receipts
    submit_error: Mutex<Option<SwapError>>,
    receipt: Mutex<Option<TxOutcome>>,
    receipt_delay: Mutex<Duration>,
    last_submitted: Mutex<Option<RouterCall>>,

    // balances
    balances: Mutex<HashMap<(Address, Address), U256>>,

    // logs and blocks
    logs: Mutex<Vec<SwapEventLog>>,
    log_failures_left: Mutex<u32>,
    log_queries: AtomicU32,
    last_from_block: Mutex<Option<u64>>,
    tip: AtomicU64,
    block_timestamps: Mutex<HashMap<u64, u64>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<'a, T>(m: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        m.lock().unwrap()
    }

    pub fn set_tier_quote(&self, fee_bps: u32, amount_out: U256) {
        Self::lock(&self.tier_quotes).insert(fee_bps, Ok(amount_out));
    }

    /// Make a fee tier answer with an error, as a missing pool does.
    pub fn fail_tier(&self, fee_bps: u32) {
        Self::lock(&self.tier_quotes)
            .insert(fee_bps, Err(SwapError::ContractReverted("no pool".into())));
    }

    pub fn quote_tiers_attempted(&self) -> Vec<u32> {
        Self::lock(&self.tiers_attempted).clone()
    }

    pub fn last_quote_pair(&self) -> Option<(Address, Address)> {
        *Self::lock(&self.last_quote_pair)
    }

    pub fn set_router_quote(&self, amount_out: U256) {
        *Self::lock(&self.router_quote) = amount_out;
    }

    /// Values returned by successive allowance reads; the last one sticks.
    pub fn set_allowance_schedule(&self, schedule: Vec<U256>) {
        *Self::lock(&self.allowance_schedule) = schedule.into();
        self.allowance_reads.store(0, Ordering::SeqCst);
    }

    pub fn allowance_reads(&self) -> u32 {
        self.allowance_reads.load(Ordering::SeqCst)
    }

    pub fn set_approve_error(&self, error: SwapError) {
        *Self::lock(&self.approve_error) = Some(error);
    }

    pub fn set_submit_error(&self, error: SwapError) {
        *Self::lock(&self.submit_error) = Some(error);
    }

    pub fn set_receipt(&self, outcome: TxOutcome) {
        *Self::lock(&self.receipt) = Some(outcome);
    }

    pub fn set_receipt_delay(&self, delay: Duration) {
        *Self::lock(&self.receipt_delay) = delay;
    }

    pub fn last_submitted(&self) -> Option<RouterCall> {
        Self::lock(&self.last_submitted).clone()
    }

    pub fn set_balance(&self, owner: Address, token: Address, balance: U256) {
        Self::lock(&self.balances).insert((owner, token), balance);
    }

    pub fn push_log(&self, log: SwapEventLog) {
        Self::lock(&self.logs).push(log);
    }

    /// Fail the next `n` log queries with a transient error.
    pub fn fail_log_queries(&self, n: u32) {
        *Self::lock(&self.log_failures_left) = n;
    }

    pub fn log_queries(&self) -> u32 {
        self.log_queries.load(Ordering::SeqCst)
    }

    pub fn last_from_block(&self) -> Option<u64> {
        *Self::lock(&self.last_from_block)
    }

    pub fn set_tip(&self, block: u64) {
        self.tip.store(block, Ordering::SeqCst);
    }

    pub fn set_block_timestamp(&self, block: u64, timestamp: u64) {
        Self::lock(&self.block_timestamps).insert(block, timestamp);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn quote_exact_input_single(
        &self,
        token_in: Address,
        token_out: Address,
        fee_bps: u32,
        _amount_in: U256,
    ) -> Result<U256, SwapError> {
        Self::lock(&self.tiers_attempted).push(fee_bps);
        *Self::lock(&self.last_quote_pair) = Some((token_in, token_out));
        match Self::lock(&self.tier_quotes).get(&fee_bps) {
            Some(result) => result.clone(),
            // unconfigured tier behaves like an empty pool
            None => Ok(U256::ZERO),
        }
    }

    async fn router_quote(
        &self,
        _token_in: Address,
        _token_out: Address,
        _amount_in: U256,
    ) -> Result<U256, SwapError> {
        Ok(*Self::lock(&self.router_quote))
    }

    async fn allowance(
        &self,
        _owner: Address,
        _token: Address,
        _spender: Address,
    ) -> Result<U256, SwapError> {
        self.allowance_reads.fetch_add(1, Ordering::SeqCst);
        let mut schedule = Self::lock(&self.allowance_schedule);
        match schedule.len() {
            0 => Ok(U256::ZERO),
            1 => Ok(schedule[0]),
            _ => Ok(schedule.pop_front().unwrap()),
        }
    }

    async fn approve(
        &self,
        _owner: Address,
        _token: Address,
        _spender: Address,
        _amount: U256,
    ) -> Result<B256, SwapError> {
        if let Some(e) = Self::lock(&self.approve_error).clone() {
            return Err(e);
        }
        Ok(B256::repeat_byte(0xaa))
    }

    async fn submit_swap(&self, _owner: Address, call: RouterCall) -> Result<B256, SwapError> {
        if let Some(e) = Self::lock(&self.submit_error).clone() {
            return Err(e);
        }
        *Self::lock(&self.last_submitted) = Some(call);
        Ok(B256::repeat_byte(0x5a))
    }

    async fn wait_for_receipt(&self, _hash: B256) -> Result<TxOutcome, SwapError> {
        let delay = *Self::lock(&self.receipt_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(Self::lock(&self.receipt).clone().unwrap_or(TxOutcome {
            success: true,
            revert_reason: None,
        }))
    }

    async fn balance_of(&self, owner: Address, token: Address) -> Result<U256, SwapError> {
        Ok(Self::lock(&self.balances)
            .get(&(owner, token))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn block_number(&self) -> Result<u64, SwapError> {
        Ok(self.tip.load(Ordering::SeqCst))
    }

    async fn swap_logs(
        &self,
        _user: Address,
        from_block: u64,
    ) -> Result<Vec<SwapEventLog>, SwapError> {
        self.log_queries.fetch_add(1, Ordering::SeqCst);
        *Self::lock(&self.last_from_block) = Some(from_block);

        let mut failures = Self::lock(&self.log_failures_left);
        if *failures > 0 {
            *failures = failures.saturating_sub(1);
            return Err(SwapError::Transient("log backend unavailable".into()));
        }

        Ok(Self::lock(&self.logs)
            .iter()
            .filter(|l| l.block_number >= from_block)
            .cloned()
            .collect())
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64, SwapError> {
        Ok(Self::lock(&self.block_timestamps)
            .get(&block)
            .copied()
            .unwrap_or_default())
    }
}
