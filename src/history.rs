use std::sync::Arc;

use alloy::primitives::Address;
use chrono::DateTime;
use futures::future::try_join_all;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::client::ChainClient;
use crate::config::EngineConfig;
use crate::error::SwapError;
use crate::registry::TokenRegistry;
use crate::types::{HistoryEntry, RouterVersion};

/// Retrieves the user's past swaps from chain logs, bounded to a recent
/// block window so public read endpoints are not asked to scan the chain.
///
/// History is best-effort and non-critical: failures retry with exponential
/// backoff and then go quiet. `None` from [`fetch_history`] means "gave up";
/// the caller keeps whatever it was showing and clears its loading state.
///
/// [`fetch_history`]: HistoryFetcher::fetch_history
pub struct HistoryFetcher<C> {
    client: Arc<C>,
    registry: Arc<TokenRegistry>,
    config: Arc<EngineConfig>,
}

impl<C: ChainClient> HistoryFetcher<C> {
    pub fn new(client: Arc<C>, registry: Arc<TokenRegistry>, config: Arc<EngineConfig>) -> Self {
        Self {
            client,
            registry,
            config,
        }
    }

    /// Newest-first, capped at the configured entry count. Zero matching
    /// logs is a successful empty fetch, not a failure.
    pub async fn fetch_history(&self, owner: Address) -> Option<Vec<HistoryEntry>> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_once(owner).await {
                Ok(entries) => return Some(entries),
                Err(e) if attempt < self.config.history_max_retries => {
                    let backoff = self.config.history_backoff_base() * 2u32.pow(attempt);
                    warn!("history fetch failed ({e}), retrying in {backoff:?}");
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("history fetch gave up after {attempt} retries: {e}");
                    return None;
                }
            }
        }
    }

    async fn fetch_once(&self, owner: Address) -> Result<Vec<HistoryEntry>, SwapError> {
        let tip = self.client.block_number().await?;
        let from_block = tip.saturating_sub(self.config.history_block_window);

        let mut logs = self.client.swap_logs(owner, from_block).await?;
        debug!(count = logs.len(), from_block, "fetched swap logs");

        // Logs arrive oldest-first; keep the most recent N, newest first.
        let cap = self.config.history_max_entries;
        if logs.len() > cap {
            logs = logs.split_off(logs.len() - cap);
        }
        logs.reverse();

        // One extra read per entry for the block timestamp, issued together.
        let timestamps = try_join_all(
            logs.iter()
                .map(|log| self.client.block_timestamp(log.block_number)),
        )
        .await?;

        Ok(logs
            .into_iter()
            .zip(timestamps)
            .map(|(log, timestamp)| HistoryEntry {
                hash: log.tx_hash,
                block_number: log.block_number,
                timestamp: DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_default(),
                token_in: self.registry.resolve(log.token_in),
                token_out: self.registry.resolve(log.token_out),
                amount_in: log.amount_in,
                amount_out: log.amount_out,
                fee_paid: log.fee,
                router_version: RouterVersion::from_u8(log.router_version),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SwapEventLog;
    use crate::testutil::{test_config, MockChain};
    use alloy::primitives::{B256, U256};
    use tokio::time::Instant;

    fn fetcher(mock: Arc<MockChain>) -> HistoryFetcher<MockChain> {
        HistoryFetcher::new(
            mock,
            Arc::new(TokenRegistry::base_mainnet()),
            Arc::new(test_config()),
        )
    }

    fn log_at(block: u64, token_in: Address, token_out: Address) -> SwapEventLog {
        SwapEventLog {
            tx_hash: B256::repeat_byte(block as u8),
            block_number: block,
            token_in,
            token_out,
            amount_in: U256::from(1_000_000u64),
            amount_out: U256::from(500u64),
            fee: U256::from(15u64),
            router_version: 2,
        }
    }

    #[tokio::test]
    async fn empty_window_is_success_without_retry() {
        let mock = Arc::new(MockChain::new());
        let entries = fetcher(mock.clone())
            .fetch_history(Address::repeat_byte(1))
            .await
            .unwrap();
        assert!(entries.is_empty());
        assert_eq!(mock.log_queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_2_4_8_then_gives_up() {
        let mock = Arc::new(MockChain::new());
        mock.fail_log_queries(u32::MAX);
        let fetcher = fetcher(mock.clone());

        let start = Instant::now();
        let result = fetcher.fetch_history(Address::repeat_byte(1)).await;

        assert!(result.is_none());
        // 1 initial attempt + 3 retries, no 4th
        assert_eq!(mock.log_queries(), 4);
        assert_eq!(start.elapsed().as_secs(), 2 + 4 + 8);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_recovers_within_retry_budget() {
        let mock = Arc::new(MockChain::new());
        mock.fail_log_queries(2);
        mock.push_log(log_at(100, Address::ZERO, usdc_addr()));
        let entries = fetcher(mock.clone())
            .fetch_history(Address::repeat_byte(1))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(mock.log_queries(), 3);
    }

    fn usdc_addr() -> Address {
        "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
            .parse()
            .unwrap()
    }

    #[tokio::test]
    async fn newest_first_and_capped_at_max_entries() {
        let mock = Arc::new(MockChain::new());
        for block in 1..=25u64 {
            mock.push_log(log_at(block, Address::ZERO, usdc_addr()));
        }
        let entries = fetcher(mock.clone())
            .fetch_history(Address::repeat_byte(1))
            .await
            .unwrap();

        assert_eq!(entries.len(), 20);
        assert_eq!(entries.first().unwrap().block_number, 25);
        assert_eq!(entries.last().unwrap().block_number, 6);
    }

    #[tokio::test]
    async fn window_is_bounded_to_recent_blocks() {
        let mock = Arc::new(MockChain::new());
        mock.set_tip(50_000);
        fetcher(mock.clone())
            .fetch_history(Address::repeat_byte(1))
            .await
            .unwrap();
        assert_eq!(mock.last_from_block(), Some(40_000));
    }

    #[tokio::test]
    async fn unknown_token_renders_with_synthetic_fallback() {
        let mock = Arc::new(MockChain::new());
        let mystery = Address::repeat_byte(0xee);
        mock.push_log(log_at(7, mystery, usdc_addr()));

        let entries = fetcher(mock.clone())
            .fetch_history(Address::repeat_byte(1))
            .await
            .unwrap();
        let entry = &entries[0];
        assert_eq!(entry.token_in.symbol, "???");
        assert_eq!(entry.token_out.symbol, "USDC");
        assert_eq!(entry.router_version, RouterVersion::V2);
    }

    #[tokio::test]
    async fn entries_carry_block_timestamps() {
        let mock = Arc::new(MockChain::new());
        mock.push_log(log_at(42, Address::ZERO, usdc_addr()));
        mock.set_block_timestamp(42, 1_700_000_000);

        let entries = fetcher(mock.clone())
            .fetch_history(Address::repeat_byte(1))
            .await
            .unwrap();
        assert_eq!(entries[0].timestamp.timestamp(), 1_700_000_000);
    }
}
