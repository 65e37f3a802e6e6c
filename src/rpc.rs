use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::eth::BlockNumberOrTag;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::client::{ChainClient, RouterCall, SwapEventLog, TxOutcome};
use crate::config::EngineConfig;
use crate::contracts::{IBaseSwapRouter, IERC20, IQuoter};
use crate::error::{classify_provider_error, SwapError};

/// Connect to the first healthy endpoint in the configured list. Each
/// candidate gets a bounded liveness probe before it is accepted.
pub async fn connect_provider(
    endpoints: &[String],
) -> Result<RootProvider<Http<Client>>, SwapError> {
    for (i, url) in endpoints.iter().enumerate() {
        match probe_endpoint(url).await {
            Ok(provider) => {
                debug!(endpoint = %url, "connected to RPC endpoint");
                return Ok(provider);
            }
            Err(e) => {
                warn!(endpoint = %url, "RPC endpoint unusable: {e}");
                if i + 1 < endpoints.len() {
                    sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
    Err(SwapError::Rpc("all RPC endpoints failed".into()))
}

async fn probe_endpoint(url: &str) -> Result<RootProvider<Http<Client>>, SwapError> {
    let parsed = url
        .parse()
        .map_err(|e| SwapError::Config(format!("invalid RPC url {url}: {e}")))?;
    let provider = ProviderBuilder::new().on_http(parsed);

    match tokio::time::timeout(Duration::from_secs(5), provider.get_block_number()).await {
        Ok(Ok(_)) => Ok(provider),
        Ok(Err(e)) => Err(SwapError::Rpc(format!("liveness probe failed: {e}"))),
        Err(_) => Err(SwapError::Transient(format!("liveness probe timed out for {url}"))),
    }
}

/// Alloy-backed [`ChainClient`]. Signing is the provider's concern: pass a
/// wallet-enabled provider for submission paths, a plain read provider is
/// enough for quotes, history and balances.
#[derive(Clone)]
pub struct RpcChainClient<P> {
    provider: P,
    router: Address,
    quoter: Address,
    receipt_poll: Duration,
    receipt_max_polls: u32,
}

impl<P> RpcChainClient<P> {
    pub fn new(provider: P, config: &EngineConfig) -> Self {
        Self {
            provider,
            router: config.router_address,
            quoter: config.quoter_address,
            receipt_poll: config.receipt_poll_interval(),
            receipt_max_polls: config.receipt_max_polls,
        }
    }
}

#[async_trait]
impl<P> ChainClient for RpcChainClient<P>
where
    P: Provider<Http<Client>> + Send + Sync + 'static,
{
    async fn quote_exact_input_single(
        &self,
        token_in: Address,
        token_out: Address,
        fee_bps: u32,
        amount_in: U256,
    ) -> Result<U256, SwapError> {
        let quoter = IQuoter::new(self.quoter, &self.provider);
        let result = quoter
            .quoteExactInputSingle(token_in, token_out, fee_bps, amount_in, U256::ZERO)
            .call()
            .await
            .map_err(|e| classify_provider_error(&e.to_string()))?;
        Ok(result.amountOut)
    }

    async fn router_quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<U256, SwapError> {
        let router = IBaseSwapRouter::new(self.router, &self.provider);
        let result = router
            .getQuoteV2(token_in, token_out, amount_in)
            .call()
            .await
            .map_err(|e| classify_provider_error(&e.to_string()))?;
        Ok(result._0)
    }

    async fn allowance(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
    ) -> Result<U256, SwapError> {
        let erc20 = IERC20::new(token, &self.provider);
        let result = erc20
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| classify_provider_error(&e.to_string()))?;
        Ok(result._0)
    }

    async fn approve(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<B256, SwapError> {
        let erc20 = IERC20::new(token, &self.provider);
        let call = erc20.approve(spender, amount).from(owner);
        let pending = call
            .send()
            .await
            .map_err(|e| classify_provider_error(&e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn submit_swap(&self, owner: Address, call: RouterCall) -> Result<B256, SwapError> {
        let router = IBaseSwapRouter::new(self.router, &self.provider);
        let hash = match call {
            RouterCall::NativeToToken {
                token_out,
                min_amount_out,
                version,
                value,
            } => {
                let call = router
                    .swapETHToToken(token_out, min_amount_out, version.as_u8())
                    .value(value)
                    .from(owner);
                let pending = call
                    .send()
                    .await
                    .map_err(|e| classify_provider_error(&e.to_string()))?;
                *pending.tx_hash()
            }
            RouterCall::TokenToNative {
                token_in,
                amount_in,
                min_amount_out,
                version,
            } => {
                let call = router
                    .swapTokenToETH(token_in, amount_in, min_amount_out, version.as_u8())
                    .from(owner);
                let pending = call
                    .send()
                    .await
                    .map_err(|e| classify_provider_error(&e.to_string()))?;
                *pending.tx_hash()
            }
            RouterCall::TokenToToken {
                token_in,
                token_out,
                amount_in,
                min_amount_out,
                version,
            } => {
                let call = router
                    .swapTokenToToken(token_in, token_out, amount_in, min_amount_out, version.as_u8())
                    .from(owner);
                let pending = call
                    .send()
                    .await
                    .map_err(|e| classify_provider_error(&e.to_string()))?;
                *pending.tx_hash()
            }
        };

        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxOutcome, SwapError> {
        for _ in 0..self.receipt_max_polls {
            match self.provider.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    return Ok(TxOutcome {
                        success: receipt.status(),
                        revert_reason: None,
                    });
                }
                Ok(None) => {}
                Err(e) => debug!("receipt poll failed for {hash}: {e}"),
            }
            sleep(self.receipt_poll).await;
        }
        Err(SwapError::Transient(format!(
            "timed out waiting for receipt of {hash}"
        )))
    }

    async fn balance_of(&self, owner: Address, token: Address) -> Result<U256, SwapError> {
        if token == Address::ZERO {
            return self
                .provider
                .get_balance(owner)
                .await
                .map_err(|e| classify_provider_error(&e.to_string()));
        }
        let erc20 = IERC20::new(token, &self.provider);
        let result = erc20
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| classify_provider_error(&e.to_string()))?;
        Ok(result._0)
    }

    async fn block_number(&self) -> Result<u64, SwapError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| classify_provider_error(&e.to_string()))
    }

    async fn swap_logs(
        &self,
        user: Address,
        from_block: u64,
    ) -> Result<Vec<SwapEventLog>, SwapError> {
        let router = IBaseSwapRouter::new(self.router, &self.provider);
        let events = router
            .Swap_filter()
            .topic1(user.into_word())
            .from_block(from_block)
            .to_block(BlockNumberOrTag::Latest)
            .query()
            .await
            .map_err(|e| classify_provider_error(&e.to_string()))?;

        Ok(events
            .into_iter()
            .map(|(ev, log)| SwapEventLog {
                tx_hash: log.transaction_hash.unwrap_or_default(),
                block_number: log.block_number.unwrap_or_default(),
                token_in: ev.tokenIn,
                token_out: ev.tokenOut,
                amount_in: ev.amountIn,
                amount_out: ev.amountOut,
                fee: ev.fee,
                router_version: ev.routerVersion,
            })
            .collect())
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64, SwapError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block), false)
            .await
            .map_err(|e| classify_provider_error(&e.to_string()))?
            .ok_or_else(|| SwapError::Transient(format!("block {block} not yet visible")))?;
        Ok(block.header.timestamp)
    }
}
