use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::client::ChainClient;
use crate::config::EngineConfig;
use crate::error::SwapError;
use crate::types::Token;

/// A resolved approval: the transaction that granted it and the allowance
/// value actually observed on-chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalTicket {
    pub tx_hash: B256,
    pub observed_allowance: U256,
}

/// Tracks and drives the spending allowance for the input token against the
/// router. Allowance is always read fresh; it is stale the moment any
/// approval or swap lands.
pub struct ApprovalGate<C> {
    client: Arc<C>,
    config: Arc<EngineConfig>,
}

impl<C: ChainClient> ApprovalGate<C> {
    pub fn new(client: Arc<C>, config: Arc<EngineConfig>) -> Self {
        Self { client, config }
    }

    /// False for the native asset (no allowance concept applies); otherwise
    /// true whenever the on-chain allowance is below the requested amount.
    pub async fn needs_approval(
        &self,
        owner: Address,
        token: &Token,
        amount: U256,
    ) -> Result<bool, SwapError> {
        if token.is_native() {
            return Ok(false);
        }
        let current = self
            .client
            .allowance(owner, token.address, self.config.router_address)
            .await?;
        Ok(current < amount)
    }

    /// Submit an approval and wait for the read path to observe it.
    ///
    /// The ticket resolves on observed on-chain state catching up, not on
    /// transaction confirmation, which tolerates lag between broadcast and
    /// read-node visibility. Submission failure fails immediately without
    /// entering the poll loop. The poll is bounded: after
    /// `approval_max_polls` reads without the allowance catching up the
    /// ticket fails with `ApprovalTimeout` rather than spinning forever on
    /// a stuck indexer.
    pub async fn approve(
        &self,
        owner: Address,
        token: &Token,
        amount: U256,
    ) -> Result<ApprovalTicket, SwapError> {
        if token.is_native() {
            return Err(SwapError::InvalidInput(
                "native asset does not require approval".into(),
            ));
        }

        let spender = self.config.router_address;
        let tx_hash = self
            .client
            .approve(owner, token.address, spender, amount)
            .await?;
        info!(token = %token.symbol, %tx_hash, "approval submitted, polling allowance");

        for attempt in 0..self.config.approval_max_polls {
            sleep(self.config.approval_poll_interval()).await;
            // Read errors mid-poll are tolerated; only the deadline ends it.
            match self.client.allowance(owner, token.address, spender).await {
                Ok(observed) if observed >= amount => {
                    info!(token = %token.symbol, "allowance visible on-chain");
                    return Ok(ApprovalTicket {
                        tx_hash,
                        observed_allowance: observed,
                    });
                }
                Ok(_) => {}
                Err(e) => debug!("allowance poll {attempt} failed: {e}"),
            }
        }

        Err(SwapError::ApprovalTimeout)
    }
}
