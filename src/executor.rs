use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{error, info, warn};

use crate::client::{ChainClient, RouterCall};
use crate::config::EngineConfig;
use crate::error::SwapError;
use crate::types::{SwapRequest, SwapStatus, SwapTransaction};

/// Drives one swap through `Submitting -> Pending -> {Confirmed | Failed}`.
///
/// The executor is the only writer of the swap-in-flight flag: it is raised
/// for the whole submission/confirmation span so the quote refresh stands
/// down, and cleared on terminal resolution, at which point the history
/// fetcher is signalled.
pub struct SwapExecutor<C> {
    client: Arc<C>,
    config: Arc<EngineConfig>,
    in_flight: watch::Sender<bool>,
    history_tx: mpsc::UnboundedSender<()>,
    /// Most recent transaction: `Pending` from broadcast until the receipt
    /// lands, then the terminal record.
    active: watch::Sender<Option<SwapTransaction>>,
    /// Serializes executions; at most one non-terminal swap exists.
    serial: Mutex<()>,
}

impl<C: ChainClient> SwapExecutor<C> {
    pub fn new(
        client: Arc<C>,
        config: Arc<EngineConfig>,
        in_flight: watch::Sender<bool>,
        history_tx: mpsc::UnboundedSender<()>,
    ) -> Self {
        let (active, _) = watch::channel(None);
        Self {
            client,
            config,
            in_flight,
            history_tx,
            active,
            serial: Mutex::new(()),
        }
    }

    /// Observe the current transaction through its lifecycle. `None` until
    /// the first broadcast.
    pub fn subscribe_active(&self) -> watch::Receiver<Option<SwapTransaction>> {
        self.active.subscribe()
    }

    /// Minimum acceptable output for a request.
    ///
    /// Order matters: the protocol fee comes off the quoted amount first,
    /// then slippage (user tolerance plus the fixed execution buffer) is
    /// applied to the net amount. Applying slippage to the raw quote would
    /// make the transaction revert far more often than the configured
    /// tolerance suggests. Integer division floors at every step, which is
    /// the required round-down at output precision.
    pub fn min_amount_out(
        quote_amount_out: U256,
        fee_bps: u32,
        slippage_bps: u32,
        buffer_bps: u32,
    ) -> U256 {
        let bps = U256::from(10_000u64);
        let net = quote_amount_out * (bps - U256::from(fee_bps)) / bps;
        let total_slippage = (slippage_bps + buffer_bps).min(10_000);
        net * (bps - U256::from(total_slippage)) / bps
    }

    /// Structural call-variant selection: which entry point depends only on
    /// which side of the pair is native. The version preference is forwarded
    /// verbatim; this component never decides routing.
    fn router_call(request: &SwapRequest, min_amount_out: U256) -> RouterCall {
        if request.token_in.is_native() {
            RouterCall::NativeToToken {
                token_out: request.token_out.address,
                min_amount_out,
                version: request.version,
                value: request.amount_in,
            }
        } else if request.token_out.is_native() {
            RouterCall::TokenToNative {
                token_in: request.token_in.address,
                amount_in: request.amount_in,
                min_amount_out,
                version: request.version,
            }
        } else {
            RouterCall::TokenToToken {
                token_in: request.token_in.address,
                token_out: request.token_out.address,
                amount_in: request.amount_in,
                min_amount_out,
                version: request.version,
            }
        }
    }

    /// Submit the swap and track it to a terminal outcome. Every terminal
    /// outcome is surfaced; a user-initiated action never disappears.
    pub async fn execute(&self, owner: Address, request: SwapRequest) -> SwapTransaction {
        let _guard = self.serial.lock().await;

        let min_out = Self::min_amount_out(
            request.quote.amount_out,
            self.config.protocol_fee_bps,
            request.slippage_bps,
            self.config.execution_buffer_bps,
        );
        let call = Self::router_call(&request, min_out);

        info!(
            pair = %format!("{}/{}", request.token_in.symbol, request.token_out.symbol),
            slippage_bps = request.slippage_bps,
            min_out = %min_out,
            "submitting swap"
        );
        self.in_flight.send_replace(true);

        let tx = match self.client.submit_swap(owner, call).await {
            Ok(hash) => {
                info!(%hash, "swap broadcast, awaiting receipt");
                self.active.send_replace(Some(SwapTransaction {
                    hash: Some(hash),
                    status: SwapStatus::Pending,
                    request: request.clone(),
                }));
                match self.client.wait_for_receipt(hash).await {
                    Ok(outcome) if outcome.success => {
                        info!(%hash, "swap confirmed");
                        SwapTransaction {
                            hash: Some(hash),
                            status: SwapStatus::Confirmed,
                            request,
                        }
                    }
                    Ok(outcome) => {
                        let reason = outcome
                            .revert_reason
                            .map(|r| crate::error::classify_provider_error(&r))
                            .unwrap_or_else(|| {
                                SwapError::ContractReverted("reverted without a reason".into())
                            });
                        warn!(%hash, "swap reverted: {reason}");
                        SwapTransaction {
                            hash: Some(hash),
                            status: SwapStatus::Failed(reason),
                            request,
                        }
                    }
                    Err(e) => {
                        warn!(%hash, "receipt tracking failed: {e}");
                        SwapTransaction {
                            hash: Some(hash),
                            status: SwapStatus::Failed(e),
                            request,
                        }
                    }
                }
            }
            Err(e) => {
                error!("swap submission failed: {e}");
                SwapTransaction {
                    hash: None,
                    status: SwapStatus::Failed(e),
                    request,
                }
            }
        };

        // Terminal: publish the final record, clear the flag, nudge history.
        self.active.send_replace(Some(tx.clone()));
        self.in_flight.send_replace(false);
        let _ = self.history_tx.send(());
        tx
    }
}
