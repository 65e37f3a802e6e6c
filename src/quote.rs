use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, U256};
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::ChainClient;
use crate::config::EngineConfig;
use crate::error::SwapError;
use crate::types::{FeeTier, Quote, Token};
use crate::units;

#[derive(Debug, Clone)]
struct QuoteInputs {
    token_in: Token,
    token_out: Token,
    amount_in: U256,
}

/// Produces estimated output amounts for a pair, cascading across fee tiers,
/// and keeps the live quote fresh through a debounced fetch plus a periodic
/// refresh that is suspended while a swap is in flight.
pub struct QuoteEngine<C> {
    client: Arc<C>,
    config: Arc<EngineConfig>,
    /// Bumped on every input change; a fetch only publishes if its
    /// generation is still current, so superseded results are discarded.
    generation: AtomicU64,
    /// Current inputs the periodic refresh re-quotes.
    inputs: Mutex<Option<QuoteInputs>>,
    refresh_busy: AtomicBool,
    in_flight: watch::Receiver<bool>,
    quote_tx: watch::Sender<Option<Quote>>,
}

impl<C: ChainClient> QuoteEngine<C> {
    pub fn new(
        client: Arc<C>,
        config: Arc<EngineConfig>,
        in_flight: watch::Receiver<bool>,
    ) -> Self {
        let (quote_tx, _) = watch::channel(None);
        Self {
            client,
            config,
            generation: AtomicU64::new(0),
            inputs: Mutex::new(None),
            refresh_busy: AtomicBool::new(false),
            in_flight,
            quote_tx,
        }
    }

    /// Live quote channel. `None` means "no active request".
    pub fn subscribe(&self) -> watch::Receiver<Option<Quote>> {
        self.quote_tx.subscribe()
    }

    pub fn current(&self) -> Option<Quote> {
        self.quote_tx.borrow().clone()
    }

    /// Debounced quote request. A newer call supersedes this one at any
    /// suspension point; superseded calls return `Ok(None)` without touching
    /// the live quote. Non-positive or unparseable amounts clear the quote
    /// and return `Ok(None)` (no request, not an error). While a swap is in
    /// flight the request is ignored outright, so the quote the swap was
    /// built from stays visible until it settles.
    pub async fn request_quote(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: &str,
    ) -> Result<Option<Quote>, SwapError> {
        if *self.in_flight.borrow() {
            debug!("swap in flight, ignoring quote request");
            return Ok(None);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let amount = match units::parse_positive(amount_in, token_in.decimals) {
            Some(a) if token_in.address != token_out.address => a,
            _ => {
                self.set_inputs(None);
                self.quote_tx.send_replace(None);
                return Ok(None);
            }
        };

        self.set_inputs(Some(QuoteInputs {
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            amount_in: amount,
        }));

        sleep(self.config.debounce()).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("quote request superseded during debounce");
            return Ok(None);
        }

        let result = self.fetch(token_in, token_out, amount).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("discarding stale quote result, inputs changed mid-fetch");
            return Ok(None);
        }

        match result {
            Ok(quote) => {
                self.quote_tx.send_replace(Some(quote.clone()));
                Ok(Some(quote))
            }
            Err(e) => {
                self.quote_tx.send_replace(None);
                Err(e)
            }
        }
    }

    /// Drop the live quote and cancel any pending debounced fetch.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.set_inputs(None);
        self.quote_tx.send_replace(None);
    }

    /// One periodic refresh tick. A no-op while a swap is in flight, and
    /// skipped outright if a previous tick is still fetching.
    pub async fn refresh_tick(&self) {
        if *self.in_flight.borrow() {
            debug!("swap in flight, suppressing quote refresh");
            return;
        }
        if self.refresh_busy.swap(true, Ordering::SeqCst) {
            debug!("previous refresh still outstanding, skipping tick");
            return;
        }

        let inputs = self.inputs.lock().ok().and_then(|g| g.clone());
        if let Some(inputs) = inputs {
            let generation = self.generation.load(Ordering::SeqCst);
            match self
                .fetch(&inputs.token_in, &inputs.token_out, inputs.amount_in)
                .await
            {
                Ok(quote) => {
                    if self.generation.load(Ordering::SeqCst) == generation {
                        self.quote_tx.send_replace(Some(quote));
                    }
                }
                Err(SwapError::NoLiquidity) => {
                    if self.generation.load(Ordering::SeqCst) == generation {
                        self.quote_tx.send_replace(None);
                    }
                }
                Err(e) => warn!("quote refresh failed: {e}"),
            }
        }

        self.refresh_busy.store(false, Ordering::SeqCst);
    }

    /// Background refresh loop; one fetch at a time, missed ticks skipped.
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<()>
    where
        C: 'static,
    {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(engine.config.quote_refresh_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                engine.refresh_tick().await;
            }
        })
    }

    /// Fee-tier cascade: try the default tier, fall back across the
    /// alternates in order, first answer wins. Remote errors and empty
    /// results both push the cascade onward; all tiers failing collapses
    /// into `NoLiquidity`.
    async fn fetch(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: U256,
    ) -> Result<Quote, SwapError> {
        let quoter_in = self.to_quoter_address(token_in);
        let quoter_out = self.to_quoter_address(token_out);

        for tier in FeeTier::CASCADE {
            match self
                .client
                .quote_exact_input_single(quoter_in, quoter_out, tier.as_bps(), amount_in)
                .await
            {
                Ok(amount_out) if amount_out > U256::ZERO => {
                    let quote = Quote {
                        token_in: token_in.clone(),
                        token_out: token_out.clone(),
                        amount_in,
                        amount_out,
                        fee_tier: tier,
                        price_impact_pct: estimate_price_impact(amount_in, token_in.decimals),
                        fetched_at: Utc::now(),
                    };
                    info!(
                        pair = %format!("{}/{}", token_in.symbol, token_out.symbol),
                        tier = tier.as_bps(),
                        "quote: {} -> {}",
                        units::format_units(amount_in, token_in.decimals),
                        quote.amount_out_display(),
                    );
                    return Ok(quote);
                }
                Ok(_) => debug!("empty quote at fee tier {}, falling back", tier.as_bps()),
                Err(e) => debug!("quote failed at fee tier {}: {e}", tier.as_bps()),
            }
        }

        Err(SwapError::NoLiquidity)
    }

    /// The quoter has no pools for the native sentinel; quote against the
    /// wrapped-native token instead.
    fn to_quoter_address(&self, token: &Token) -> Address {
        if token.is_native() {
            self.config.wrapped_native
        } else {
            token.address
        }
    }

    fn set_inputs(&self, inputs: Option<QuoteInputs>) {
        if let Ok(mut guard) = self.inputs.lock() {
            *guard = inputs;
        }
    }
}

/// Size-bracket price impact estimate.
///
/// This is an approximation driven by input size only; no order-book depth
/// is available client-side. The bracket thresholds and clamps are a
/// contract detail the UI's warning thresholds depend on (impact above 5%
/// warns), so they must not be "improved" in isolation. Each bracket states
/// both its floor and ceiling even where the linear term cannot reach the
/// ceiling (the sub-unit bracket tops out just below 0.10).
pub fn estimate_price_impact(amount_in: U256, decimals: u8) -> f64 {
    let scale = U256::from(10).pow(U256::from(decimals));
    let whole = (amount_in / scale).try_into().unwrap_or(u64::MAX);
    let frac_raw: u64 = (amount_in % scale)
        .try_into()
        .unwrap_or(0);
    let units = whole as f64 + frac_raw as f64 / 10f64.powi(decimals as i32);

    if units < 1.0 {
        (units * 0.10).clamp(0.05, 0.10)
    } else if units < 100.0 {
        (units * 0.01).clamp(0.10, 0.50)
    } else if units < 10_000.0 {
        (units * 0.0005).clamp(0.50, 2.00)
    } else {
        (units * 0.0001).clamp(2.00, 15.00)
    }
}
