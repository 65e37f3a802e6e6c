use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, U256};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;

use crate::approval::ApprovalGate;
use crate::client::ChainClient;
use crate::config::EngineConfig;
use crate::error::SwapError;
use crate::executor::SwapExecutor;
use crate::history::HistoryFetcher;
use crate::quote::QuoteEngine;
use crate::registry::TokenRegistry;
use crate::types::{HistoryEntry, Quote, RouterVersion, SwapRequest, SwapTransaction, Token};

/// User-editable inputs of a session. The raw amount string is kept as typed;
/// parsing happens at quote time.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: String,
    pub slippage_bps: u32,
    pub version: RouterVersion,
}

/// Wires the quote engine, approval gate, executor and history fetcher into
/// one interactive session over a single wallet.
///
/// Channel topology: the executor owns the swap-in-flight flag (watch) which
/// the quote engine and this session only read; terminal swap resolutions
/// signal the history loop over an mpsc channel; the live quote and the
/// latest history batch are each published on their own watch channel.
pub struct SwapSession<C> {
    client: Arc<C>,
    config: Arc<EngineConfig>,
    quotes: Arc<QuoteEngine<C>>,
    gate: ApprovalGate<C>,
    executor: SwapExecutor<C>,
    history: Arc<HistoryFetcher<C>>,
    state: Mutex<SessionState>,
    in_flight: watch::Receiver<bool>,
    history_signal: Mutex<Option<mpsc::UnboundedReceiver<()>>>,
    history_out: watch::Sender<Vec<HistoryEntry>>,
}

impl<C: ChainClient + 'static> SwapSession<C> {
    pub fn new(client: Arc<C>, config: Arc<EngineConfig>, registry: Arc<TokenRegistry>) -> Self {
        let (flag_tx, flag_rx) = watch::channel(false);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (history_out, _) = watch::channel(Vec::new());

        // Default pair mirrors the deployed UI: native in, USDC out. A
        // custom registry without either degrades to the unknown sentinel.
        let token_in = registry
            .by_symbol("ETH")
            .cloned()
            .unwrap_or_else(|| Token::unknown(Address::ZERO));
        let token_out = registry
            .by_symbol("USDC")
            .cloned()
            .unwrap_or_else(|| Token::unknown(Address::repeat_byte(0xff)));

        Self {
            quotes: Arc::new(QuoteEngine::new(
                Arc::clone(&client),
                Arc::clone(&config),
                flag_rx.clone(),
            )),
            gate: ApprovalGate::new(Arc::clone(&client), Arc::clone(&config)),
            executor: SwapExecutor::new(
                Arc::clone(&client),
                Arc::clone(&config),
                flag_tx,
                signal_tx,
            ),
            history: Arc::new(HistoryFetcher::new(
                Arc::clone(&client),
                registry,
                Arc::clone(&config),
            )),
            state: Mutex::new(SessionState {
                token_in,
                token_out,
                amount_in: String::new(),
                slippage_bps: 50,
                version: RouterVersion::Auto,
            }),
            in_flight: flag_rx,
            history_signal: Mutex::new(Some(signal_rx)),
            history_out,
            client,
            config,
        }
    }

    pub fn state(&self) -> SessionState {
        self.snapshot()
    }

    /// Live quote channel; `None` while there is no active request.
    pub fn subscribe_quote(&self) -> watch::Receiver<Option<Quote>> {
        self.quotes.subscribe()
    }

    pub fn current_quote(&self) -> Option<Quote> {
        self.quotes.current()
    }

    /// Latest fetched history batch, newest first.
    pub fn subscribe_history(&self) -> watch::Receiver<Vec<HistoryEntry>> {
        self.history_out.subscribe()
    }

    /// The current transaction as it moves through `Pending` to a terminal
    /// state; `None` until the first broadcast.
    pub fn subscribe_transaction(&self) -> watch::Receiver<Option<SwapTransaction>> {
        self.executor.subscribe_active()
    }

    /// Update the input amount and drive a (debounced) re-quote. Edits made
    /// while a swap is in flight leave the executed quote untouched.
    pub async fn set_input(&self, amount: &str) -> Result<Option<Quote>, SwapError> {
        let (token_in, token_out) = {
            let mut state = self.lock_state();
            state.amount_in = amount.to_string();
            (state.token_in.clone(), state.token_out.clone())
        };
        self.quotes.request_quote(&token_in, &token_out, amount).await
    }

    /// Replace the pair and re-quote the current amount.
    pub async fn set_pair(
        &self,
        token_in: Token,
        token_out: Token,
    ) -> Result<Option<Quote>, SwapError> {
        let amount = {
            let mut state = self.lock_state();
            state.token_in = token_in.clone();
            state.token_out = token_out.clone();
            state.amount_in.clone()
        };
        self.quotes.request_quote(&token_in, &token_out, &amount).await
    }

    /// Flip input and output in place, keeping the typed amount.
    pub async fn switch_tokens(&self) -> Result<Option<Quote>, SwapError> {
        let (token_in, token_out, amount) = {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            std::mem::swap(&mut state.token_in, &mut state.token_out);
            (
                state.token_in.clone(),
                state.token_out.clone(),
                state.amount_in.clone(),
            )
        };
        self.quotes.request_quote(&token_in, &token_out, &amount).await
    }

    pub fn set_slippage(&self, bps: u32) {
        self.lock_state().slippage_bps = bps;
    }

    pub fn set_version(&self, version: RouterVersion) {
        self.lock_state().version = version;
    }

    /// Execute the live quote: approval gate first when the input token
    /// needs it, then submission. Rejected outright while another swap is
    /// in flight. The amount and live quote are reset on terminal
    /// resolution, so a stale quote cannot be re-executed.
    pub async fn swap(&self, owner: Address) -> Result<SwapTransaction, SwapError> {
        if *self.in_flight.borrow() {
            return Err(SwapError::SwapInFlight);
        }

        let quote = self
            .quotes
            .current()
            .ok_or_else(|| SwapError::InvalidInput("no live quote to execute".into()))?;
        let (slippage_bps, version) = {
            let state = self.lock_state();
            (state.slippage_bps, state.version)
        };
        let request = SwapRequest {
            token_in: quote.token_in.clone(),
            token_out: quote.token_out.clone(),
            amount_in: quote.amount_in,
            quote,
            slippage_bps,
            version,
        };

        if self
            .gate
            .needs_approval(owner, &request.token_in, request.amount_in)
            .await?
        {
            self.gate
                .approve(owner, &request.token_in, request.amount_in)
                .await?;
        }

        let tx = self.executor.execute(owner, request).await;

        self.lock_state().amount_in.clear();
        self.quotes.clear();
        Ok(tx)
    }

    /// Native balance for the zero address, ERC-20 balance otherwise.
    pub async fn balance_of(&self, owner: Address, token: &Token) -> Result<U256, SwapError> {
        self.client.balance_of(owner, token.address).await
    }

    /// Start the background loops: periodic quote refresh, and the history
    /// loop which re-fetches on every terminal swap and on a slow timer.
    /// History polling is deliberately not suppressed by the in-flight flag.
    pub fn spawn_background(self: &Arc<Self>, owner: Address) -> Vec<JoinHandle<()>> {
        let mut handles = vec![self.quotes.spawn_refresh()];

        let signal = self.history_signal.lock().ok().and_then(|mut g| g.take());
        match signal {
            Some(mut signal) => {
                let session = Arc::clone(self);
                handles.push(tokio::spawn(async move {
                    let mut ticker = interval(session.config.history_poll_interval());
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    loop {
                        tokio::select! {
                            _ = ticker.tick() => {}
                            received = signal.recv() => {
                                if received.is_none() {
                                    break;
                                }
                            }
                        }
                        if let Some(entries) = session.history.fetch_history(owner).await {
                            session.history_out.send_replace(entries);
                        }
                    }
                }));
            }
            None => warn!("background loops already running"),
        }

        handles
    }

    fn snapshot(&self) -> SessionState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
