use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use baseswap_engine::{
    connect_provider, ChainClient, EngineConfig, HistoryFetcher, QuoteEngine, RpcChainClient,
    Token, TokenRegistry,
};

#[derive(Parser)]
#[command(name = "baseswap-engine", about = "Quote and inspect swaps against the BaseSwap router")]
struct Cli {
    /// JSON config file; defaults target Base mainnet.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One-shot quote for a pair, e.g. `quote ETH USDC 0.5`.
    Quote {
        token_in: String,
        token_out: String,
        amount: String,
    },
    /// Recent swaps of a wallet, newest first.
    History { owner: Address },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).context("loading config file")?,
        None => EngineConfig::default(),
    };
    let config = Arc::new(config);
    let registry = Arc::new(TokenRegistry::base_mainnet());

    let provider = connect_provider(&config.rpc_endpoints).await?;
    let client = Arc::new(RpcChainClient::new(provider, &config));

    match cli.command {
        Command::Quote {
            token_in,
            token_out,
            amount,
        } => {
            let token_in = registry
                .by_symbol(&token_in)
                .with_context(|| format!("unknown token symbol {token_in}"))?;
            let token_out = registry
                .by_symbol(&token_out)
                .with_context(|| format!("unknown token symbol {token_out}"))?;

            let (_flag_tx, flag_rx) = watch::channel(false);
            let engine = QuoteEngine::new(Arc::clone(&client), Arc::clone(&config), flag_rx);

            let quote = engine
                .request_quote(token_in, token_out, &amount)
                .await?
                .context("amount must be a positive decimal number")?;
            println!(
                "{} {} -> {} {}  (fee tier {} bps, est. impact {:.2}%)",
                amount,
                token_in.symbol,
                quote.amount_out_display(),
                token_out.symbol,
                quote.fee_tier.as_bps(),
                quote.price_impact_pct,
            );

            // cross-check against the router's own simplified quote path
            let wrapped = |t: &Token| {
                if t.is_native() {
                    config.wrapped_native
                } else {
                    t.address
                }
            };
            let router_out = client
                .router_quote(wrapped(token_in), wrapped(token_out), quote.amount_in)
                .await?;
            if router_out > U256::ZERO {
                println!(
                    "router getQuoteV2: {} {}",
                    baseswap_engine::units::format_units(router_out, token_out.decimals),
                    token_out.symbol,
                );
            }
        }
        Command::History { owner } => {
            let fetcher = HistoryFetcher::new(
                Arc::clone(&client),
                Arc::clone(&registry),
                Arc::clone(&config),
            );
            match fetcher.fetch_history(owner).await {
                Some(entries) if entries.is_empty() => {
                    println!("no swaps in the last {} blocks", config.history_block_window);
                }
                Some(entries) => {
                    for entry in &entries {
                        println!(
                            "{}  {} {} -> {} {}  [{:?}]  {}",
                            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            entry.amount_in_display(),
                            entry.token_in.symbol,
                            entry.amount_out_display(),
                            entry.token_out.symbol,
                            entry.router_version,
                            entry.hash,
                        );
                    }
                }
                None => bail!("history fetch failed after retries"),
            }
        }
    }

    Ok(())
}
