use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SwapError;
use crate::units;

/// A token known to the engine. Loaded once from the registry, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub logo: Option<String>,
}

impl Token {
    /// The native asset is represented by the zero address everywhere.
    pub fn is_native(&self) -> bool {
        self.address == Address::ZERO
    }

    /// Synthetic fallback for addresses the registry does not know, so a
    /// malformed or unsupported token never aborts rendering a history entry.
    pub fn unknown(address: Address) -> Self {
        Self {
            address,
            symbol: "???".to_string(),
            name: "Unknown".to_string(),
            decimals: 18,
            logo: None,
        }
    }
}

/// Pool fee tiers the quoter is asked about, in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeTier {
    Low,
    Medium,
    High,
}

impl FeeTier {
    /// Tier order for the quote cascade: the most common tier first, then
    /// the alternates. The first tier that answers wins.
    pub const CASCADE: [FeeTier; 3] = [FeeTier::Medium, FeeTier::Low, FeeTier::High];

    pub fn as_bps(self) -> u32 {
        match self {
            FeeTier::Low => 500,
            FeeTier::Medium => 3000,
            FeeTier::High => 10000,
        }
    }
}

/// Routing hint forwarded verbatim to the router contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RouterVersion {
    #[default]
    Auto,
    V2,
    V3,
}

impl RouterVersion {
    /// Wire encoding used by the router: 0 = auto, 2 = V2, 3 = V3.
    pub fn as_u8(self) -> u8 {
        match self {
            RouterVersion::Auto => 0,
            RouterVersion::V2 => 2,
            RouterVersion::V3 => 3,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            2 => RouterVersion::V2,
            3 => RouterVersion::V3,
            _ => RouterVersion::Auto,
        }
    }
}

/// One successful quote. Superseded by the next fetch, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_tier: FeeTier,
    pub price_impact_pct: f64,
    pub fetched_at: DateTime<Utc>,
}

impl Quote {
    pub fn amount_out_display(&self) -> String {
        units::format_units(self.amount_out, self.token_out.decimals)
    }
}

/// Built at the moment the user triggers a swap; immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: U256,
    pub quote: Quote,
    pub slippage_bps: u32,
    pub version: RouterVersion,
}

// Serialize-only: the embedded SwapError does not round-trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SwapStatus {
    Pending,
    Confirmed,
    Failed(SwapError),
}

impl SwapStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SwapStatus::Pending)
    }
}

/// Lifecycle record for one swap. Owned by the executor until terminal.
/// `hash` is absent when submission itself failed (nothing was broadcast).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapTransaction {
    pub hash: Option<B256>,
    pub status: SwapStatus,
    pub request: SwapRequest,
}

/// A decoded `Swap` event, newest first in any fetched batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub hash: B256,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_paid: U256,
    pub router_version: RouterVersion,
}

impl HistoryEntry {
    pub fn amount_in_display(&self) -> String {
        units::format_units(self.amount_in, self.token_in.decimals)
    }

    pub fn amount_out_display(&self) -> String {
        units::format_units(self.amount_out, self.token_out.decimals)
    }

    /// Fee is taken from the output leg, so it formats at the output decimals.
    pub fn fee_display(&self) -> String {
        units::format_units(self.fee_paid, self.token_out.decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_tier_cascade_order() {
        assert_eq!(
            FeeTier::CASCADE,
            [FeeTier::Medium, FeeTier::Low, FeeTier::High]
        );
        assert_eq!(FeeTier::Medium.as_bps(), 3000);
    }

    #[test]
    fn router_version_wire_encoding() {
        assert_eq!(RouterVersion::Auto.as_u8(), 0);
        assert_eq!(RouterVersion::V2.as_u8(), 2);
        assert_eq!(RouterVersion::V3.as_u8(), 3);
        assert_eq!(RouterVersion::from_u8(2), RouterVersion::V2);
        assert_eq!(RouterVersion::from_u8(7), RouterVersion::Auto);
    }

    #[test]
    fn native_token_is_zero_address() {
        let eth = Token {
            address: Address::ZERO,
            symbol: "ETH".into(),
            name: "Ethereum".into(),
            decimals: 18,
            logo: None,
        };
        assert!(eth.is_native());
        assert!(!Token::unknown(Address::repeat_byte(1)).is_native());
    }
}
