use std::path::Path;
use std::time::Duration;

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::error::SwapError;

/// Every tunable of the engine in one place. Defaults target Base mainnet,
/// matching the deployed router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub chain_id: u64,
    pub router_address: Address,
    pub quoter_address: Address,
    pub wrapped_native: Address,
    /// Tried in order until one answers a liveness probe.
    pub rpc_endpoints: Vec<String>,

    /// Fixed percentage the router takes on the output leg.
    pub protocol_fee_bps: u32,
    /// Safety margin added on top of user slippage to absorb block-to-block
    /// price drift between quote time and execution time.
    pub execution_buffer_bps: u32,

    pub debounce_ms: u64,
    pub quote_refresh_secs: u64,

    pub approval_poll_ms: u64,
    /// Allowance polls before giving up with `ApprovalTimeout`.
    pub approval_max_polls: u32,

    /// Log query window, bounded so public read endpoints do not time out.
    pub history_block_window: u64,
    pub history_max_entries: usize,
    pub history_max_retries: u32,
    pub history_backoff_base_secs: u64,
    pub history_poll_secs: u64,

    pub receipt_poll_ms: u64,
    pub receipt_max_polls: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chain_id: 8453,
            router_address: address!("372042003cE6968856401A79454a8574936690D1"),
            quoter_address: address!("3d4e44Eb1374240CE5F1B871ab261CD16335B76a"),
            wrapped_native: address!("4200000000000000000000000000000000000006"),
            rpc_endpoints: vec![
                "https://mainnet.base.org".to_string(),
                "https://base.drpc.org".to_string(),
                "https://base.publicnode.com".to_string(),
            ],
            protocol_fee_bps: 300,
            execution_buffer_bps: 50,
            debounce_ms: 300,
            quote_refresh_secs: 10,
            approval_poll_ms: 1000,
            approval_max_polls: 60,
            history_block_window: 10_000,
            history_max_entries: 20,
            history_max_retries: 3,
            history_backoff_base_secs: 2,
            history_poll_secs: 30,
            receipt_poll_ms: 2000,
            receipt_max_polls: 150,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SwapError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SwapError::Config(format!("cannot read config file: {e}")))?;
        serde_json::from_str(&raw).map_err(|e| SwapError::Config(format!("invalid config: {e}")))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn quote_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.quote_refresh_secs)
    }

    pub fn approval_poll_interval(&self) -> Duration {
        Duration::from_millis(self.approval_poll_ms)
    }

    pub fn history_backoff_base(&self) -> Duration {
        Duration::from_secs(self.history_backoff_base_secs)
    }

    pub fn history_poll_interval(&self) -> Duration {
        Duration::from_secs(self.history_poll_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_target_base_mainnet() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.chain_id, 8453);
        assert_eq!(cfg.protocol_fee_bps, 300);
        assert_eq!(cfg.execution_buffer_bps, 50);
        assert_eq!(cfg.history_max_entries, 20);
        assert!(!cfg.rpc_endpoints.is_empty());
    }

    #[test]
    fn partial_file_overrides_merge_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "debounce_ms": 150, "history_block_window": 5000 }}"#).unwrap();

        let cfg = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.debounce_ms, 150);
        assert_eq!(cfg.history_block_window, 5000);
        // untouched fields keep their defaults
        assert_eq!(cfg.chain_id, 8453);
        assert_eq!(cfg.approval_max_polls, 60);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        assert!(matches!(
            EngineConfig::from_file("/nonexistent/engine.json"),
            Err(SwapError::Config(_))
        ));
    }
}
