use thiserror::Error;

/// Closed error taxonomy for everything the engine can surface to a caller.
///
/// Quote and history paths absorb `Transient` internally (fee-tier cascade,
/// retry/backoff); only terminal outcomes cross a component boundary. The
/// executor surfaces every terminal outcome, classified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwapError {
    #[error("no liquidity available for this pair")]
    NoLiquidity,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("transaction rejected by signer")]
    TransactionRejected,
    #[error("insufficient native balance to cover network fee")]
    InsufficientGas,
    #[error("output below minimum, try increasing slippage tolerance")]
    SlippageExceeded,
    #[error("token not supported by the router: {0}")]
    UnsupportedToken(String),
    #[error("contract reverted: {0}")]
    ContractReverted(String),
    #[error("transient RPC failure: {0}")]
    Transient(String),
    #[error("allowance never caught up on-chain")]
    ApprovalTimeout,
    #[error("a swap is already in flight")]
    SwapInFlight,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("RPC error: {0}")]
    Rpc(String),
}

// Serialized as the display string, for logs and outbound payloads only.
// There is deliberately no `Deserialize`: the structured variant cannot be
// recovered from its message, so types embedding this are serialize-only.
impl serde::Serialize for SwapError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Map raw provider/contract error text onto the taxonomy.
///
/// The node does not expose structured codes for most of these, so this is a
/// best-effort substring heuristic kept as a compatibility layer. Anything
/// unmatched falls through to `Rpc` carrying the raw diagnostic for logs.
pub fn classify_provider_error(raw: &str) -> SwapError {
    let msg = raw.to_lowercase();

    if msg.contains("user rejected") || msg.contains("user denied") || msg.contains("rejected the request")
    {
        return SwapError::TransactionRejected;
    }
    if msg.contains("insufficient funds") || msg.contains("insufficient balance for gas") {
        return SwapError::InsufficientGas;
    }
    // Minimum-output reverts, checked before the generic revert branch.
    if msg.contains("insufficient_output_amount")
        || msg.contains("too little received")
        || msg.contains("slippage")
    {
        return SwapError::SlippageExceeded;
    }
    if msg.contains("unsupported token") || msg.contains("token not supported") {
        return SwapError::UnsupportedToken(raw.to_string());
    }
    if msg.contains("429")
        || msg.contains("rate limit")
        || msg.contains("timed out")
        || msg.contains("timeout")
    {
        return SwapError::Transient(raw.to_string());
    }
    if let Some(reason) = extract_revert_reason(raw) {
        return SwapError::ContractReverted(reason);
    }
    if msg.contains("revert") {
        return SwapError::ContractReverted(raw.to_string());
    }

    SwapError::Rpc(raw.to_string())
}

/// Pull the human-readable reason out of an "execution reverted: ..." message.
fn extract_revert_reason(raw: &str) -> Option<String> {
    let idx = raw.to_lowercase().find("execution reverted:")?;
    let reason = raw[idx + "execution reverted:".len()..].trim();
    if reason.is_empty() {
        None
    } else {
        Some(reason.trim_matches(|c| c == '"' || c == '\'').to_string())
    }
}
