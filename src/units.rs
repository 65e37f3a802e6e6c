use alloy::primitives::U256;

use crate::error::SwapError;

/// Parse a human decimal string into a fixed-point integer at `decimals`
/// precision. Pure integer arithmetic, no floating point on the money path.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, SwapError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(SwapError::InvalidInput("empty amount".into()));
    }

    let parts: Vec<&str> = amount.split('.').collect();
    if parts.len() > 2 {
        return Err(SwapError::InvalidInput(format!(
            "malformed amount: {amount}"
        )));
    }

    let whole: u128 = if parts[0].is_empty() {
        0
    } else {
        parts[0]
            .parse()
            .map_err(|_| SwapError::InvalidInput(format!("malformed amount: {amount}")))?
    };

    let frac: u128 = if parts.len() > 1 && !parts[1].is_empty() {
        let frac_str = parts[1];
        if frac_str.len() > decimals as usize {
            return Err(SwapError::InvalidInput(format!(
                "more than {decimals} decimal places: {amount}"
            )));
        }
        // Pad to the token's precision before parsing.
        let padded = format!("{frac_str:0<width$}", width = decimals as usize);
        padded
            .parse()
            .map_err(|_| SwapError::InvalidInput(format!("malformed amount: {amount}")))?
    } else {
        0
    };

    let scale = U256::from(10).pow(U256::from(decimals));
    Ok(U256::from(whole) * scale + U256::from(frac))
}

/// Parse an amount and require it to be strictly positive. A non-positive or
/// unparseable amount is the "no active request" state, not a user error.
pub fn parse_positive(amount: &str, decimals: u8) -> Option<U256> {
    match parse_units(amount, decimals) {
        Ok(v) if v > U256::ZERO => Some(v),
        _ => None,
    }
}

/// Format a fixed-point integer back into a trimmed decimal string.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let scale = U256::from(10).pow(U256::from(decimals));
    let whole = amount / scale;
    let remainder = amount % scale;

    if remainder.is_zero() {
        return whole.to_string();
    }

    let frac = format!("{remainder:0>width$}", width = decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(
            parse_units("1.0", 18).unwrap(),
            U256::from(10).pow(U256::from(18))
        );
        assert_eq!(parse_units("1000.123456", 6).unwrap(), U256::from(1000123456u64));
        assert_eq!(parse_units("0.5", 6).unwrap(), U256::from(500000u64));
        assert_eq!(parse_units(".5", 6).unwrap(), U256::from(500000u64));
        assert_eq!(parse_units("0", 18).unwrap(), U256::ZERO);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_units("", 18).is_err());
        assert!(parse_units("1.2.3", 18).is_err());
        assert!(parse_units("abc", 18).is_err());
        assert!(parse_units("-1", 18).is_err());
        // more fractional digits than the token carries
        assert!(parse_units("1.1234567", 6).is_err());
    }

    #[test]
    fn positive_filter_treats_zero_as_no_request() {
        assert_eq!(parse_positive("0", 18), None);
        assert_eq!(parse_positive("0.0", 6), None);
        assert_eq!(parse_positive("x", 6), None);
        assert_eq!(parse_positive("2", 6), Some(U256::from(2_000_000u64)));
    }

    #[test]
    fn formats_and_trims() {
        assert_eq!(format_units(U256::from(1000123456u64), 6), "1000.123456");
        assert_eq!(format_units(U256::from(500000u64), 6), "0.5");
        assert_eq!(format_units(U256::from(10).pow(U256::from(18)), 18), "1");
        assert_eq!(format_units(U256::ZERO, 18), "0");
    }

    #[test]
    fn parse_format_agree_on_small_fractions() {
        let v = parse_units("0.000001", 6).unwrap();
        assert_eq!(v, U256::from(1u64));
        assert_eq!(format_units(v, 6), "0.000001");
    }
}
