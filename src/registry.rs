use alloy::primitives::{address, Address};

use crate::types::Token;

/// Static symbol -> token mapping, seeded at startup. Pure data, no I/O.
///
/// Includes a WETH entry alongside the native sentinel so history rows for
/// wrapped legs resolve to a named token.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
}

impl TokenRegistry {
    /// The token list the router was deployed with on Base mainnet.
    pub fn base_mainnet() -> Self {
        let tokens = vec![
            Token {
                address: Address::ZERO,
                symbol: "ETH".into(),
                name: "Ethereum".into(),
                decimals: 18,
                logo: Some("/tokens/eth.svg".into()),
            },
            Token {
                address: address!("4200000000000000000000000000000000000006"),
                symbol: "WETH".into(),
                name: "Wrapped Ether".into(),
                decimals: 18,
                logo: None,
            },
            Token {
                address: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
                symbol: "USDC".into(),
                name: "USD Coin".into(),
                decimals: 6,
                logo: Some("/tokens/usdc.svg".into()),
            },
            Token {
                address: address!("fde4C96c8593536E31F229EA8f37b2ADa2699bb2"),
                symbol: "USDT".into(),
                name: "Tether USD".into(),
                decimals: 6,
                logo: Some("/tokens/usdt.svg".into()),
            },
            Token {
                address: address!("9a33406165f562E16C3abD82fd1185482E01b49a"),
                symbol: "TALENT".into(),
                name: "Talent Protocol".into(),
                decimals: 18,
                logo: Some("/tokens/talent.svg".into()),
            },
        ];
        Self { tokens }
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Address match. `Address` comparison is byte-wise, so checksum casing
    /// in the source string is irrelevant once parsed.
    pub fn by_address(&self, address: Address) -> Option<&Token> {
        self.tokens.iter().find(|t| t.address == address)
    }

    /// Resolve with the synthetic "???" fallback instead of failing.
    pub fn resolve(&self, address: Address) -> Token {
        self.by_address(address)
            .cloned()
            .unwrap_or_else(|| Token::unknown(address))
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::base_mainnet()
    }
}
