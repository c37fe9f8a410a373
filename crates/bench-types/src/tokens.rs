//! Token metadata shared across chains.

use serde::Serialize;

/// Token symbols accepted by the input validators.
pub const SUPPORTED_TOKENS: [&str; 8] = ["ETH", "WETH", "USDC", "USDT", "DAI", "MATIC", "WMATIC", "LINK"];

/// Chain-independent token metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
	pub symbol: &'static str,
	pub decimals: u32,
	/// CoinGecko asset id used for USD pricing.
	pub coingecko_id: &'static str,
	/// Whether this is a chain's native currency rather than an ERC-20.
	pub native: bool,
}

const TOKENS: [TokenInfo; 8] = [
	TokenInfo { symbol: "ETH", decimals: 18, coingecko_id: "ethereum", native: true },
	TokenInfo { symbol: "WETH", decimals: 18, coingecko_id: "weth", native: false },
	TokenInfo { symbol: "USDC", decimals: 6, coingecko_id: "usd-coin", native: false },
	TokenInfo { symbol: "USDT", decimals: 6, coingecko_id: "tether", native: false },
	TokenInfo { symbol: "DAI", decimals: 18, coingecko_id: "dai", native: false },
	TokenInfo { symbol: "MATIC", decimals: 18, coingecko_id: "matic-network", native: true },
	TokenInfo { symbol: "WMATIC", decimals: 18, coingecko_id: "wmatic", native: false },
	TokenInfo { symbol: "LINK", decimals: 18, coingecko_id: "chainlink", native: false },
];

/// Looks up token metadata by symbol (case-insensitive).
pub fn token_info(symbol: &str) -> Option<TokenInfo> {
	TOKENS
		.iter()
		.copied()
		.find(|token| token.symbol.eq_ignore_ascii_case(symbol))
}

pub fn is_supported_token(symbol: &str) -> bool {
	SUPPORTED_TOKENS.contains(&symbol)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_every_supported_token_has_metadata() {
		for symbol in SUPPORTED_TOKENS {
			assert!(token_info(symbol).is_some(), "missing metadata for {}", symbol);
		}
	}

	#[test]
	fn test_supported_token_check_is_exact() {
		assert!(is_supported_token("USDC"));
		assert!(!is_supported_token("usdc"));
		assert!(!is_supported_token("DOGECOIN"));
		assert_eq!(token_info("usdc").map(|t| t.decimals), Some(6));
	}
}
