//! Static chain table used by every aggregator plugin.
//!
//! Chains are identified by their EVM chain id on the wire and by their
//! upper-case name (`ETHEREUM`, `POLYGON`, ...) in configuration, RPC
//! environment variables and reports.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder address aggregators use for a chain's native currency.
pub const NATIVE_TOKEN_ADDRESS: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// EVM chains known to the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
	Ethereum,
	Goerli,
	Optimism,
	Polygon,
	Arbitrum,
	Mumbai,
	Sepolia,
}

impl Chain {
	/// All chains in chain id order.
	pub const ALL: [Chain; 7] = [
		Chain::Ethereum,
		Chain::Goerli,
		Chain::Optimism,
		Chain::Polygon,
		Chain::Arbitrum,
		Chain::Mumbai,
		Chain::Sepolia,
	];

	pub fn id(&self) -> u64 {
		match self {
			Chain::Ethereum => 1,
			Chain::Goerli => 5,
			Chain::Optimism => 10,
			Chain::Polygon => 137,
			Chain::Arbitrum => 42161,
			Chain::Mumbai => 80001,
			Chain::Sepolia => 11155111,
		}
	}

	/// Upper-case chain name, as used in config keys and `RPC_<NAME>` variables.
	pub fn name(&self) -> &'static str {
		match self {
			Chain::Ethereum => "ETHEREUM",
			Chain::Goerli => "GOERLI",
			Chain::Optimism => "OPTIMISM",
			Chain::Polygon => "POLYGON",
			Chain::Arbitrum => "ARBITRUM",
			Chain::Mumbai => "MUMBAI",
			Chain::Sepolia => "SEPOLIA",
		}
	}

	pub fn from_id(chain_id: u64) -> Option<Self> {
		Self::ALL.into_iter().find(|chain| chain.id() == chain_id)
	}

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL
			.into_iter()
			.find(|chain| chain.name().eq_ignore_ascii_case(name))
	}

	pub fn is_testnet(&self) -> bool {
		matches!(self, Chain::Goerli | Chain::Mumbai | Chain::Sepolia)
	}

	/// Symbol of the chain's native currency.
	pub fn native_symbol(&self) -> &'static str {
		match self {
			Chain::Polygon | Chain::Mumbai => "MATIC",
			_ => "ETH",
		}
	}

	/// Symbol of the wrapped native currency.
	pub fn wrapped_native_symbol(&self) -> &'static str {
		match self {
			Chain::Polygon | Chain::Mumbai => "WMATIC",
			_ => "WETH",
		}
	}

	/// Resolves a token symbol to its contract address on this chain.
	///
	/// The native currency resolves to [`NATIVE_TOKEN_ADDRESS`].
	pub fn token_address(&self, symbol: &str) -> Option<Address> {
		let symbol = symbol.to_ascii_uppercase();
		if symbol == self.native_symbol() {
			return Some(NATIVE_TOKEN_ADDRESS);
		}

		let address = match (self, symbol.as_str()) {
			(Chain::Ethereum, "WETH") => address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
			(Chain::Ethereum, "USDC") => address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
			(Chain::Ethereum, "USDT") => address!("dAC17F958D2ee523a2206206994597C13D831ec7"),
			(Chain::Ethereum, "DAI") => address!("6B175474E89094C44Da98b954EedeAC495271d0F"),
			(Chain::Ethereum, "MATIC") => address!("7D1AfA7B718fb893dB30A3aBc0Cfc608AaCfeBB0"),
			(Chain::Ethereum, "LINK") => address!("514910771AF9Ca656af840dff83E8264EcF986CA"),

			(Chain::Goerli, "WETH") => address!("B4FBF271143F4FBf7B91A5ded31805e42b2208d6"),
			(Chain::Goerli, "USDC") => address!("07865c6E87B9F70255377e024ace6630C1Eaa37F"),
			(Chain::Goerli, "LINK") => address!("326C977E6efc84E512bB9C30f76E30c160eD06FB"),

			(Chain::Optimism, "WETH") => address!("4200000000000000000000000000000000000006"),
			(Chain::Optimism, "USDC") => address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85"),
			(Chain::Optimism, "USDT") => address!("94b008aA00579c1307B0EF2c499aD98a8ce58e58"),
			(Chain::Optimism, "DAI") => address!("DA10009cBd5D07dd0CeCc66161FC93D7c9000da1"),
			(Chain::Optimism, "LINK") => address!("350a791Bfc2C21F9Ed5d10980Dad2e2638ffa7f6"),

			(Chain::Polygon, "WETH") => address!("7ceB23fD6bC0adD59E62ac25578270cFf1b9f619"),
			(Chain::Polygon, "USDC") => address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
			(Chain::Polygon, "USDT") => address!("c2132D05D31c914a87C6611C10748AEb04B58e8F"),
			(Chain::Polygon, "DAI") => address!("8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063"),
			(Chain::Polygon, "WMATIC") => address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"),
			(Chain::Polygon, "LINK") => address!("53E0bca35eC356BD5ddDFebbD1Fc0fD03FaBad39"),

			(Chain::Arbitrum, "WETH") => address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
			(Chain::Arbitrum, "USDC") => address!("af88d065e77c8cC2239327C5EDb3A432268e5831"),
			(Chain::Arbitrum, "USDT") => address!("Fd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"),
			(Chain::Arbitrum, "DAI") => address!("DA10009cBd5D07dd0CeCc66161FC93D7c9000da1"),
			(Chain::Arbitrum, "LINK") => address!("f97f4df75117a78c1A5a0DBb814Af92458539FB4"),

			(Chain::Mumbai, "WMATIC") => address!("9c3C9283D3e44854697Cd22D3Faa240Cfb032889"),
			(Chain::Mumbai, "LINK") => address!("326C977E6efc84E512bB9C30f76E30c160eD06FB"),

			(Chain::Sepolia, "WETH") => address!("7b79995e5f793A07Bc00c21412e50Ecae098E7f9"),
			(Chain::Sepolia, "USDC") => address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"),
			(Chain::Sepolia, "LINK") => address!("779877A7B0D9E8603169DdbD7836e478b4624789"),

			_ => return None,
		};

		Some(address)
	}
}

impl fmt::Display for Chain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_chain_lookup_by_id_and_name() {
		assert_eq!(Chain::from_id(137), Some(Chain::Polygon));
		assert_eq!(Chain::from_id(999), None);
		assert_eq!(Chain::from_name("sepolia"), Some(Chain::Sepolia));
		assert_eq!(Chain::from_name("MUMBAI").map(|c| c.id()), Some(80001));
	}

	#[test]
	fn test_native_tokens_resolve_to_placeholder() {
		assert_eq!(Chain::Ethereum.token_address("ETH"), Some(NATIVE_TOKEN_ADDRESS));
		assert_eq!(Chain::Polygon.token_address("matic"), Some(NATIVE_TOKEN_ADDRESS));
		// MATIC is an ERC-20 on Ethereum
		assert_ne!(Chain::Ethereum.token_address("MATIC"), Some(NATIVE_TOKEN_ADDRESS));
	}

	#[test]
	fn test_unknown_token_on_chain() {
		assert!(Chain::Mumbai.token_address("USDT").is_none());
		assert!(Chain::Ethereum.token_address("DOGECOIN").is_none());
	}
}
