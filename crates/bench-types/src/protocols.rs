//! Integrated protocols and the chains each one supports.

use crate::chains::Chain;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A token aggregator or cross-chain messaging protocol under benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
	Lifi,
	Socket,
	Uniswap,
	#[serde(alias = "cowswap")]
	Cow,
	Xy,
	Ccip,
	Hyperlane,
}

impl Protocol {
	/// Token aggregators, in the order they are benchmarked.
	pub const AGGREGATORS: [Protocol; 5] = [
		Protocol::Lifi,
		Protocol::Socket,
		Protocol::Uniswap,
		Protocol::Cow,
		Protocol::Xy,
	];

	/// Upper-case protocol key, as it appears in validation errors.
	pub fn as_str(&self) -> &'static str {
		match self {
			Protocol::Lifi => "LIFI",
			Protocol::Socket => "SOCKET",
			Protocol::Uniswap => "UNISWAP",
			Protocol::Cow => "COW",
			Protocol::Xy => "XY",
			Protocol::Ccip => "CCIP",
			Protocol::Hyperlane => "HYPERLANE",
		}
	}

	/// Key of the protocol's section in the `[protocols]` config table.
	pub fn config_key(&self) -> &'static str {
		match self {
			Protocol::Lifi => "lifi",
			Protocol::Socket => "socket",
			Protocol::Uniswap => "uniswap",
			Protocol::Cow => "cowswap",
			Protocol::Xy => "xy",
			Protocol::Ccip => "ccip",
			Protocol::Hyperlane => "hyperlane",
		}
	}

	pub fn supported_chains(&self) -> &'static [Chain] {
		use Chain::*;
		match self {
			Protocol::Lifi => &[Ethereum, Goerli, Polygon, Mumbai, Arbitrum, Optimism],
			Protocol::Socket => &[Ethereum, Polygon, Arbitrum, Optimism],
			Protocol::Uniswap => &[Ethereum, Goerli, Polygon, Arbitrum, Optimism, Sepolia],
			Protocol::Cow => &[Ethereum, Goerli, Sepolia],
			Protocol::Xy => &[Ethereum, Polygon, Arbitrum, Optimism],
			Protocol::Ccip => &[Sepolia, Mumbai],
			Protocol::Hyperlane => &[Goerli, Mumbai, Sepolia],
		}
	}

	pub fn supports(&self, chain: Chain) -> bool {
		self.supported_chains().contains(&chain)
	}
}

impl fmt::Display for Protocol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Protocol {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"lifi" => Ok(Protocol::Lifi),
			"socket" => Ok(Protocol::Socket),
			"uniswap" => Ok(Protocol::Uniswap),
			"cow" | "cowswap" => Ok(Protocol::Cow),
			"xy" => Ok(Protocol::Xy),
			"ccip" => Ok(Protocol::Ccip),
			"hyperlane" => Ok(Protocol::Hyperlane),
			_ => Err(format!("Invalid protocol name: {}", s)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_protocol_names() {
		assert_eq!("LIFI".parse::<Protocol>(), Ok(Protocol::Lifi));
		assert_eq!("cowswap".parse::<Protocol>(), Ok(Protocol::Cow));
		assert_eq!(
			"dodo".parse::<Protocol>(),
			Err("Invalid protocol name: dodo".to_string())
		);
	}

	#[test]
	fn test_socket_rejects_goerli() {
		assert!(Protocol::Socket.supports(Chain::Ethereum));
		assert!(!Protocol::Socket.supports(Chain::Goerli));
	}
}
