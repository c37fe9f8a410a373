//! Route request and execution types exchanged with aggregator plugins.

use crate::protocols::Protocol;
use crate::report::{ExecutionSummary, Latency};
use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side for protocols that quote both directions (CoW).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
	#[default]
	Sell,
	Buy,
}

impl Operation {
	pub fn as_str(&self) -> &'static str {
		match self {
			Operation::Sell => "sell",
			Operation::Buy => "buy",
		}
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Operation {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"sell" => Ok(Operation::Sell),
			"buy" => Ok(Operation::Buy),
			_ => Err("Operation must be either 'sell' or 'buy'".to_string()),
		}
	}
}

/// Protocol-specific knobs carried alongside a route request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteOptions {
	/// Socket: allow routes that need more than one user transaction.
	pub multi_tx: bool,
	/// CoW: order side.
	pub operation: Operation,
	/// CoW: order validity in minutes.
	pub valid_minutes: u64,
	/// Slippage tolerance in basis points, where the protocol accepts one.
	pub slippage_bps: u32,
}

impl Default for RouteOptions {
	fn default() -> Self {
		Self {
			multi_tx: false,
			operation: Operation::Sell,
			valid_minutes: 30,
			slippage_bps: 100,
		}
	}
}

/// What to quote: `amount` base units of `from_token` on `from_chain`
/// into `to_token` on `to_chain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
	pub protocol: Protocol,
	pub from_chain: u64,
	pub to_chain: u64,
	pub from_token: String,
	pub to_token: String,
	pub amount: String,
	#[serde(default)]
	pub options: RouteOptions,
}

impl RouteRequest {
	pub fn is_same_chain(&self) -> bool {
		self.from_chain == self.to_chain
	}
}

/// A vendor quote together with the request that produced it.
///
/// `quote` holds the protocol's response as returned; each plugin parses it
/// back into its own typed representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
	pub request: RouteRequest,
	pub quote: serde_json::Value,
	pub latency: Latency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
	/// All transactions confirmed (and, for bridges, the transfer completed).
	Done,
	/// The order or bridge transfer was accepted but not yet settled.
	Pending,
	Failed,
}

impl fmt::Display for ExecutionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ExecutionStatus::Done => "done",
			ExecutionStatus::Pending => "pending",
			ExecutionStatus::Failed => "failed",
		};
		f.write_str(s)
	}
}

/// Result of executing a route on-chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
	pub tx_hashes: Vec<B256>,
	pub order_uid: Option<String>,
	pub status: ExecutionStatus,
	pub latency: Latency,
}

impl From<&Execution> for ExecutionSummary {
	fn from(execution: &Execution) -> Self {
		ExecutionSummary {
			tx_hashes: execution.tx_hashes.iter().map(|h| h.to_string()).collect(),
			order_uid: execution.order_uid.clone(),
			status: execution.status.to_string(),
			latency: execution.latency.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_operation_parsing() {
		assert_eq!("buy".parse::<Operation>(), Ok(Operation::Buy));
		assert_eq!(
			"swap".parse::<Operation>().unwrap_err(),
			"Operation must be either 'sell' or 'buy'"
		);
	}

	#[test]
	fn test_route_request_defaults_options() {
		let json = r#"{
			"protocol": "lifi",
			"from_chain": 1,
			"to_chain": 137,
			"from_token": "WETH",
			"to_token": "USDC",
			"amount": "1000000000000000000"
		}"#;

		let request: RouteRequest = serde_json::from_str(json).unwrap();
		assert_eq!(request.protocol, Protocol::Lifi);
		assert!(!request.is_same_chain());
		assert_eq!(request.options, RouteOptions::default());
	}
}
