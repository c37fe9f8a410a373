//! Normalized benchmark report schema.
//!
//! Every aggregator plugin reshapes its vendor quote into an [`ApiReport`] so
//! reports from different protocols can be compared field by field.

use crate::protocols::Protocol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Name of the net fee entry carried by every report.
pub const NET_FEE_NAME: &str = "TOTAL FEE WITH GAS";

/// A benchmark report for a single quote (and optionally its execution).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiReport {
	pub id: uuid::Uuid,
	pub protocol: Protocol,
	/// RFC 3339 timestamp of report creation.
	pub date_time: String,
	pub source_network: Network,
	pub destination_network: Network,
	pub aggregator: Aggregator,
	pub trade_value: Asset,
	pub net_fee: Fee,
	pub query_latency: Vec<Latency>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub execution: Option<ExecutionSummary>,
	/// The vendor quote the report was built from.
	pub raw_quote: serde_json::Value,
}

/// One side of the trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
	pub name: String,
	pub chain_id: u64,
	pub token: String,
	pub token_address: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_price_usd: Option<Decimal>,
}

/// The aggregator (or bridge/DEX tool) that produced the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregator {
	pub name: String,
	pub address: Option<String>,
	pub fee: Vec<AggregatorFee>,
	/// Sum of `fee[*].usd_price`.
	pub total_fee: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorFee {
	pub name: String,
	/// Fee amount in the fee token's base units.
	pub amount: String,
	pub percentage: Decimal,
	pub gas_price_gwei: Option<Decimal>,
	pub usd_price: Decimal,
}

/// Value of the trade before and after fees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
	pub name: String,
	pub description: String,
	/// Input amount in base units.
	pub actual_value: String,
	pub actual_value_usd: Decimal,
	pub effective_trade_value_usd: Decimal,
	/// `actual_value_usd - effective_trade_value_usd`.
	pub difference_in_value: Decimal,
	pub approximated_gas_cost_gwei: Decimal,
	pub approximated_gas_cost_usd: Decimal,
	pub effective_trade_value_usd_with_gas: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
	pub name: String,
	pub amount_usd: Decimal,
}

/// A measured interval, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Latency {
	pub name: String,
	pub start_timestamp: i64,
	pub end_timestamp: i64,
	pub latency: i64,
}

/// Outcome of executing the reported route, when it was executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
	pub tx_hashes: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_uid: Option<String>,
	pub status: String,
	pub latency: Latency,
}

impl ApiReport {
	/// Total measured latency across all query phases.
	pub fn total_query_latency(&self) -> i64 {
		self.query_latency.iter().map(|l| l.latency).sum()
	}
}

impl Asset {
	/// Builds a trade value entry, deriving the value difference and the
	/// value net of gas.
	pub fn new(
		name: impl Into<String>,
		description: impl Into<String>,
		actual_value: impl Into<String>,
		actual_value_usd: Decimal,
		effective_trade_value_usd: Decimal,
		approximated_gas_cost_gwei: Decimal,
		approximated_gas_cost_usd: Decimal,
	) -> Self {
		Self {
			name: name.into(),
			description: description.into(),
			actual_value: actual_value.into(),
			actual_value_usd,
			effective_trade_value_usd,
			difference_in_value: actual_value_usd - effective_trade_value_usd,
			approximated_gas_cost_gwei,
			approximated_gas_cost_usd,
			effective_trade_value_usd_with_gas: effective_trade_value_usd - approximated_gas_cost_usd,
		}
	}
}

impl Aggregator {
	/// Builds an aggregator entry, totalling the individual fees.
	pub fn new(name: impl Into<String>, address: Option<String>, fee: Vec<AggregatorFee>) -> Self {
		let total_fee = fee.iter().map(|f| f.usd_price).sum();
		Self {
			name: name.into(),
			address,
			fee,
			total_fee,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn test_aggregator_total_fee_sums_entries() {
		let fee = |usd: &str| AggregatorFee {
			name: "LP Fee".to_string(),
			amount: "100".to_string(),
			percentage: Decimal::from_str("0.003").unwrap(),
			gas_price_gwei: None,
			usd_price: Decimal::from_str(usd).unwrap(),
		};

		let aggregator = Aggregator::new("stargate", None, vec![fee("1.25"), fee("0.75")]);
		assert_eq!(aggregator.total_fee, Decimal::from(2));
	}

	#[test]
	fn test_asset_derives_differences() {
		let d = |s: &str| Decimal::from_str(s).unwrap();
		let asset = Asset::new("WETH", "", "1000000000000000000", d("1843.12"), d("1839.50"), d("105000"), d("0.19"));

		assert_eq!(asset.difference_in_value, d("3.62"));
		assert_eq!(asset.effective_trade_value_usd_with_gas, d("1839.31"));
	}
}
