//! Unit conversion and latency measurement for reports.

use crate::report::Latency;
use alloy::primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Errors that can occur while converting token amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitError {
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	#[error("Amount {amount} with {decimals} decimals does not fit a decimal")]
	Overflow { amount: String, decimals: u32 },
}

/// Parses a base-unit amount given as a decimal or `0x` hex string.
pub fn parse_amount(amount: &str) -> Result<U256, UnitError> {
	let trimmed = amount.trim();
	let parsed = match trimmed.strip_prefix("0x") {
		Some(hex) => U256::from_str_radix(hex, 16),
		None => U256::from_str_radix(trimmed, 10),
	};
	parsed.map_err(|_| UnitError::InvalidAmount(amount.to_string()))
}

/// Converts a base-unit amount into a token-denominated decimal.
///
/// `1500000` with 6 decimals becomes `1.5`. The conversion is exact.
pub fn to_decimal(amount: U256, decimals: u32) -> Result<Decimal, UnitError> {
	let overflow = || UnitError::Overflow {
		amount: amount.to_string(),
		decimals,
	};

	if amount > U256::from(i128::MAX as u128) {
		return Err(overflow());
	}

	// Decimal keeps at most 28 fractional digits; drop the excess before scaling.
	let (amount, decimals) = if decimals > 28 {
		let excess = U256::from(10u64).pow(U256::from(decimals - 28));
		(amount / excess, 28)
	} else {
		(amount, decimals)
	};

	Decimal::try_from_i128_with_scale(amount.to::<u128>() as i128, decimals)
		.map(|d| d.normalize())
		.map_err(|_| overflow())
}

/// Parses and converts a base-unit amount string.
pub fn amount_to_decimal(amount: &str, decimals: u32) -> Result<Decimal, UnitError> {
	to_decimal(parse_amount(amount)?, decimals)
}

/// Rounds a USD value half-away-from-zero to cents.
pub fn scale_two_decimals(value: Decimal) -> Decimal {
	value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a wei amount to gwei.
pub fn wei_to_gwei(wei: U256) -> Result<Decimal, UnitError> {
	to_decimal(wei, 9)
}

/// Parses a loosely formatted decimal string (`"12.5"`, `""`) from an API response.
pub fn parse_decimal_or_zero(value: &str) -> Decimal {
	value.trim().parse::<Decimal>().unwrap_or(Decimal::ZERO)
}

/// Wall-clock stopwatch producing a [`Latency`] entry.
#[derive(Debug, Clone)]
pub struct Stopwatch {
	name: String,
	start_timestamp: i64,
}

impl Stopwatch {
	pub fn start(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			start_timestamp: chrono::Utc::now().timestamp_millis(),
		}
	}

	pub fn finish(self) -> Latency {
		let end_timestamp = chrono::Utc::now().timestamp_millis();
		Latency {
			name: self.name,
			start_timestamp: self.start_timestamp,
			end_timestamp,
			latency: end_timestamp - self.start_timestamp,
		}
	}
}
