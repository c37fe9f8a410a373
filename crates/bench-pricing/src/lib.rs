//! USD token prices for report generation.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

pub mod implementations;

pub use implementations::coingecko::CoinGeckoOracle;
pub use implementations::fixed::StaticOracle;

#[derive(Debug, Error)]
pub enum PricingError {
	#[error("Unknown token: {0}")]
	UnknownToken(String),
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),
	#[error("Request failed with status: {0}")]
	RequestFailed(u16),
	#[error("No USD price returned for {0}")]
	MissingPrice(String),
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
	/// USD price of one whole token.
	async fn usd_price(&self, symbol: &str) -> Result<Decimal, PricingError>;
}
