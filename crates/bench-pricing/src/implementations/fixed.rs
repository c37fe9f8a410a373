use crate::{PriceOracle, PricingError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Oracle answering from a fixed symbol → USD table.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
	prices: HashMap<String, Decimal>,
}

impl StaticOracle {
	pub fn new<I, S>(prices: I) -> Self
	where
		I: IntoIterator<Item = (S, Decimal)>,
		S: AsRef<str>,
	{
		let prices = prices
			.into_iter()
			.map(|(symbol, price)| (symbol.as_ref().to_ascii_uppercase(), price))
			.collect();
		Self { prices }
	}
}

#[async_trait]
impl PriceOracle for StaticOracle {
	async fn usd_price(&self, symbol: &str) -> Result<Decimal, PricingError> {
		self.prices
			.get(&symbol.to_ascii_uppercase())
			.copied()
			.ok_or_else(|| PricingError::UnknownToken(symbol.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_static_prices_are_case_insensitive() {
		let oracle = StaticOracle::new([("eth", Decimal::from(2000)), ("USDC", Decimal::ONE)]);

		assert_eq!(oracle.usd_price("ETH").await.unwrap(), Decimal::from(2000));
		assert_eq!(oracle.usd_price("usdc").await.unwrap(), Decimal::ONE);
		assert!(matches!(
			oracle.usd_price("LINK").await,
			Err(PricingError::UnknownToken(_))
		));
	}
}
