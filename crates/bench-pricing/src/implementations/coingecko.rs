//! CoinGecko simple price API.

use crate::{PriceOracle, PricingError};
use async_trait::async_trait;
use bench_types::token_info;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// `id -> { "usd": price }`
type SimplePriceResponse = HashMap<String, HashMap<String, Decimal>>;

pub struct CoinGeckoOracle {
	client: reqwest::Client,
	base_url: String,
	api_key: Option<String>,
}

impl CoinGeckoOracle {
	pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, PricingError> {
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(10))
			.build()?;

		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
			api_key,
		})
	}
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
	async fn usd_price(&self, symbol: &str) -> Result<Decimal, PricingError> {
		let token = token_info(symbol).ok_or_else(|| PricingError::UnknownToken(symbol.to_string()))?;

		let mut request = self
			.client
			.get(format!("{}/simple/price", self.base_url))
			.query(&[("ids", token.coingecko_id), ("vs_currencies", "usd")]);
		if let Some(key) = &self.api_key {
			request = request.header("x-cg-demo-api-key", key);
		}

		let response = request.send().await?;
		if !response.status().is_success() {
			return Err(PricingError::RequestFailed(response.status().as_u16()));
		}

		let prices: SimplePriceResponse = response.json().await?;
		let price = prices
			.get(token.coingecko_id)
			.and_then(|p| p.get("usd"))
			.copied()
			.ok_or_else(|| PricingError::MissingPrice(symbol.to_string()))?;

		debug!(symbol = token.symbol, %price, "Fetched USD price");
		Ok(price)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{header, method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	#[tokio::test]
	async fn test_fetches_price_by_coingecko_id() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/simple/price"))
			.and(query_param("ids", "matic-network"))
			.and(query_param("vs_currencies", "usd"))
			.and(header("x-cg-demo-api-key", "demo"))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({ "matic-network": { "usd": 0.52 } })),
			)
			.mount(&server)
			.await;

		let oracle = CoinGeckoOracle::new(server.uri(), Some("demo".to_string())).unwrap();
		let price = oracle.usd_price("matic").await.unwrap();
		assert_eq!(price, "0.52".parse::<Decimal>().unwrap());
	}

	#[tokio::test]
	async fn test_error_status_and_missing_price() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(query_param("ids", "ethereum"))
			.respond_with(ResponseTemplate::new(429))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(query_param("ids", "dai"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
			.mount(&server)
			.await;

		let oracle = CoinGeckoOracle::new(server.uri(), None).unwrap();
		assert!(matches!(
			oracle.usd_price("ETH").await,
			Err(PricingError::RequestFailed(429))
		));
		assert!(matches!(
			oracle.usd_price("DAI").await,
			Err(PricingError::MissingPrice(_))
		));
		assert!(matches!(
			oracle.usd_price("SHIB").await,
			Err(PricingError::UnknownToken(_))
		));
	}
}
