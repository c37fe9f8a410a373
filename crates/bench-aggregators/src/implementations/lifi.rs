//! LiFi quote API.
//!
//! Quotes come from `GET /quote`. Cross-chain executions are followed through
//! `GET /status` until the bridge reports `DONE` or `FAILED`.

use crate::http::{read_json, table_str, table_u64};
use crate::poll::StatusPoller;
use crate::report::ReportBase;
use crate::{AggregatorContext, AggregatorError, AggregatorInterface};
use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use bench_config::{validate_amount, validate_chain, validate_keys, validate_tokens};
use bench_types::{
	parse_amount, parse_decimal_or_zero, scale_two_decimals, wei_to_gwei, Aggregator, AggregatorFee,
	ApiReport, ConfigSchema, Execution, ExecutionStatus, Field, FieldType, Protocol, Route,
	RouteRequest, Schema, Stopwatch, Transaction, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// LiFi serves mainnets and testnets from staging.
pub const LIFI_STAGING_URL: &str = "https://staging.li.quest/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifiQuote {
	#[serde(default)]
	pub id: Option<String>,
	pub tool: String,
	pub tool_details: LifiToolDetails,
	pub estimate: LifiEstimate,
	#[serde(default)]
	pub transaction_request: Option<LifiTransactionRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifiToolDetails {
	pub key: String,
	pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifiEstimate {
	pub approval_address: String,
	pub from_amount: String,
	pub to_amount: String,
	#[serde(default)]
	pub to_amount_min: Option<String>,
	#[serde(rename = "fromAmountUSD", default)]
	pub from_amount_usd: Option<String>,
	#[serde(rename = "toAmountUSD", default)]
	pub to_amount_usd: Option<String>,
	#[serde(default)]
	pub fee_costs: Vec<LifiFeeCost>,
	#[serde(default)]
	pub gas_costs: Vec<LifiGasCost>,
	#[serde(default)]
	pub execution_duration: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifiFeeCost {
	pub name: String,
	pub percentage: String,
	pub amount: String,
	#[serde(rename = "amountUSD", default)]
	pub amount_usd: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifiGasCost {
	#[serde(rename = "type", default)]
	pub kind: Option<String>,
	/// Gas cost in the native token's base units.
	pub amount: String,
	#[serde(rename = "amountUSD", default)]
	pub amount_usd: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifiTransactionRequest {
	pub to: Address,
	pub data: Bytes,
	pub value: String,
	pub chain_id: u64,
	#[serde(default)]
	pub gas_limit: Option<String>,
	#[serde(default)]
	pub gas_price: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LifiStatus {
	status: String,
	#[serde(default)]
	substatus: Option<String>,
}

pub struct LifiAggregator {
	ctx: AggregatorContext,
	base_url: String,
	testnet_url: String,
	order: String,
	poller: StatusPoller,
}

impl LifiAggregator {
	pub fn new(ctx: AggregatorContext, base_url: &str, testnet_url: &str, poller_interval: Duration, max_polls: u32) -> Self {
		Self {
			ctx,
			base_url: base_url.trim_end_matches('/').to_string(),
			testnet_url: testnet_url.trim_end_matches('/').to_string(),
			order: "RECOMMENDED".to_string(),
			poller: StatusPoller::new(poller_interval, max_polls),
		}
	}

	fn url_for(&self, chain_id: u64) -> &str {
		if chain_id == 5 || chain_id == 80001 {
			&self.testnet_url
		} else {
			&self.base_url
		}
	}

	async fn bridge_status(&self, quote: &LifiQuote, route: &Route, tx_hash: B256) -> Result<ExecutionStatus, AggregatorError> {
		let request = &route.request;
		let url = format!("{}/status", self.url_for(request.from_chain));
		let query = [
			("bridge", quote.tool.clone()),
			("fromChain", request.from_chain.to_string()),
			("toChain", request.to_chain.to_string()),
			("txHash", tx_hash.to_string()),
		];

		let (url, query) = (&url, &query);
		let outcome = self
			.poller
			.poll("LiFi bridge status", move || async move {
				// The tx is already on chain; a failed lookup only means "not settled yet".
				let status: LifiStatus = match self.ctx.http.get(url).query(query).send().await {
					Ok(response) => match read_json(response).await {
						Ok(status) => status,
						Err(e) => {
							warn!(error = %e, %tx_hash, "LiFi status lookup failed");
							return Ok(None);
						}
					},
					Err(e) => {
						warn!(error = %e, %tx_hash, "LiFi status request failed");
						return Ok(None);
					}
				};
				info!(status = %status.status, substatus = ?status.substatus, "LiFi status");
				Ok(match status.status.as_str() {
					"DONE" => Some(ExecutionStatus::Done),
					"FAILED" => Some(ExecutionStatus::Failed),
					_ => None,
				})
			})
			.await;

		match outcome {
			Err(AggregatorError::StatusTimeout { attempts, .. }) => {
				warn!(attempts, %tx_hash, "Bridge transfer still pending");
				Ok(ExecutionStatus::Pending)
			}
			other => other,
		}
	}
}

pub struct LifiSchema;

impl ConfigSchema for LifiSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![
				Field::url("base_url"),
				Field::url("testnet_url"),
				Field::new("order", FieldType::String),
				Field::new(
					"status_poll_interval_ms",
					FieldType::Integer {
						min: Some(1),
						max: Some(120_000),
					},
				),
				Field::new(
					"status_max_attempts",
					FieldType::Integer {
						min: Some(1),
						max: Some(10_000),
					},
				),
			],
		)
		.validate(config)
	}
}

fn parse_quote(route: &Route) -> Result<LifiQuote, AggregatorError> {
	Ok(serde_json::from_value(route.quote.clone())?)
}

#[async_trait]
impl AggregatorInterface for LifiAggregator {
	fn protocol(&self) -> Protocol {
		Protocol::Lifi
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LifiSchema)
	}

	async fn build_route(&self, request: &RouteRequest) -> Result<Route, AggregatorError> {
		validate_chain(Protocol::Lifi, request.from_chain, Some(request.to_chain), None)?;
		validate_tokens(&request.from_token, &request.to_token, request.is_same_chain())?;
		validate_amount(&request.amount)?;
		let from_address = validate_keys(&self.ctx.config)?.public;

		let url = format!("{}/quote", self.url_for(request.from_chain));
		let query = [
			("fromChain", request.from_chain.to_string()),
			("toChain", request.to_chain.to_string()),
			("fromToken", request.from_token.clone()),
			("toToken", request.to_token.clone()),
			("fromAmount", request.amount.clone()),
			("fromAddress", from_address.to_checksum(None)),
			("order", self.order.clone()),
		];

		let stopwatch = Stopwatch::start("API Query");
		let response = self.ctx.http.get(&url).query(&query).send().await?;
		let quote: serde_json::Value = read_json(response).await?;
		let latency = stopwatch.finish();

		// Reject quotes we could not execute or report on.
		let parsed: LifiQuote = serde_json::from_value(quote.clone())?;
		info!(tool = %parsed.tool, to_amount = %parsed.estimate.to_amount, latency_ms = latency.latency, "LiFi quote");

		Ok(Route {
			request: request.clone(),
			quote,
			latency,
		})
	}

	async fn execute_route(&self, route: &Route) -> Result<Execution, AggregatorError> {
		let request = &route.request;
		let quote = parse_quote(route)?;
		let tx_request = quote
			.transaction_request
			.clone()
			.ok_or_else(|| AggregatorError::InvalidQuote("quote has no transactionRequest".to_string()))?;

		let stopwatch = Stopwatch::start("Execution");
		let (source, _) = validate_chain(Protocol::Lifi, request.from_chain, Some(request.to_chain), None)?;
		let token = source
			.token_address(&request.from_token)
			.ok_or_else(|| AggregatorError::UnsupportedToken {
				token: request.from_token.clone(),
				chain: source.to_string(),
			})?;
		let spender: Address = quote
			.estimate
			.approval_address
			.parse()
			.map_err(|_| AggregatorError::InvalidQuote("invalid approvalAddress".to_string()))?;
		let amount = validate_amount(&request.amount)?;

		self.ctx
			.delivery
			.approve_allowance(request.from_chain, token, spender, amount)
			.await?;

		let tx = Transaction::new(
			tx_request.chain_id,
			tx_request.to,
			tx_request.data.clone(),
			parse_amount(&tx_request.value)?,
		)
		.with_gas_limit(
			tx_request
				.gas_limit
				.as_deref()
				.and_then(|g| parse_amount(g).ok())
				.map(|g| g.saturating_to::<u64>()),
		)
		.with_gas_price(
			tx_request
				.gas_price
				.as_deref()
				.and_then(|g| parse_amount(g).ok())
				.map(|g| g.saturating_to::<u128>()),
		);

		let receipt = self.ctx.delivery.send_and_confirm(tx).await?;

		let status = if request.is_same_chain() {
			ExecutionStatus::Done
		} else {
			self.bridge_status(&quote, route, receipt.hash).await?
		};

		Ok(Execution {
			tx_hashes: vec![receipt.hash],
			order_uid: None,
			status,
			latency: stopwatch.finish(),
		})
	}

	async fn generate_report(&self, route: &Route, execution: Option<&Execution>) -> Result<ApiReport, AggregatorError> {
		let quote = parse_quote(route)?;
		let base = ReportBase::new(self.ctx.oracle.as_ref(), &route.request).await?;

		let fees: Vec<AggregatorFee> = quote
			.estimate
			.fee_costs
			.iter()
			.map(|fee| AggregatorFee {
				name: fee.name.clone(),
				amount: fee.amount.clone(),
				percentage: parse_decimal_or_zero(&fee.percentage),
				gas_price_gwei: None,
				usd_price: parse_decimal_or_zero(fee.amount_usd.as_deref().unwrap_or_default()),
			})
			.collect();
		let aggregator = Aggregator::new(
			quote.tool_details.name.clone(),
			Some(quote.estimate.approval_address.clone()),
			fees,
		);

		let (gas_cost_gwei, gas_cost_usd) = match quote.estimate.gas_costs.first() {
			Some(gas) => (
				wei_to_gwei(parse_amount(&gas.amount).unwrap_or(U256::ZERO))?,
				parse_decimal_or_zero(gas.amount_usd.as_deref().unwrap_or_default()),
			),
			None => Default::default(),
		};

		let trade_value = base.asset(
			&route.request,
			scale_two_decimals(parse_decimal_or_zero(quote.estimate.from_amount_usd.as_deref().unwrap_or_default())),
			scale_two_decimals(parse_decimal_or_zero(quote.estimate.to_amount_usd.as_deref().unwrap_or_default())),
			gas_cost_gwei,
			gas_cost_usd,
		);
		let net_fee = aggregator.total_fee + gas_cost_usd;

		Ok(base.finish(route, execution, aggregator, trade_value, net_fee))
	}
}

/// Creates the LiFi plugin from its `[protocols.lifi]` table.
pub fn create_lifi(ctx: AggregatorContext, config: &toml::Value) -> Result<Box<dyn AggregatorInterface>, AggregatorError> {
	LifiSchema.validate(config)?;

	let mut aggregator = LifiAggregator::new(
		ctx,
		table_str(config, "base_url").unwrap_or(LIFI_STAGING_URL),
		table_str(config, "testnet_url").unwrap_or(LIFI_STAGING_URL),
		Duration::from_millis(table_u64(config, "status_poll_interval_ms").unwrap_or(5_000)),
		table_u64(config, "status_max_attempts").unwrap_or(120) as u32,
	);
	if let Some(order) = table_str(config, "order") {
		aggregator.order = order.to_string();
	}
	Ok(Box::new(aggregator))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing;
	use bench_delivery::MockDelivery;
	use bench_types::RouteOptions;
	use rust_decimal::Decimal;
	use serde_json::json;
	use wiremock::matchers::{method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const DIAMOND: &str = "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE";

	fn quote_json() -> serde_json::Value {
		json!({
			"id": "0x6ad2",
			"type": "lifi",
			"tool": "stargate",
			"toolDetails": { "key": "stargate", "name": "Stargate", "logoURI": "" },
			"estimate": {
				"tool": "stargate",
				"approvalAddress": DIAMOND,
				"fromAmount": "1000000000000000000",
				"toAmount": "3990000000000000000000",
				"toAmountMin": "3970000000000000000000",
				"fromAmountUSD": "2000.004",
				"toAmountUSD": "1995.126",
				"feeCosts": [
					{ "name": "LP Fee", "percentage": "0.0006", "amount": "600000000000000", "amountUSD": "1.20" },
					{ "name": "Relayer Fee", "percentage": "0.0002", "amount": "200000000000000", "amountUSD": "0.40" }
				],
				"gasCosts": [
					{ "type": "SEND", "estimate": "210000", "limit": "300000", "amount": "4200000000000000", "amountUSD": "8.40" }
				],
				"executionDuration": 60
			},
			"transactionRequest": {
				"from": testing::PUBLIC_KEY,
				"to": DIAMOND,
				"data": "0xdeadbeef",
				"value": "0x0de0b6b3a7640000",
				"chainId": 1,
				"gasLimit": "0x493e0",
				"gasPrice": "0x4a817c800"
			}
		})
	}

	fn request(to_chain: u64) -> RouteRequest {
		RouteRequest {
			protocol: Protocol::Lifi,
			from_chain: 1,
			to_chain,
			from_token: "ETH".to_string(),
			to_token: "MATIC".to_string(),
			amount: "1000000000000000000".to_string(),
			options: RouteOptions::default(),
		}
	}

	fn plugin(server: &MockServer, deliveries: Vec<MockDelivery>) -> Box<dyn AggregatorInterface> {
		let table = testing::table(&[
			("base_url", toml::Value::String(server.uri())),
			("status_poll_interval_ms", toml::Value::Integer(1)),
			("status_max_attempts", toml::Value::Integer(3)),
		]);
		create_lifi(testing::context_with(deliveries), &table).unwrap()
	}

	#[tokio::test]
	async fn test_build_route_queries_quote() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/quote"))
			.and(query_param("fromChain", "1"))
			.and(query_param("toChain", "137"))
			.and(query_param("fromToken", "ETH"))
			.and(query_param("fromAmount", "1000000000000000000"))
			.and(query_param("fromAddress", testing::PUBLIC_KEY))
			.and(query_param("order", "RECOMMENDED"))
			.respond_with(ResponseTemplate::new(200).set_body_json(quote_json()))
			.expect(1)
			.mount(&server)
			.await;

		let route = plugin(&server, vec![]).build_route(&request(137)).await.unwrap();
		assert_eq!(route.latency.name, "API Query");
		assert_eq!(route.quote["tool"], "stargate");
	}

	#[tokio::test]
	async fn test_build_route_reports_http_status() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;

		let err = plugin(&server, vec![]).build_route(&request(137)).await.unwrap_err();
		assert_eq!(err.to_string(), "Request failed with status: 500");
	}

	#[tokio::test]
	async fn test_build_route_validates_before_querying() {
		let server = MockServer::start().await;
		let mut bad = request(137);
		bad.from_chain = 11155111;

		let err = plugin(&server, vec![]).build_route(&bad).await.unwrap_err();
		assert_eq!(err.to_string(), "Invalid chain_id: 11155111 for protocol: LIFI");
		assert!(server.received_requests().await.unwrap_or_default().is_empty());
	}

	#[tokio::test]
	async fn test_report_sums_fees_and_gas() {
		let server = MockServer::start().await;
		let route = Route {
			request: request(137),
			quote: quote_json(),
			latency: Stopwatch::start("API Query").finish(),
		};

		let report = plugin(&server, vec![]).generate_report(&route, None).await.unwrap();
		let d = |s: &str| s.parse::<Decimal>().unwrap();

		assert_eq!(report.aggregator.name, "Stargate");
		assert_eq!(report.aggregator.fee.len(), 2);
		assert_eq!(report.aggregator.total_fee, d("1.60"));
		assert_eq!(report.trade_value.actual_value_usd, d("2000.00"));
		assert_eq!(report.trade_value.effective_trade_value_usd, d("1995.13"));
		assert_eq!(report.trade_value.approximated_gas_cost_gwei, d("4200000"));
		assert_eq!(report.trade_value.effective_trade_value_usd_with_gas, d("1986.73"));
		assert_eq!(report.net_fee.name, "TOTAL FEE WITH GAS");
		assert_eq!(report.net_fee.amount_usd, d("10.00"));
		assert_eq!(
			report.trade_value.description,
			"Trade value of 1 ETH from ETHEREUM to POLYGON for MATIC"
		);
	}

	#[tokio::test]
	async fn test_execute_cross_chain_waits_for_bridge() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/status"))
			.and(query_param("bridge", "stargate"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "DONE" })))
			.expect(1)
			.mount(&server)
			.await;

		let delivery = MockDelivery::new(1);
		let submitted = delivery.submissions();
		let route = Route {
			request: request(137),
			quote: quote_json(),
			latency: Stopwatch::start("API Query").finish(),
		};

		let execution = plugin(&server, vec![delivery]).execute_route(&route).await.unwrap();
		assert_eq!(execution.status, ExecutionStatus::Done);
		assert_eq!(execution.tx_hashes.len(), 1);

		let submitted = submitted.lock().unwrap();
		assert_eq!(submitted.len(), 1);
		assert_eq!(submitted[0].to, DIAMOND.parse::<Address>().unwrap());
		assert_eq!(submitted[0].value, U256::from(10u128.pow(18)));
		assert_eq!(submitted[0].gas_limit, Some(300_000));
	}

	#[tokio::test]
	async fn test_execute_reports_pending_when_bridge_is_slow() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/status"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "PENDING" })))
			.expect(3)
			.mount(&server)
			.await;

		let route = Route {
			request: request(137),
			quote: quote_json(),
			latency: Stopwatch::start("API Query").finish(),
		};

		let execution = plugin(&server, vec![MockDelivery::new(1)]).execute_route(&route).await.unwrap();
		assert_eq!(execution.status, ExecutionStatus::Pending);
	}

	#[tokio::test]
	async fn test_execute_keeps_tx_when_status_lookup_fails() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/status"))
			.respond_with(ResponseTemplate::new(404).set_body_string("tx not indexed"))
			.expect(3)
			.mount(&server)
			.await;

		let delivery = MockDelivery::new(1);
		let submitted = delivery.submissions();
		let route = Route {
			request: request(137),
			quote: quote_json(),
			latency: Stopwatch::start("API Query").finish(),
		};

		let execution = plugin(&server, vec![delivery]).execute_route(&route).await.unwrap();
		assert_eq!(execution.status, ExecutionStatus::Pending);
		assert_eq!(execution.tx_hashes.len(), 1);
		assert_eq!(submitted.lock().unwrap().len(), 1);
	}
}
