//! Socket (Bungee) REST API v2.
//!
//! Single-transaction routes are built with `POST /build-tx`. Multi-transaction
//! routes are started with `POST /route/start` and advanced one user
//! transaction at a time through `/route/prepare` and `/route/build-next-tx`.

use crate::http::{read_json, table_str, table_u64};
use crate::poll::StatusPoller;
use crate::report::ReportBase;
use crate::{AggregatorContext, AggregatorError, AggregatorInterface};
use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use bench_config::{validate_amount, validate_api_key, validate_chain, validate_keys, validate_tokens};
use bench_types::{
	parse_amount, scale_two_decimals, wei_to_gwei, Aggregator, AggregatorFee, ApiReport, Chain,
	ConfigSchema, Execution, ExecutionStatus, Field, FieldType, Protocol, Route, RouteRequest, Schema,
	Stopwatch, Transaction, ValidationError,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

pub const SOCKET_API_URL: &str = "https://api.socket.tech/v2";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
	#[serde(default = "default_success")]
	success: bool,
	result: T,
}

fn default_success() -> bool {
	true
}

#[derive(Debug, Deserialize)]
struct QuoteResult {
	#[serde(default)]
	routes: Vec<serde_json::Value>,
}

/// The fields of a Socket route the benchmark reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketRoute {
	pub route_id: String,
	pub from_amount: String,
	pub to_amount: String,
	#[serde(default)]
	pub used_bridge_names: Vec<String>,
	#[serde(default)]
	pub total_user_tx: u32,
	#[serde(default)]
	pub total_gas_fees_in_usd: Option<Decimal>,
	#[serde(default)]
	pub input_value_in_usd: Option<Decimal>,
	#[serde(default)]
	pub output_value_in_usd: Option<Decimal>,
	#[serde(default)]
	pub user_txs: Vec<SocketUserTx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketUserTx {
	#[serde(default)]
	pub user_tx_type: Option<String>,
	#[serde(default)]
	pub protocol: Option<SocketProtocol>,
	#[serde(default)]
	pub protocol_fees: Option<SocketProtocolFees>,
	#[serde(default)]
	pub gas_fees: Option<SocketGasFees>,
	#[serde(default)]
	pub steps: Vec<SocketStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketStep {
	#[serde(default)]
	pub protocol: Option<SocketProtocol>,
	#[serde(default)]
	pub protocol_fees: Option<SocketProtocolFees>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketProtocol {
	pub name: String,
	#[serde(default)]
	pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketProtocolFees {
	pub asset: SocketAsset,
	pub amount: String,
	pub fees_in_usd: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketAsset {
	pub symbol: String,
	pub decimals: u32,
	pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketGasFees {
	/// Gas cost in the native token's base units.
	pub gas_amount: String,
	pub fees_in_usd: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApprovalData {
	allowance_target: Address,
	approval_token_address: Address,
	minimum_approval_amount: String,
}

/// A user transaction as returned by `build-tx`, `route/start` and `route/build-next-tx`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxDetails {
	tx_target: Address,
	tx_data: Bytes,
	value: String,
	chain_id: u64,
	#[serde(default)]
	approval_data: Option<ApprovalData>,
	#[serde(default)]
	active_route_id: Option<u64>,
	#[serde(default)]
	user_tx_index: Option<u32>,
	#[serde(default)]
	total_user_tx: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeStatus {
	#[serde(default)]
	destination_tx_status: Option<String>,
}

pub struct SocketAggregator {
	ctx: AggregatorContext,
	base_url: String,
	poller: StatusPoller,
}

impl SocketAggregator {
	pub fn new(ctx: AggregatorContext, base_url: &str, poll_interval: Duration, max_polls: u32) -> Self {
		Self {
			ctx,
			base_url: base_url.trim_end_matches('/').to_string(),
			poller: StatusPoller::new(poll_interval, max_polls),
		}
	}

	fn api_key(&self) -> Result<String, AggregatorError> {
		Ok(validate_api_key(&self.ctx.config, Protocol::Socket)?)
	}

	async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, AggregatorError> {
		let response = self
			.ctx
			.http
			.get(format!("{}{}", self.base_url, path))
			.header("API-KEY", self.api_key()?)
			.query(query)
			.send()
			.await?;
		unwrap_envelope(read_json(response).await?)
	}

	async fn post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T, AggregatorError> {
		let response = self
			.ctx
			.http
			.post(format!("{}{}", self.base_url, path))
			.header("API-KEY", self.api_key()?)
			.json(body)
			.send()
			.await?;
		unwrap_envelope(read_json(response).await?)
	}

	/// A status read made after a submission. Failures are logged and read as "not yet".
	async fn lookup<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Option<T> {
		match self.get(path, query).await {
			Ok(value) => Some(value),
			Err(e) => {
				warn!(error = %e, path, "Socket lookup failed");
				None
			}
		}
	}

	/// Approves the route's spender if needed, then sends the user transaction.
	async fn run_user_tx(&self, details: &TxDetails) -> Result<B256, AggregatorError> {
		if let Some(approval) = &details.approval_data {
			self.ctx
				.delivery
				.approve_allowance(
					details.chain_id,
					approval.approval_token_address,
					approval.allowance_target,
					parse_amount(&approval.minimum_approval_amount)?,
				)
				.await?;
		}

		let tx = Transaction::new(
			details.chain_id,
			details.tx_target,
			details.tx_data.clone(),
			parse_amount(&details.value)?,
		);
		let receipt = self.ctx.delivery.send_and_confirm(tx).await?;
		Ok(receipt.hash)
	}

	async fn execute_single(&self, route: &Route, raw_route: &serde_json::Value) -> Result<(Vec<B256>, ExecutionStatus), AggregatorError> {
		let details: TxDetails = self.post("/build-tx", &json!({ "route": raw_route })).await?;
		let hash = self.run_user_tx(&details).await?;

		if route.request.is_same_chain() {
			return Ok((vec![hash], ExecutionStatus::Done));
		}

		let query = [
			("transactionHash", hash.to_string()),
			("fromChainId", route.request.from_chain.to_string()),
			("toChainId", route.request.to_chain.to_string()),
		];
		let query = &query;
		let outcome = self
			.poller
			.poll("Socket bridge status", move || async move {
				let Some(status) = self.lookup::<BridgeStatus>("/bridge-status", query).await else {
					return Ok(None);
				};
				Ok(match status.destination_tx_status.as_deref() {
					Some("COMPLETED") => Some(ExecutionStatus::Done),
					Some("FAILED") => Some(ExecutionStatus::Failed),
					_ => None,
				})
			})
			.await;

		Ok((vec![hash], settle(outcome)?))
	}

	async fn execute_multi(&self, route: &Route, raw_route: &serde_json::Value) -> Result<(Vec<B256>, ExecutionStatus), AggregatorError> {
		let request = &route.request;
		let (source, destination) = chains_of(request)?;
		let body = json!({
			"fromChainId": request.from_chain,
			"toChainId": request.to_chain,
			"fromAssetAddress": token_address(source, &request.from_token)?,
			"toAssetAddress": token_address(destination, &request.to_token)?,
			"includeFirstTxDetails": true,
			"route": raw_route,
		});

		let mut details: TxDetails = self.post("/route/start", &body).await?;
		let active_route_id = details
			.active_route_id
			.ok_or_else(|| AggregatorError::InvalidQuote("route/start returned no activeRouteId".to_string()))?;
		let total = details.total_user_tx.unwrap_or(1);
		let mut hashes = Vec::new();

		loop {
			let index = details.user_tx_index.unwrap_or(0);
			info!(active_route_id, index, total, chain_id = details.chain_id, "Executing Socket user tx");

			let hash = self.run_user_tx(&details).await?;
			hashes.push(hash);

			let query = [
				("activeRouteId", active_route_id.to_string()),
				("userTxIndex", index.to_string()),
				("txHash", hash.to_string()),
			];
			let query = &query;
			let outcome = self
				.poller
				.poll("Socket user tx", move || async move {
					let Some(status) = self.lookup::<String>("/route/prepare", query).await else {
						return Ok(None);
					};
					Ok(match status.as_str() {
						"completed" => Some(ExecutionStatus::Done),
						"failed" => Some(ExecutionStatus::Failed),
						_ => None,
					})
				})
				.await;

			let status = settle(outcome)?;
			if status != ExecutionStatus::Done || index + 1 >= total {
				return Ok((hashes, status));
			}

			// Earlier user txs are on chain, so a missing next tx leaves the route pending.
			details = match self
				.lookup("/route/build-next-tx", &[("activeRouteId", active_route_id.to_string())])
				.await
			{
				Some(next) => next,
				None => return Ok((hashes, ExecutionStatus::Pending)),
			};
		}
	}
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, AggregatorError> {
	if !envelope.success {
		return Err(AggregatorError::Vendor("Socket request was not successful".to_string()));
	}
	Ok(envelope.result)
}

/// Maps a polling cap to a pending status; other errors propagate.
fn settle(outcome: Result<ExecutionStatus, AggregatorError>) -> Result<ExecutionStatus, AggregatorError> {
	match outcome {
		Err(AggregatorError::StatusTimeout { what, attempts }) => {
			warn!(what, attempts, "Socket route still pending");
			Ok(ExecutionStatus::Pending)
		}
		other => other,
	}
}

fn chains_of(request: &RouteRequest) -> Result<(Chain, Chain), AggregatorError> {
	Ok(validate_chain(Protocol::Socket, request.from_chain, Some(request.to_chain), None)?)
}

fn token_address(chain: Chain, symbol: &str) -> Result<Address, AggregatorError> {
	chain
		.token_address(symbol)
		.ok_or_else(|| AggregatorError::UnsupportedToken {
			token: symbol.to_string(),
			chain: chain.to_string(),
		})
}

pub struct SocketSchema;

impl ConfigSchema for SocketSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![
				Field::url("base_url"),
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

fn parse_route(route: &Route) -> Result<SocketRoute, AggregatorError> {
	Ok(serde_json::from_value(route.quote.clone())?)
}

#[async_trait]
impl AggregatorInterface for SocketAggregator {
	fn protocol(&self) -> Protocol {
		Protocol::Socket
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SocketSchema)
	}

	async fn build_route(&self, request: &RouteRequest) -> Result<Route, AggregatorError> {
		self.api_key()?;
		let (source, destination) = chains_of(request)?;
		validate_tokens(&request.from_token, &request.to_token, request.is_same_chain())?;
		let user_address = validate_keys(&self.ctx.config)?.public;
		validate_amount(&request.amount)?;

		let query = [
			("fromChainId", request.from_chain.to_string()),
			("fromTokenAddress", token_address(source, &request.from_token)?.to_checksum(None)),
			("toChainId", request.to_chain.to_string()),
			("toTokenAddress", token_address(destination, &request.to_token)?.to_checksum(None)),
			("fromAmount", request.amount.clone()),
			("userAddress", user_address.to_checksum(None)),
			("uniqueRoutesPerBridge", "true".to_string()),
			("sort", "output".to_string()),
			("singleTxOnly", (!request.options.multi_tx).to_string()),
			("bridgeWithGas", "false".to_string()),
		];

		let stopwatch = Stopwatch::start("API Query");
		let result: QuoteResult = self.get("/quote", &query).await?;
		let latency = stopwatch.finish();

		// Routes arrive sorted by output amount.
		let best = result.routes.into_iter().next().ok_or(AggregatorError::NoQuote)?;
		let parsed: SocketRoute = serde_json::from_value(best.clone())?;
		info!(
			route_id = %parsed.route_id,
			bridges = ?parsed.used_bridge_names,
			user_txs = parsed.total_user_tx,
			latency_ms = latency.latency,
			"Socket quote"
		);

		Ok(Route {
			request: request.clone(),
			quote: best,
			latency,
		})
	}

	async fn execute_route(&self, route: &Route) -> Result<Execution, AggregatorError> {
		let stopwatch = Stopwatch::start("Execution");
		let (tx_hashes, status) = if route.request.options.multi_tx {
			self.execute_multi(route, &route.quote).await?
		} else {
			self.execute_single(route, &route.quote).await?
		};

		Ok(Execution {
			tx_hashes,
			order_uid: None,
			status,
			latency: stopwatch.finish(),
		})
	}

	async fn generate_report(&self, route: &Route, execution: Option<&Execution>) -> Result<ApiReport, AggregatorError> {
		let quote = parse_route(route)?;
		let base = ReportBase::new(self.ctx.oracle.as_ref(), &route.request).await?;

		let input_usd = scale_two_decimals(quote.input_value_in_usd.unwrap_or_default());
		let output_usd = scale_two_decimals(quote.output_value_in_usd.unwrap_or_default());
		let gas_usd = quote.total_gas_fees_in_usd.unwrap_or_default();

		let mut gas_wei = alloy::primitives::U256::ZERO;
		let mut fees = Vec::new();
		for user_tx in &quote.user_txs {
			if let Some(gas) = &user_tx.gas_fees {
				gas_wei += parse_amount(&gas.gas_amount)?;
			}

			let protocol_fees = user_tx
				.protocol_fees
				.iter()
				.map(|f| (user_tx.protocol.as_ref(), f))
				.chain(
					user_tx
						.steps
						.iter()
						.filter_map(|s| s.protocol_fees.as_ref().map(|f| (s.protocol.as_ref(), f))),
				);
			for (protocol, fee) in protocol_fees {
				let name = protocol
					.map(|p| p.display_name.clone().unwrap_or_else(|| p.name.clone()))
					.unwrap_or_else(|| fee.asset.symbol.clone());
				let percentage = if input_usd.is_zero() {
					Decimal::ZERO
				} else {
					fee.fees_in_usd / input_usd
				};
				fees.push(AggregatorFee {
					name: format!("{} Fee", name),
					amount: fee.amount.clone(),
					percentage,
					gas_price_gwei: None,
					usd_price: fee.fees_in_usd,
				});
			}
		}

		let name = if quote.used_bridge_names.is_empty() {
			"socket".to_string()
		} else {
			quote.used_bridge_names.join("+")
		};
		let aggregator = Aggregator::new(name, None, fees);
		let trade_value = base.asset(&route.request, input_usd, output_usd, wei_to_gwei(gas_wei)?, gas_usd);
		let net_fee = aggregator.total_fee + gas_usd;

		Ok(base.finish(route, execution, aggregator, trade_value, net_fee))
	}
}

/// Creates the Socket plugin from its `[protocols.socket]` table.
pub fn create_socket(ctx: AggregatorContext, config: &toml::Value) -> Result<Box<dyn AggregatorInterface>, AggregatorError> {
	SocketSchema.validate(config)?;

	Ok(Box::new(SocketAggregator::new(
		ctx,
		table_str(config, "base_url").unwrap_or(SOCKET_API_URL),
		Duration::from_millis(table_u64(config, "status_poll_interval_ms").unwrap_or(10_000)),
		table_u64(config, "status_max_attempts").unwrap_or(90) as u32,
	)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing;
	use alloy::primitives::{address, U256};
	use bench_delivery::MockDelivery;
	use bench_types::RouteOptions;
	use wiremock::matchers::{body_partial_json, header, method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const USDC_POLYGON: Address = address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174");
	const BUNGEE_GATEWAY: Address = address!("3a23F943181408EAC424116Af7b7790c94Cb97a5");
	const ALLOWANCE_TARGET: Address = address!("2ddf16BA6d0180e5357d5e170eF1917a01b41fc0");

	fn route_json() -> serde_json::Value {
		json!({
			"routeId": "a2f5-7e21",
			"isOnlySwapRoute": false,
			"fromAmount": "100000000",
			"toAmount": "99400000",
			"usedBridgeNames": ["hop"],
			"totalUserTx": 1,
			"totalGasFeesInUsd": 0.31,
			"recipient": testing::PUBLIC_KEY,
			"sender": testing::PUBLIC_KEY,
			"inputValueInUsd": 100.004,
			"outputValueInUsd": 99.396,
			"userTxs": [{
				"userTxType": "fund-movr",
				"txType": "eth_sendTransaction",
				"chainId": 137,
				"gasFees": {
					"gasAmount": "9000000000000000",
					"gasLimit": 300000,
					"feesInUsd": 0.31
				},
				"steps": [{
					"type": "bridge",
					"protocol": { "name": "hop", "displayName": "Hop" },
					"protocolFees": {
						"asset": { "symbol": "USDC", "decimals": 6, "address": USDC_POLYGON },
						"amount": "400000",
						"feesInUsd": 0.4
					}
				}]
			}]
		})
	}

	fn request(multi_tx: bool) -> RouteRequest {
		RouteRequest {
			protocol: Protocol::Socket,
			from_chain: 137,
			to_chain: 42161,
			from_token: "USDC".to_string(),
			to_token: "USDC".to_string(),
			amount: "100000000".to_string(),
			options: RouteOptions {
				multi_tx,
				..Default::default()
			},
		}
	}

	fn route(multi_tx: bool) -> Route {
		Route {
			request: request(multi_tx),
			quote: route_json(),
			latency: Stopwatch::start("API Query").finish(),
		}
	}

	fn plugin(server: &MockServer, deliveries: Vec<MockDelivery>) -> Box<dyn AggregatorInterface> {
		let table = testing::table(&[
			("base_url", toml::Value::String(server.uri())),
			("status_poll_interval_ms", toml::Value::Integer(1)),
			("status_max_attempts", toml::Value::Integer(3)),
		]);
		create_socket(testing::context_with(deliveries), &table).unwrap()
	}

	fn polygon_without_allowance() -> MockDelivery {
		MockDelivery::new(137).with_call_response(USDC_POLYGON, Bytes::from(U256::ZERO.to_be_bytes::<32>().to_vec()))
	}

	fn tx_details(index: u32, total: u32) -> serde_json::Value {
		json!({
			"activeRouteId": 4211,
			"userTxIndex": index,
			"totalUserTx": total,
			"userTxType": "fund-movr",
			"txTarget": BUNGEE_GATEWAY,
			"txData": "0xa44bbb15",
			"value": "0x00",
			"chainId": 137,
			"approvalData": {
				"minimumApprovalAmount": "100000000",
				"approvalTokenAddress": USDC_POLYGON,
				"allowanceTarget": ALLOWANCE_TARGET,
				"owner": testing::PUBLIC_KEY
			}
		})
	}

	#[tokio::test]
	async fn test_build_route_takes_best_route() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/quote"))
			.and(header("API-KEY", "test-socket-key"))
			.and(query_param("fromTokenAddress", USDC_POLYGON.to_checksum(None)))
			.and(query_param("singleTxOnly", "true"))
			.and(query_param("sort", "output"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"success": true,
				"result": { "routes": [route_json(), { "routeId": "worse" }] }
			})))
			.expect(1)
			.mount(&server)
			.await;

		let route = plugin(&server, vec![]).build_route(&request(false)).await.unwrap();
		assert_eq!(route.quote["routeId"], "a2f5-7e21");
		assert_eq!(route.latency.name, "API Query");
	}

	#[tokio::test]
	async fn test_build_route_without_routes() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/quote"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"success": true,
				"result": { "routes": [] }
			})))
			.mount(&server)
			.await;

		let err = plugin(&server, vec![]).build_route(&request(false)).await.unwrap_err();
		assert_eq!(err.to_string(), "no quote available");
	}

	#[tokio::test]
	async fn test_build_route_requires_api_key() {
		let server = MockServer::start().await;
		let mut config = testing::config();
		config.keys.socket_api_key = None;
		let plugin = create_socket(
			testing::context_from(config, vec![]),
			&testing::table(&[("base_url", toml::Value::String(server.uri()))]),
		)
		.unwrap();

		let err = plugin.build_route(&request(false)).await.unwrap_err();
		assert_eq!(err.to_string(), "Missing Socket API Key. Get it from the Socket Docs.");
	}

	#[tokio::test]
	async fn test_build_route_rejects_goerli() {
		let server = MockServer::start().await;
		let mut goerli = request(false);
		goerli.from_chain = 5;
		goerli.to_chain = 5;
		goerli.to_token = "WETH".to_string();

		let err = plugin(&server, vec![]).build_route(&goerli).await.unwrap_err();
		assert_eq!(err.to_string(), "Invalid chain_id: 5 for protocol: SOCKET");
	}

	#[tokio::test]
	async fn test_single_tx_is_sent_to_tx_target() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/build-tx"))
			.and(body_partial_json(json!({ "route": { "routeId": "a2f5-7e21" } })))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": tx_details(0, 1) })))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/bridge-status"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"success": true,
				"result": { "sourceTxStatus": "COMPLETED", "destinationTxStatus": "COMPLETED" }
			})))
			.mount(&server)
			.await;

		let delivery = polygon_without_allowance();
		let submitted = delivery.submissions();
		let execution = plugin(&server, vec![delivery]).execute_route(&route(false)).await.unwrap();

		assert_eq!(execution.status, ExecutionStatus::Done);
		assert_eq!(execution.tx_hashes.len(), 1);

		let submitted = submitted.lock().unwrap();
		assert_eq!(submitted.len(), 2, "approval then swap");
		assert_eq!(submitted[0].to, USDC_POLYGON);
		assert_eq!(submitted[1].to, BUNGEE_GATEWAY);
	}

	#[tokio::test]
	async fn test_multi_tx_runs_every_user_tx() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/route/start"))
			.and(body_partial_json(json!({ "includeFirstTxDetails": true, "fromChainId": 137 })))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": tx_details(0, 2) })))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/route/prepare"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": "completed" })))
			.expect(2)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/route/build-next-tx"))
			.and(query_param("activeRouteId", "4211"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": tx_details(1, 2) })))
			.expect(1)
			.mount(&server)
			.await;

		let delivery = polygon_without_allowance();
		let submitted = delivery.submissions();
		let execution = plugin(&server, vec![delivery]).execute_route(&route(true)).await.unwrap();

		assert_eq!(execution.status, ExecutionStatus::Done);
		assert_eq!(execution.tx_hashes.len(), 2);
		// The mock allowance stays at zero, so both user txs approve first.
		assert_eq!(submitted.lock().unwrap().len(), 4);
	}

	#[tokio::test]
	async fn test_report_collects_bridge_fees() {
		let server = MockServer::start().await;
		let report = plugin(&server, vec![]).generate_report(&route(false), None).await.unwrap();
		let d = |s: &str| s.parse::<Decimal>().unwrap();

		assert_eq!(report.aggregator.name, "hop");
		assert_eq!(report.aggregator.fee.len(), 1);
		assert_eq!(report.aggregator.fee[0].name, "Hop Fee");
		assert_eq!(report.aggregator.total_fee, d("0.4"));
		assert_eq!(report.trade_value.actual_value_usd, d("100.00"));
		assert_eq!(report.trade_value.effective_trade_value_usd, d("99.40"));
		assert_eq!(report.trade_value.approximated_gas_cost_gwei, d("9000000"));
		assert_eq!(report.net_fee.amount_usd, d("0.71"));
		assert_eq!(report.source_network.name, "POLYGON");
		assert_eq!(report.destination_network.name, "ARBITRUM");
	}

	#[tokio::test]
	async fn test_single_tx_stays_pending_when_status_lookup_fails() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/build-tx"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": tx_details(0, 1) })))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/bridge-status"))
			.respond_with(ResponseTemplate::new(404))
			.expect(3)
			.mount(&server)
			.await;

		let execution = plugin(&server, vec![polygon_without_allowance()])
			.execute_route(&route(false))
			.await
			.unwrap();
		assert_eq!(execution.status, ExecutionStatus::Pending);
		assert_eq!(execution.tx_hashes.len(), 1);
	}

	#[tokio::test]
	async fn test_multi_tx_keeps_hashes_when_next_tx_is_unavailable() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/route/start"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": tx_details(0, 2) })))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/route/prepare"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": "completed" })))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/route/build-next-tx"))
			.respond_with(ResponseTemplate::new(503))
			.expect(1)
			.mount(&server)
			.await;

		let delivery = polygon_without_allowance();
		let submitted = delivery.submissions();
		let execution = plugin(&server, vec![delivery]).execute_route(&route(true)).await.unwrap();

		assert_eq!(execution.status, ExecutionStatus::Pending);
		assert_eq!(execution.tx_hashes.len(), 1);
		assert_eq!(submitted.lock().unwrap().len(), 2, "approval then first user tx");
	}
}
