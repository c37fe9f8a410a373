//! XY Finance aggregator API.

use crate::http::{read_json, table_str};
use crate::report::{chain_of, price_or_none, ReportBase};
use crate::{AggregatorContext, AggregatorError, AggregatorInterface};
use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use bench_config::{validate_amount, validate_chain, validate_keys, validate_tokens};
use bench_types::{
	parse_amount, scale_two_decimals, to_decimal, wei_to_gwei, Aggregator,
	AggregatorFee, ApiReport, Chain, ConfigSchema, Execution, ExecutionStatus, Field, Protocol, Route,
	RouteRequest, Schema, Stopwatch, Transaction, ValidationError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const XY_API_URL: &str = "https://aggregator-api.xy.finance/v1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
	success: bool,
	#[serde(default)]
	error_msg: Option<String>,
	#[serde(default)]
	routes: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XyRoute {
	pub src_chain_id: u64,
	pub src_quote_token_address: Address,
	pub src_quote_token_amount: String,
	#[serde(default)]
	pub src_quote_token_usd_value: Option<String>,
	pub dst_chain_id: u64,
	pub dst_quote_token_address: Address,
	pub dst_quote_token_amount: String,
	#[serde(default)]
	pub dst_quote_token_usd_value: Option<String>,
	/// Gas units for the source transaction.
	#[serde(default)]
	pub estimated_gas: Option<String>,
	/// Spender for same-chain swaps, which carry no bridge description.
	#[serde(default)]
	pub contract_address: Option<Address>,
	#[serde(default)]
	pub bridge_description: Option<XyBridgeDescription>,
	pub src_swap_description: XySwapDescription,
	#[serde(default)]
	pub dst_swap_description: Option<XySwapDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XyBridgeDescription {
	pub provider: String,
	pub src_bridge_token_address: Address,
	pub dst_bridge_token_address: Address,
	pub bridge_contract_address: Address,
	#[serde(default)]
	pub bridge_fee_amount: Option<String>,
	#[serde(default)]
	pub bridge_fee_token: Option<XyToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XyToken {
	pub symbol: String,
	pub decimals: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XySwapDescription {
	pub provider: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildTxResponse {
	success: bool,
	#[serde(default)]
	error_msg: Option<String>,
	tx: Option<XyTx>,
}

#[derive(Debug, Deserialize)]
struct XyTx {
	to: Address,
	data: Bytes,
	value: String,
}

impl XyRoute {
	fn spender(&self) -> Result<Address, AggregatorError> {
		self.bridge_description
			.as_ref()
			.map(|b| b.bridge_contract_address)
			.or(self.contract_address)
			.ok_or_else(|| AggregatorError::InvalidQuote("route has no spender contract".to_string()))
	}

	fn provider(&self) -> &str {
		self.bridge_description
			.as_ref()
			.map(|b| b.provider.as_str())
			.unwrap_or(&self.src_swap_description.provider)
	}
}

/// Slippage in percent, as the XY API expects it.
fn slippage_percent(bps: u32) -> String {
	(Decimal::from(bps) / Decimal::from(100)).normalize().to_string()
}

fn token_address(chain: Chain, symbol: &str) -> Result<Address, AggregatorError> {
	chain
		.token_address(symbol)
		.ok_or_else(|| AggregatorError::UnsupportedToken {
			token: symbol.to_string(),
			chain: chain.to_string(),
		})
}

fn vendor_error(message: Option<String>) -> AggregatorError {
	AggregatorError::Vendor(message.unwrap_or_else(|| "XY request was not successful".to_string()))
}

pub struct XyAggregator {
	ctx: AggregatorContext,
	base_url: String,
}

impl XyAggregator {
	pub fn new(ctx: AggregatorContext, base_url: &str) -> Self {
		Self {
			ctx,
			base_url: base_url.trim_end_matches('/').to_string(),
		}
	}

	fn build_tx_query(&self, route: &XyRoute, request: &RouteRequest) -> Result<Vec<(&'static str, String)>, AggregatorError> {
		let receiver = validate_keys(&self.ctx.config)?.public;

		let mut query = vec![
			("srcChainId", route.src_chain_id.to_string()),
			("srcQuoteTokenAddress", route.src_quote_token_address.to_checksum(None)),
			("srcQuoteTokenAmount", route.src_quote_token_amount.clone()),
			("dstChainId", route.dst_chain_id.to_string()),
			("dstQuoteTokenAddress", route.dst_quote_token_address.to_checksum(None)),
			("slippage", slippage_percent(request.options.slippage_bps)),
			("receiver", receiver.to_checksum(None)),
			("affiliate", Address::ZERO.to_checksum(None)),
			("commissionRate", "0".to_string()),
		];
		if let Some(bridge) = &route.bridge_description {
			query.push(("bridgeProvider", bridge.provider.clone()));
			query.push(("srcBridgeTokenAddress", bridge.src_bridge_token_address.to_checksum(None)));
			query.push(("dstBridgeTokenAddress", bridge.dst_bridge_token_address.to_checksum(None)));
		}
		query.push(("srcSwapProvider", route.src_swap_description.provider.clone()));
		if let Some(dst_swap) = &route.dst_swap_description {
			query.push(("dstSwapProvider", dst_swap.provider.clone()));
		}
		Ok(query)
	}
}

pub struct XySchema;

impl ConfigSchema for XySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![Field::url("base_url")]).validate(config)
	}
}

/// A USD value from the route. Absent reads as zero; malformed values are logged and zeroed.
fn usd_field(field: &str, value: Option<&str>) -> Decimal {
	let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
		return Decimal::ZERO;
	};
	raw.parse().unwrap_or_else(|_| {
		warn!(field, value = raw, "Malformed XY USD value, reporting zero");
		Decimal::ZERO
	})
}

fn parse_route(route: &Route) -> Result<XyRoute, AggregatorError> {
	Ok(serde_json::from_value(route.quote.clone())?)
}

#[async_trait]
impl AggregatorInterface for XyAggregator {
	fn protocol(&self) -> Protocol {
		Protocol::Xy
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(XySchema)
	}

	async fn build_route(&self, request: &RouteRequest) -> Result<Route, AggregatorError> {
		let (source, destination) = validate_chain(Protocol::Xy, request.from_chain, Some(request.to_chain), None)?;
		validate_tokens(&request.from_token, &request.to_token, request.is_same_chain())?;
		validate_keys(&self.ctx.config)?;
		validate_amount(&request.amount)?;

		let query = [
			("srcChainId", request.from_chain.to_string()),
			("srcQuoteTokenAddress", token_address(source, &request.from_token)?.to_checksum(None)),
			("srcQuoteTokenAmount", request.amount.clone()),
			("dstChainId", request.to_chain.to_string()),
			("dstQuoteTokenAddress", token_address(destination, &request.to_token)?.to_checksum(None)),
			("slippage", slippage_percent(request.options.slippage_bps)),
		];

		let stopwatch = Stopwatch::start("API Query");
		let response = self
			.ctx
			.http
			.get(format!("{}/quote", self.base_url))
			.query(&query)
			.send()
			.await?;
		let quote: QuoteResponse = read_json(response).await?;
		let latency = stopwatch.finish();

		if !quote.success {
			return Err(vendor_error(quote.error_msg));
		}
		let best = quote.routes.into_iter().next().ok_or(AggregatorError::NoQuote)?;
		let parsed: XyRoute = serde_json::from_value(best.clone())?;
		info!(
			provider = parsed.provider(),
			dst_amount = %parsed.dst_quote_token_amount,
			latency_ms = latency.latency,
			"XY quote"
		);

		Ok(Route {
			request: request.clone(),
			quote: best,
			latency,
		})
	}

	async fn execute_route(&self, route: &Route) -> Result<Execution, AggregatorError> {
		let request = &route.request;
		let quote = parse_route(route)?;
		let stopwatch = Stopwatch::start("Execution");

		let response = self
			.ctx
			.http
			.get(format!("{}/buildTx", self.base_url))
			.query(&self.build_tx_query(&quote, request)?)
			.send()
			.await?;
		let built: BuildTxResponse = read_json(response).await?;
		if !built.success {
			return Err(vendor_error(built.error_msg));
		}
		let tx = built
			.tx
			.ok_or_else(|| AggregatorError::InvalidQuote("buildTx returned no tx".to_string()))?;

		let source = chain_of(request.from_chain)?;
		self.ctx
			.delivery
			.approve_allowance(
				request.from_chain,
				token_address(source, &request.from_token)?,
				quote.spender()?,
				parse_amount(&quote.src_quote_token_amount)?,
			)
			.await?;

		let receipt = self
			.ctx
			.delivery
			.send_and_confirm(Transaction::new(request.from_chain, tx.to, tx.data, parse_amount(&tx.value)?))
			.await?;

		// Bridge delivery on the destination chain is not tracked.
		let status = if request.is_same_chain() {
			ExecutionStatus::Done
		} else {
			ExecutionStatus::Pending
		};

		Ok(Execution {
			tx_hashes: vec![receipt.hash],
			order_uid: None,
			status,
			latency: stopwatch.finish(),
		})
	}

	async fn generate_report(&self, route: &Route, execution: Option<&Execution>) -> Result<ApiReport, AggregatorError> {
		let request = &route.request;
		let quote = parse_route(route)?;
		let base = ReportBase::new(self.ctx.oracle.as_ref(), request).await?;

		let mut fees = Vec::new();
		if let Some(bridge) = &quote.bridge_description {
			if let (Some(amount), Some(token)) = (&bridge.bridge_fee_amount, &bridge.bridge_fee_token) {
				let price = price_or_none(self.ctx.oracle.as_ref(), &token.symbol).await.unwrap_or_default();
				let fee_tokens = to_decimal(parse_amount(amount)?, token.decimals)?;
				let src_usd = usd_field("srcQuoteTokenUsdValue", quote.src_quote_token_usd_value.as_deref());
				let usd_price = scale_two_decimals(fee_tokens * price);
				fees.push(AggregatorFee {
					name: format!("{} Bridge Fee", bridge.provider),
					amount: amount.clone(),
					percentage: if src_usd.is_zero() {
						Decimal::ZERO
					} else {
						usd_price / src_usd
					},
					gas_price_gwei: None,
					usd_price,
				});
			}
		}

		let (gas_gwei, gas_usd) = match quote.estimated_gas.as_deref().map(parse_amount).transpose()? {
			Some(gas) => match self.ctx.delivery.gas_price(request.from_chain).await {
				Ok(gas_price) => {
					let wei = gas * alloy::primitives::U256::from(gas_price);
					let chain = chain_of(request.from_chain)?;
					let native_price = price_or_none(self.ctx.oracle.as_ref(), chain.native_symbol())
						.await
						.unwrap_or_default();
					(wei_to_gwei(wei)?, scale_two_decimals(to_decimal(wei, 18)? * native_price))
				}
				Err(e) => {
					warn!(error = %e, "No gas price, reporting zero gas");
					Default::default()
				}
			},
			None => Default::default(),
		};

		let aggregator = Aggregator::new(
			quote.provider().to_string(),
			Some(quote.spender()?.to_checksum(None)),
			fees,
		);
		let trade_value = base.asset(
			request,
			scale_two_decimals(usd_field("srcQuoteTokenUsdValue", quote.src_quote_token_usd_value.as_deref())),
			scale_two_decimals(usd_field("dstQuoteTokenUsdValue", quote.dst_quote_token_usd_value.as_deref())),
			gas_gwei,
			gas_usd,
		);
		let net_fee = aggregator.total_fee + gas_usd;

		Ok(base.finish(route, execution, aggregator, trade_value, net_fee))
	}
}

/// Creates the XY plugin from its `[protocols.xy]` table.
pub fn create_xy(ctx: AggregatorContext, config: &toml::Value) -> Result<Box<dyn AggregatorInterface>, AggregatorError> {
	XySchema.validate(config)?;
	Ok(Box::new(XyAggregator::new(ctx, table_str(config, "base_url").unwrap_or(XY_API_URL))))
}
