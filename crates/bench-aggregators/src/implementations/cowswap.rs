//! CoW Protocol order book API.
//!
//! Orders are quoted with `POST /api/v1/quote`, signed off-chain as GPv2
//! orders and submitted with `POST /api/v1/orders`. Settlement happens later
//! through a solver batch, so an execution ends with a pending order UID.

use crate::http::{read_json, table_str};
use crate::report::ReportBase;
use crate::{AggregatorContext, AggregatorError, AggregatorInterface};
use alloy::primitives::{address, b256, Address, B256, U256};
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct};
use async_trait::async_trait;
use bench_config::{validate_amount, validate_chain, validate_keys, validate_tokens};
use bench_types::{
	parse_amount, scale_two_decimals, to_decimal, Aggregator, AggregatorFee, ApiReport, Chain,
	ConfigSchema, Execution, ExecutionStatus, Field, Operation, Protocol, Route,
	RouteRequest, Schema, Stopwatch, ValidationError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

sol! {
	/// GPv2 order as hashed by the settlement contract.
	struct Order {
		address sellToken;
		address buyToken;
		address receiver;
		uint256 sellAmount;
		uint256 buyAmount;
		uint32 validTo;
		bytes32 appData;
		uint256 feeAmount;
		string kind;
		bool partiallyFillable;
		string sellTokenBalance;
		string buyTokenBalance;
	}
}

pub const COW_API_URL: &str = "https://api.cow.fi";
pub const GPV2_SETTLEMENT: Address = address!("9008D19f58AAbD9eD0D60971565AA8510560ab41");
pub const GPV2_VAULT_RELAYER: Address = address!("C92E8bdf79f0507f65a392b0ab4667716BFE0110");

/// keccak256("Hyperledger Benchmark Cross-Chain Bridges - Shankar")
pub const APP_DATA: B256 = b256!("420b2cd7e0de3377492d507a33f20a6e733552f57c1829fc99478954d47ce63d");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CowQuoteResponse {
	pub quote: CowOrder,
	pub from: Address,
	pub expiration: String,
	#[serde(default)]
	pub id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CowOrder {
	pub sell_token: Address,
	pub buy_token: Address,
	#[serde(default)]
	pub receiver: Option<Address>,
	pub sell_amount: String,
	pub buy_amount: String,
	pub valid_to: u32,
	pub app_data: String,
	#[serde(default)]
	pub app_data_hash: Option<B256>,
	pub fee_amount: String,
	pub kind: String,
	pub partially_fillable: bool,
	#[serde(default = "erc20")]
	pub sell_token_balance: String,
	#[serde(default = "erc20")]
	pub buy_token_balance: String,
}

fn erc20() -> String {
	"erc20".to_string()
}

impl CowOrder {
	fn app_data_hash(&self) -> Result<B256, AggregatorError> {
		match self.app_data_hash {
			Some(hash) => Ok(hash),
			None => self
				.app_data
				.parse()
				.map_err(|_| AggregatorError::InvalidQuote("appData is not a 32-byte hash".to_string())),
		}
	}

	/// The signed form of this order, with `owner` as the default receiver.
	pub fn to_gpv2(&self, owner: Address) -> Result<Order, AggregatorError> {
		Ok(Order {
			sellToken: self.sell_token,
			buyToken: self.buy_token,
			receiver: self.receiver.unwrap_or(owner),
			sellAmount: parse_amount(&self.sell_amount)?,
			buyAmount: parse_amount(&self.buy_amount)?,
			validTo: self.valid_to,
			appData: self.app_data_hash()?,
			feeAmount: parse_amount(&self.fee_amount)?,
			kind: self.kind.clone(),
			partiallyFillable: self.partially_fillable,
			sellTokenBalance: self.sell_token_balance.clone(),
			buyTokenBalance: self.buy_token_balance.clone(),
		})
	}
}

pub fn gpv2_domain(chain_id: u64) -> Eip712Domain {
	Eip712Domain::new(
		Some("Gnosis Protocol".into()),
		Some("v2".into()),
		Some(U256::from(chain_id)),
		Some(GPV2_SETTLEMENT),
		None,
	)
}

/// Path segment of the order book API for `chain`.
fn network(chain: Chain) -> Result<&'static str, AggregatorError> {
	match chain {
		Chain::Ethereum => Ok("mainnet"),
		Chain::Goerli => Ok("goerli"),
		Chain::Sepolia => Ok("sepolia"),
		other => Err(AggregatorError::InvalidConfig(format!("CoW has no order book on {}", other))),
	}
}

pub struct CowSwapAggregator {
	ctx: AggregatorContext,
	base_url: String,
}

impl CowSwapAggregator {
	pub fn new(ctx: AggregatorContext, base_url: &str) -> Self {
		Self {
			ctx,
			base_url: base_url.trim_end_matches('/').to_string(),
		}
	}

	fn api(&self, chain: Chain, path: &str) -> Result<String, AggregatorError> {
		Ok(format!("{}/{}/api/v1/{}", self.base_url, network(chain)?, path))
	}

	fn validate(&self, request: &RouteRequest) -> Result<(Chain, Address), AggregatorError> {
		if !request.is_same_chain() {
			return Err(AggregatorError::SameChainRequired("COWswap"));
		}
		let (chain, _) = validate_chain(Protocol::Cow, request.from_chain, Some(request.to_chain), None)?;
		validate_tokens(&request.from_token, &request.to_token, true)?;
		let owner = validate_keys(&self.ctx.config)?.public;
		validate_amount(&request.amount)?;

		if request.from_token.eq_ignore_ascii_case(chain.native_symbol()) {
			return Err(AggregatorError::NativeSell("COWswap"));
		}
		Ok((chain, owner))
	}
}

fn token_address(chain: Chain, symbol: &str) -> Result<Address, AggregatorError> {
	chain
		.token_address(symbol)
		.ok_or_else(|| AggregatorError::UnsupportedToken {
			token: symbol.to_string(),
			chain: chain.to_string(),
		})
}

pub struct CowSwapSchema;

impl ConfigSchema for CowSwapSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![Field::url("base_url")],
		)
		.validate(config)
	}
}

fn parse_quote(route: &Route) -> Result<CowQuoteResponse, AggregatorError> {
	Ok(serde_json::from_value(route.quote.clone())?)
}

#[async_trait]
impl AggregatorInterface for CowSwapAggregator {
	fn protocol(&self) -> Protocol {
		Protocol::Cow
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(CowSwapSchema)
	}

	async fn build_route(&self, request: &RouteRequest) -> Result<Route, AggregatorError> {
		let (chain, owner) = self.validate(request)?;
		let owner = owner.to_checksum(None);
		let valid_to = chrono::Utc::now().timestamp() + (request.options.valid_minutes * 60) as i64;

		let mut order = json!({
			"sellToken": token_address(chain, &request.from_token)?,
			"buyToken": token_address(chain, &request.to_token)?,
			"receiver": owner,
			"appData": APP_DATA,
			"partiallyFillable": false,
			"sellTokenBalance": "erc20",
			"buyTokenBalance": "erc20",
			"from": owner,
			"kind": request.options.operation.as_str(),
			"validTo": valid_to,
		});
		let amount_key = match request.options.operation {
			Operation::Sell => "sellAmountBeforeFee",
			Operation::Buy => "buyAmountAfterFee",
		};
		order[amount_key] = json!(request.amount);

		let stopwatch = Stopwatch::start("API Query");
		let response = self
			.ctx
			.http
			.post(self.api(chain, "quote")?)
			.json(&order)
			.send()
			.await?;
		let quote: serde_json::Value = read_json(response).await?;
		let latency = stopwatch.finish();

		let parsed: CowQuoteResponse = serde_json::from_value(quote.clone())?;
		info!(
			kind = %parsed.quote.kind,
			sell_amount = %parsed.quote.sell_amount,
			buy_amount = %parsed.quote.buy_amount,
			fee_amount = %parsed.quote.fee_amount,
			latency_ms = latency.latency,
			"CoW quote"
		);

		Ok(Route {
			request: request.clone(),
			quote,
			latency,
		})
	}

	async fn execute_route(&self, route: &Route) -> Result<Execution, AggregatorError> {
		let (chain, owner) = self.validate(&route.request)?;
		let quote = parse_quote(route)?;
		let stopwatch = Stopwatch::start("Execution");

		let order = quote.quote.to_gpv2(owner)?;
		let digest = order.eip712_signing_hash(&gpv2_domain(chain.id()));
		// ethsign: EIP-191 personal signature over the EIP-712 digest
		let signature = self.ctx.account.sign_message(digest.as_slice()).await?;

		let approval = self
			.ctx
			.delivery
			.approve_allowance(chain.id(), order.sellToken, GPV2_VAULT_RELAYER, order.sellAmount + order.feeAmount)
			.await?;

		let mut body = json!({
			"sellToken": order.sellToken,
			"buyToken": order.buyToken,
			"receiver": order.receiver,
			"sellAmount": quote.quote.sell_amount,
			"buyAmount": quote.quote.buy_amount,
			"validTo": order.validTo,
			"appData": quote.quote.app_data,
			"feeAmount": quote.quote.fee_amount,
			"kind": order.kind,
			"partiallyFillable": order.partiallyFillable,
			"sellTokenBalance": order.sellTokenBalance,
			"buyTokenBalance": order.buyTokenBalance,
			"signingScheme": "ethsign",
			"signature": alloy::hex::encode_prefixed(signature.as_bytes()),
			"from": owner,
		});
		if let Some(id) = quote.id {
			body["quoteId"] = json!(id);
		}

		let response = self
			.ctx
			.http
			.post(self.api(chain, "orders")?)
			.json(&body)
			.send()
			.await?;
		let uid: String = read_json(response).await?;
		info!(%uid, "CoW order placed");

		Ok(Execution {
			tx_hashes: approval.map(|r| r.hash).into_iter().collect(),
			order_uid: Some(uid),
			status: ExecutionStatus::Pending,
			latency: stopwatch.finish(),
		})
	}

	async fn generate_report(&self, route: &Route, execution: Option<&Execution>) -> Result<ApiReport, AggregatorError> {
		let request = &route.request;
		let quote = parse_quote(route)?.quote;
		let base = ReportBase::new(self.ctx.oracle.as_ref(), request).await?;

		let sell_price = base.source_network.token_price_usd.unwrap_or_default();
		let buy_price = base.destination_network.token_price_usd.unwrap_or_default();

		let fee = parse_amount(&quote.fee_amount)?;
		let sell = parse_amount(&quote.sell_amount)?;
		let buy = parse_amount(&quote.buy_amount)?;

		let fee_usd = scale_two_decimals(to_decimal(fee, base.from_decimals)? * sell_price);
		let actual_value_usd = scale_two_decimals(to_decimal(sell + fee, base.from_decimals)? * sell_price);
		let effective_value_usd = scale_two_decimals(to_decimal(buy, base.to_decimals)? * buy_price);
		let percentage = if (sell + fee).is_zero() {
			Decimal::ZERO
		} else {
			to_decimal(fee, base.from_decimals)? / to_decimal(sell + fee, base.from_decimals)?
		};

		let aggregator = Aggregator::new(
			"CoW Protocol",
			Some(GPV2_SETTLEMENT.to_checksum(None)),
			vec![AggregatorFee {
				name: "Protocol Fee".to_string(),
				amount: quote.fee_amount.clone(),
				percentage,
				gas_price_gwei: None,
				usd_price: fee_usd,
			}],
		);
		// Solvers pay gas; it is folded into feeAmount.
		let trade_value = base.asset(request, actual_value_usd, effective_value_usd, Decimal::ZERO, Decimal::ZERO);
		let net_fee = aggregator.total_fee;

		Ok(base.finish(route, execution, aggregator, trade_value, net_fee))
	}
}

/// Creates the CoW plugin from its `[protocols.cowswap]` table.
pub fn create_cowswap(ctx: AggregatorContext, config: &toml::Value) -> Result<Box<dyn AggregatorInterface>, AggregatorError> {
	CowSwapSchema.validate(config)?;
	Ok(Box::new(CowSwapAggregator::new(
		ctx,
		table_str(config, "base_url").unwrap_or(COW_API_URL),
	)))
}
