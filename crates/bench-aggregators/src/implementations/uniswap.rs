//! Uniswap V3 single-pool swaps.
//!
//! There is no quote API: each fee tier is quoted on-chain through QuoterV2
//! and the best pool is turned into SwapRouter02 calldata.

use crate::http::table_str;
use crate::report::{chain_of, price_or_none, ReportBase};
use crate::{AggregatorContext, AggregatorError, AggregatorInterface};
use alloy::primitives::aliases::{U160, U24};
use alloy::primitives::{address, Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use bench_config::{validate_amount, validate_chain, validate_keys, validate_tokens};
use bench_types::{
	parse_amount, scale_two_decimals, to_decimal, wei_to_gwei, Aggregator, AggregatorFee, ApiReport,
	Chain, ConfigSchema, Execution, ExecutionStatus, Field, FieldType, Protocol, Route, RouteRequest,
	Schema, Stopwatch, Transaction, ValidationError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

sol! {
	struct QuoteExactInputSingleParams {
		address tokenIn;
		address tokenOut;
		uint256 amountIn;
		uint24 fee;
		uint160 sqrtPriceLimitX96;
	}

	interface IQuoterV2 {
		function quoteExactInputSingle(QuoteExactInputSingleParams memory params)
			external
			returns (uint256 amountOut, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate);
	}

	struct ExactInputSingleParams {
		address tokenIn;
		address tokenOut;
		uint24 fee;
		address recipient;
		uint256 amountIn;
		uint256 amountOutMinimum;
		uint160 sqrtPriceLimitX96;
	}

	interface ISwapRouter02 {
		function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
		function unwrapWETH9(uint256 amountMinimum, address recipient) external payable;
		function multicall(uint256 deadline, bytes[] calldata data) external payable returns (bytes[] memory results);
	}
}

pub const QUOTER_V2: Address = address!("61fFE014bA17989E743c5F6cB21bF9697530B21e");
pub const QUOTER_V2_SEPOLIA: Address = address!("Ed1f6473345F45b75F8179591dd5bA1888cf2FB3");
pub const SWAP_ROUTER_02: Address = address!("68b3465833fb72A70ecDF485E0e4C7bD8665Fc45");
pub const SWAP_ROUTER_02_SEPOLIA: Address = address!("3bFA4769FB09eefC5a80d6E87c3B9C650f7Ae48E");

/// SwapRouter02 sentinel recipient meaning "keep the output in the router".
const ADDRESS_THIS: Address = address!("0000000000000000000000000000000000000002");

pub const DEFAULT_FEE_TIERS: [u32; 3] = [500, 3000, 10000];

/// Pool fees are expressed in hundredths of a basis point.
const FEE_DENOMINATOR: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodParameters {
	pub calldata: Bytes,
	pub value: String,
	pub to: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniswapQuote {
	pub fee: u32,
	pub token_in: Address,
	pub token_out: Address,
	pub amount_in: String,
	pub amount_out: String,
	pub amount_out_minimum: String,
	pub gas_estimate: String,
	/// Gas price observed when the quote was taken.
	pub gas_price_wei: String,
	pub method_parameters: MethodParameters,
}

pub struct UniswapAggregator {
	ctx: AggregatorContext,
	quoter: Option<Address>,
	router: Option<Address>,
	fee_tiers: Vec<u32>,
}

impl UniswapAggregator {
	pub fn new(ctx: AggregatorContext) -> Self {
		Self {
			ctx,
			quoter: None,
			router: None,
			fee_tiers: DEFAULT_FEE_TIERS.to_vec(),
		}
	}

	fn quoter_for(&self, chain: Chain) -> Address {
		self.quoter.unwrap_or(match chain {
			Chain::Sepolia => QUOTER_V2_SEPOLIA,
			_ => QUOTER_V2,
		})
	}

	fn router_for(&self, chain: Chain) -> Address {
		self.router.unwrap_or(match chain {
			Chain::Sepolia => SWAP_ROUTER_02_SEPOLIA,
			_ => SWAP_ROUTER_02,
		})
	}

	/// Quotes one pool; `None` when the pool does not exist or the call reverts.
	async fn quote_tier(
		&self,
		chain: Chain,
		token_in: Address,
		token_out: Address,
		amount_in: U256,
		fee: u32,
	) -> Option<IQuoterV2::quoteExactInputSingleReturn> {
		let call = IQuoterV2::quoteExactInputSingleCall {
			params: QuoteExactInputSingleParams {
				tokenIn: token_in,
				tokenOut: token_out,
				amountIn: amount_in,
				fee: U24::from(fee),
				sqrtPriceLimitX96: U160::ZERO,
			},
		};
		let tx = Transaction::new(chain.id(), self.quoter_for(chain), call.abi_encode(), U256::ZERO);

		let raw = match self.ctx.delivery.call(&tx).await {
			Ok(raw) => raw,
			Err(e) => {
				debug!(fee, error = %e, "Quoter call failed");
				return None;
			}
		};
		match IQuoterV2::quoteExactInputSingleCall::abi_decode_returns(&raw) {
			Ok(quote) => Some(quote),
			Err(e) => {
				debug!(fee, error = %e, "No pool for fee tier");
				None
			}
		}
	}
}

/// Uniswap pools hold the wrapped native token.
fn pool_token(chain: Chain, symbol: &str) -> Result<Address, AggregatorError> {
	let symbol = if symbol.eq_ignore_ascii_case(chain.native_symbol()) {
		chain.wrapped_native_symbol()
	} else {
		symbol
	};
	chain
		.token_address(symbol)
		.ok_or_else(|| AggregatorError::UnsupportedToken {
			token: symbol.to_string(),
			chain: chain.to_string(),
		})
}

fn is_native(chain: Chain, symbol: &str) -> bool {
	symbol.eq_ignore_ascii_case(chain.native_symbol())
}

/// SwapRouter02 calldata for an exact-input swap through a single pool.
///
/// Native output is swapped into the router and unwrapped to the recipient.
fn encode_swap(
	params: ExactInputSingleParams,
	unwrap_output: bool,
	deadline: U256,
) -> Bytes {
	let recipient = params.recipient;
	let amount_out_minimum = params.amountOutMinimum;

	let calls: Vec<Bytes> = if unwrap_output {
		let swap = ExactInputSingleParams {
			recipient: ADDRESS_THIS,
			..params
		};
		vec![
			ISwapRouter02::exactInputSingleCall { params: swap }.abi_encode().into(),
			ISwapRouter02::unwrapWETH9Call {
				amountMinimum: amount_out_minimum,
				recipient,
			}
			.abi_encode()
			.into(),
		]
	} else {
		vec![ISwapRouter02::exactInputSingleCall { params }.abi_encode().into()]
	};

	ISwapRouter02::multicallCall { deadline, data: calls }
		.abi_encode()
		.into()
}

pub struct UniswapSchema;

impl ConfigSchema for UniswapSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![
				Field::address("quoter"),
				Field::address("router"),
				Field::new(
					"fee_tiers",
					FieldType::Array(Box::new(FieldType::Integer {
						min: Some(1),
						max: Some(FEE_DENOMINATOR as i64),
					})),
				),
			],
		)
		.validate(config)
	}
}

fn parse_quote(route: &Route) -> Result<UniswapQuote, AggregatorError> {
	Ok(serde_json::from_value(route.quote.clone())?)
}

fn same_chain(request: &RouteRequest) -> Result<Chain, AggregatorError> {
	let (source, _) = validate_chain(Protocol::Uniswap, request.from_chain, Some(request.to_chain), None)?;
	if !request.is_same_chain() {
		return Err(AggregatorError::SameChainRequired("Uniswap"));
	}
	Ok(source)
}

#[async_trait]
impl AggregatorInterface for UniswapAggregator {
	fn protocol(&self) -> Protocol {
		Protocol::Uniswap
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(UniswapSchema)
	}

	async fn build_route(&self, request: &RouteRequest) -> Result<Route, AggregatorError> {
		let chain = same_chain(request)?;
		validate_tokens(&request.from_token, &request.to_token, true)?;
		let recipient = validate_keys(&self.ctx.config)?.public;
		let amount_in = validate_amount(&request.amount)?;

		let token_in = pool_token(chain, &request.from_token)?;
		let token_out = pool_token(chain, &request.to_token)?;

		let stopwatch = Stopwatch::start("API Query");
		let mut best: Option<(u32, IQuoterV2::quoteExactInputSingleReturn)> = None;
		for &fee in &self.fee_tiers {
			let Some(quote) = self.quote_tier(chain, token_in, token_out, amount_in, fee).await else {
				continue;
			};
			debug!(fee, amount_out = %quote.amountOut, "Pool quote");
			if best.as_ref().map_or(true, |(_, b)| quote.amountOut > b.amountOut) {
				best = Some((fee, quote));
			}
		}
		let (fee, quote) = best.ok_or(AggregatorError::NoQuote)?;
		let gas_price = self.ctx.delivery.gas_price(chain.id()).await?;
		let latency = stopwatch.finish();

		let slippage = U256::from(10_000u32.saturating_sub(request.options.slippage_bps));
		let amount_out_minimum = quote.amountOut * slippage / U256::from(10_000u32);
		let deadline = U256::from(chrono::Utc::now().timestamp().max(0) as u64 + request.options.valid_minutes * 60);

		let router = self.router_for(chain);
		let calldata = encode_swap(
			ExactInputSingleParams {
				tokenIn: token_in,
				tokenOut: token_out,
				fee: U24::from(fee),
				recipient,
				amountIn: amount_in,
				amountOutMinimum: amount_out_minimum,
				sqrtPriceLimitX96: U160::ZERO,
			},
			is_native(chain, &request.to_token),
			deadline,
		);
		let value = if is_native(chain, &request.from_token) {
			amount_in
		} else {
			U256::ZERO
		};

		info!(fee, amount_out = %quote.amountOut, gas_estimate = %quote.gasEstimate, latency_ms = latency.latency, "Uniswap quote");

		let uniswap_quote = UniswapQuote {
			fee,
			token_in,
			token_out,
			amount_in: amount_in.to_string(),
			amount_out: quote.amountOut.to_string(),
			amount_out_minimum: amount_out_minimum.to_string(),
			gas_estimate: quote.gasEstimate.to_string(),
			gas_price_wei: gas_price.to_string(),
			method_parameters: MethodParameters {
				calldata,
				value: value.to_string(),
				to: router,
			},
		};

		Ok(Route {
			request: request.clone(),
			quote: serde_json::to_value(&uniswap_quote)?,
			latency,
		})
	}

	async fn execute_route(&self, route: &Route) -> Result<Execution, AggregatorError> {
		let request = &route.request;
		let chain = same_chain(request)?;
		let quote = parse_quote(route)?;
		let stopwatch = Stopwatch::start("Execution");

		// The native placeholder is skipped by the allowance check.
		let from_token = chain
			.token_address(&request.from_token)
			.ok_or_else(|| AggregatorError::UnsupportedToken {
				token: request.from_token.clone(),
				chain: chain.to_string(),
			})?;
		let params = &quote.method_parameters;
		self.ctx
			.delivery
			.approve_allowance(chain.id(), from_token, params.to, parse_amount(&quote.amount_in)?)
			.await?;

		let tx = Transaction::new(chain.id(), params.to, params.calldata.clone(), parse_amount(&params.value)?);
		let receipt = self.ctx.delivery.send_and_confirm(tx).await?;

		Ok(Execution {
			tx_hashes: vec![receipt.hash],
			order_uid: None,
			status: ExecutionStatus::Done,
			latency: stopwatch.finish(),
		})
	}

	async fn generate_report(&self, route: &Route, execution: Option<&Execution>) -> Result<ApiReport, AggregatorError> {
		let request = &route.request;
		let quote = parse_quote(route)?;
		let chain = chain_of(request.from_chain)?;
		let base = ReportBase::new(self.ctx.oracle.as_ref(), request).await?;

		let from_price = base.source_network.token_price_usd.unwrap_or_default();
		let to_price = base.destination_network.token_price_usd.unwrap_or_default();
		let native_price = price_or_none(self.ctx.oracle.as_ref(), chain.native_symbol())
			.await
			.unwrap_or_default();

		let amount_out = to_decimal(parse_amount(&quote.amount_out)?, base.to_decimals)?;
		let actual_value_usd = scale_two_decimals(base.trade_amount * from_price);
		let effective_value_usd = scale_two_decimals(amount_out * to_price);

		let gas_wei = parse_amount(&quote.gas_estimate)? * parse_amount(&quote.gas_price_wei)?;
		let gas_gwei = wei_to_gwei(gas_wei)?;
		let gas_usd = scale_two_decimals(to_decimal(gas_wei, 18)? * native_price);

		let fee_fraction = Decimal::from(quote.fee) / Decimal::from(FEE_DENOMINATOR);
		let fee_amount = parse_amount(&quote.amount_in)? * U256::from(quote.fee) / U256::from(FEE_DENOMINATOR);
		let pool_fee = AggregatorFee {
			name: "Pool Fee".to_string(),
			amount: fee_amount.to_string(),
			percentage: fee_fraction,
			gas_price_gwei: Some(wei_to_gwei(parse_amount(&quote.gas_price_wei)?)?),
			usd_price: scale_two_decimals(actual_value_usd * fee_fraction),
		};

		let aggregator = Aggregator::new(
			"Uniswap V3",
			Some(quote.method_parameters.to.to_checksum(None)),
			vec![pool_fee],
		);
		let trade_value = base.asset(request, actual_value_usd, effective_value_usd, gas_gwei, gas_usd);
		let net_fee = aggregator.total_fee + gas_usd;

		Ok(base.finish(route, execution, aggregator, trade_value, net_fee))
	}
}

/// Creates the Uniswap plugin from its `[protocols.uniswap]` table.
pub fn create_uniswap(ctx: AggregatorContext, config: &toml::Value) -> Result<Box<dyn AggregatorInterface>, AggregatorError> {
	UniswapSchema.validate(config)?;

	let parse = |key: &str| -> Result<Option<Address>, AggregatorError> {
		table_str(config, key)
			.map(|s| {
				s.parse()
					.map_err(|_| AggregatorError::InvalidConfig(format!("{} is not an address", key)))
			})
			.transpose()
	};

	let mut aggregator = UniswapAggregator::new(ctx);
	aggregator.quoter = parse("quoter")?;
	aggregator.router = parse("router")?;
	if let Some(tiers) = config.get("fee_tiers").and_then(|v| v.as_array()) {
		aggregator.fee_tiers = tiers
			.iter()
			.filter_map(|t| t.as_integer())
			.filter_map(|t| u32::try_from(t).ok())
			.collect();
	}
	Ok(Box::new(aggregator))
}
