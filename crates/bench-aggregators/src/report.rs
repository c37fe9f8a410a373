//! Report assembly shared by every plugin.

use crate::AggregatorError;
use bench_pricing::PriceOracle;
use bench_types::{
	amount_to_decimal, token_info, Aggregator, ApiReport, Asset, Chain, Execution, ExecutionSummary,
	Fee, Network, Route, RouteRequest, NET_FEE_NAME,
};
use rust_decimal::Decimal;
use tracing::warn;

/// Everything about a report that does not depend on the vendor quote.
pub(crate) struct ReportBase {
	pub source: Chain,
	pub destination: Chain,
	pub source_network: Network,
	pub destination_network: Network,
	pub from_decimals: u32,
	pub to_decimals: u32,
	/// Input amount in whole tokens.
	pub trade_amount: Decimal,
	pub description: String,
}

pub(crate) fn chain_of(chain_id: u64) -> Result<Chain, AggregatorError> {
	Chain::from_id(chain_id).ok_or_else(|| AggregatorError::InvalidQuote(format!("unknown chain id {}", chain_id)))
}

pub(crate) fn decimals_of(symbol: &str) -> Result<u32, AggregatorError> {
	token_info(symbol)
		.map(|t| t.decimals)
		.ok_or_else(|| AggregatorError::InvalidQuote(format!("unknown token {}", symbol)))
}

/// USD price of `symbol`, or `None` when the oracle cannot price it.
pub(crate) async fn price_or_none(oracle: &dyn PriceOracle, symbol: &str) -> Option<Decimal> {
	match oracle.usd_price(symbol).await {
		Ok(price) => Some(price),
		Err(e) => {
			warn!(symbol, error = %e, "No USD price");
			None
		}
	}
}

fn network(chain: Chain, symbol: &str, token_price_usd: Option<Decimal>) -> Network {
	Network {
		name: chain.name().to_string(),
		chain_id: chain.id(),
		token: symbol.to_string(),
		token_address: chain
			.token_address(symbol)
			.map(|a| a.to_checksum(None))
			.unwrap_or_default(),
		token_price_usd,
	}
}

impl ReportBase {
	pub(crate) async fn new(oracle: &dyn PriceOracle, request: &RouteRequest) -> Result<Self, AggregatorError> {
		let source = chain_of(request.from_chain)?;
		let destination = chain_of(request.to_chain)?;
		let from_decimals = decimals_of(&request.from_token)?;
		let to_decimals = decimals_of(&request.to_token)?;

		let from_price = price_or_none(oracle, &request.from_token).await;
		let to_price = price_or_none(oracle, &request.to_token).await;

		let trade_amount = amount_to_decimal(&request.amount, from_decimals)?;
		let description = format!(
			"Trade value of {} {} from {} to {} for {}",
			trade_amount, request.from_token, source, destination, request.to_token
		);

		Ok(Self {
			source,
			destination,
			source_network: network(source, &request.from_token, from_price),
			destination_network: network(destination, &request.to_token, to_price),
			from_decimals,
			to_decimals,
			trade_amount,
			description,
		})
	}

	/// Builds the trade value entry for the request's input token.
	pub(crate) fn asset(
		&self,
		request: &RouteRequest,
		actual_value_usd: Decimal,
		effective_trade_value_usd: Decimal,
		gas_cost_gwei: Decimal,
		gas_cost_usd: Decimal,
	) -> Asset {
		Asset::new(
			request.from_token.clone(),
			self.description.clone(),
			request.amount.clone(),
			actual_value_usd,
			effective_trade_value_usd,
			gas_cost_gwei,
			gas_cost_usd,
		)
	}

	pub(crate) fn finish(
		self,
		route: &Route,
		execution: Option<&Execution>,
		aggregator: Aggregator,
		trade_value: Asset,
		net_fee_usd: Decimal,
	) -> ApiReport {
		ApiReport {
			id: uuid::Uuid::new_v4(),
			protocol: route.request.protocol,
			date_time: chrono::Utc::now().to_rfc3339(),
			source_network: self.source_network,
			destination_network: self.destination_network,
			aggregator,
			trade_value,
			net_fee: Fee {
				name: NET_FEE_NAME.to_string(),
				amount_usd: net_fee_usd,
			},
			query_latency: vec![route.latency.clone()],
			execution: execution.map(ExecutionSummary::from),
			raw_quote: route.quote.clone(),
		}
	}
}
