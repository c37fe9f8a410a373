//! Token aggregator plugins.
//!
//! Every integration runs the same three steps: `build_route` asks the vendor
//! for a quote, `execute_route` signs and submits it, and `generate_report`
//! reshapes the quote into a normalized [`ApiReport`].

use async_trait::async_trait;
use bench_account::{AccountError, AccountService};
use bench_config::{BenchConfig, InputError};
use bench_delivery::{DeliveryError, DeliveryService};
use bench_pricing::{PriceOracle, PricingError};
use bench_types::{
	ApiReport, ConfigSchema, Execution, Protocol, Route, RouteRequest, UnitError, ValidationError,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

mod http;
mod poll;
mod report;

pub mod implementations;

pub use implementations::cowswap::CowSwapAggregator;
pub use implementations::lifi::LifiAggregator;
pub use implementations::socket::SocketAggregator;
pub use implementations::uniswap::UniswapAggregator;
pub use implementations::xy::XyAggregator;

#[derive(Debug, Error)]
pub enum AggregatorError {
	#[error(transparent)]
	Input(#[from] InputError),
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),
	#[error("Request failed with status: {0}")]
	RequestFailed(u16),
	#[error("no quote available")]
	NoQuote,
	#[error("Source and destination chains must be the same for {0}")]
	SameChainRequired(&'static str),
	#[error("{0} cannot sell the native currency, wrap it first")]
	NativeSell(&'static str),
	#[error("Token {token} is not available on {chain}")]
	UnsupportedToken { token: String, chain: String },
	#[error("Vendor error: {0}")]
	Vendor(String),
	#[error("Invalid quote: {0}")]
	InvalidQuote(String),
	#[error("Execution failed: {0}")]
	Execution(String),
	#[error("Gave up waiting for {what} after {attempts} attempts")]
	StatusTimeout { what: String, attempts: u32 },
	#[error("No aggregator registered for {0}")]
	UnknownProtocol(Protocol),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
	#[error(transparent)]
	Delivery(#[from] DeliveryError),
	#[error(transparent)]
	Pricing(#[from] PricingError),
	#[error(transparent)]
	Account(#[from] AccountError),
	#[error(transparent)]
	Unit(#[from] UnitError),
}

impl From<ValidationError> for AggregatorError {
	fn from(e: ValidationError) -> Self {
		AggregatorError::InvalidConfig(e.to_string())
	}
}

impl From<serde_json::Error> for AggregatorError {
	fn from(e: serde_json::Error) -> Self {
		AggregatorError::InvalidQuote(e.to_string())
	}
}

#[async_trait]
pub trait AggregatorInterface: Send + Sync {
	fn protocol(&self) -> Protocol;

	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Validates the request and fetches a quote, timing the query as `API Query`.
	async fn build_route(&self, request: &RouteRequest) -> Result<Route, AggregatorError>;

	/// Signs and submits the quoted route from the benchmark wallet.
	async fn execute_route(&self, route: &Route) -> Result<Execution, AggregatorError>;

	async fn generate_report(
		&self,
		route: &Route,
		execution: Option<&Execution>,
	) -> Result<ApiReport, AggregatorError>;
}

/// Shared dependencies handed to every plugin.
#[derive(Clone)]
pub struct AggregatorContext {
	pub config: Arc<BenchConfig>,
	pub delivery: Arc<DeliveryService>,
	pub oracle: Arc<dyn PriceOracle>,
	pub account: Arc<AccountService>,
	pub http: reqwest::Client,
}

impl AggregatorContext {
	pub fn new(
		config: Arc<BenchConfig>,
		delivery: Arc<DeliveryService>,
		oracle: Arc<dyn PriceOracle>,
		account: Arc<AccountService>,
	) -> Result<Self, AggregatorError> {
		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.bench.http_timeout_secs))
			.build()?;

		Ok(Self {
			config,
			delivery,
			oracle,
			account,
			http,
		})
	}
}

/// Creates the plugin for `protocol` from its `[protocols.<key>]` table.
pub fn create_aggregator(
	protocol: Protocol,
	ctx: AggregatorContext,
) -> Result<Box<dyn AggregatorInterface>, AggregatorError> {
	let table = ctx.config.protocol(protocol.config_key());
	match protocol {
		Protocol::Lifi => implementations::lifi::create_lifi(ctx, &table),
		Protocol::Socket => implementations::socket::create_socket(ctx, &table),
		Protocol::Uniswap => implementations::uniswap::create_uniswap(ctx, &table),
		Protocol::Cow => implementations::cowswap::create_cowswap(ctx, &table),
		Protocol::Xy => implementations::xy::create_xy(ctx, &table),
		Protocol::Ccip | Protocol::Hyperlane => Err(AggregatorError::UnknownProtocol(protocol)),
	}
}

/// Dispatches requests to the plugin registered for each protocol.
pub struct AggregatorService {
	aggregators: HashMap<Protocol, Box<dyn AggregatorInterface>>,
}

impl AggregatorService {
	pub fn new(aggregators: Vec<Box<dyn AggregatorInterface>>) -> Self {
		let aggregators = aggregators.into_iter().map(|a| (a.protocol(), a)).collect();
		Self { aggregators }
	}

	/// Creates every token aggregator from its configured table.
	pub fn from_context(ctx: AggregatorContext) -> Result<Self, AggregatorError> {
		let aggregators = Protocol::AGGREGATORS
			.into_iter()
			.map(|protocol| create_aggregator(protocol, ctx.clone()))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self::new(aggregators))
	}

	fn aggregator(&self, protocol: Protocol) -> Result<&dyn AggregatorInterface, AggregatorError> {
		self.aggregators
			.get(&protocol)
			.map(|a| a.as_ref())
			.ok_or(AggregatorError::UnknownProtocol(protocol))
	}

	pub fn protocols(&self) -> Vec<Protocol> {
		Protocol::AGGREGATORS
			.into_iter()
			.filter(|p| self.aggregators.contains_key(p))
			.collect()
	}

	pub async fn build_route(&self, request: &RouteRequest) -> Result<Route, AggregatorError> {
		self.aggregator(request.protocol)?.build_route(request).await
	}

	pub async fn execute_route(&self, route: &Route) -> Result<Execution, AggregatorError> {
		self.aggregator(route.request.protocol)?.execute_route(route).await
	}

	pub async fn generate_report(
		&self,
		route: &Route,
		execution: Option<&Execution>,
	) -> Result<ApiReport, AggregatorError> {
		self.aggregator(route.request.protocol)?
			.generate_report(route, execution)
			.await
	}

	/// Quotes `request` and reports on the quote without executing it.
	/// The quoted route comes back alongside its report.
	#[instrument(skip(self), fields(protocol = %request.protocol))]
	pub async fn make_api_report(&self, request: &RouteRequest) -> Result<(Route, ApiReport), AggregatorError> {
		let route = self.build_route(request).await?;
		info!(latency_ms = route.latency.latency, "Route built");
		let report = self.generate_report(&route, None).await?;
		Ok((route, report))
	}

	/// Reports on every request concurrently, keeping input order.
	pub async fn make_api_reports(
		&self,
		requests: &[RouteRequest],
	) -> Vec<Result<(Route, ApiReport), AggregatorError>> {
		join_all(requests.iter().map(|request| self.make_api_report(request))).await
	}
}
