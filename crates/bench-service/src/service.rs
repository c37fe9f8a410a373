//! Wires configuration into the benchmark services and runs commands.

use crate::cli::{MessageArgs, RouteArgs};
use crate::confirm::DialoguerConfirmer;
use alloy::primitives::U256;
use anyhow::{bail, Context, Result};
use bench_account::{create_account, AccountService};
use bench_aggregators::{AggregatorContext, AggregatorService};
use bench_config::{validate_keys, BenchConfig, KeyPair};
use bench_delivery::{create_http_delivery, DeliveryInterface, DeliveryService};
use bench_messaging::{Confirmer, DispatchRequest, ForgeRunner, MessagingContract, MessagingService};
use bench_pricing::CoinGeckoOracle;
use bench_report::{compare, render_rankings, render_summary, summarize, Metric};
use bench_storage::{FileStorage, StorageService, EXECUTIONS, REPORTS, ROUTES};
use bench_types::{ApiReport, Chain, ExecutionSummary, Protocol, Route, RouteRequest};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

fn table(entries: Vec<(&str, toml::Value)>) -> toml::Value {
	toml::Value::Table(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// One HTTP delivery per configured RPC endpoint with a known chain.
pub fn build_deliveries(config: &BenchConfig, keys: &KeyPair) -> Result<DeliveryService> {
	let mut deliveries: Vec<Box<dyn DeliveryInterface>> = Vec::new();
	let mut networks: Vec<(&String, &String)> = config.rpc.iter().collect();
	networks.sort();

	for (network, rpc_url) in networks {
		let Some(chain) = Chain::from_name(network) else {
			warn!(network = %network, "Ignoring RPC URL for unknown network");
			continue;
		};
		let delivery = create_http_delivery(&table(vec![
			("rpc_url", toml::Value::String(rpc_url.clone())),
			("chain_id", toml::Value::Integer(chain.id() as i64)),
			("private_key", toml::Value::String(keys.private.clone())),
		]))
		.with_context(|| format!("Failed to create delivery for {}", chain))?;
		deliveries.push(delivery);
	}

	Ok(DeliveryService::new(deliveries))
}

/// Stable storage id for a route, one per protocol and chain layout.
pub fn route_id(request: &RouteRequest) -> String {
	let layout = if request.is_same_chain() {
		"same-chain"
	} else {
		"cross-chain"
	};
	format!("{}-route-{}", request.protocol.config_key(), layout)
}

pub fn report_id(report: &ApiReport) -> String {
	format!("{}-{}", report.protocol.config_key(), report.id)
}

pub struct BenchService {
	config: Arc<BenchConfig>,
	deliveries: Arc<DeliveryService>,
	aggregators: AggregatorService,
	storage: StorageService,
}

impl BenchService {
	#[instrument(skip(config), fields(name = %config.bench.name))]
	pub fn new(config: BenchConfig) -> Result<Self> {
		let config = Arc::new(config);
		let keys = validate_keys(&config).context("Invalid wallet keys")?;

		let deliveries = Arc::new(build_deliveries(&config, &keys)?);
		let account = create_account(&table(vec![
			("private_key", toml::Value::String(keys.private.clone())),
			("public_key", toml::Value::String(keys.public.to_string())),
		]))
		.context("Failed to create account")?;
		let oracle = CoinGeckoOracle::new(config.pricing.coingecko_url.clone(), config.pricing.api_key.clone())
			.context("Failed to create price oracle")?;

		let ctx = AggregatorContext::new(
			config.clone(),
			deliveries.clone(),
			Arc::new(oracle),
			Arc::new(AccountService::new(account)),
		)
		.context("Failed to create aggregator context")?;
		let aggregators = AggregatorService::from_context(ctx).context("Invalid protocol configuration")?;
		let storage = StorageService::new(Box::new(FileStorage::new(&config.bench.output_dir)));

		info!(
			chains = ?deliveries.chains(),
			protocols = ?aggregators.protocols(),
			output_dir = %config.bench.output_dir.display(),
			"Benchmark service ready"
		);

		Ok(Self {
			config,
			deliveries,
			aggregators,
			storage,
		})
	}

	pub fn with_storage(mut self, storage: StorageService) -> Self {
		self.storage = storage;
		self
	}

	/// Quotes every selected protocol. Failures are logged and skipped.
	pub async fn quote(&self, args: &RouteArgs, report: bool, save: bool) -> Result<()> {
		let requests = args.requests();
		if report {
			let reports = self.aggregators.make_api_reports(&requests).await;
			for (request, result) in requests.iter().zip(reports) {
				match result {
					Ok((route, report)) => {
						print_json(&route)?;
						print_json(&report)?;
						if save {
							self.save_route(&route).await?;
							self.storage
								.store(REPORTS, &report_id(&report), &report)
								.await
								.context("Failed to save report")?;
						}
					}
					Err(e) => error!(protocol = %request.protocol, error = %e, "Report failed"),
				}
			}
			return Ok(());
		}

		for request in &requests {
			match self.aggregators.build_route(request).await {
				Ok(route) => {
					info!(protocol = %request.protocol, latency_ms = route.latency.latency, "Route built");
					print_json(&route)?;
					if save {
						self.save_route(&route).await?;
					}
				}
				Err(e) => error!(protocol = %request.protocol, error = %e, "Quote failed"),
			}
		}
		Ok(())
	}

	/// Executes one route per selected protocol, reporting on each execution.
	pub async fn execute(&self, args: &RouteArgs, save: bool, confirmer: &dyn Confirmer) -> Result<()> {
		for request in args.requests() {
			let route = self
				.aggregators
				.build_route(&request)
				.await
				.with_context(|| format!("Failed to quote {}", request.protocol))?;
			print_json(&route)?;

			let prompt = format!(
				"Execute {} route {} -> {} for {} {}?",
				request.protocol, request.from_chain, request.to_chain, request.amount, request.from_token
			);
			if !confirmer.confirm(&prompt)? {
				warn!(protocol = %request.protocol, "Execution skipped");
				continue;
			}

			let execution = self
				.aggregators
				.execute_route(&route)
				.await
				.with_context(|| format!("Failed to execute {} route", request.protocol))?;
			info!(
				protocol = %request.protocol,
				status = %execution.status,
				txs = execution.tx_hashes.len(),
				latency_ms = execution.latency.latency,
				"Route executed"
			);

			let report = self
				.aggregators
				.generate_report(&route, Some(&execution))
				.await
				.context("Failed to generate report")?;
			print_json(&report)?;

			if save {
				self.save_route(&route).await?;
				self.storage
					.store(EXECUTIONS, &report_id(&report), &ExecutionSummary::from(&execution))
					.await
					.context("Failed to save execution")?;
				self.storage
					.store(REPORTS, &report_id(&report), &report)
					.await
					.context("Failed to save report")?;
			}
		}
		Ok(())
	}

	async fn save_route(&self, route: &Route) -> Result<()> {
		self.storage
			.store(ROUTES, &route_id(&route.request), route)
			.await
			.context("Failed to save route")
	}

	/// Ranks every stored report and renders the rankings and summary tables.
	pub async fn compare(&self, metric: Metric, protocols: &[Protocol]) -> Result<String> {
		let reports = stored_reports(&self.storage, protocols).await?;
		if reports.is_empty() {
			bail!("No reports found in {}", self.config.bench.output_dir.display());
		}

		Ok(format!(
			"Ranked by {}\n{}\n\n{}",
			metric,
			render_rankings(&compare(&reports, metric)),
			render_summary(&summarize(&reports))
		))
	}

	pub async fn message(&self, args: &MessageArgs) -> Result<String> {
		let service = MessagingService::new(
			self.config.clone(),
			self.deliveries.clone(),
			Box::new(ForgeRunner::new()),
			Box::new(DialoguerConfirmer),
		);
		let request = dispatch_request(args)?;
		service
			.script_interface(&request)
			.await
			.with_context(|| format!("{} {} failed", request.contract, request.operation))
	}
}

/// Reports under the `reports` namespace, optionally for some protocols only.
pub async fn stored_reports(storage: &StorageService, protocols: &[Protocol]) -> Result<Vec<ApiReport>> {
	let reports: Vec<ApiReport> = storage
		.retrieve_all(REPORTS)
		.await
		.context("Failed to read stored reports")?;
	Ok(reports
		.into_iter()
		.filter(|r| protocols.is_empty() || protocols.contains(&r.protocol))
		.collect())
}

pub fn dispatch_request(args: &MessageArgs) -> Result<DispatchRequest> {
	if !matches!(args.protocol, Protocol::Ccip | Protocol::Hyperlane) {
		bail!("{} is not a messaging protocol", args.protocol);
	}
	let contract = MessagingContract::from_name(args.protocol, &args.contract)?;

	Ok(DispatchRequest {
		source_chain_id: args.source_chain,
		destination_chain_id: args.dest_chain,
		tx_chain_id: args.tx_chain.unwrap_or(args.source_chain),
		contract,
		operation: args.operation,
		value: U256::from(args.value),
		mode: args.mode,
		confirm: args.confirm,
	})
}

/// Checks keys, RPC endpoints and every protocol table.
pub fn validate(config: BenchConfig) -> Result<()> {
	let service = BenchService::new(config)?;

	for (network, url) in &service.config.rpc {
		info!(network = %network, url = %url, "RPC endpoint");
	}
	for protocol in Protocol::AGGREGATORS {
		let chains: Vec<&str> = protocol
			.supported_chains()
			.iter()
			.filter(|chain| service.deliveries.delivery(chain.id()).is_ok())
			.map(|chain| chain.name())
			.collect();
		if chains.is_empty() {
			warn!(protocol = %protocol, "No RPC endpoint for any supported chain");
		} else {
			info!(protocol = %protocol, chains = ?chains, "Protocol ready");
		}
	}
	if service.config.keys.socket_api_key.is_none() {
		warn!("No Socket API key configured, Socket routes will fail");
	}

	info!("Configuration is valid");
	Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}
