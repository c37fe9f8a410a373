//! Command-line interface definitions.

use bench_messaging::{ScriptMode, ScriptOperation};
use bench_report::Metric;
use bench_types::{Operation, Protocol, RouteOptions, RouteRequest};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bench")]
#[command(about = "Benchmark cross-chain aggregators and messaging protocols", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
	/// Path to configuration file (toml, json or yaml)
	#[arg(short, long, env = "CONFIG_FILE")]
	pub config: Option<PathBuf>,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(short, long, env = "BENCH_LOG_LEVEL")]
	pub log_level: Option<String>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Request routes and print them
	Quote {
		#[command(flatten)]
		route: RouteArgs,

		/// Also generate the benchmark report
		#[arg(long)]
		report: bool,

		/// Persist routes and reports to the output directory
		#[arg(long)]
		save: bool,
	},

	/// Quote, sign and submit a route, then report on it
	Execute {
		#[command(flatten)]
		route: RouteArgs,

		/// Persist the route, execution and report
		#[arg(long)]
		save: bool,

		/// Skip the confirmation prompt
		#[arg(short, long)]
		yes: bool,
	},

	/// Rank stored reports
	Compare {
		/// net-fee, effective-value or latency
		#[arg(short, long, default_value = "net-fee")]
		metric: Metric,

		/// Only compare reports for these protocols
		#[arg(short, long = "protocol")]
		protocols: Vec<Protocol>,
	},

	/// Deploy or send through a CCIP or Hyperlane contract
	Message(MessageArgs),

	/// Validate configuration, keys and protocol tables
	Validate,
}

#[derive(Args, Debug, Clone)]
pub struct RouteArgs {
	/// Protocols to benchmark; repeat for several. Defaults to every aggregator.
	#[arg(short, long = "protocol")]
	pub protocols: Vec<Protocol>,

	#[arg(long)]
	pub from_chain: u64,

	/// Defaults to the source chain
	#[arg(long)]
	pub to_chain: Option<u64>,

	#[arg(long)]
	pub from_token: String,

	#[arg(long)]
	pub to_token: String,

	/// Amount in the source token's base units (decimal or 0x hex)
	#[arg(long)]
	pub amount: String,

	/// Socket: allow multi-transaction routes
	#[arg(long)]
	pub multi_tx: bool,

	/// CoWswap: order side (sell or buy)
	#[arg(long, default_value = "sell")]
	pub operation: Operation,

	/// CoWswap: order validity in minutes
	#[arg(long, default_value_t = 30)]
	pub valid_minutes: u64,

	#[arg(long, default_value_t = 100)]
	pub slippage_bps: u32,
}

impl RouteArgs {
	/// One request per selected protocol.
	pub fn requests(&self) -> Vec<RouteRequest> {
		let protocols = if self.protocols.is_empty() {
			Protocol::AGGREGATORS.to_vec()
		} else {
			self.protocols.clone()
		};
		let options = RouteOptions {
			multi_tx: self.multi_tx,
			operation: self.operation,
			valid_minutes: self.valid_minutes,
			slippage_bps: self.slippage_bps,
		};

		protocols
			.into_iter()
			.map(|protocol| RouteRequest {
				protocol,
				from_chain: self.from_chain,
				to_chain: self.to_chain.unwrap_or(self.from_chain),
				from_token: self.from_token.clone(),
				to_token: self.to_token.clone(),
				amount: self.amount.clone(),
				options: options.clone(),
			})
			.collect()
	}
}

#[derive(Args, Debug, Clone)]
pub struct MessageArgs {
	/// ccip or hyperlane
	#[arg(short, long)]
	pub protocol: Protocol,

	#[arg(long)]
	pub source_chain: u64,

	#[arg(long)]
	pub dest_chain: u64,

	/// Chain the script transacts on; defaults to the source chain
	#[arg(long)]
	pub tx_chain: Option<u64>,

	/// Contract name, e.g. Send_SourceTxLink or Counter
	#[arg(long)]
	pub contract: String,

	/// deploy or send
	#[arg(long)]
	pub operation: ScriptOperation,

	/// Value attached to a send, in wei
	#[arg(long, default_value_t = 0)]
	pub value: u128,

	/// test or broadcast
	#[arg(long, default_value = "test")]
	pub mode: ScriptMode,

	/// Ask before broadcasting
	#[arg(long)]
	pub confirm: bool,
}
