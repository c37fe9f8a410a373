//! The `bench` command-line service.
//!
//! - `cli`: argument definitions
//! - `service`: builds deliveries, plugins and storage from the configuration
//!   and runs each command
//! - `confirm`: terminal prompts guarding on-chain actions

pub mod cli;
pub mod confirm;
pub mod service;

use anyhow::{Context, Result};
use bench_config::{load_config, BenchConfig, ConfigLoader};
use bench_messaging::AutoConfirm;
use cli::{Cli, Command};
use confirm::DialoguerConfirmer;
use service::BenchService;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Loads the file given on the command line, or searches the standard locations.
pub fn load(cli: &Cli) -> Result<BenchConfig> {
	match &cli.config {
		Some(path) => ConfigLoader::from_env_and_file(Some(path.as_path()))
			.with_context(|| format!("Failed to load configuration from {}", path.display())),
		None => load_config().context("Failed to load configuration"),
	}
}

/// Log filter: an explicit `--log-level` wins, then `RUST_LOG`, then the configured level.
pub fn env_filter(explicit: Option<&str>, configured: &str) -> EnvFilter {
	match explicit {
		Some(level) => EnvFilter::new(level),
		None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured)),
	}
}

pub async fn run(cli: Cli, config: BenchConfig) -> Result<()> {
	match cli.command {
		Command::Validate => service::validate(config),
		Command::Quote { route, report, save } => BenchService::new(config)?.quote(&route, report, save).await,
		Command::Execute { route, save, yes } => {
			let service = BenchService::new(config)?;
			if yes {
				service.execute(&route, save, &AutoConfirm(true)).await
			} else {
				service.execute(&route, save, &DialoguerConfirmer).await
			}
		}
		Command::Compare { metric, protocols } => {
			let tables = BenchService::new(config)?.compare(metric, &protocols).await?;
			println!("{}", tables);
			Ok(())
		}
		Command::Message(args) => {
			let result = BenchService::new(config)?.message(&args).await?;
			info!(contract = %args.contract, operation = %args.operation, "Messaging script finished");
			println!("{}", result);
			Ok(())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_explicit_log_level_beats_rust_log() {
		std::env::set_var("RUST_LOG", "error");

		assert_eq!(env_filter(Some("bench_aggregators=debug"), "info").to_string(), "bench_aggregators=debug");
		assert_eq!(env_filter(None, "info").to_string(), "error");

		std::env::remove_var("RUST_LOG");
		assert_eq!(env_filter(None, "warn").to_string(), "warn");
	}
}
