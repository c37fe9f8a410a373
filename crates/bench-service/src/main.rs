use anyhow::Result;
use bench_service::cli::Cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	let config = bench_service::load(&cli)?;

	setup_tracing(bench_service::env_filter(cli.log_level.as_deref(), &config.bench.log_level));

	bench_service::run(cli, config).await
}

fn setup_tracing(env_filter: EnvFilter) {
	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();
}
