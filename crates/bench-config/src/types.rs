//! Configuration types for the benchmark.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Complete benchmark configuration.
///
/// Every section has defaults, so an empty file (or no file at all plus
/// environment overrides) is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BenchConfig {
	pub bench: BenchSettings,
	pub keys: KeysConfig,
	/// RPC endpoints keyed by upper-case chain name (`ETHEREUM`, `SEPOLIA`, ...).
	pub rpc: HashMap<String, String>,
	/// Per-protocol plugin tables keyed by `Protocol::config_key`.
	pub protocols: HashMap<String, toml::Value>,
	pub messaging: MessagingConfig,
	pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BenchSettings {
	pub name: String,
	pub log_level: String,
	/// Directory reports and routes are written to.
	pub output_dir: PathBuf,
	/// Timeout applied to every vendor HTTP request.
	pub http_timeout_secs: u64,
}

impl Default for BenchSettings {
	fn default() -> Self {
		Self {
			name: "bridge-aggregator-bench".to_string(),
			log_level: "info".to_string(),
			output_dir: PathBuf::from("run-data"),
			http_timeout_secs: 30,
		}
	}
}

/// Wallet credentials and vendor API keys.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct KeysConfig {
	pub public_key: Option<String>,
	pub private_key: Option<String>,
	pub socket_api_key: Option<String>,
}

impl std::fmt::Debug for KeysConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KeysConfig")
			.field("public_key", &self.public_key)
			.field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
			.field("socket_api_key", &self.socket_api_key.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Foundry project driving the CCIP and Hyperlane scripts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MessagingConfig {
	pub foundry_project_dir: PathBuf,
	pub forge_binary: String,
}

impl Default for MessagingConfig {
	fn default() -> Self {
		Self {
			foundry_project_dir: PathBuf::from("contracts"),
			forge_binary: "forge".to_string(),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PricingConfig {
	pub coingecko_url: String,
	pub api_key: Option<String>,
}

impl Default for PricingConfig {
	fn default() -> Self {
		Self {
			coingecko_url: "https://api.coingecko.com/api/v3".to_string(),
			api_key: None,
		}
	}
}

impl BenchConfig {
	/// Plugin table for a protocol, or an empty table when unconfigured.
	pub fn protocol(&self, key: &str) -> toml::Value {
		self.protocols
			.get(key)
			.cloned()
			.unwrap_or_else(|| toml::Value::Table(toml::map::Map::new()))
	}
}
