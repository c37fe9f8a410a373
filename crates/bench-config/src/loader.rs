//! Configuration loading from files and environment.

use crate::types::BenchConfig;
use crate::ConfigError;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
	/// Load configuration from a TOML, JSON or YAML file.
	///
	/// `${VAR}` references are replaced with environment values before parsing.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<BenchConfig, ConfigError> {
		let path = path.as_ref();
		info!("Loading configuration from {:?}", path);

		let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
			std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.display().to_string()),
			_ => ConfigError::IoError(e),
		})?;
		let contents = substitute_env_vars(&raw)?;

		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Self::from_toml(&contents),
			Some("json") => Self::from_json(&contents),
			Some("yaml") | Some("yml") => Self::from_yaml(&contents),
			_ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
		}
	}

	pub fn from_toml(contents: &str) -> Result<BenchConfig, ConfigError> {
		toml::from_str(contents).map_err(|e| ConfigError::ParseError(format!("TOML: {}", e)))
	}

	pub fn from_json(contents: &str) -> Result<BenchConfig, ConfigError> {
		serde_json::from_str(contents).map_err(|e| ConfigError::ParseError(format!("JSON: {}", e)))
	}

	pub fn from_yaml(contents: &str) -> Result<BenchConfig, ConfigError> {
		serde_yaml::from_str(contents).map_err(|e| ConfigError::ParseError(format!("YAML: {}", e)))
	}

	/// Load `.env`, then the optional file, then environment overrides.
	pub fn from_env_and_file(file_path: Option<&Path>) -> Result<BenchConfig, ConfigError> {
		if let Ok(path) = dotenvy::dotenv() {
			debug!("Loaded environment from {:?}", path);
		}

		let mut config = match file_path {
			Some(path) => Self::from_file(path)?,
			None => BenchConfig::default(),
		};

		Self::apply_env_overrides(&mut config, std::env::vars());
		Ok(config)
	}

	/// Apply `KEY_PUBLIC`, `KEY_PRIVATE`, `SOCKET_API_KEY`, `BENCH_LOG_LEVEL`
	/// and `RPC_<NETWORK>` overrides from the given variables.
	pub fn apply_env_overrides<I>(config: &mut BenchConfig, vars: I)
	where
		I: IntoIterator<Item = (String, String)>,
	{
		for (key, value) in vars {
			if value.is_empty() {
				continue;
			}
			match key.as_str() {
				"KEY_PUBLIC" => {
					debug!("Overriding public key from environment");
					config.keys.public_key = Some(value);
				}
				"KEY_PRIVATE" => {
					debug!("Overriding private key from environment");
					config.keys.private_key = Some(value);
				}
				"SOCKET_API_KEY" => {
					debug!("Overriding Socket API key from environment");
					config.keys.socket_api_key = Some(value);
				}
				"BENCH_LOG_LEVEL" => config.bench.log_level = value,
				_ => {
					if let Some(network) = key.strip_prefix("RPC_").filter(|n| !n.is_empty()) {
						debug!(network, "Overriding RPC URL from environment");
						config.rpc.insert(network.to_uppercase(), value);
					}
				}
			}
		}
	}
}

/// Replaces every `${VAR}` with the value of the environment variable `VAR`.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;

	let mut missing = None;
	let result = re.replace_all(content, |caps: &regex::Captures| {
		let var_name = &caps[1];
		match std::env::var(var_name) {
			Ok(value) => value,
			Err(_) => {
				missing.get_or_insert_with(|| var_name.to_string());
				String::new()
			}
		}
	});

	match missing {
		Some(var_name) => Err(ConfigError::EnvVarNotFound(var_name)),
		None => Ok(result.into_owned()),
	}
}

/// Load configuration from standard locations.
///
/// Looks at `CONFIG_FILE`, then `./bench.toml`, then `./config/bench.toml`,
/// falling back to defaults with environment overrides.
pub fn load_config() -> Result<BenchConfig, ConfigError> {
	if let Ok(path) = std::env::var("CONFIG_FILE") {
		return ConfigLoader::from_env_and_file(Some(Path::new(&path)));
	}

	for path in ["./bench.toml", "./config/bench.toml"] {
		if Path::new(path).exists() {
			return ConfigLoader::from_env_and_file(Some(Path::new(path)));
		}
	}

	ConfigLoader::from_env_and_file(None)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_default_config() {
		let config = BenchConfig::default();
		assert_eq!(config.bench.output_dir, Path::new("run-data"));
		assert_eq!(config.bench.log_level, "info");
		assert_eq!(config.messaging.forge_binary, "forge");
		assert!(config.keys.private_key.is_none());
	}

	#[test]
	fn test_toml_parsing_keeps_protocol_tables() {
		let toml = r#"
[bench]
name = "nightly"

[rpc]
ETHEREUM = "https://eth.example"

[protocols.uniswap]
fee_tiers = [500, 3000]

[protocols.lifi]
base_url = "https://li.quest/v1"
"#;

		let config = ConfigLoader::from_toml(toml).unwrap();
		assert_eq!(config.bench.name, "nightly");
		assert_eq!(config.bench.output_dir, Path::new("run-data"));
		assert_eq!(config.rpc.get("ETHEREUM").map(String::as_str), Some("https://eth.example"));
		assert_eq!(
			config.protocol("lifi").get("base_url").and_then(|v| v.as_str()),
			Some("https://li.quest/v1")
		);
		assert!(config.protocol("xy").as_table().is_some_and(|t| t.is_empty()));
	}

	#[test]
	fn test_env_overrides() {
		let mut config = BenchConfig::default();
		let vars = [
			("KEY_PUBLIC", "0xabc"),
			("KEY_PRIVATE", "0xdef"),
			("SOCKET_API_KEY", "socket-key"),
			("RPC_polygon", "https://polygon.example"),
			("RPC_", "ignored"),
			("BENCH_LOG_LEVEL", "debug"),
			("HOME", "/root"),
		]
		.map(|(k, v)| (k.to_string(), v.to_string()));

		ConfigLoader::apply_env_overrides(&mut config, vars);

		assert_eq!(config.keys.public_key.as_deref(), Some("0xabc"));
		assert_eq!(config.keys.private_key.as_deref(), Some("0xdef"));
		assert_eq!(config.keys.socket_api_key.as_deref(), Some("socket-key"));
		assert_eq!(config.rpc.get("POLYGON").map(String::as_str), Some("https://polygon.example"));
		assert_eq!(config.rpc.len(), 1);
		assert_eq!(config.bench.log_level, "debug");
	}

	#[test]
	fn test_substitution_from_file() {
		std::env::set_var("BENCH_LOADER_TEST_RPC", "https://sepolia.example");

		let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
		writeln!(file, "[rpc]\nSEPOLIA = \"${{BENCH_LOADER_TEST_RPC}}\"").unwrap();

		let config = ConfigLoader::from_file(file.path()).unwrap();
		assert_eq!(config.rpc.get("SEPOLIA").map(String::as_str), Some("https://sepolia.example"));
	}

	#[test]
	fn test_missing_substitution_variable() {
		let result = substitute_env_vars("url = \"${BENCH_LOADER_TEST_UNSET_VAR}\"");
		assert!(matches!(result, Err(ConfigError::EnvVarNotFound(v)) if v == "BENCH_LOADER_TEST_UNSET_VAR"));
	}

	#[test]
	fn test_yaml_and_unsupported_format() {
		let config = ConfigLoader::from_yaml("bench:\n  output_dir: out\n").unwrap();
		assert_eq!(config.bench.output_dir, Path::new("out"));

		let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
		assert!(matches!(
			ConfigLoader::from_file(file.path()),
			Err(ConfigError::UnsupportedFormat(_))
		));
		assert!(matches!(
			ConfigLoader::from_file("/nonexistent/bench.toml"),
			Err(ConfigError::FileNotFound(_))
		));
	}
}
