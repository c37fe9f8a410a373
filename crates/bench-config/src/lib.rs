//! Configuration loading and input validation for the benchmark.

use thiserror::Error;

pub mod inputs;
pub mod loader;
pub mod types;

pub use inputs::*;
pub use loader::{load_config, substitute_env_vars, ConfigLoader};
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Unsupported config format: {0}")]
	UnsupportedFormat(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}
