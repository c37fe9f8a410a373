//! Validators run on user input before any vendor API is called.

use crate::types::BenchConfig;
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use bench_types::{is_supported_token, parse_amount, Chain, Protocol};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
	#[error("Invalid chain_id: {chain_id} for protocol: {protocol}")]
	UnsupportedChain { chain_id: u64, protocol: Protocol },
	#[error("Invalid tx_chain_id: {0}")]
	InvalidTxChain(u64),
	#[error("Invalid from_token: {0}")]
	InvalidFromToken(String),
	#[error("Invalid to_token: {0}")]
	InvalidToToken(String),
	#[error("from_token and to_token cannot be the same on same chain swap")]
	SameTokenSameChain,
	#[error("Missing public key")]
	MissingPublicKey,
	#[error("Missing private key")]
	MissingPrivateKey,
	#[error("Invalid public key: {0}")]
	InvalidPublicKey(String),
	#[error("Invalid private key")]
	InvalidPrivateKey,
	#[error("Public key {public} does not match private key address {derived}")]
	KeyMismatch { public: Address, derived: Address },
	#[error("Amount need to be greater than 0")]
	InvalidAmount,
	#[error("Missing Socket API Key. Get it from the Socket Docs.")]
	MissingSocketApiKey,
	#[error("Invalid protocol name: {0}")]
	InvalidProtocol(String),
	#[error("Missing network")]
	MissingNetwork,
	#[error("RPC URL not found for {0}")]
	RpcUrlNotFound(String),
}

/// Validated wallet credentials.
#[derive(Clone)]
pub struct KeyPair {
	pub public: Address,
	pub private: String,
}

impl std::fmt::Debug for KeyPair {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KeyPair")
			.field("public", &self.public)
			.field("private", &"<redacted>")
			.finish()
	}
}

/// Checks both chains against the protocol's support matrix.
///
/// `to_chain_id` defaults to the source chain. When `tx_chain_id` is given it
/// must equal one of the two chains.
pub fn validate_chain(
	protocol: Protocol,
	source_chain_id: u64,
	to_chain_id: Option<u64>,
	tx_chain_id: Option<u64>,
) -> Result<(Chain, Chain), InputError> {
	let to_chain_id = to_chain_id.unwrap_or(source_chain_id);

	let supported = |chain_id: u64| {
		Chain::from_id(chain_id)
			.filter(|chain| protocol.supports(*chain))
			.ok_or(InputError::UnsupportedChain { chain_id, protocol })
	};
	let source = supported(source_chain_id)?;
	let destination = supported(to_chain_id)?;

	if let Some(tx_chain_id) = tx_chain_id {
		if tx_chain_id != source_chain_id && tx_chain_id != to_chain_id {
			return Err(InputError::InvalidTxChain(tx_chain_id));
		}
	}

	Ok((source, destination))
}

pub fn validate_tokens(from_token: &str, to_token: &str, same_chain: bool) -> Result<bool, InputError> {
	if !is_supported_token(from_token) {
		return Err(InputError::InvalidFromToken(from_token.to_string()));
	}
	if !is_supported_token(to_token) {
		return Err(InputError::InvalidToToken(to_token.to_string()));
	}
	if from_token == to_token && same_chain {
		return Err(InputError::SameTokenSameChain);
	}
	Ok(true)
}

/// Returns the configured key pair, checking that the public key is the
/// private key's address.
pub fn validate_keys(config: &BenchConfig) -> Result<KeyPair, InputError> {
	let public = config
		.keys
		.public_key
		.as_deref()
		.filter(|k| !k.is_empty())
		.ok_or(InputError::MissingPublicKey)?;
	let private = config
		.keys
		.private_key
		.as_deref()
		.filter(|k| !k.is_empty())
		.ok_or(InputError::MissingPrivateKey)?;

	let public: Address = public
		.parse()
		.map_err(|_| InputError::InvalidPublicKey(public.to_string()))?;
	let derived = private
		.parse::<PrivateKeySigner>()
		.map_err(|_| InputError::InvalidPrivateKey)?
		.address();
	if derived != public {
		return Err(InputError::KeyMismatch { public, derived });
	}

	Ok(KeyPair {
		public,
		private: private.to_string(),
	})
}

/// Parses a base-unit amount, which must be strictly positive.
pub fn validate_amount(amount: &str) -> Result<U256, InputError> {
	parse_amount(amount)
		.ok()
		.filter(|value| !value.is_zero())
		.ok_or(InputError::InvalidAmount)
}

/// Returns the vendor API key for protocols that require one.
pub fn validate_api_key(config: &BenchConfig, protocol: Protocol) -> Result<String, InputError> {
	match protocol {
		Protocol::Socket => config
			.keys
			.socket_api_key
			.clone()
			.filter(|k| !k.is_empty())
			.ok_or(InputError::MissingSocketApiKey),
		other => Err(InputError::InvalidProtocol(other.as_str().to_string())),
	}
}

/// Looks up the RPC URL for a network name (case-insensitive).
pub fn validate_rpc_url(config: &BenchConfig, network: &str) -> Result<String, InputError> {
	if network.is_empty() {
		return Err(InputError::MissingNetwork);
	}

	config
		.rpc
		.get(&network.to_uppercase())
		.filter(|url| !url.is_empty())
		.cloned()
		.ok_or_else(|| InputError::RpcUrlNotFound(network.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	// Anvil's first development account.
	const PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const PUBLIC_KEY: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

	fn config_with_keys(public: Option<&str>, private: Option<&str>) -> BenchConfig {
		let mut config = BenchConfig::default();
		config.keys.public_key = public.map(str::to_string);
		config.keys.private_key = private.map(str::to_string);
		config
	}

	#[test]
	fn test_validate_chain_checks_source_first() {
		assert_eq!(
			validate_chain(Protocol::Socket, 5, Some(999), None),
			Err(InputError::UnsupportedChain {
				chain_id: 5,
				protocol: Protocol::Socket
			})
		);
		assert_eq!(
			validate_chain(Protocol::Socket, 1, Some(999), None)
				.unwrap_err()
				.to_string(),
			"Invalid chain_id: 999 for protocol: SOCKET"
		);
	}

	#[test]
	fn test_validate_chain_defaults_destination_to_source() {
		assert_eq!(
			validate_chain(Protocol::Cow, 11155111, None, None),
			Ok((Chain::Sepolia, Chain::Sepolia))
		);
	}

	#[test]
	fn test_validate_tx_chain() {
		assert_eq!(
			validate_chain(Protocol::Ccip, 11155111, Some(80001), Some(80001)),
			Ok((Chain::Sepolia, Chain::Mumbai))
		);
		assert_eq!(
			validate_chain(Protocol::Ccip, 11155111, Some(80001), Some(1))
				.unwrap_err()
				.to_string(),
			"Invalid tx_chain_id: 1"
		);
	}

	#[test]
	fn test_validate_tokens() {
		assert_eq!(validate_tokens("WETH", "USDC", true), Ok(true));
		assert_eq!(validate_tokens("USDC", "USDC", false), Ok(true));
		assert_eq!(
			validate_tokens("SHIB", "USDC", false).unwrap_err().to_string(),
			"Invalid from_token: SHIB"
		);
		assert_eq!(
			validate_tokens("USDC", "SHIB", false).unwrap_err().to_string(),
			"Invalid to_token: SHIB"
		);
		assert_eq!(
			validate_tokens("DAI", "DAI", true),
			Err(InputError::SameTokenSameChain)
		);
	}

	#[test]
	fn test_validate_keys() {
		let keys = validate_keys(&config_with_keys(Some(PUBLIC_KEY), Some(PRIVATE_KEY))).unwrap();
		assert_eq!(keys.public, PUBLIC_KEY.parse::<Address>().unwrap());

		assert_eq!(
			validate_keys(&config_with_keys(None, Some(PRIVATE_KEY))).unwrap_err(),
			InputError::MissingPublicKey
		);
		assert_eq!(
			validate_keys(&config_with_keys(Some(PUBLIC_KEY), Some(""))).unwrap_err(),
			InputError::MissingPrivateKey
		);
		assert!(matches!(
			validate_keys(&config_with_keys(
				Some("0x0000000000000000000000000000000000000001"),
				Some(PRIVATE_KEY)
			)),
			Err(InputError::KeyMismatch { .. })
		));
	}

	#[test]
	fn test_validate_amount_requires_positive() {
		assert_eq!(validate_amount("1000000"), Ok(U256::from(1_000_000)));
		assert_eq!(validate_amount("0"), Err(InputError::InvalidAmount));
		assert_eq!(validate_amount("-5"), Err(InputError::InvalidAmount));
		assert_eq!(
			validate_amount("abc").unwrap_err().to_string(),
			"Amount need to be greater than 0"
		);
	}

	#[test]
	fn test_validate_api_key() {
		let mut config = BenchConfig::default();
		assert_eq!(
			validate_api_key(&config, Protocol::Socket).unwrap_err().to_string(),
			"Missing Socket API Key. Get it from the Socket Docs."
		);
		config.keys.socket_api_key = Some("key".to_string());
		assert_eq!(validate_api_key(&config, Protocol::Socket).unwrap(), "key");
		assert_eq!(
			validate_api_key(&config, Protocol::Lifi).unwrap_err().to_string(),
			"Invalid protocol name: LIFI"
		);
	}

	#[test]
	fn test_validate_rpc_url() {
		let mut config = BenchConfig::default();
		config
			.rpc
			.insert("SEPOLIA".to_string(), "https://sepolia.example".to_string());

		assert_eq!(validate_rpc_url(&config, "sepolia").unwrap(), "https://sepolia.example");
		assert_eq!(validate_rpc_url(&config, ""), Err(InputError::MissingNetwork));
		assert_eq!(
			validate_rpc_url(&config, "MUMBAI").unwrap_err().to_string(),
			"RPC URL not found for MUMBAI"
		);
	}
}
