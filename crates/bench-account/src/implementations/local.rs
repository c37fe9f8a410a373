//! Local private key wallet.

use crate::{AccountError, AccountInterface};
use alloy::primitives::{Address, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use bench_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};

/// Wallet holding a private key in memory.
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a wallet from a hex private key, with or without `0x`.
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}
}

pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("private_key", FieldType::String).with_validator(|value| {
					let key = value.as_str().unwrap_or_default();
					let key_without_prefix = key.strip_prefix("0x").unwrap_or(key);

					if key_without_prefix.len() != 64 {
						return Err("Private key must be 64 hex characters (32 bytes)".to_string());
					}
					if hex::decode(key_without_prefix).is_err() {
						return Err("Private key must be valid hexadecimal".to_string());
					}
					Ok(())
				}),
			],
			vec![Field::address("public_key")],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	fn address(&self) -> Address {
		self.signer.address()
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		self.signer
			.sign_message(message)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign message: {}", e)))
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		self.signer
			.sign_hash(hash)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign hash: {}", e)))
	}
}

/// Creates a local wallet from a `{ private_key = "0x..." }` table.
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidConfig(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidConfig("private_key is required".to_string()))?;
	let wallet = LocalWallet::new(private_key)?;

	if let Some(public_key) = config.get("public_key").and_then(|v| v.as_str()) {
		let expected: Address = public_key
			.parse()
			.map_err(|_| AccountError::InvalidConfig(format!("Invalid public key: {}", public_key)))?;
		if expected != wallet.address() {
			return Err(AccountError::InvalidKey(format!(
				"public key {} does not match private key address {}",
				expected,
				wallet.address()
			)));
		}
	}

	tracing::debug!(address = %wallet.address(), "Created local wallet");
	Ok(Box::new(wallet))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::{address, keccak256};

	const PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const ADDRESS: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

	fn table(entries: &[(&str, &str)]) -> toml::Value {
		let mut map = toml::map::Map::new();
		for (k, v) in entries {
			map.insert(k.to_string(), toml::Value::String(v.to_string()));
		}
		toml::Value::Table(map)
	}

	#[test]
	fn test_wallet_address_from_key() {
		let wallet = LocalWallet::new(PRIVATE_KEY).unwrap();
		assert_eq!(wallet.address(), ADDRESS);
		assert!(LocalWallet::new("0x1234").is_err());
	}

	#[tokio::test]
	async fn test_signatures_recover_to_wallet() {
		let wallet = LocalWallet::new(PRIVATE_KEY).unwrap();

		let message = b"bridge aggregator bench";
		let signature = wallet.sign_message(message).await.unwrap();
		assert_eq!(signature.recover_address_from_msg(message).unwrap(), ADDRESS);

		let digest = keccak256(message);
		let signature = wallet.sign_hash(&digest).await.unwrap();
		assert_eq!(signature.recover_address_from_prehash(&digest).unwrap(), ADDRESS);
	}

	#[test]
	fn test_create_account_checks_public_key() {
		let account = create_account(&table(&[("private_key", PRIVATE_KEY)])).unwrap();
		assert_eq!(account.address(), ADDRESS);

		let mismatched = table(&[
			("private_key", PRIVATE_KEY),
			("public_key", "0x0000000000000000000000000000000000000001"),
		]);
		assert!(matches!(create_account(&mismatched), Err(AccountError::InvalidKey(_))));

		assert!(matches!(
			create_account(&table(&[("private_key", "zz")])),
			Err(AccountError::InvalidConfig(_))
		));
	}
}
