//! Alloy-based EVM delivery.

use crate::{DeliveryError, DeliveryInterface};
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use bench_types::{
	ConfigSchema, Field, FieldType, Schema, Transaction, TransactionReceipt, ValidationError,
};
use std::time::Duration;

fn truncate_hash(hash: &B256) -> String {
	let hash_str = hex::encode(hash.0);
	format!("{}..", &hash_str[..8])
}

/// Submits transactions over HTTP JSON-RPC, signing with a local key.
pub struct AlloyDelivery {
	provider: DynProvider,
	address: Address,
	chain_id: u64,
	poll_interval: Duration,
	receipt_timeout: Duration,
}

impl AlloyDelivery {
	pub fn new(rpc_url: &str, chain_id: u64, signer: PrivateKeySigner) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?;

		let address = signer.address();
		let provider = ProviderBuilder::new()
			.wallet(EthereumWallet::from(signer))
			.connect_http(url)
			.erased();

		Ok(Self {
			provider,
			address,
			chain_id,
			poll_interval: Duration::from_secs(3),
			receipt_timeout: Duration::from_secs(300),
		})
	}

	pub fn with_polling(mut self, poll_interval: Duration, receipt_timeout: Duration) -> Self {
		self.poll_interval = poll_interval;
		self.receipt_timeout = receipt_timeout;
		self
	}
}

pub struct AlloyDeliverySchema;

impl ConfigSchema for AlloyDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::url("rpc_url"),
				Field::new("private_key", FieldType::String),
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
			vec![
				Field::new(
					"poll_interval_secs",
					FieldType::Integer {
						min: Some(1),
						max: Some(60),
					},
				),
				Field::new(
					"receipt_timeout_secs",
					FieldType::Integer {
						min: Some(1),
						max: Some(3600),
					},
				),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyDeliverySchema)
	}

	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	fn address(&self) -> Address {
		self.address
	}

	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		let request: TransactionRequest = tx.clone().into();
		let request = request.with_from(self.address);

		self.provider
			.call(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("eth_call failed: {}", e)))
	}

	async fn gas_price(&self) -> Result<u128, DeliveryError> {
		self.provider
			.get_gas_price()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get gas price: {}", e)))
	}

	async fn nonce(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_transaction_count(self.address)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get nonce: {}", e)))
	}

	async fn submit(&self, tx: Transaction) -> Result<B256, DeliveryError> {
		let request: TransactionRequest = tx.into();

		// The provider's wallet fills nonce and fees, then signs.
		let pending_tx = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to send transaction: {}", e)))?;

		let tx_hash = *pending_tx.tx_hash();
		tracing::info!(tx_hash = %truncate_hash(&tx_hash), chain_id = self.chain_id, "Submitted transaction");
		Ok(tx_hash)
	}

	async fn wait_for_receipt(&self, hash: &B256) -> Result<TransactionReceipt, DeliveryError> {
		let start_time = tokio::time::Instant::now();
		tracing::info!(
			tx_hash = %truncate_hash(hash),
			"Waiting for receipt (timeout: {}s)",
			self.receipt_timeout.as_secs()
		);

		loop {
			if start_time.elapsed() > self.receipt_timeout {
				return Err(DeliveryError::Timeout {
					hash: *hash,
					seconds: self.receipt_timeout.as_secs(),
				});
			}

			match self.provider.get_transaction_receipt(*hash).await {
				Ok(Some(receipt)) => {
					return Ok(TransactionReceipt {
						hash: receipt.transaction_hash,
						block_number: receipt.block_number.unwrap_or(0),
						gas_used: receipt.gas_used,
						effective_gas_price: receipt.effective_gas_price,
						success: receipt.status(),
					});
				}
				Ok(None) => {
					tracing::debug!(tx_hash = %truncate_hash(hash), "Not yet mined");
					tokio::time::sleep(self.poll_interval).await;
				}
				Err(e) => {
					return Err(DeliveryError::Network(format!("Failed to get receipt: {}", e)));
				}
			}
		}
	}
}

/// Creates an HTTP delivery from `{ rpc_url, chain_id, private_key }`, with
/// optional `poll_interval_secs` and `receipt_timeout_secs`.
pub fn create_http_delivery(config: &toml::Value) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	AlloyDeliverySchema
		.validate(config)
		.map_err(|e| DeliveryError::InvalidConfig(e.to_string()))?;

	let get_str = |key: &str| {
		config
			.get(key)
			.and_then(|v| v.as_str())
			.ok_or_else(|| DeliveryError::InvalidConfig(format!("{} is required", key)))
	};
	let get_secs = |key: &str, default: u64| {
		config
			.get(key)
			.and_then(|v| v.as_integer())
			.map(|v| v as u64)
			.unwrap_or(default)
	};

	let rpc_url = get_str("rpc_url")?;
	let signer: PrivateKeySigner = get_str("private_key")?
		.parse()
		.map_err(|e| DeliveryError::InvalidConfig(format!("Invalid private key: {}", e)))?;
	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.ok_or_else(|| DeliveryError::InvalidConfig("chain_id is required".to_string()))? as u64;

	let delivery = AlloyDelivery::new(rpc_url, chain_id, signer)?.with_polling(
		Duration::from_secs(get_secs("poll_interval_secs", 3)),
		Duration::from_secs(get_secs("receipt_timeout_secs", 300)),
	);
	Ok(Box::new(delivery))
}

#[cfg(test)]
mod tests {
	use super::*;

	const PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn config(rpc_url: &str) -> toml::Value {
		toml::from_str(&format!(
			"rpc_url = \"{}\"\nchain_id = 11155111\nprivate_key = \"{}\"\nreceipt_timeout_secs = 60",
			rpc_url, PRIVATE_KEY
		))
		.unwrap()
	}

	#[test]
	fn test_create_http_delivery() {
		let delivery = create_http_delivery(&config("http://localhost:8545")).unwrap();
		assert_eq!(delivery.chain_id(), 11155111);
		assert_eq!(
			delivery.address(),
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>().unwrap()
		);
	}

	#[test]
	fn test_create_http_delivery_rejects_bad_url() {
		assert!(matches!(
			create_http_delivery(&config("ws://localhost:8545")),
			Err(DeliveryError::InvalidConfig(_))
		));
	}
}
