//! Signing accounts used to submit transactions and sign CoW orders.

use alloy::primitives::{Address, Signature, B256};
use async_trait::async_trait;
use bench_types::ConfigSchema;
use thiserror::Error;

pub mod implementations;

pub use implementations::local::{create_account, LocalWallet};

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

#[async_trait]
pub trait AccountInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	fn address(&self) -> Address;

	/// Signs `message` with the EIP-191 personal message prefix.
	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError>;

	/// Signs a precomputed 32-byte digest without any prefix.
	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError>;
}

pub struct AccountService {
	provider: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(provider: Box<dyn AccountInterface>) -> Self {
		Self { provider }
	}

	pub fn address(&self) -> Address {
		self.provider.address()
	}

	pub async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		self.provider.sign_message(message).await
	}

	pub async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		self.provider.sign_hash(hash).await
	}
}
