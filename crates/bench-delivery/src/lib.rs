//! Per-chain transaction delivery.
//!
//! A [`DeliveryInterface`] owns one chain: it answers `eth_call`s, reports the
//! gas price and submits signed transactions from the benchmark wallet.
//! [`DeliveryService`] routes requests by chain id and adds the ERC-20
//! allowance flow every aggregator runs before its swap transaction.

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use bench_types::{ConfigSchema, Transaction, TransactionReceipt, NATIVE_TOKEN_ADDRESS};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

pub mod implementations;

pub use implementations::evm::alloy::{create_http_delivery, AlloyDelivery};
pub use implementations::mock::MockDelivery;

sol! {
	interface IERC20 {
		function allowance(address owner, address spender) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
	}
}

#[derive(Debug, Error)]
pub enum DeliveryError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("No delivery configured for chain {0}")]
	NoProviderForChain(u64),
	#[error("Transaction {0} reverted")]
	Reverted(B256),
	#[error("Timeout waiting for receipt of {hash} after {seconds} seconds")]
	Timeout { hash: B256, seconds: u64 },
	#[error("Failed to decode call result: {0}")]
	Decode(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	fn chain_id(&self) -> u64;

	/// Address transactions are sent from.
	fn address(&self) -> Address;

	/// Executes `tx` as an `eth_call` from [`address`](Self::address).
	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError>;

	/// Current legacy gas price in wei.
	async fn gas_price(&self) -> Result<u128, DeliveryError>;

	/// Transaction count of [`address`](Self::address).
	async fn nonce(&self) -> Result<u64, DeliveryError>;

	async fn submit(&self, tx: Transaction) -> Result<B256, DeliveryError>;

	async fn wait_for_receipt(&self, hash: &B256) -> Result<TransactionReceipt, DeliveryError>;
}

pub struct DeliveryService {
	deliveries: HashMap<u64, Box<dyn DeliveryInterface>>,
}

impl DeliveryService {
	pub fn new(deliveries: Vec<Box<dyn DeliveryInterface>>) -> Self {
		let deliveries = deliveries.into_iter().map(|d| (d.chain_id(), d)).collect();
		Self { deliveries }
	}

	pub fn delivery(&self, chain_id: u64) -> Result<&dyn DeliveryInterface, DeliveryError> {
		self.deliveries
			.get(&chain_id)
			.map(|d| d.as_ref())
			.ok_or(DeliveryError::NoProviderForChain(chain_id))
	}

	pub fn chains(&self) -> Vec<u64> {
		let mut chains: Vec<u64> = self.deliveries.keys().copied().collect();
		chains.sort_unstable();
		chains
	}

	pub async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		self.delivery(tx.chain_id)?.call(tx).await
	}

	pub async fn gas_price(&self, chain_id: u64) -> Result<u128, DeliveryError> {
		self.delivery(chain_id)?.gas_price().await
	}

	pub async fn nonce(&self, chain_id: u64) -> Result<u64, DeliveryError> {
		self.delivery(chain_id)?.nonce().await
	}

	/// Submits `tx` and waits for its receipt, failing if it reverted.
	pub async fn send_and_confirm(&self, tx: Transaction) -> Result<TransactionReceipt, DeliveryError> {
		let delivery = self.delivery(tx.chain_id)?;
		let hash = delivery.submit(tx).await?;
		let receipt = delivery.wait_for_receipt(&hash).await?;

		if !receipt.success {
			return Err(DeliveryError::Reverted(hash));
		}
		info!(tx_hash = %hash, block = receipt.block_number, gas_used = receipt.gas_used, "Transaction confirmed");
		Ok(receipt)
	}

	/// Ensures `spender` may move at least `amount` of `token` from the wallet.
	///
	/// Returns the approval receipt when an `approve` had to be sent. Native
	/// currency needs no allowance and is skipped.
	pub async fn approve_allowance(
		&self,
		chain_id: u64,
		token: Address,
		spender: Address,
		amount: U256,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		if token == NATIVE_TOKEN_ADDRESS || token.is_zero() {
			debug!(%token, "Native token, skipping allowance");
			return Ok(None);
		}

		let delivery = self.delivery(chain_id)?;
		let owner = delivery.address();

		let query = IERC20::allowanceCall { owner, spender }.abi_encode();
		let raw = delivery
			.call(&Transaction::new(chain_id, token, query, U256::ZERO))
			.await?;
		let allowance = IERC20::allowanceCall::abi_decode_returns(&raw)
			.map_err(|e| DeliveryError::Decode(e.to_string()))?;

		if allowance >= amount {
			debug!(%token, %spender, %allowance, "Allowance sufficient");
			return Ok(None);
		}

		info!(%token, %spender, %amount, "Approving allowance");
		let approve = IERC20::approveCall { spender, amount }.abi_encode();
		let receipt = self
			.send_and_confirm(Transaction::new(chain_id, token, approve, U256::ZERO))
			.await?;
		Ok(Some(receipt))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::address;

	const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
	const SPENDER: Address = address!("1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE");

	fn allowance_of(value: u64) -> Bytes {
		Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec())
	}

	#[tokio::test]
	async fn test_approve_skips_native_token() {
		let mock = MockDelivery::new(1);
		let submitted = mock.submissions();
		let service = DeliveryService::new(vec![Box::new(mock)]);

		let result = service
			.approve_allowance(1, NATIVE_TOKEN_ADDRESS, SPENDER, U256::from(10))
			.await
			.unwrap();
		assert!(result.is_none());
		assert!(submitted.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_approve_skips_sufficient_allowance() {
		let mock = MockDelivery::new(1).with_call_response(USDC, allowance_of(1_000));
		let submitted = mock.submissions();
		let service = DeliveryService::new(vec![Box::new(mock)]);

		let result = service
			.approve_allowance(1, USDC, SPENDER, U256::from(1_000))
			.await
			.unwrap();
		assert!(result.is_none());
		assert!(submitted.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_approve_sends_approval_when_short() {
		let mock = MockDelivery::new(1).with_call_response(USDC, allowance_of(5));
		let submitted = mock.submissions();
		let service = DeliveryService::new(vec![Box::new(mock)]);

		let receipt = service
			.approve_allowance(1, USDC, SPENDER, U256::from(1_000))
			.await
			.unwrap();
		assert!(receipt.is_some_and(|r| r.success));

		let submitted = submitted.lock().unwrap();
		assert_eq!(submitted.len(), 1);
		assert_eq!(submitted[0].to, USDC);
		let decoded = IERC20::approveCall::abi_decode(&submitted[0].data).unwrap();
		assert_eq!(decoded.spender, SPENDER);
		assert_eq!(decoded.amount, U256::from(1_000));
	}

	#[tokio::test]
	async fn test_send_and_confirm_reports_revert() {
		let service = DeliveryService::new(vec![Box::new(MockDelivery::new(137).reverting())]);
		let tx = Transaction::new(137, SPENDER, Bytes::new(), U256::ZERO);

		assert!(matches!(
			service.send_and_confirm(tx).await,
			Err(DeliveryError::Reverted(_))
		));
	}

	#[tokio::test]
	async fn test_unknown_chain() {
		let service = DeliveryService::new(vec![Box::new(MockDelivery::new(1))]);
		assert!(matches!(
			service.gas_price(10).await,
			Err(DeliveryError::NoProviderForChain(10))
		));
		assert_eq!(service.chains(), vec![1]);
	}
}
