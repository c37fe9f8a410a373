//! In-memory delivery for tests and dry runs.

use crate::{DeliveryError, DeliveryInterface};
use alloy::primitives::{address, keccak256, Address, Bytes, B256};
use async_trait::async_trait;
use bench_types::{ConfigSchema, Schema, Transaction, TransactionReceipt, ValidationError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Handle onto the transactions a [`MockDelivery`] has accepted.
pub type Submissions = Arc<Mutex<Vec<Transaction>>>;

/// Delivery that answers calls from a fixed table and records submissions.
///
/// Every submitted transaction gets a receipt in the next block. Calls to an
/// address without a configured response return empty bytes.
pub struct MockDelivery {
	chain_id: u64,
	address: Address,
	gas_price: u128,
	call_responses: HashMap<Address, Bytes>,
	submitted: Submissions,
	revert: bool,
}

impl MockDelivery {
	pub fn new(chain_id: u64) -> Self {
		Self {
			chain_id,
			address: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
			gas_price: 20_000_000_000,
			call_responses: HashMap::new(),
			submitted: Arc::default(),
			revert: false,
		}
	}

	pub fn with_address(mut self, address: Address) -> Self {
		self.address = address;
		self
	}

	pub fn with_gas_price(mut self, gas_price: u128) -> Self {
		self.gas_price = gas_price;
		self
	}

	pub fn with_call_response(mut self, to: Address, response: Bytes) -> Self {
		self.call_responses.insert(to, response);
		self
	}

	/// Makes every receipt report a reverted transaction.
	pub fn reverting(mut self) -> Self {
		self.revert = true;
		self
	}

	pub fn submissions(&self) -> Submissions {
		self.submitted.clone()
	}

	fn hash_for(&self, index: usize) -> B256 {
		keccak256([self.chain_id.to_be_bytes(), (index as u64).to_be_bytes()].concat())
	}
}

struct MockDeliverySchema;

impl ConfigSchema for MockDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for MockDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockDeliverySchema)
	}

	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	fn address(&self) -> Address {
		self.address
	}

	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		Ok(self.call_responses.get(&tx.to).cloned().unwrap_or_default())
	}

	async fn gas_price(&self) -> Result<u128, DeliveryError> {
		Ok(self.gas_price)
	}

	async fn nonce(&self) -> Result<u64, DeliveryError> {
		let submitted = self
			.submitted
			.lock()
			.map_err(|_| DeliveryError::Network("mock delivery poisoned".to_string()))?;
		Ok(submitted.len() as u64)
	}

	async fn submit(&self, tx: Transaction) -> Result<B256, DeliveryError> {
		let mut submitted = self
			.submitted
			.lock()
			.map_err(|_| DeliveryError::Network("mock delivery poisoned".to_string()))?;
		submitted.push(tx);
		Ok(self.hash_for(submitted.len() - 1))
	}

	async fn wait_for_receipt(&self, hash: &B256) -> Result<TransactionReceipt, DeliveryError> {
		let submitted = self
			.submitted
			.lock()
			.map_err(|_| DeliveryError::Network("mock delivery poisoned".to_string()))?;
		let index = (0..submitted.len())
			.find(|i| self.hash_for(*i) == *hash)
			.ok_or_else(|| DeliveryError::Network(format!("Transaction {} not found", hash)))?;

		Ok(TransactionReceipt {
			hash: *hash,
			block_number: index as u64 + 1,
			gas_used: submitted[index].gas_limit.unwrap_or(21_000),
			effective_gas_price: self.gas_price,
			success: !self.revert,
		})
	}
}
