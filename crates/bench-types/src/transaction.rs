//! Transaction types handed from aggregator plugins to the delivery layer.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::TransactionRequest;
use serde::{Deserialize, Serialize};

/// An EVM call or transaction built from a vendor quote.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
	pub to: Address,
	pub data: Bytes,
	pub value: U256,
	pub chain_id: u64,
	/// Gas limit suggested by the vendor, if any.
	pub gas_limit: Option<u64>,
	/// Legacy gas price suggested by the vendor, if any.
	pub gas_price: Option<u128>,
}

impl Transaction {
	pub fn new(chain_id: u64, to: Address, data: impl Into<Bytes>, value: U256) -> Self {
		Self {
			to,
			data: data.into(),
			value,
			chain_id,
			gas_limit: None,
			gas_price: None,
		}
	}

	pub fn with_gas_limit(mut self, gas_limit: Option<u64>) -> Self {
		self.gas_limit = gas_limit;
		self
	}

	pub fn with_gas_price(mut self, gas_price: Option<u128>) -> Self {
		self.gas_price = gas_price;
		self
	}
}

/// Conversion from our Transaction type to Alloy's TransactionRequest.
impl From<Transaction> for TransactionRequest {
	fn from(tx: Transaction) -> Self {
		let mut request = TransactionRequest::default()
			.with_to(tx.to)
			.with_input(tx.data)
			.with_value(tx.value)
			.with_chain_id(tx.chain_id);

		if let Some(gas_limit) = tx.gas_limit {
			request = request.with_gas_limit(gas_limit);
		}
		if let Some(gas_price) = tx.gas_price {
			request = request.with_gas_price(gas_price);
		}

		request
	}
}

/// Receipt of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	pub hash: B256,
	pub block_number: u64,
	pub gas_used: u64,
	pub effective_gas_price: u128,
	pub success: bool,
}
