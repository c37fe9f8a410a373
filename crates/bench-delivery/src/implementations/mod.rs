//! Transaction delivery implementations.
//!
//! - `evm::alloy`: JSON-RPC submission through an alloy provider with a local wallet
//! - `mock`: in-memory delivery that records submissions

pub mod evm {
	pub mod alloy;
}
pub mod mock;
