//! Messaging contracts and the chain identifiers their scripts expect.

use crate::MessagingError;
use bench_types::{Chain, Protocol};
use std::fmt;

/// A Foundry script shipped with the messaging contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingContract {
	/// CCIP sender paying fees in LINK.
	CcipSendSourceTxLink,
	/// CCIP sender paying fees in the native currency.
	CcipSendSourceTxNative,
	CcipReceiver,
	HyperlaneCounter,
	HyperlaneDispatcher,
}

impl MessagingContract {
	pub const ALL: [MessagingContract; 5] = [
		MessagingContract::CcipSendSourceTxLink,
		MessagingContract::CcipSendSourceTxNative,
		MessagingContract::CcipReceiver,
		MessagingContract::HyperlaneCounter,
		MessagingContract::HyperlaneDispatcher,
	];

	/// Contract name as it appears in the Foundry project.
	pub fn name(&self) -> &'static str {
		match self {
			MessagingContract::CcipSendSourceTxLink => "Send_SourceTxLink",
			MessagingContract::CcipSendSourceTxNative => "Send_SourceTxNative",
			MessagingContract::CcipReceiver => "Receiver",
			MessagingContract::HyperlaneCounter => "Counter",
			MessagingContract::HyperlaneDispatcher => "Dispatcher",
		}
	}

	pub fn protocol(&self) -> Protocol {
		match self {
			MessagingContract::CcipSendSourceTxLink
			| MessagingContract::CcipSendSourceTxNative
			| MessagingContract::CcipReceiver => Protocol::Ccip,
			MessagingContract::HyperlaneCounter | MessagingContract::HyperlaneDispatcher => Protocol::Hyperlane,
		}
	}

	/// Receivers only get deployed; senders can also dispatch messages.
	pub fn can_send(&self) -> bool {
		!matches!(self, MessagingContract::CcipReceiver | MessagingContract::HyperlaneCounter)
	}

	/// `script/<protocol>/<name>.s.sol:<name>Script`
	pub fn script_target(&self) -> String {
		let dir = match self.protocol() {
			Protocol::Ccip => "CCIP",
			_ => "Hyperlane",
		};
		format!("script/{}/{}.s.sol:{}Script", dir, self.name(), self.name())
	}

	/// Resolves a contract by protocol and name.
	pub fn from_name(protocol: Protocol, name: &str) -> Result<Self, MessagingError> {
		Self::ALL
			.into_iter()
			.find(|c| c.protocol() == protocol && c.name() == name)
			.ok_or_else(|| MessagingError::UnknownContract {
				contract: name.to_string(),
				protocol,
			})
	}
}

impl fmt::Display for MessagingContract {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// CCIP chain selector, for the chains CCIP is benchmarked on.
pub fn ccip_chain_selector(chain: Chain) -> Option<u64> {
	match chain {
		Chain::Sepolia => Some(16_015_286_601_757_825_753),
		Chain::Mumbai => Some(12_532_609_583_862_916_517),
		_ => None,
	}
}

/// Hyperlane domain ids equal EVM chain ids on every benchmarked chain.
pub fn hyperlane_domain(chain: Chain) -> u32 {
	chain.id() as u32
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_contract_lookup_is_scoped_to_protocol() {
		assert_eq!(
			MessagingContract::from_name(Protocol::Ccip, "Receiver").unwrap(),
			MessagingContract::CcipReceiver
		);
		assert!(matches!(
			MessagingContract::from_name(Protocol::Hyperlane, "Receiver"),
			Err(MessagingError::UnknownContract { .. })
		));
	}

	#[test]
	fn test_script_target() {
		assert_eq!(
			MessagingContract::HyperlaneCounter.script_target(),
			"script/Hyperlane/Counter.s.sol:CounterScript"
		);
		assert!(!MessagingContract::HyperlaneCounter.can_send());
		assert!(MessagingContract::CcipSendSourceTxNative.can_send());
	}

	#[test]
	fn test_every_ccip_chain_has_a_selector() {
		for chain in Protocol::Ccip.supported_chains() {
			assert!(ccip_chain_selector(*chain).is_some(), "{}", chain);
		}
		assert_eq!(hyperlane_domain(Chain::Mumbai), 80001);
	}
}
