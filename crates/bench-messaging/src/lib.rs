//! CCIP and Hyperlane dispatchers.
//!
//! Messaging protocols are benchmarked through the Foundry scripts that ship
//! with their contracts. A dispatch validates the chains against the protocol
//! matrix, hands the chain selectors (or domains) and value to the script as
//! environment variables, runs it through a [`ScriptRunner`] and extracts the
//! transaction hash or deployed address from its output.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use bench_config::{validate_chain, validate_keys, validate_rpc_url, BenchConfig, InputError};
use bench_delivery::{DeliveryError, DeliveryService};
use bench_types::{Chain, Protocol};
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod contracts;
pub mod implementations;

pub use contracts::{ccip_chain_selector, hyperlane_domain, MessagingContract};
pub use implementations::forge::ForgeRunner;
pub use implementations::mock::MockRunner;

/// Result of a simulated send.
pub const TEST_SEND_RESULT: &str = "we're in test so tx successful";

#[derive(Debug, Error)]
pub enum MessagingError {
	#[error(transparent)]
	Input(#[from] InputError),
	#[error("Unknown contract: {contract} for protocol: {protocol}")]
	UnknownContract { contract: String, protocol: Protocol },
	#[error("Operation must be either 'deploy' or 'send', got: {0}")]
	InvalidOperation(String),
	#[error("Mode must be either 'test' or 'broadcast', got: {0}")]
	InvalidMode(String),
	#[error("{0} cannot send messages, it can only be deployed")]
	NotSendable(MessagingContract),
	#[error("Messages can only be sent from the source chain {source_chain}, not {tx_chain}")]
	SendFromSourceOnly { source_chain: Chain, tx_chain: Chain },
	#[error("No chain selector for {0}")]
	NoChainSelector(Chain),
	#[error("Broadcast cancelled")]
	Cancelled,
	#[error("Failed to run script: {0}")]
	Spawn(String),
	#[error("Script failed with exit code {code:?}: {stderr}")]
	Script { code: Option<i32>, stderr: String },
	#[error("Could not find {0} in script output")]
	Output(&'static str),
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
	#[error("Confirmation failed: {0}")]
	Confirm(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOperation {
	/// Deploys the contract on the transaction chain.
	Deploy,
	/// Dispatches a message from the source chain.
	Send,
}

impl FromStr for ScriptOperation {
	type Err = MessagingError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"deploy" => Ok(ScriptOperation::Deploy),
			"send" => Ok(ScriptOperation::Send),
			other => Err(MessagingError::InvalidOperation(other.to_string())),
		}
	}
}

impl fmt::Display for ScriptOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ScriptOperation::Deploy => "deploy",
			ScriptOperation::Send => "send",
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptMode {
	/// Simulates the script without broadcasting.
	Test,
	/// Broadcasts the script's transactions.
	Broadcast,
}

impl FromStr for ScriptMode {
	type Err = MessagingError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"test" => Ok(ScriptMode::Test),
			"broadcast" => Ok(ScriptMode::Broadcast),
			other => Err(MessagingError::InvalidMode(other.to_string())),
		}
	}
}

/// One `script_interface` call.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
	pub source_chain_id: u64,
	pub destination_chain_id: u64,
	/// Chain the script's transactions go to.
	pub tx_chain_id: u64,
	pub contract: MessagingContract,
	pub operation: ScriptOperation,
	/// Value attached to a send, in wei.
	pub value: U256,
	pub mode: ScriptMode,
	/// Ask the [`Confirmer`] before broadcasting.
	pub confirm: bool,
}

/// A fully resolved external command.
#[derive(Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
	pub program: String,
	pub args: Vec<String>,
	pub env: Vec<(String, String)>,
	pub working_dir: PathBuf,
}

impl ScriptInvocation {
	pub fn env_var(&self, key: &str) -> Option<&str> {
		self.env.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}
}

impl fmt::Debug for ScriptInvocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let env: Vec<(&str, &str)> = self
			.env
			.iter()
			.map(|(k, v)| (k.as_str(), if k == "PRIVATE_KEY" { "<redacted>" } else { v.as_str() }))
			.collect();
		f.debug_struct("ScriptInvocation")
			.field("program", &self.program)
			.field("args", &self.args)
			.field("env", &env)
			.field("working_dir", &self.working_dir)
			.finish()
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
	pub success: bool,
	pub code: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

/// Runs a resolved script invocation.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
	async fn run(&self, invocation: &ScriptInvocation) -> Result<ScriptOutput, MessagingError>;
}

/// Asks the operator before anything is broadcast.
pub trait Confirmer: Send + Sync {
	fn confirm(&self, prompt: &str) -> Result<bool, MessagingError>;
}

/// Confirmer with a fixed answer.
pub struct AutoConfirm(pub bool);

impl Confirmer for AutoConfirm {
	fn confirm(&self, _prompt: &str) -> Result<bool, MessagingError> {
		Ok(self.0)
	}
}

pub struct MessagingService {
	config: Arc<BenchConfig>,
	deliveries: Arc<DeliveryService>,
	runner: Box<dyn ScriptRunner>,
	confirmer: Box<dyn Confirmer>,
}

impl MessagingService {
	pub fn new(
		config: Arc<BenchConfig>,
		deliveries: Arc<DeliveryService>,
		runner: Box<dyn ScriptRunner>,
		confirmer: Box<dyn Confirmer>,
	) -> Self {
		Self {
			config,
			deliveries,
			runner,
			confirmer,
		}
	}

	/// Deploys a messaging contract or sends a message through it.
	///
	/// Returns the transaction hash of a broadcast send, [`TEST_SEND_RESULT`]
	/// for a simulated send, or the deployed contract address for a deploy.
	pub async fn script_interface(&self, request: &DispatchRequest) -> Result<String, MessagingError> {
		let protocol = request.contract.protocol();
		let (source, destination) = validate_chain(
			protocol,
			request.source_chain_id,
			Some(request.destination_chain_id),
			Some(request.tx_chain_id),
		)?;
		let tx_chain = if request.tx_chain_id == source.id() {
			source
		} else {
			destination
		};

		if request.operation == ScriptOperation::Send {
			if !request.contract.can_send() {
				return Err(MessagingError::NotSendable(request.contract));
			}
			if tx_chain != source {
				return Err(MessagingError::SendFromSourceOnly {
					source_chain: source,
					tx_chain,
				});
			}
		}

		let keys = validate_keys(&self.config)?;
		let rpc_url = validate_rpc_url(&self.config, tx_chain.name())?;
		let invocation = self.invocation(request, source, destination, &rpc_url, &keys.private)?;

		if request.mode == ScriptMode::Broadcast && request.confirm {
			let prompt = format!(
				"Broadcast {} of {} on {}?",
				request.operation, request.contract, tx_chain
			);
			if !self.confirmer.confirm(&prompt)? {
				return Err(MessagingError::Cancelled);
			}
		}

		info!(
			protocol = %protocol,
			contract = %request.contract,
			operation = %request.operation,
			source = %source,
			destination = %destination,
			tx_chain = %tx_chain,
			broadcast = request.mode == ScriptMode::Broadcast,
			"Running messaging script"
		);
		let output = self.runner.run(&invocation).await?;
		if !output.success {
			return Err(MessagingError::Script {
				code: output.code,
				stderr: output.stderr.trim().to_string(),
			});
		}
		debug!(stdout_len = output.stdout.len(), "Script finished");

		match (request.operation, request.mode) {
			(ScriptOperation::Send, ScriptMode::Test) => Ok(TEST_SEND_RESULT.to_string()),
			(ScriptOperation::Send, ScriptMode::Broadcast) => parse_tx_hash(&output.stdout)
				.map(|hash| hash.to_string())
				.ok_or(MessagingError::Output("transaction hash")),
			(ScriptOperation::Deploy, ScriptMode::Broadcast) => parse_deployed_address(&output.stdout)
				.map(|address| address.to_string())
				.ok_or(MessagingError::Output("deployed contract address")),
			(ScriptOperation::Deploy, ScriptMode::Test) => match parse_deployed_address(&output.stdout) {
				Some(address) => Ok(address.to_string()),
				None => {
					let nonce = self.deliveries.nonce(tx_chain.id()).await?;
					let predicted = keys.public.create(nonce);
					warn!(%predicted, nonce, "No address in simulation output, using predicted CREATE address");
					Ok(predicted.to_string())
				}
			},
		}
	}

	fn invocation(
		&self,
		request: &DispatchRequest,
		source: Chain,
		destination: Chain,
		rpc_url: &str,
		private_key: &str,
	) -> Result<ScriptInvocation, MessagingError> {
		let signature = match request.operation {
			ScriptOperation::Deploy => "deploy()",
			ScriptOperation::Send => "send()",
		};
		let mut args = vec![
			"script".to_string(),
			request.contract.script_target(),
			"--sig".to_string(),
			signature.to_string(),
			"--rpc-url".to_string(),
			rpc_url.to_string(),
		];
		if request.mode == ScriptMode::Broadcast {
			args.push("--broadcast".to_string());
		}

		let mut env = vec![("PRIVATE_KEY".to_string(), private_key.to_string())];
		match request.contract.protocol() {
			Protocol::Ccip => {
				let selector = |chain: Chain| ccip_chain_selector(chain).ok_or(MessagingError::NoChainSelector(chain));
				env.push(("SOURCE_CHAIN_SELECTOR".to_string(), selector(source)?.to_string()));
				env.push(("DESTINATION_CHAIN_SELECTOR".to_string(), selector(destination)?.to_string()));
			}
			_ => {
				env.push(("ORIGIN_DOMAIN".to_string(), hyperlane_domain(source).to_string()));
				env.push(("DESTINATION_DOMAIN".to_string(), hyperlane_domain(destination).to_string()));
			}
		}
		env.push(("VALUE".to_string(), request.value.to_string()));

		Ok(ScriptInvocation {
			program: self.config.messaging.forge_binary.clone(),
			args,
			env,
			working_dir: self.config.messaging.foundry_project_dir.clone(),
		})
	}
}

/// First transaction hash forge reports for a broadcast.
pub fn parse_tx_hash(output: &str) -> Option<B256> {
	let re = Regex::new(r"(?i)hash:?\s*(0x[0-9a-f]{64})").ok()?;
	re.captures(output).and_then(|caps| caps[1].parse().ok())
}

/// Address of the first contract the script deployed.
pub fn parse_deployed_address(output: &str) -> Option<Address> {
	let re = Regex::new(r"(?i)(?:contract address|deployed (?:to|at)):?\s*(0x[0-9a-f]{40})\b").ok()?;
	re.captures(output).and_then(|caps| caps[1].parse().ok())
}

#[cfg(test)]
mod tests {
	use super::*;
	use bench_delivery::MockDelivery;

	// Anvil's first development account.
	const PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const PUBLIC_KEY: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
	const TX_HASH: &str = "0x5f3c0e4c1a1d0fd9b6f3a0f1b8d3d7b1e6a7c2c9b4d5e6f708192a3b4c5d6e7f";

	fn config() -> Arc<BenchConfig> {
		let mut config = BenchConfig::default();
		config.keys.public_key = Some(PUBLIC_KEY.to_string());
		config.keys.private_key = Some(PRIVATE_KEY.to_string());
		for chain in [Chain::Sepolia, Chain::Mumbai, Chain::Goerli] {
			config
				.rpc
				.insert(chain.name().to_string(), format!("https://rpc.{}.example", chain.name().to_lowercase()));
		}
		Arc::new(config)
	}

	fn service(runner: MockRunner, confirm: bool) -> MessagingService {
		let deliveries = DeliveryService::new(vec![Box::new(MockDelivery::new(80001)), Box::new(MockDelivery::new(11155111))]);
		MessagingService::new(config(), Arc::new(deliveries), Box::new(runner), Box::new(AutoConfirm(confirm)))
	}

	fn send_request(contract: MessagingContract) -> DispatchRequest {
		DispatchRequest {
			source_chain_id: Chain::Sepolia.id(),
			destination_chain_id: Chain::Mumbai.id(),
			tx_chain_id: Chain::Sepolia.id(),
			contract,
			operation: ScriptOperation::Send,
			value: U256::from(20),
			mode: ScriptMode::Test,
			confirm: false,
		}
	}

	#[tokio::test]
	async fn test_simulated_ccip_sends_succeed() {
		for contract in [MessagingContract::CcipSendSourceTxLink, MessagingContract::CcipSendSourceTxNative] {
			let runner = MockRunner::succeeding("Script ran successfully.");
			let invocations = runner.invocations();
			let result = service(runner, false).script_interface(&send_request(contract)).await.unwrap();

			assert_eq!(result, TEST_SEND_RESULT);
			let invocation = invocations.lock().unwrap()[0].clone();
			assert_eq!(invocation.env_var("SOURCE_CHAIN_SELECTOR"), Some("16015286601757825753"));
			assert_eq!(invocation.env_var("DESTINATION_CHAIN_SELECTOR"), Some("12532609583862916517"));
			assert_eq!(invocation.env_var("VALUE"), Some("20"));
			assert!(invocation.args.contains(&"https://rpc.sepolia.example".to_string()));
			assert!(!invocation.args.contains(&"--broadcast".to_string()));
		}
	}

	#[tokio::test]
	async fn test_simulated_hyperlane_deploy_predicts_address() {
		let runner = MockRunner::succeeding("Script ran successfully.");
		let invocations = runner.invocations();
		let request = DispatchRequest {
			source_chain_id: Chain::Goerli.id(),
			destination_chain_id: Chain::Mumbai.id(),
			tx_chain_id: Chain::Mumbai.id(),
			contract: MessagingContract::HyperlaneCounter,
			operation: ScriptOperation::Deploy,
			value: U256::ZERO,
			mode: ScriptMode::Test,
			confirm: false,
		};

		let address = service(runner, false).script_interface(&request).await.unwrap();

		assert_eq!(address.len(), 42);
		let deployer: Address = PUBLIC_KEY.parse().unwrap();
		assert_eq!(address, deployer.create(0).to_string());
		let invocation = invocations.lock().unwrap()[0].clone();
		assert_eq!(invocation.env_var("ORIGIN_DOMAIN"), Some("5"));
		assert_eq!(invocation.env_var("DESTINATION_DOMAIN"), Some("80001"));
		assert_eq!(invocation.args[1], "script/Hyperlane/Counter.s.sol:CounterScript");
	}

	#[tokio::test]
	async fn test_broadcast_send_parses_hash() {
		let stdout = format!("##### sepolia\n✅  [Success]Hash: {}\nBlock: 4821733\n", TX_HASH);
		let runner = MockRunner::succeeding(&stdout);
		let invocations = runner.invocations();
		let mut request = send_request(MessagingContract::CcipSendSourceTxNative);
		request.mode = ScriptMode::Broadcast;
		request.confirm = true;

		let hash = service(runner, true).script_interface(&request).await.unwrap();

		assert_eq!(hash, TX_HASH);
		assert!(invocations.lock().unwrap()[0].args.contains(&"--broadcast".to_string()));
	}

	#[tokio::test]
	async fn test_declined_broadcast_does_not_run() {
		let runner = MockRunner::succeeding("");
		let invocations = runner.invocations();
		let mut request = send_request(MessagingContract::CcipSendSourceTxLink);
		request.mode = ScriptMode::Broadcast;
		request.confirm = true;

		let result = service(runner, false).script_interface(&request).await;

		assert!(matches!(result, Err(MessagingError::Cancelled)));
		assert!(invocations.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_send_rules() {
		let mut from_destination = send_request(MessagingContract::CcipSendSourceTxLink);
		from_destination.tx_chain_id = Chain::Mumbai.id();
		assert!(matches!(
			service(MockRunner::succeeding(""), false).script_interface(&from_destination).await,
			Err(MessagingError::SendFromSourceOnly { .. })
		));

		assert!(matches!(
			service(MockRunner::succeeding(""), false)
				.script_interface(&send_request(MessagingContract::CcipReceiver))
				.await,
			Err(MessagingError::NotSendable(MessagingContract::CcipReceiver))
		));

		let mut unrelated = send_request(MessagingContract::CcipSendSourceTxLink);
		unrelated.tx_chain_id = Chain::Goerli.id();
		assert!(matches!(
			service(MockRunner::succeeding(""), false).script_interface(&unrelated).await,
			Err(MessagingError::Input(InputError::InvalidTxChain(5)))
		));

		let mut unsupported = send_request(MessagingContract::CcipSendSourceTxLink);
		unsupported.source_chain_id = Chain::Goerli.id();
		let err = service(MockRunner::succeeding(""), false)
			.script_interface(&unsupported)
			.await
			.unwrap_err();
		assert_eq!(err.to_string(), "Invalid chain_id: 5 for protocol: CCIP");
	}

	#[tokio::test]
	async fn test_script_failure_surfaces_stderr() {
		let runner = MockRunner::failing(1, "Error: script failed: insufficient funds\n");
		let result = service(runner, false)
			.script_interface(&send_request(MessagingContract::CcipSendSourceTxLink))
			.await;

		match result {
			Err(MessagingError::Script { code, stderr }) => {
				assert_eq!(code, Some(1));
				assert_eq!(stderr, "Error: script failed: insufficient funds");
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn test_parse_deployed_address() {
		let output = "== Logs ==\n  Counter deployed to: 0x5FbDB2315678afecb367f032d93F642f64180aa3\n";
		assert_eq!(
			parse_deployed_address(output),
			Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap())
		);
		assert_eq!(parse_deployed_address("nothing here"), None);
		assert!(matches!(
			"upgrade".parse::<ScriptOperation>(),
			Err(MessagingError::InvalidOperation(_))
		));
	}
}
