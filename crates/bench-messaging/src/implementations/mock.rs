//! Script runner with a canned result, for tests and dry runs.

use crate::{MessagingError, ScriptInvocation, ScriptOutput, ScriptRunner};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Handle onto the invocations a [`MockRunner`] has received.
pub type Invocations = Arc<Mutex<Vec<ScriptInvocation>>>;

pub struct MockRunner {
	output: ScriptOutput,
	invocations: Invocations,
}

impl MockRunner {
	pub fn succeeding(stdout: &str) -> Self {
		Self {
			output: ScriptOutput {
				success: true,
				code: Some(0),
				stdout: stdout.to_string(),
				stderr: String::new(),
			},
			invocations: Arc::default(),
		}
	}

	pub fn failing(code: i32, stderr: &str) -> Self {
		Self {
			output: ScriptOutput {
				success: false,
				code: Some(code),
				stdout: String::new(),
				stderr: stderr.to_string(),
			},
			invocations: Arc::default(),
		}
	}

	pub fn invocations(&self) -> Invocations {
		self.invocations.clone()
	}
}

#[async_trait]
impl ScriptRunner for MockRunner {
	async fn run(&self, invocation: &ScriptInvocation) -> Result<ScriptOutput, MessagingError> {
		self.invocations
			.lock()
			.map_err(|_| MessagingError::Spawn("mock runner poisoned".to_string()))?
			.push(invocation.clone());
		Ok(self.output.clone())
	}
}
