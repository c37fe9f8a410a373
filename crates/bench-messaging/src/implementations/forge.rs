//! Runs scripts with the Foundry `forge` binary.

use crate::{MessagingError, ScriptInvocation, ScriptOutput, ScriptRunner};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ForgeRunner;

impl ForgeRunner {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl ScriptRunner for ForgeRunner {
	async fn run(&self, invocation: &ScriptInvocation) -> Result<ScriptOutput, MessagingError> {
		debug!(?invocation, "Spawning script");

		let output = Command::new(&invocation.program)
			.args(&invocation.args)
			.envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
			.current_dir(&invocation.working_dir)
			.env("NO_COLOR", "1")
			.stdin(Stdio::null())
			.output()
			.await
			.map_err(|e| match e.kind() {
				std::io::ErrorKind::NotFound => MessagingError::Spawn(format!(
					"{} not found (is Foundry installed and is {} a Foundry project?)",
					invocation.program,
					invocation.working_dir.display()
				)),
				_ => MessagingError::Spawn(e.to_string()),
			})?;

		Ok(ScriptOutput {
			success: output.status.success(),
			code: output.status.code(),
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	#[tokio::test]
	async fn test_missing_binary_is_a_spawn_error() {
		let invocation = ScriptInvocation {
			program: "forge-binary-that-does-not-exist".to_string(),
			args: vec!["script".to_string()],
			env: vec![],
			working_dir: PathBuf::from("."),
		};

		let result = ForgeRunner::new().run(&invocation).await;
		assert!(matches!(result, Err(MessagingError::Spawn(_))));
	}
}
