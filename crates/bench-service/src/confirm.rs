//! Interactive confirmation before anything is broadcast.

use bench_messaging::{Confirmer, MessagingError};
use dialoguer::{theme::ColorfulTheme, Confirm};

/// Prompts on the terminal. Defaults to "no".
pub struct DialoguerConfirmer;

impl Confirmer for DialoguerConfirmer {
	fn confirm(&self, prompt: &str) -> Result<bool, MessagingError> {
		Confirm::with_theme(&ColorfulTheme::default())
			.with_prompt(prompt)
			.default(false)
			.interact()
			.map_err(|e| MessagingError::Confirm(e.to_string()))
	}
}
