//! Bounded status polling for bridge transfers and multi-step routes.

use crate::AggregatorError;
use backoff::{backoff::Backoff, ExponentialBackoff};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub(crate) struct StatusPoller {
	backoff: ExponentialBackoff,
	max_attempts: u32,
}

impl StatusPoller {
	pub(crate) fn new(interval: Duration, max_attempts: u32) -> Self {
		let backoff = ExponentialBackoff {
			initial_interval: interval,
			current_interval: interval,
			max_interval: interval * 4,
			multiplier: 1.5,
			randomization_factor: 0.1,
			max_elapsed_time: None,
			..Default::default()
		};

		Self {
			backoff,
			max_attempts: max_attempts.max(1),
		}
	}

	/// Calls `check` until it yields `Some`, an error, or the attempt cap.
	pub(crate) async fn poll<T, F, Fut>(&self, what: &str, mut check: F) -> Result<T, AggregatorError>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<Option<T>, AggregatorError>>,
	{
		let mut backoff = self.backoff.clone();
		backoff.reset();

		for attempt in 1..=self.max_attempts {
			if let Some(done) = check().await? {
				return Ok(done);
			}
			if attempt == self.max_attempts {
				break;
			}

			let delay = backoff.next_backoff().unwrap_or(self.backoff.max_interval);
			debug!(what, attempt, delay_ms = delay.as_millis() as u64, "Not settled yet");
			tokio::time::sleep(delay).await;
		}

		Err(AggregatorError::StatusTimeout {
			what: what.to_string(),
			attempts: self.max_attempts,
		})
	}
}
