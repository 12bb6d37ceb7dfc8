//! Cooperative cancellation shared by every suspension point in the broker.

// crates.io
use tokio::sync::watch;
// self
use crate::_prelude::*;

/// Cloneable cancellation signal.
///
/// Clones observe the same signal. Once cancelled, a token stays cancelled.
#[derive(Clone, Debug)]
pub struct CancellationToken(Arc<watch::Sender<bool>>);
impl CancellationToken {
	/// Creates a token that has not been cancelled.
	pub fn new() -> Self {
		let (sender, _) = watch::channel(false);

		Self(Arc::new(sender))
	}

	/// Signals cancellation to every clone of this token.
	pub fn cancel(&self) {
		self.0.send_replace(true);
	}

	/// Returns `true` once [`CancellationToken::cancel`] has been called.
	pub fn is_cancelled(&self) -> bool {
		*self.0.borrow()
	}

	/// Resolves once the token is cancelled.
	pub async fn cancelled(&self) {
		let mut receiver = self.0.subscribe();

		// The sender lives as long as `self`, so the wait only ends on cancellation.
		let _ = receiver.wait_for(|cancelled| *cancelled).await;
	}

	/// Drives `fut` to completion unless the token fires first.
	///
	/// Cancellation wins ties, and a token that is already cancelled never polls `fut`.
	pub async fn run_until_cancelled<F, T>(&self, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		if self.is_cancelled() {
			return Err(cancelled_error());
		}

		tokio::select! {
			biased;
			_ = self.cancelled() => Err(cancelled_error()),
			result = fut => result,
		}
	}

	/// Sleeps for `duration`, returning a cancellation failure if the token fires first.
	pub async fn sleep(&self, duration: Duration) -> Result<()> {
		self.run_until_cancelled(async {
			tokio::time::sleep(duration).await;

			Ok(())
		})
		.await
	}
}
impl Default for CancellationToken {
	fn default() -> Self {
		Self::new()
	}
}

fn cancelled_error() -> Error {
	Error::cancelled("Operation was cancelled.")
}
