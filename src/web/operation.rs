//! Per-session completion state shared between the coordinator and the platform session.

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	web::{SessionHandle, WebAuthenticationCallback},
};

/// One interactive session moving from processing to completed.
///
/// Completion and cancellation race through the same lock; whichever arrives first wins and the
/// other becomes a no-op.
pub(crate) struct Operation {
	state: Mutex<OperationState>,
	callback: Option<WebAuthenticationCallback>,
	cancel_delay: Duration,
}
impl Operation {
	pub(crate) fn new(
		sender: oneshot::Sender<Result<Url>>,
		callback: Option<WebAuthenticationCallback>,
		cancel_delay: Duration,
	) -> Self {
		let state =
			OperationState::Processing { sender, handle: None, started_at: Instant::now() };

		Self { state: Mutex::new(state), callback, cancel_delay }
	}

	pub(crate) fn callback(&self) -> Option<&WebAuthenticationCallback> {
		self.callback.as_ref()
	}

	/// Stores the platform handle once the session has started.
	pub(crate) fn attach(&self, handle: Arc<dyn SessionHandle>) {
		let dismiss = {
			let mut state = self.state.lock();

			match &mut *state {
				OperationState::Processing { handle: slot, .. } => {
					*slot = Some(handle);

					None
				},
				OperationState::Completed { cancel_pending, started_at } if *cancel_pending => {
					*cancel_pending = false;

					Some((handle, *started_at))
				},
				OperationState::Completed { .. } => None,
			}
		};

		if let Some((handle, started_at)) = dismiss {
			self.schedule_cancel(handle, started_at);
		}
	}

	/// Resolves the operation with `result`. Returns `false` if it had already finished.
	///
	/// With `dismiss_session` set, the platform session is cancelled as well; used when the result
	/// arrives out of band and the session UI is still on screen.
	pub(crate) fn finish(&self, result: Result<Url>, dismiss_session: bool) -> bool {
		let result = result.and_then(|url| self.check_callback(url));
		let Some((sender, handle, started_at)) = self.take_processing(false) else {
			return false;
		};
		let _ = sender.send(result);

		if let Some(handle) = handle.filter(|_| dismiss_session) {
			self.schedule_cancel(handle, started_at);
		}

		true
	}

	/// Abandons the operation and asks the platform session to go away.
	///
	/// Returns `false` if the operation had already finished.
	pub(crate) fn cancel(&self) -> bool {
		let Some((sender, handle, started_at)) = self.take_processing(true) else {
			return false;
		};

		drop(sender);

		if let Some(handle) = handle {
			self.schedule_cancel(handle, started_at);
		}

		true
	}

	fn take_processing(
		&self,
		cancelling: bool,
	) -> Option<(oneshot::Sender<Result<Url>>, Option<Arc<dyn SessionHandle>>, Instant)> {
		let mut state = self.state.lock();
		let OperationState::Processing { started_at, handle, .. } = &*state else {
			return None;
		};
		let completed = OperationState::Completed {
			cancel_pending: cancelling && handle.is_none(),
			started_at: *started_at,
		};

		match std::mem::replace(&mut *state, completed) {
			OperationState::Processing { sender, handle, started_at } =>
				Some((sender, handle, started_at)),
			OperationState::Completed { .. } => None,
		}
	}

	fn check_callback(&self, url: Url) -> Result<Url> {
		match &self.callback {
			Some(callback) if !callback.matches(&url) => Err(Error::internal(format!(
				"Web authentication returned `{url}`, which does not match the expected callback."
			))),
			_ => Ok(url),
		}
	}

	// The platform cancel is held back until the session is at least `cancel_delay` old.
	fn schedule_cancel(&self, handle: Arc<dyn SessionHandle>, started_at: Instant) {
		let remaining = self.cancel_delay.saturating_sub(started_at.elapsed());

		if remaining.is_zero() {
			handle.cancel();

			return;
		}

		match tokio::runtime::Handle::try_current() {
			Ok(runtime) => {
				runtime.spawn(async move {
					tokio::time::sleep(remaining).await;
					handle.cancel();
				});
			},
			Err(_) => handle.cancel(),
		}
	}
}
impl Debug for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = match &*self.state.lock() {
			OperationState::Processing { .. } => "processing",
			OperationState::Completed { .. } => "completed",
		};

		f.debug_struct("Operation")
			.field("state", &state)
			.field("callback", &self.callback)
			.finish()
	}
}

enum OperationState {
	Processing {
		sender: oneshot::Sender<Result<Url>>,
		handle: Option<Arc<dyn SessionHandle>>,
		started_at: Instant,
	},
	Completed {
		// Cancelled before the platform handle arrived; `attach` dismisses it.
		cancel_pending: bool,
		started_at: Instant,
	},
}
