//! Single-flight coordination of interactive web-authentication sessions.
//!
//! [`WebAuthenticationCoordinator`] wraps a platform [`WebAuthenticationSession`]:
//!
//! - only one session is presented at a time; later callers queue on a semaphore,
//! - a new session starts no sooner than the configured settle delay after the previous one
//!   finished,
//! - cancelling a caller (or dropping its future) dismisses the platform session, never earlier
//!   than the configured cancel delay after it started,
//! - out-of-band deep links can complete the in-flight session through
//!   [`WebAuthenticationCoordinator::handle_deep_link`].

pub mod alternative_payments;
pub mod callback;
pub mod redirect;

mod operation;

pub use alternative_payments::{
	AlternativePaymentAuthorizationRequest, AlternativePaymentResponse,
	AlternativePaymentTokenizationRequest, AlternativePaymentsService,
};
pub use callback::WebAuthenticationCallback;
pub use redirect::WebRedirectThreeDsService;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	cancel::CancellationToken,
	config::WebAuthenticationConfig,
	flows::FlowMetrics,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};
use operation::Operation;

/// Platform session able to present a web page and report the URL it was redirected to.
pub trait WebAuthenticationSession
where
	Self: Send + Sync,
{
	/// Presents `request` and reports the outcome through `completion`.
	///
	/// Returning an error means the session could not be presented at all.
	fn start(
		&self,
		request: &WebAuthenticationRequest,
		completion: SessionCompletion,
	) -> Result<Arc<dyn SessionHandle>>;
}

/// Handle to a presented platform session.
pub trait SessionHandle
where
	Self: Send + Sync,
{
	/// Dismisses the session.
	fn cancel(&self);
}

/// One interactive authentication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebAuthenticationRequest {
	/// Page to present.
	pub url: Url,
	/// Address that ends the session. `None` lets the platform decide.
	pub callback: Option<WebAuthenticationCallback>,
	/// Whether the platform should avoid sharing browser state with the session.
	pub prefers_ephemeral_session: bool,
	/// Optional bound on how long the session may stay on screen.
	pub timeout: Option<Duration>,
}
impl WebAuthenticationRequest {
	/// Request for `url` with no callback, shared browser state, and no timeout.
	pub fn new(url: Url) -> Self {
		Self { url, callback: None, prefers_ephemeral_session: false, timeout: None }
	}

	/// Sets the callback address.
	pub fn with_callback(mut self, callback: WebAuthenticationCallback) -> Self {
		self.callback = Some(callback);

		self
	}

	/// Requests an ephemeral browser session.
	pub fn with_ephemeral_session(mut self, ephemeral: bool) -> Self {
		self.prefers_ephemeral_session = ephemeral;

		self
	}

	/// Bounds the session's lifetime.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}
}

/// Completion handle handed to [`WebAuthenticationSession::start`].
///
/// The first call to [`SessionCompletion::complete`] decides the outcome; later calls, and calls
/// after the caller cancelled, are ignored.
#[derive(Clone, Debug)]
pub struct SessionCompletion(Arc<Operation>);
impl SessionCompletion {
	/// Reports the session outcome. Returns `false` when the outcome was already decided.
	///
	/// A returned URL that does not match the request's callback is reported as an internal
	/// failure.
	pub fn complete(&self, result: Result<Url>) -> bool {
		self.0.finish(result, false)
	}
}

/// Serializes interactive web sessions.
///
/// Clones share the same queue and timing state.
#[derive(Clone)]
pub struct WebAuthenticationCoordinator {
	inner: Arc<CoordinatorInner>,
}
impl WebAuthenticationCoordinator {
	/// Wraps `session` with default timing.
	pub fn new(session: Arc<dyn WebAuthenticationSession>) -> Self {
		Self::with_config(session, WebAuthenticationConfig::default())
	}

	/// Wraps `session` with explicit timing.
	pub fn with_config(
		session: Arc<dyn WebAuthenticationSession>,
		config: WebAuthenticationConfig,
	) -> Self {
		Self {
			inner: Arc::new(CoordinatorInner {
				session,
				config,
				permits: Semaphore::new(1),
				state: Mutex::new(CoordinatorState::default()),
				metrics: FlowMetrics::default(),
			}),
		}
	}

	/// Timing configuration.
	pub fn config(&self) -> &WebAuthenticationConfig {
		&self.inner.config
	}

	/// Counters for presented sessions.
	pub fn metrics(&self) -> &FlowMetrics {
		&self.inner.metrics
	}

	/// Presents `request` and returns the URL the session ended on.
	///
	/// Only `http` and `https` pages are presented; anything else fails with `generic(mobile)`.
	/// Waits for any session already on screen, then for the settle delay. Cancelling `cancel`
	/// at any point ends the call with a cancellation failure and dismisses the session; an
	/// elapsed request timeout does the same with `timeout(mobile)`.
	pub async fn authenticate(
		&self,
		request: WebAuthenticationRequest,
		cancel: &CancellationToken,
	) -> Result<Url> {
		const KIND: FlowKind = FlowKind::WebAuthentication;

		let span = FlowSpan::new(KIND, "authenticate");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.inner.metrics.record_attempt();

		let result = span.instrument(self.run(request, cancel)).await;

		if let Err(e) = &result {
			obs::record_failure_event(KIND, "authenticate", e);
		}

		self.inner.metrics.record_result(&result);
		obs::record_flow_result(KIND, &result);

		result
	}

	/// Completes the in-flight session with a URL delivered outside the platform session.
	///
	/// Returns `true` when a session was waiting for this callback.
	pub fn handle_deep_link(&self, url: &Url) -> bool {
		let Some(operation) = self.inner.state.lock().current.clone() else {
			return false;
		};

		match operation.callback() {
			Some(callback) if callback.matches(url) => operation.finish(Ok(url.clone()), true),
			_ => false,
		}
	}

	async fn run(&self, request: WebAuthenticationRequest, cancel: &CancellationToken) -> Result<Url> {
		if !matches!(request.url.scheme(), "http" | "https") {
			return Err(Error::generic("Redirect URL is not supported."));
		}

		let _permit =
			cancel.run_until_cancelled(async { Ok(self.inner.permits.acquire().await) }).await?;
		let settle = self.inner.remaining_settle_delay();

		if !settle.is_zero() {
			cancel.sleep(settle).await?;
		}
		if cancel.is_cancelled() {
			return Err(Error::cancelled("Web authentication was cancelled."));
		}

		let (sender, mut receiver) = oneshot::channel();
		let operation = Arc::new(Operation::new(
			sender,
			request.callback.clone(),
			self.inner.config.cancel_delay,
		));
		let _active = ActiveOperation::register(&self.inner, operation.clone());
		let handle = self.inner.session.start(&request, SessionCompletion(operation.clone()))?;

		operation.attach(handle);

		let deadline = async {
			match request.timeout {
				Some(timeout) => tokio::time::sleep(timeout).await,
				None => std::future::pending().await,
			}
		};

		tokio::select! {
			biased;
			_ = cancel.cancelled() =>
				interrupt(&operation, receiver, Error::cancelled("Web authentication was cancelled."))
					.await,
			_ = deadline =>
				interrupt(&operation, receiver, Error::timeout("Web authentication timed out.")).await,
			outcome = &mut receiver => outcome.unwrap_or_else(|_| Err(session_dropped())),
		}
	}
}
impl Debug for WebAuthenticationCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WebAuthenticationCoordinator")
			.field("config", &self.inner.config)
			.field("in_flight", &self.inner.state.lock().current.is_some())
			.finish()
	}
}

struct CoordinatorInner {
	session: Arc<dyn WebAuthenticationSession>,
	config: WebAuthenticationConfig,
	permits: Semaphore,
	state: Mutex<CoordinatorState>,
	metrics: FlowMetrics,
}
impl CoordinatorInner {
	fn remaining_settle_delay(&self) -> Duration {
		self.state
			.lock()
			.last_completed_at
			.map(|at| self.config.settle_delay.saturating_sub(at.elapsed()))
			.unwrap_or_default()
	}
}

#[derive(Debug, Default)]
struct CoordinatorState {
	current: Option<Arc<Operation>>,
	last_completed_at: Option<Instant>,
}

// Keeps the coordinator state consistent even when the caller drops the future mid-session.
struct ActiveOperation<'a> {
	inner: &'a CoordinatorInner,
	operation: Arc<Operation>,
}
impl<'a> ActiveOperation<'a> {
	fn register(inner: &'a CoordinatorInner, operation: Arc<Operation>) -> Self {
		inner.state.lock().current = Some(operation.clone());

		Self { inner, operation }
	}
}
impl Drop for ActiveOperation<'_> {
	fn drop(&mut self) {
		self.operation.cancel();

		let mut state = self.inner.state.lock();

		state.current = None;
		state.last_completed_at = Some(Instant::now());
	}
}

async fn interrupt(
	operation: &Operation,
	receiver: oneshot::Receiver<Result<Url>>,
	reason: Error,
) -> Result<Url> {
	if operation.cancel() {
		Err(reason)
	} else {
		receiver.await.unwrap_or_else(|_| Err(session_dropped()))
	}
}

fn session_dropped() -> Error {
	Error::internal("Web authentication session ended without reporting a result.")
}
