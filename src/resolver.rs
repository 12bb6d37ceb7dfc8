//! Drives a single customer action to the source token the gateway expects next.
//!
//! Mobile actions decode their base64 payload and hand it to the [`ThreeDsService`]; web actions
//! delegate the URL. A web fingerprint that times out is absorbed into a fallback token so the
//! gateway can continue without it.

// self
use crate::{
	_prelude::*,
	action::{ActionUrl, CustomerAction},
	cancel::CancellationToken,
	codec::{self, SourceEnvelope, SourceToken},
	flows::FlowMetrics,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	threeds::{ChallengeParameters, DirectoryServerData, ThreeDsService},
};

/// Default bound on web fingerprint loads.
pub const DEFAULT_WEB_FINGERPRINT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves customer actions through a [`ThreeDsService`].
///
/// Clones share one delegate guard, so delegate calls never overlap.
#[derive(Clone, Debug)]
pub struct CustomerActionResolver {
	fingerprint_timeout: Duration,
	delegate_guard: Arc<AsyncMutex<()>>,
	metrics: Arc<FlowMetrics>,
}
impl CustomerActionResolver {
	/// Creates a resolver with the default web fingerprint timeout.
	pub fn new() -> Self {
		Self {
			fingerprint_timeout: DEFAULT_WEB_FINGERPRINT_TIMEOUT,
			delegate_guard: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Overrides the web fingerprint timeout.
	pub fn with_fingerprint_timeout(mut self, timeout: Duration) -> Self {
		self.fingerprint_timeout = timeout;

		self
	}

	/// Counters for resolved actions.
	pub fn metrics(&self) -> &FlowMetrics {
		&self.metrics
	}

	/// Resolves `action` into a new source token.
	pub async fn resolve(
		&self,
		action: &CustomerAction,
		delegate: &dyn ThreeDsService,
		cancel: &CancellationToken,
	) -> Result<SourceToken> {
		const KIND: FlowKind = FlowKind::CustomerAction;

		let span = FlowSpan::new(KIND, "resolve");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span
			.instrument(async {
				let _delegate = cancel
					.run_until_cancelled(async { Ok(self.delegate_guard.lock().await) })
					.await?;

				cancel.run_until_cancelled(self.resolve_exclusive(action, delegate)).await
			})
			.await;

		if let Err(e) = &result {
			obs::record_failure_event(KIND, "resolve", e);
		}

		self.metrics.record_result(&result);
		obs::record_flow_result(KIND, &result);

		result
	}

	async fn resolve_exclusive(
		&self,
		action: &CustomerAction,
		delegate: &dyn ThreeDsService,
	) -> Result<SourceToken> {
		match action {
			CustomerAction::FingerprintMobile(data) => {
				let data: DirectoryServerData = codec::decode(data)?;
				let parameters = delegate.authentication_request_parameters(&data).await?;
				let body = codec::encode_authentication_request(&parameters)?;

				Ok(codec::encode(&SourceEnvelope::new(body))?)
			},
			CustomerAction::ChallengeMobile(data) => {
				let parameters: ChallengeParameters = codec::decode(data)?;
				let accepted = delegate.perform_challenge(&parameters).await?;

				Ok(SourceToken::challenge_result(accepted))
			},
			CustomerAction::Fingerprint(url) => {
				let outcome = tokio::time::timeout(
					self.fingerprint_timeout,
					delegate.fingerprint_via_url(url.url(), self.fingerprint_timeout),
				)
				.await;

				match outcome {
					Ok(Ok(token)) => Ok(token),
					Ok(Err(e)) if e.code == FailureCode::Timeout(FailureScope::Mobile) =>
						fingerprint_fallback(url, &e),
					Ok(Err(e)) => Err(e),
					Err(_) => fingerprint_fallback(
						url,
						&Error::timeout("Web fingerprint did not finish in time."),
					),
				}
			},
			CustomerAction::Redirect(url) => delegate.redirect(url.url(), None).await,
		}
	}
}
impl Default for CustomerActionResolver {
	fn default() -> Self {
		Self::new()
	}
}

fn fingerprint_fallback(url: &ActionUrl, cause: &Error) -> Result<SourceToken> {
	obs::record_failure_event(FlowKind::CustomerAction, "fingerprint_timeout", cause);

	Ok(codec::encode(&SourceEnvelope::fingerprint_timeout(url.as_str()))?)
}
