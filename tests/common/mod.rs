//! Doubles shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
use tokio::time::Instant;
// self
use payment_action_broker::{
	action::CustomerAction,
	codec::SourceToken,
	error::{Error, FailureCode, Result},
	gateway::{
		CaptureResponse, GatewayFuture, InvoiceAuthorizationRequest, InvoicesGateway,
		NativeAlternativePaymentCaptureRequest, NativeAlternativePaymentState,
	},
	threeds::{
		AuthenticationRequestParameters, ChallengeParameters, CleanupFuture, DirectoryServerData,
		ThreeDsFuture, ThreeDsService,
	},
	url::Url,
	web::{SessionCompletion, SessionHandle, WebAuthenticationRequest, WebAuthenticationSession},
};

/// Base64 directory-server payload with transaction id `4`.
pub const DIRECTORY_SERVER_DATA: &str = "eyJkaXJlY3RvcnlTZXJ2ZXJJRCI6IjEiLCJkaXJlY3RvcnlTZXJ2ZXJQdWJsaWNLZXkiOiIyIiwiZGlyZWN0b3J5U2VydmVyUm9vdENBcyI6WyIzIl0sInRocmVlRFNTZXJ2ZXJUcmFuc0lEIjoiNCIsInNjaGVtZSI6IjUiLCJtZXNzYWdlVmVyc2lvbiI6IjYifQ";
/// Base64 challenge payload with ACS transaction id `1`.
pub const CHALLENGE_DATA: &str = "eyJhY3NUcmFuc0lEIjoiMSIsImFjc1JlZmVyZW5jZU51bWJlciI6IjIiLCJhY3NTaWduZWRDb250ZW50IjoiMyIsInRocmVlRFNTZXJ2ZXJUcmFuc0lEIjoiNCJ9";

pub fn url(raw: &str) -> Url {
	Url::parse(raw).expect("Fixture URL should parse.")
}

/// One scripted gateway answer.
#[derive(Clone, Debug)]
pub enum Step<T> {
	Reply(T),
	Fail(FailureCode),
}
impl<T> Step<T>
where
	T: Clone,
{
	fn into_result(self) -> Result<T> {
		match self {
			Self::Reply(value) => Ok(value),
			Self::Fail(code) => Err(Error::new(code)),
		}
	}
}

// The last step repeats once the script runs out.
fn next_step<T>(script: &Mutex<VecDeque<Step<T>>>) -> Option<Step<T>>
where
	T: Clone,
{
	let mut script = script.lock();

	if script.len() > 1 { script.pop_front() } else { script.front().cloned() }
}

/// Gateway answering from fixed scripts and recording every request.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
	authorizations: Mutex<VecDeque<Step<Option<CustomerAction>>>>,
	captures: Mutex<VecDeque<Step<NativeAlternativePaymentState>>>,
	pub authorization_requests: Mutex<Vec<InvoiceAuthorizationRequest>>,
	pub capture_instants: Mutex<Vec<Instant>>,
}
impl ScriptedGateway {
	pub fn authorizing(steps: impl IntoIterator<Item = Step<Option<CustomerAction>>>) -> Self {
		Self { authorizations: Mutex::new(steps.into_iter().collect()), ..Default::default() }
	}

	pub fn capturing(steps: impl IntoIterator<Item = Step<NativeAlternativePaymentState>>) -> Self {
		Self { captures: Mutex::new(steps.into_iter().collect()), ..Default::default() }
	}

	pub fn authorization_sources(&self) -> Vec<String> {
		self.authorization_requests.lock().iter().map(|r| r.source.to_string()).collect()
	}

	pub fn capture_calls(&self) -> usize {
		self.capture_instants.lock().len()
	}
}
impl InvoicesGateway for ScriptedGateway {
	fn authorize_invoice<'a>(
		&'a self,
		request: &'a InvoiceAuthorizationRequest,
	) -> GatewayFuture<'a, Option<CustomerAction>> {
		Box::pin(async move {
			self.authorization_requests.lock().push(request.clone());

			next_step(&self.authorizations).unwrap_or(Step::Reply(None)).into_result()
		})
	}

	fn capture_native_alternative_payment<'a>(
		&'a self,
		_request: &'a NativeAlternativePaymentCaptureRequest,
	) -> GatewayFuture<'a, CaptureResponse> {
		Box::pin(async move {
			self.capture_instants.lock().push(Instant::now());

			next_step(&self.captures)
				.unwrap_or(Step::Reply(NativeAlternativePaymentState::PendingCapture))
				.into_result()
				.map(CaptureResponse::new)
		})
	}
}

/// 3DS delegate with canned answers that records which operations ran.
#[derive(Debug, Default)]
pub struct ScriptedThreeDs {
	pub version: Option<String>,
	pub challenge_passed: bool,
	/// Token returned by redirects; `None` never completes.
	pub redirect_token: Option<String>,
	pub calls: Mutex<Vec<&'static str>>,
	pub clean_calls: AtomicUsize,
}
impl ScriptedThreeDs {
	pub fn new() -> Self {
		Self { challenge_passed: true, ..Default::default() }
	}

	pub fn with_version(mut self, version: &str) -> Self {
		self.version = Some(version.into());

		self
	}

	pub fn with_redirect_token(mut self, token: &str) -> Self {
		self.redirect_token = Some(token.into());

		self
	}

	pub fn calls(&self) -> Vec<&'static str> {
		self.calls.lock().clone()
	}
}
impl ThreeDsService for ScriptedThreeDs {
	fn version(&self) -> Option<String> {
		self.version.clone()
	}

	fn authentication_request_parameters<'a>(
		&'a self,
		_data: &'a DirectoryServerData,
	) -> ThreeDsFuture<'a, AuthenticationRequestParameters> {
		self.calls.lock().push("fingerprint");

		Box::pin(async {
			Ok(AuthenticationRequestParameters {
				device_data: "1".into(),
				sdk_app_id: "2".into(),
				sdk_ephemeral_public_key: r#"{"kty": "EC"}"#.into(),
				sdk_reference_number: "3".into(),
				sdk_transaction_id: "4".into(),
			})
		})
	}

	fn perform_challenge<'a>(
		&'a self,
		_parameters: &'a ChallengeParameters,
	) -> ThreeDsFuture<'a, bool> {
		self.calls.lock().push("challenge");

		Box::pin(async move { Ok(self.challenge_passed) })
	}

	fn redirect<'a>(
		&'a self,
		_url: &'a Url,
		_timeout: Option<Duration>,
	) -> ThreeDsFuture<'a, SourceToken> {
		self.calls.lock().push("redirect");

		Box::pin(async move {
			match &self.redirect_token {
				Some(token) => Ok(SourceToken::new(token.clone())),
				None => std::future::pending().await,
			}
		})
	}

	fn clean(&self) -> CleanupFuture<'_> {
		self.clean_calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async {})
	}
}

/// How a [`RecordingSession`] behaves once started.
#[derive(Clone, Debug)]
pub enum SessionBehavior {
	/// Completes with the URL after the delay.
	CompleteAfter(Duration, Url),
	/// Stays on screen until cancelled or completed from outside.
	Hang,
	/// Refuses to present.
	FailToStart,
}

/// Platform session double recording starts, completions, and dismissals.
#[derive(Debug)]
pub struct RecordingSession {
	behavior: SessionBehavior,
	pub handle: Arc<RecordingHandle>,
	pub requests: Mutex<Vec<WebAuthenticationRequest>>,
	pub started_at: Mutex<Vec<Instant>>,
	pub completed_at: Arc<Mutex<Vec<Instant>>>,
	pub completions: Mutex<Vec<SessionCompletion>>,
}
impl RecordingSession {
	pub fn new(behavior: SessionBehavior) -> Arc<Self> {
		Arc::new(Self {
			behavior,
			handle: Default::default(),
			requests: Default::default(),
			started_at: Default::default(),
			completed_at: Default::default(),
			completions: Default::default(),
		})
	}

	pub fn starts(&self) -> usize {
		self.started_at.lock().len()
	}
}
impl WebAuthenticationSession for RecordingSession {
	fn start(
		&self,
		request: &WebAuthenticationRequest,
		completion: SessionCompletion,
	) -> Result<Arc<dyn SessionHandle>> {
		if let SessionBehavior::FailToStart = self.behavior {
			return Err(Error::generic("Session could not be presented."));
		}

		self.requests.lock().push(request.clone());
		self.started_at.lock().push(Instant::now());
		self.completions.lock().push(completion.clone());

		if let SessionBehavior::CompleteAfter(delay, url) = &self.behavior {
			let (delay, url, completed_at) = (*delay, url.clone(), self.completed_at.clone());

			tokio::spawn(async move {
				tokio::time::sleep(delay).await;
				completed_at.lock().push(Instant::now());
				completion.complete(Ok(url));
			});
		}

		let handle: Arc<dyn SessionHandle> = self.handle.clone();

		Ok(handle)
	}
}

/// Session handle counting dismissals.
#[derive(Debug, Default)]
pub struct RecordingHandle {
	pub cancelled_at: Mutex<Vec<Instant>>,
}
impl RecordingHandle {
	pub fn cancels(&self) -> usize {
		self.cancelled_at.lock().len()
	}
}
impl SessionHandle for RecordingHandle {
	fn cancel(&self) {
		self.cancelled_at.lock().push(Instant::now());
	}
}
