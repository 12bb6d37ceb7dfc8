//! reqwest-backed [`InvoicesGateway`].
//!
//! Every call is a JSON `POST` beneath the configured API root, authenticated with the project
//! identifier and private key as basic-auth credentials. The gateway reports the outcome through a
//! top-level `success` flag; failed calls carry an `error_type` that is mapped onto
//! [`FailureCode`]. Network failures, local timeouts, and 5xx answers are retried under
//! [`GatewayConfig::retry`] with a stable idempotency key.

// crates.io
use rand::{Rng, distr::Alphanumeric};
use reqwest::{StatusCode, redirect::Policy};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	action::CustomerAction,
	cancel::CancellationToken,
	config::{GatewayConfig, Secret},
	error::{CodecError, ConfigError, InvalidField},
	gateway::{
		CaptureResponse, GatewayFuture, InvoiceAuthorizationRequest, InvoicesGateway,
		NativeAlternativePaymentCaptureRequest, NativeAlternativePaymentState,
	},
	retry::RetryPoller,
};

const CLIENT_SECRET_HEADER: &str = "x-client-secret";
const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
const IDEMPOTENCY_KEY_LEN: usize = 32;

/// Gateway client speaking JSON over HTTPS.
///
/// The wrapped client never follows redirects; invoice endpoints answer directly.
#[derive(Clone)]
pub struct HttpInvoicesGateway {
	client: ReqwestClient,
	config: GatewayConfig,
}
impl HttpInvoicesGateway {
	/// Builds a client for `config`.
	pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder().redirect(Policy::none());

		if let Some(timeout) = config.request_timeout {
			builder = builder.timeout(timeout);
		}

		Ok(Self { client: builder.build()?, config })
	}

	/// Uses an existing [`ReqwestClient`].
	///
	/// The client should be configured not to follow redirects.
	pub fn with_client(client: ReqwestClient, config: GatewayConfig) -> Self {
		Self { client, config }
	}

	/// Connection settings.
	pub fn config(&self) -> &GatewayConfig {
		&self.config
	}

	async fn post<B>(&self, segments: &[&str], body: &B, client_secret: Option<&Secret>) -> Result<Value>
	where
		B: ?Sized + Serialize + Sync,
	{
		let url = &self.config.endpoint(segments)?;
		let idempotency_key = &idempotency_key();
		let reply = RetryPoller::run(
			move || self.send_once(url, body, client_secret, idempotency_key),
			|result| match result {
				Ok(Reply::Rejected { status, .. }) => status.is_server_error(),
				Err(e) => matches!(
					e.code,
					FailureCode::NetworkUnreachable | FailureCode::Timeout(FailureScope::Mobile)
				),
				Ok(Reply::Accepted(_)) => false,
			},
			Duration::MAX,
			Error::timeout("Gateway request timed out."),
			&self.config.retry,
			&CancellationToken::new(),
		)
		.await?;

		match reply {
			Reply::Accepted(value) => Ok(value),
			Reply::Rejected { error, .. } => Err(error),
		}
	}

	async fn send_once<B>(
		&self,
		url: &Url,
		body: &B,
		client_secret: Option<&Secret>,
		idempotency_key: &str,
	) -> Result<Reply>
	where
		B: ?Sized + Serialize + Sync,
	{
		let mut request = self
			.client
			.post(url.clone())
			.basic_auth(&self.config.project_id, self.config.private_key.as_ref().map(Secret::expose))
			.header(IDEMPOTENCY_KEY_HEADER, idempotency_key)
			.json(body);

		if let Some(secret) = client_secret {
			request = request.header(CLIENT_SECRET_HEADER, secret.expose());
		}

		let response = request.send().await.map_err(map_transport_error)?;
		let status = response.status();
		let bytes = response.bytes().await.map_err(map_transport_error)?;

		classify(status, &bytes)
	}
}
impl InvoicesGateway for HttpInvoicesGateway {
	fn authorize_invoice<'a>(
		&'a self,
		request: &'a InvoiceAuthorizationRequest,
	) -> GatewayFuture<'a, Option<CustomerAction>> {
		Box::pin(async move {
			let value = self
				.post(
					&["invoices", request.invoice_id.as_str(), "authorize"],
					request,
					request.client_secret.as_ref(),
				)
				.await?;
			let response: AuthorizationResponse = decode_value(value)?;

			Ok(response.customer_action)
		})
	}

	fn capture_native_alternative_payment<'a>(
		&'a self,
		request: &'a NativeAlternativePaymentCaptureRequest,
	) -> GatewayFuture<'a, CaptureResponse> {
		Box::pin(async move {
			let body = CaptureBody { source: &request.gateway_configuration_id };
			let mut value =
				self.post(&["invoices", request.invoice_id.as_str(), "capture"], &body, None).await?;
			let response: CaptureEnvelope = decode_value(value.clone())?;
			let raw = value.get_mut("native_apm").map(Value::take).unwrap_or_default();

			Ok(CaptureResponse { state: response.native_apm.state, raw })
		})
	}
}
impl Debug for HttpInvoicesGateway {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpInvoicesGateway").field("config", &self.config).finish()
	}
}

enum Reply {
	Accepted(Value),
	Rejected { status: StatusCode, error: Error },
}

#[derive(Deserialize)]
struct AuthorizationResponse {
	#[serde(default)]
	customer_action: Option<CustomerAction>,
}

#[derive(Serialize)]
struct CaptureBody<'a> {
	source: &'a str,
}

#[derive(Deserialize)]
struct CaptureEnvelope {
	native_apm: CapturedPayment,
}

#[derive(Deserialize)]
struct CapturedPayment {
	state: NativeAlternativePaymentState,
}

#[derive(Debug, Default, Deserialize)]
struct FailureBody {
	#[serde(default)]
	error_type: Option<String>,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	invalid_fields: Vec<InvalidField>,
}

fn classify(status: StatusCode, bytes: &[u8]) -> Result<Reply> {
	let value = match serde_json::from_slice::<Value>(bytes) {
		Ok(value) => value,
		Err(e) if status.is_success() =>
			return Err(Error::internal("Gateway returned a body that is not JSON.").with_source(e)),
		Err(_) =>
			return Ok(Reply::Rejected { status, error: Error::new(fallback_code(status)) }),
	};
	let success = value.get("success").and_then(Value::as_bool).unwrap_or(false);

	if success && status.is_success() {
		return Ok(Reply::Accepted(value));
	}

	let failure = serde_json::from_value::<FailureBody>(value).unwrap_or_default();
	let code = failure
		.error_type
		.as_deref()
		.map_or_else(|| fallback_code(status), FailureCode::from_gateway);
	let mut error = Error::new(code).with_invalid_fields(failure.invalid_fields);

	if let Some(message) = failure.message {
		error = error.message(message);
	}

	Ok(Reply::Rejected { status, error })
}

fn fallback_code(status: StatusCode) -> FailureCode {
	if status.is_server_error() {
		FailureCode::Internal(FailureScope::Gateway)
	} else {
		FailureCode::Unknown(status.as_str().into())
	}
}

fn decode_value<T>(value: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	Ok(serde_path_to_error::deserialize(value).map_err(CodecError::from)?)
}

fn map_transport_error(e: ReqwestError) -> Error {
	let code = if e.is_timeout() {
		FailureCode::Timeout(FailureScope::Mobile)
	} else if e.is_connect() {
		FailureCode::NetworkUnreachable
	} else {
		FailureCode::Internal(FailureScope::Mobile)
	};

	Error::with_message(code, "Gateway request failed.").with_source(e)
}

fn idempotency_key() -> String {
	rand::rng().sample_iter(Alphanumeric).take(IDEMPOTENCY_KEY_LEN).map(char::from).collect()
}
