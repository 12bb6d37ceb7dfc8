//! Gateway contract consumed by the broker plus the request/response models it exchanges.

// self
use crate::{_prelude::*, action::CustomerAction, codec::SourceToken, config::Secret};

/// Boxed future returned by [`InvoicesGateway`] operations.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Invoice operations the broker drives.
pub trait InvoicesGateway
where
	Self: Send + Sync,
{
	/// Submits an authorization; `Some` when the gateway needs a customer action first.
	fn authorize_invoice<'a>(
		&'a self,
		request: &'a InvoiceAuthorizationRequest,
	) -> GatewayFuture<'a, Option<CustomerAction>>;

	/// Asks the gateway to capture a native alternative payment and reports its state.
	fn capture_native_alternative_payment<'a>(
		&'a self,
		request: &'a NativeAlternativePaymentCaptureRequest,
	) -> GatewayFuture<'a, CaptureResponse>;
}

/// Invoice authorization request.
///
/// Each resolved customer action produces a fresh copy through
/// [`InvoiceAuthorizationRequest::with_source`]; earlier copies stay untouched.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InvoiceAuthorizationRequest {
	/// Invoice identifier. Part of the request path, not the body.
	#[serde(skip)]
	pub invoice_id: String,
	/// Payment source or resolved customer-action token.
	pub source: SourceToken,
	/// Whether the gateway should keep the source for later payments.
	pub save_source: bool,
	/// Whether the authorization may be incremented later.
	pub incremental: bool,
	/// Whether 3DS2 may be used.
	pub enable_three_ds2: bool,
	/// Preferred card scheme for co-branded cards.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub preferred_scheme: Option<String>,
	/// Version of the 3DS SDK performing customer actions.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub third_party_sdk_version: Option<String>,
	/// Invoice detail identifiers covered by this authorization.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub invoice_detail_ids: Option<Vec<String>>,
	/// Whether to bypass merchant-advice-code blocking.
	pub override_mac_blocking: bool,
	/// Scheme transaction identifier of an earlier transaction in the series.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub initial_scheme_transaction_id: Option<String>,
	/// Instant at which the gateway captures automatically.
	#[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
	pub auto_capture_at: Option<OffsetDateTime>,
	/// Amount to capture, as a decimal string.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub capture_amount: Option<String>,
	/// Whether the gateway may fall back to a sale when authorization alone is unsupported.
	pub allow_fallback_to_sale: bool,
	/// Operation metadata.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<BTreeMap<String, String>>,
	/// Invoice client secret. Sent as a header, never in the body.
	#[serde(skip)]
	pub client_secret: Option<Secret>,
}
impl InvoiceAuthorizationRequest {
	/// Creates a request with gateway defaults (3DS2 enabled, everything else off).
	pub fn new(invoice_id: impl Into<String>, source: impl Into<SourceToken>) -> Self {
		Self {
			invoice_id: invoice_id.into(),
			source: source.into(),
			save_source: false,
			incremental: false,
			enable_three_ds2: true,
			preferred_scheme: None,
			third_party_sdk_version: None,
			invoice_detail_ids: None,
			override_mac_blocking: false,
			initial_scheme_transaction_id: None,
			auto_capture_at: None,
			capture_amount: None,
			allow_fallback_to_sale: false,
			metadata: None,
			client_secret: None,
		}
	}

	/// Returns a copy carrying `source`.
	pub fn with_source(&self, source: SourceToken) -> Self {
		Self { source, ..self.clone() }
	}

	/// Returns a copy carrying the provided 3DS SDK version.
	pub fn with_third_party_sdk_version(&self, version: impl Into<String>) -> Self {
		Self { third_party_sdk_version: Some(version.into()), ..self.clone() }
	}

	/// Asks the gateway to keep the source for later payments.
	pub fn save_source(mut self, save: bool) -> Self {
		self.save_source = save;

		self
	}

	/// Marks the authorization as incremental.
	pub fn incremental(mut self, incremental: bool) -> Self {
		self.incremental = incremental;

		self
	}

	/// Enables or disables 3DS2.
	pub fn enable_three_ds2(mut self, enabled: bool) -> Self {
		self.enable_three_ds2 = enabled;

		self
	}

	/// Sets the preferred card scheme.
	pub fn preferred_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.preferred_scheme = Some(scheme.into());

		self
	}

	/// Restricts the authorization to specific invoice details.
	pub fn invoice_detail_ids(mut self, ids: Vec<String>) -> Self {
		self.invoice_detail_ids = Some(ids);

		self
	}

	/// Bypasses merchant-advice-code blocking.
	pub fn override_mac_blocking(mut self, enabled: bool) -> Self {
		self.override_mac_blocking = enabled;

		self
	}

	/// Links the authorization to an earlier scheme transaction.
	pub fn initial_scheme_transaction_id(mut self, id: impl Into<String>) -> Self {
		self.initial_scheme_transaction_id = Some(id.into());

		self
	}

	/// Schedules an automatic capture.
	pub fn auto_capture_at(mut self, at: OffsetDateTime) -> Self {
		self.auto_capture_at = Some(at);

		self
	}

	/// Sets the amount to capture.
	pub fn capture_amount(mut self, amount: impl Into<String>) -> Self {
		self.capture_amount = Some(amount.into());

		self
	}

	/// Lets the gateway fall back to a sale.
	pub fn allow_fallback_to_sale(mut self, allowed: bool) -> Self {
		self.allow_fallback_to_sale = allowed;

		self
	}

	/// Attaches operation metadata.
	pub fn metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
		self.metadata = Some(metadata);

		self
	}

	/// Attaches the invoice client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(Secret::new(secret));

		self
	}
}

/// Request to confirm a native alternative-payment capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeAlternativePaymentCaptureRequest {
	/// Invoice identifier.
	pub invoice_id: String,
	/// Gateway configuration that processed the payment.
	pub gateway_configuration_id: String,
	/// How long the caller is willing to wait. Clamped to the broker's maximum.
	pub timeout: Option<Duration>,
}
impl NativeAlternativePaymentCaptureRequest {
	/// Creates a request that waits for the broker's maximum capture timeout.
	pub fn new(invoice_id: impl Into<String>, gateway_configuration_id: impl Into<String>) -> Self {
		Self {
			invoice_id: invoice_id.into(),
			gateway_configuration_id: gateway_configuration_id.into(),
			timeout: None,
		}
	}

	/// Sets the caller's timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}
}

/// State of a native alternative payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NativeAlternativePaymentState {
	/// Customer input is still required.
	CustomerInput,
	/// Payment is waiting for capture.
	PendingCapture,
	/// Payment has been captured.
	Captured,
}

/// Capture status reported by the gateway.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureResponse {
	/// Current state.
	pub state: NativeAlternativePaymentState,
	/// Full response payload.
	pub raw: serde_json::Value,
}
impl CaptureResponse {
	/// Response with the provided state and no extra payload.
	pub fn new(state: NativeAlternativePaymentState) -> Self {
		Self { state, raw: serde_json::Value::Null }
	}

	/// Returns `true` once the payment is captured.
	pub fn is_captured(&self) -> bool {
		self.state == NativeAlternativePaymentState::Captured
	}
}
