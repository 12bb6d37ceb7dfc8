//! Broker-level error types shared across codecs, resolvers, flows, and gateways.

// std
use std::borrow::Cow;
// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical failure exposed by public APIs.
///
/// Every failure carries a [`FailureCode`]; retry and fallback decisions are made on the code
/// alone, never on the message.
#[derive(Debug, ThisError)]
#[error("{code}: {}", .message.as_deref().unwrap_or("no further details"))]
pub struct Error {
	/// Classified failure code.
	pub code: FailureCode,
	/// Diagnostic message. Not intended for end users.
	pub message: Option<String>,
	/// Fields rejected by the gateway, if any.
	pub invalid_fields: Vec<InvalidField>,
	#[source]
	source: Option<BoxError>,
}
impl Error {
	/// Creates a failure with the provided code and no message.
	pub fn new(code: FailureCode) -> Self {
		Self { code, message: None, invalid_fields: Vec::new(), source: None }
	}

	/// Creates a failure with a code and diagnostic message.
	pub fn with_message(code: FailureCode, message: impl Into<String>) -> Self {
		Self::new(code).message(message)
	}

	/// Shorthand for an SDK-side `internal` failure.
	pub fn internal(message: impl Into<String>) -> Self {
		Self::with_message(FailureCode::Internal(FailureScope::Mobile), message)
	}

	/// Shorthand for an SDK-side `timeout` failure.
	pub fn timeout(message: impl Into<String>) -> Self {
		Self::with_message(FailureCode::Timeout(FailureScope::Mobile), message)
	}

	/// Shorthand for a cancellation failure.
	pub fn cancelled(message: impl Into<String>) -> Self {
		Self::with_message(FailureCode::Cancelled, message)
	}

	/// Shorthand for an SDK-side `generic` failure.
	pub fn generic(message: impl Into<String>) -> Self {
		Self::with_message(FailureCode::generic_mobile(), message)
	}

	/// Replaces the diagnostic message.
	pub fn message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());

		self
	}

	/// Attaches the rejected fields reported by the gateway.
	pub fn with_invalid_fields(mut self, fields: Vec<InvalidField>) -> Self {
		self.invalid_fields = fields;

		self
	}

	/// Attaches the underlying error for inspection.
	pub fn with_source(mut self, src: impl 'static + Send + Sync + StdError) -> Self {
		self.source = Some(Box::new(src));

		self
	}

	/// Returns `true` when the failure represents a cancellation.
	pub fn is_cancelled(&self) -> bool {
		matches!(self.code, FailureCode::Cancelled)
	}
}

/// A field rejected by the gateway during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidField {
	/// Field name.
	pub name: String,
	/// Message describing the rejection.
	pub message: String,
}

/// Distinguishes gateway-origin failures from SDK-origin (mobile) ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureScope {
	/// Reported by the payment gateway.
	Gateway,
	/// Raised locally by this crate.
	Mobile,
}

/// Failure classification shared by every broker operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FailureCode {
	/// No network connection.
	NetworkUnreachable,
	/// Operation did not finish in time.
	Timeout(FailureScope),
	/// Unexpected internal failure.
	Internal(FailureScope),
	/// Operation was cancelled by the caller.
	Cancelled,
	/// Request contained fields that could not be validated.
	Validation(Cow<'static, str>),
	/// Credentials could not be verified.
	Authentication(Cow<'static, str>),
	/// Requested resource does not exist.
	NotFound(Cow<'static, str>),
	/// Failure that fits none of the more specific categories.
	Generic(Cow<'static, str>),
	/// Code the broker does not recognize; the raw value is preserved.
	Unknown(String),
}
impl FailureCode {
	const CANCELLED: &'static str = "processout-mobile.cancelled";
	const GATEWAY_INTERNAL: &'static str = "gateway-internal-error";
	const GATEWAY_TIMEOUT: &'static str = "gateway.timeout";
	const GENERIC_MOBILE: &'static str = "processout-mobile.generic.error";
	const MOBILE_INTERNAL: &'static str = "processout-mobile.internal";
	const MOBILE_TIMEOUT: &'static str = "processout-mobile.timeout";
	const NETWORK_UNREACHABLE: &'static str = "processout-mobile.network-unreachable";

	/// SDK-side generic failure.
	pub const fn generic_mobile() -> Self {
		Self::Generic(Cow::Borrowed(Self::GENERIC_MOBILE))
	}

	/// Maps a gateway-returned error code into the taxonomy.
	///
	/// Tables are consulted in order (authentication, not found, validation, generic, timeout,
	/// internal); the first match wins. SDK-side `processout-mobile.*` codes map back onto their
	/// variants and anything else becomes [`FailureCode::Unknown`].
	pub fn from_gateway(raw: &str) -> Self {
		let raw = raw.trim();

		if let Some(code) = lookup(AUTHENTICATION_CODES, raw) {
			return Self::Authentication(Cow::Borrowed(code));
		}
		if let Some(code) = lookup(NOT_FOUND_CODES, raw) {
			return Self::NotFound(Cow::Borrowed(code));
		}
		if let Some(code) = lookup(VALIDATION_CODES, raw) {
			return Self::Validation(Cow::Borrowed(code));
		}
		if let Some(code) = lookup(GENERIC_CODES, raw) {
			return Self::Generic(Cow::Borrowed(code));
		}

		match raw {
			Self::GATEWAY_TIMEOUT => Self::Timeout(FailureScope::Gateway),
			Self::MOBILE_TIMEOUT => Self::Timeout(FailureScope::Mobile),
			Self::GATEWAY_INTERNAL => Self::Internal(FailureScope::Gateway),
			Self::MOBILE_INTERNAL => Self::Internal(FailureScope::Mobile),
			Self::NETWORK_UNREACHABLE => Self::NetworkUnreachable,
			Self::CANCELLED => Self::Cancelled,
			Self::GENERIC_MOBILE => Self::generic_mobile(),
			_ => Self::Unknown(raw.to_owned()),
		}
	}

	/// Returns the stable string form of the code.
	pub fn raw_value(&self) -> &str {
		match self {
			Self::NetworkUnreachable => Self::NETWORK_UNREACHABLE,
			Self::Timeout(FailureScope::Gateway) => Self::GATEWAY_TIMEOUT,
			Self::Timeout(FailureScope::Mobile) => Self::MOBILE_TIMEOUT,
			Self::Internal(FailureScope::Gateway) => Self::GATEWAY_INTERNAL,
			Self::Internal(FailureScope::Mobile) => Self::MOBILE_INTERNAL,
			Self::Cancelled => Self::CANCELLED,
			Self::Validation(code)
			| Self::Authentication(code)
			| Self::NotFound(code)
			| Self::Generic(code) => code,
			Self::Unknown(raw) => raw,
		}
	}
}
impl Display for FailureCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.raw_value())
	}
}

/// Configuration and validation failures raised while assembling broker components.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Gateway base URL cannot carry path segments.
	#[error("Gateway URL `{url}` cannot be used as an API root.")]
	NotABase {
		/// Offending URL.
		url: String,
	},
	/// Gateway base URL does not use HTTPS.
	#[error("Gateway URL `{url}` must use HTTPS.")]
	InsecureEndpoint {
		/// Offending URL.
		url: String,
	},
	/// Project identifier is empty.
	#[error("Project identifier cannot be empty.")]
	MissingProjectId,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ConfigError> for Error {
	fn from(e: ConfigError) -> Self {
		let message = e.to_string();

		Error::generic(message).with_source(e)
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised while encoding or decoding source tokens and action payloads.
#[derive(Debug, ThisError)]
pub enum CodecError {
	/// Payload is not valid base64.
	#[error("Payload is not valid base64.")]
	Base64(#[from] base64::DecodeError),
	/// Payload decoded but its JSON did not match the expected shape.
	#[error("Payload JSON is malformed at `{}`.", .0.path())]
	Json(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// Value could not be serialized.
	#[error("Value could not be serialized to JSON.")]
	Serialize(#[source] serde_json::Error),
	/// Source token lacks the expected prefix.
	#[error("Source token does not start with the expected prefix.")]
	MissingPrefix,
	/// Action URL is empty or cannot be parsed.
	#[error("Action URL `{value}` is invalid.")]
	InvalidUrl {
		/// Raw value supplied by the gateway.
		value: String,
	},
}
impl From<CodecError> for Error {
	fn from(e: CodecError) -> Self {
		Error::internal("Unable to process customer action.").with_source(e)
	}
}

fn lookup(table: &'static [&'static str], raw: &str) -> Option<&'static str> {
	table.iter().copied().find(|code| *code == raw)
}

const AUTHENTICATION_CODES: &[&str] =
	&["request.authentication.invalid", "request.authentication.invalid-project-id"];

const NOT_FOUND_CODES: &[&str] = &[
	"resource.activity.not-found",
	"resource.addon.not-found",
	"resource.alert.not-found",
	"resource.api-key.not-found",
	"resource.api-request.not-found",
	"resource.api-version.not-found",
	"resource.applepay-configuration.not-found",
	"resource.board.not-found",
	"resource.card.not-found",
	"resource.chart.not-found",
	"resource.collaborator.not-found",
	"resource.country.not-found",
	"resource.coupon.not-found",
	"resource.currency.not-found",
	"resource.customer.not-found",
	"resource.discount.not-found",
	"resource.event.not-found",
	"resource.export.not-found",
	"resource.fraud-service-configuration.not-found",
	"resource.gateway.not-found",
	"resource.gateway-configuration.not-found",
	"resource.not-found",
	"resource.invoice.not-found",
	"resource.payout.not-found",
	"resource.permission-group.not-found",
	"resource.plan.not-found",
	"resource.product.not-found",
	"resource.project.not-found",
	"resource.refund.not-found",
	"request.route-not-found",
	"resource.subscription.not-found",
	"resource.token.not-found",
	"resource.tokenization-request.not-found",
	"resource.transaction.not-found",
	"resource.user.not-found",
	"resource.webhook-endpoint.not-found",
];

const VALIDATION_CODES: &[&str] = &[
	"request.validation.error",
	"gateway.validation-error",
	"request.validation.invalid-address",
	"request.validation.invalid-amount",
	"request.validation.invalid-challenge-indicator",
	"request.validation.invalid-country",
	"request.validation.invalid-currency",
	"gateway.invalid-customer-input",
	"request.validation.invalid-date",
	"request.validation.invalid-description",
	"request.validation.invalid-detail-category",
	"request.validation.invalid-detail-condition",
	"request.validation.invalid-device-channel",
	"request.validation.invalid-duration",
	"request.validation.invalid-email",
	"request.validation.invalid-exemption-reason",
	"request.validation.invalid-external-fraud-tools",
	"request.validation.invalid-gateway-data",
	"request.validation.invalid-id",
	"request.validation.invalid-ip-address",
	"request.validation.invalid-legal-document",
	"request.validation.invalid-metadata",
	"request.validation.invalid-name",
	"request.validation.invalid-payment-type",
	"request.validation.invalid-percent",
	"request.validation.invalid-phone-number",
	"request.validation.invalid-quantity",
	"request.validation.invalid-relationship",
	"request.validation.invalid-relay-store-name",
	"request.validation.invalid-role",
	"request.validation.invalid-settings",
	"request.validation.invalid-sex",
	"request.validation.invalid-shipping-delay",
	"request.validation.invalid-shipping-method",
	"gateway.invalid-state",
	"request.validation.invalid-subaccount",
	"request.validation.invalid-tax-amount",
	"request.validation.invalid-tax-rate",
	"request.validation.invalid-type",
	"request.validation.invalid-url",
	"request.validation.invalid-user",
	"request.validation.missing-currency",
	"gateway.missing-customer-input",
	"request.validation.missing-description",
	"request.validation.missing-email",
	"request.validation.missing-invoice",
	"request.validation.missing-name",
	"request.validation.missing-source",
	"request.validation.missing-type",
];

const GENERIC_CODES: &[&str] = &[
	"card.exceeded-limits",
	"card.failed-cvc",
	"card.issuer-down",
	"card.issuer-failed",
	"card.no-money",
	"card.not-authorized",
	"gateway.declined",
	"gateway.unknown-error",
	FailureCode::GENERIC_MOBILE,
	"request.bad-format",
	"request.source.card-already-used",
	"request.card.invalid",
	"request.expand.invalid",
	"request.filter.invalid",
	"request.still-processing",
	"request.too-much",
	"request.gateway.not-available",
	"request.gateway.operation-not-supported",
	"request.idempotency-key.invalid",
	"request.pagination.invalid",
	"request.source.invalid",
	"request.configuration.missing-gateway-configuration",
	"request.rate.exceeded",
	"resource.not-linked",
	"routing-rules.transaction-blocked",
	"sandbox.not-supported",
	"service.not-supported",
];

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn gateway_codes_resolve_in_table_order() {
		assert_eq!(
			FailureCode::from_gateway("request.authentication.invalid"),
			FailureCode::Authentication("request.authentication.invalid".into())
		);
		assert_eq!(
			FailureCode::from_gateway("resource.invoice.not-found"),
			FailureCode::NotFound("resource.invoice.not-found".into())
		);
		assert_eq!(
			FailureCode::from_gateway("request.validation.missing-source"),
			FailureCode::Validation("request.validation.missing-source".into())
		);
		assert_eq!(
			FailureCode::from_gateway("card.no-money"),
			FailureCode::Generic("card.no-money".into())
		);
		assert_eq!(
			FailureCode::from_gateway("gateway.timeout"),
			FailureCode::Timeout(FailureScope::Gateway)
		);
		assert_eq!(
			FailureCode::from_gateway("gateway-internal-error"),
			FailureCode::Internal(FailureScope::Gateway)
		);
		assert_eq!(
			FailureCode::from_gateway("something.new"),
			FailureCode::Unknown("something.new".into())
		);
	}

	#[test]
	fn raw_values_round_trip_through_gateway_mapping() {
		for code in [
			FailureCode::NetworkUnreachable,
			FailureCode::Timeout(FailureScope::Mobile),
			FailureCode::Internal(FailureScope::Mobile),
			FailureCode::Cancelled,
			FailureCode::generic_mobile(),
		] {
			assert_eq!(FailureCode::from_gateway(code.raw_value()), code);
		}
	}

	#[test]
	fn sdk_codes_carry_the_processout_mobile_namespace() {
		assert_eq!(FailureCode::NetworkUnreachable.raw_value(), "processout-mobile.network-unreachable");
		assert_eq!(FailureCode::Timeout(FailureScope::Mobile).raw_value(), "processout-mobile.timeout");
		assert_eq!(
			FailureCode::Internal(FailureScope::Mobile).raw_value(),
			"processout-mobile.internal"
		);
		assert_eq!(FailureCode::Cancelled.raw_value(), "processout-mobile.cancelled");
		assert_eq!(FailureCode::generic_mobile().raw_value(), "processout-mobile.generic.error");
		assert_eq!(
			FailureCode::from_gateway("processout-mobile.timeout"),
			FailureCode::Timeout(FailureScope::Mobile)
		);
		assert_eq!(
			FailureCode::from_gateway("mobile.timeout"),
			FailureCode::Unknown("mobile.timeout".into())
		);
	}

	#[test]
	fn codec_error_becomes_mobile_internal_with_source() {
		let err: Error = CodecError::MissingPrefix.into();

		assert_eq!(err.code, FailureCode::Internal(FailureScope::Mobile));

		let source = StdError::source(&err)
			.expect("Codec failures should expose the original error as their source.");

		assert_eq!(source.to_string(), CodecError::MissingPrefix.to_string());
	}

	#[test]
	fn display_includes_code_and_message() {
		let err = Error::timeout("Capture did not complete.");

		assert_eq!(err.to_string(), "processout-mobile.timeout: Capture did not complete.");
		assert_eq!(
			Error::new(FailureCode::Cancelled).to_string(),
			"processout-mobile.cancelled: no further details"
		);
	}
}
