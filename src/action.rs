//! Customer actions requested by the gateway during authorization.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::CodecError};

/// Additional work the device must perform before the gateway can continue an authorization.
///
/// Mobile variants carry the raw base64 payload; web variants carry the URL to load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCustomerAction", into = "RawCustomerAction")]
pub enum CustomerAction {
	/// Produce a 3DS2 device fingerprint from base64 directory-server data.
	FingerprintMobile(String),
	/// Run an interactive 3DS2 challenge from base64 challenge parameters.
	ChallengeMobile(String),
	/// Load a web fingerprint URL with a bounded timeout.
	Fingerprint(ActionUrl),
	/// Perform an interactive redirect with no timeout.
	Redirect(ActionUrl),
}
impl CustomerAction {
	/// Builds an action from its wire kind and raw value.
	///
	/// URL values without a scheme are treated as `https`.
	pub fn from_raw(kind: CustomerActionKind, value: impl Into<String>) -> Result<Self, CodecError> {
		let value = value.into();
		let action = match kind {
			CustomerActionKind::FingerprintMobile => Self::FingerprintMobile(value),
			CustomerActionKind::ChallengeMobile => Self::ChallengeMobile(value),
			CustomerActionKind::Fingerprint => Self::Fingerprint(ActionUrl::parse(value)?),
			CustomerActionKind::Redirect | CustomerActionKind::Url =>
				Self::Redirect(ActionUrl::parse(value)?),
		};

		Ok(action)
	}

	/// Returns the wire kind of this action.
	pub fn kind(&self) -> CustomerActionKind {
		match self {
			Self::FingerprintMobile(_) => CustomerActionKind::FingerprintMobile,
			Self::ChallengeMobile(_) => CustomerActionKind::ChallengeMobile,
			Self::Fingerprint(_) => CustomerActionKind::Fingerprint,
			Self::Redirect(_) => CustomerActionKind::Redirect,
		}
	}
}
impl TryFrom<RawCustomerAction> for CustomerAction {
	type Error = CodecError;

	fn try_from(raw: RawCustomerAction) -> Result<Self, Self::Error> {
		Self::from_raw(raw.kind, raw.value)
	}
}
impl From<CustomerAction> for RawCustomerAction {
	fn from(action: CustomerAction) -> Self {
		let kind = action.kind();
		let value = match action {
			CustomerAction::FingerprintMobile(value) | CustomerAction::ChallengeMobile(value) =>
				value,
			CustomerAction::Fingerprint(url) | CustomerAction::Redirect(url) => url.raw,
		};

		Self { kind, value }
	}
}

/// Wire form of a customer action: `{ "type": <kind>, "value": <string> }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCustomerAction {
	/// Action kind.
	#[serde(rename = "type")]
	pub kind: CustomerActionKind,
	/// Base64 payload or URL, depending on `kind`.
	pub value: String,
}

/// Customer action kinds understood by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CustomerActionKind {
	/// `fingerprint-mobile`
	FingerprintMobile,
	/// `challenge-mobile`
	ChallengeMobile,
	/// `fingerprint`
	Fingerprint,
	/// `redirect`
	Redirect,
	/// `url`, an alias of `redirect`.
	Url,
}

/// URL carried by a web action.
///
/// The gateway string is kept verbatim next to its parsed form; tokens sent back to the gateway
/// quote it byte for byte.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ActionUrl {
	raw: String,
	url: Url,
}
impl ActionUrl {
	/// Parses a gateway-supplied URL.
	///
	/// Surrounding whitespace is dropped and a value without a scheme is loaded over `https`.
	pub fn parse(value: impl Into<String>) -> Result<Self, CodecError> {
		let value = value.into();
		let trimmed = value.trim();

		if trimmed.is_empty() {
			return Err(CodecError::InvalidUrl { value });
		}

		let url = match Url::parse(trimmed) {
			Ok(url) => url,
			Err(url::ParseError::RelativeUrlWithoutBase) =>
				Url::parse(&format!("https://{trimmed}"))
					.map_err(|_| CodecError::InvalidUrl { value: value.clone() })?,
			Err(_) => return Err(CodecError::InvalidUrl { value }),
		};

		Ok(Self { raw: trimmed.to_owned(), url })
	}

	/// The string the gateway sent, trimmed.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// The URL to load.
	pub fn url(&self) -> &Url {
		&self.url
	}
}
impl Deref for ActionUrl {
	type Target = Url;

	fn deref(&self) -> &Self::Target {
		&self.url
	}
}
impl Display for ActionUrl {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.raw)
	}
}
impl From<Url> for ActionUrl {
	fn from(url: Url) -> Self {
		Self { raw: url.to_string(), url }
	}
}
