//! 3DS2 payloads and the delegate contract that performs device-side work.

// self
use crate::{_prelude::*, codec::SourceToken};

/// Boxed future returned by [`ThreeDsService`] operations.
pub type ThreeDsFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Boxed future returned by [`ThreeDsService::clean`].
pub type CleanupFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Directory-server configuration decoded from a `fingerprint-mobile` action.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryServerData {
	/// Directory server identifier.
	#[serde(rename = "directoryServerID")]
	pub id: String,
	/// Directory server public key.
	#[serde(rename = "directoryServerPublicKey")]
	pub public_key: String,
	/// Directory server root certificates.
	#[serde(rename = "directoryServerRootCAs")]
	pub root_certificates: Vec<String>,
	/// 3DS server transaction identifier.
	#[serde(rename = "threeDSServerTransID")]
	pub transaction_id: String,
	/// Card scheme, when the gateway names one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scheme: Option<String>,
	/// 3DS protocol version.
	#[serde(rename = "messageVersion")]
	pub message_version: String,
}

/// Device parameters produced by the 3DS SDK during fingerprinting.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AuthenticationRequestParameters {
	/// Encrypted device data.
	pub device_data: String,
	/// SDK application identifier.
	pub sdk_app_id: String,
	/// SDK ephemeral public key as a JWK JSON document.
	pub sdk_ephemeral_public_key: String,
	/// SDK reference number.
	pub sdk_reference_number: String,
	/// SDK transaction identifier.
	pub sdk_transaction_id: String,
}

/// Challenge parameters decoded from a `challenge-mobile` action.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeParameters {
	/// ACS transaction identifier.
	#[serde(rename = "acsTransID")]
	pub acs_transaction_id: String,
	/// ACS reference number.
	#[serde(rename = "acsReferenceNumber")]
	pub acs_reference_number: String,
	/// Signed content returned by the ACS.
	#[serde(rename = "acsSignedContent")]
	pub acs_signed_content: String,
	/// 3DS server transaction identifier.
	#[serde(rename = "threeDSServerTransID")]
	pub three_ds_server_transaction_id: String,
}

/// Delegate that performs device-specific customer-action work.
///
/// Implementations may present interactive UI. The broker never calls into one delegate from
/// two authorization attempts at the same time.
pub trait ThreeDsService
where
	Self: Send + Sync,
{
	/// Version of the underlying 3DS SDK, forwarded to the gateway when the caller sets none.
	fn version(&self) -> Option<String> {
		None
	}

	/// Collects the device fingerprint for the provided directory server.
	fn authentication_request_parameters<'a>(
		&'a self,
		data: &'a DirectoryServerData,
	) -> ThreeDsFuture<'a, AuthenticationRequestParameters>;

	/// Runs the interactive challenge; `true` when the cardholder passed it.
	fn perform_challenge<'a>(
		&'a self,
		parameters: &'a ChallengeParameters,
	) -> ThreeDsFuture<'a, bool>;

	/// Performs a redirect and returns the resulting source token.
	///
	/// A `timeout` of `None` waits for as long as the customer needs.
	fn redirect<'a>(
		&'a self,
		url: &'a Url,
		timeout: Option<Duration>,
	) -> ThreeDsFuture<'a, SourceToken>;

	/// Loads a web fingerprint URL. Defaults to a bounded [`ThreeDsService::redirect`].
	fn fingerprint_via_url<'a>(
		&'a self,
		url: &'a Url,
		timeout: Duration,
	) -> ThreeDsFuture<'a, SourceToken> {
		self.redirect(url, Some(timeout))
	}

	/// Releases SDK resources once an authorization finishes.
	fn clean(&self) -> CleanupFuture<'_> {
		Box::pin(async {})
	}
}
