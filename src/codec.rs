//! Source-token codec: the base64-JSON envelope exchanged with the gateway.
//!
//! Gateway payloads arrive as (possibly unpadded) base64 JSON; resolved customer actions leave
//! as `gway_req_` prefixed tokens wrapping a [`SourceEnvelope`].

// std
use std::ops::Deref;
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, error::CodecError, threeds::AuthenticationRequestParameters};

/// Literal prefix carried by every source token.
pub const SOURCE_TOKEN_PREFIX: &str = "gway_req_";
/// Pre-computed token reporting a passed challenge (`{"transStatus":"Y"}`).
pub const CHALLENGE_ACCEPTED_TOKEN: &str =
	"gway_req_eyJib2R5Ijoie1widHJhbnNTdGF0dXNcIjpcIllcIn0ifQ==";
/// Pre-computed token reporting a denied challenge (`{"transStatus":"N"}`).
pub const CHALLENGE_REJECTED_TOKEN: &str =
	"gway_req_eyJib2R5Ijoie1widHJhbnNTdGF0dXNcIjpcIk5cIn0ifQ==";
/// Envelope body submitted when a web fingerprint does not finish in time.
pub const FINGERPRINT_TIMEOUT_BODY: &str = "{ \"threeDS2FingerprintTimeout\": true }";

const DEVICE_CHANNEL_APP: &str = "app";

/// Opaque source identifier submitted to the gateway in place of a payment method.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceToken(String);
impl SourceToken {
	/// Wraps a raw source value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Token reporting the outcome of a 3DS2 challenge.
	pub fn challenge_result(accepted: bool) -> Self {
		Self::new(if accepted { CHALLENGE_ACCEPTED_TOKEN } else { CHALLENGE_REJECTED_TOKEN })
	}

	/// Returns the raw token.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Consumes the token, returning the raw string.
	pub fn into_inner(self) -> String {
		self.0
	}
}
impl Deref for SourceToken {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for SourceToken {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Debug for SourceToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SourceToken").field(&self.0).finish()
	}
}
impl Display for SourceToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl From<String> for SourceToken {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<&str> for SourceToken {
	fn from(value: &str) -> Self {
		Self(value.to_owned())
	}
}

/// JSON envelope wrapped by a source token.
///
/// Absent fields are left out of the encoded JSON. The legacy `{url, body}` form decodes into
/// the same type with `headers` unset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEnvelope {
	/// Payload forwarded to the gateway, usually a JSON document serialized as a string.
	pub body: String,
	/// Extra headers the gateway should replay.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub headers: Option<BTreeMap<String, String>>,
	/// Target URL associated with the payload, exactly as the gateway supplied it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}
impl SourceEnvelope {
	/// Envelope carrying only a body.
	pub fn new(body: impl Into<String>) -> Self {
		Self { body: body.into(), headers: None, url: None }
	}

	/// Envelope reporting that the web fingerprint at `url` timed out.
	pub fn fingerprint_timeout(url: impl Into<String>) -> Self {
		let headers = BTreeMap::from([("Content-Type".to_owned(), "application/json".to_owned())]);

		Self {
			body: FINGERPRINT_TIMEOUT_BODY.to_owned(),
			headers: Some(headers),
			url: Some(url.into()),
		}
	}
}

/// Decodes a gateway-supplied base64 JSON payload.
///
/// Missing `=` padding is restored before decoding.
pub fn decode<T>(value: &str) -> Result<T, CodecError>
where
	T: DeserializeOwned,
{
	let mut padded = value.trim().to_owned();
	let remainder = padded.len() % 4;

	if remainder != 0 {
		padded.push_str(&"=".repeat(4 - remainder));
	}

	let bytes = STANDARD.decode(padded)?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

	Ok(serde_path_to_error::deserialize(&mut deserializer)?)
}

/// Encodes an envelope into a prefixed source token.
pub fn encode(envelope: &SourceEnvelope) -> Result<SourceToken, CodecError> {
	let json = serde_json::to_vec(envelope).map_err(CodecError::Serialize)?;

	Ok(SourceToken::new(format!("{SOURCE_TOKEN_PREFIX}{}", STANDARD.encode(json))))
}

/// Decodes a prefixed source token back into its envelope.
pub fn decode_token(token: &str) -> Result<SourceEnvelope, CodecError> {
	let payload = token.strip_prefix(SOURCE_TOKEN_PREFIX).ok_or(CodecError::MissingPrefix)?;

	decode(payload)
}

/// Serializes the 3DS2 AReq body for the provided SDK parameters.
pub fn encode_authentication_request(
	parameters: &AuthenticationRequestParameters,
) -> Result<String, CodecError> {
	let mut deserializer =
		serde_json::Deserializer::from_str(&parameters.sdk_ephemeral_public_key);
	let ephemeral_key: serde_json::Value =
		serde_path_to_error::deserialize(&mut deserializer)?;
	let request = AuthenticationRequest {
		device_channel: DEVICE_CHANNEL_APP,
		sdk_app_id: &parameters.sdk_app_id,
		sdk_enc_data: &parameters.device_data,
		sdk_ephem_pub_key: ephemeral_key,
		sdk_reference_number: &parameters.sdk_reference_number,
		sdk_trans_id: &parameters.sdk_transaction_id,
	};

	serde_json::to_string(&request).map_err(CodecError::Serialize)
}

// Field order is the wire order.
#[derive(Serialize)]
struct AuthenticationRequest<'a> {
	#[serde(rename = "deviceChannel")]
	device_channel: &'static str,
	#[serde(rename = "sdkAppID")]
	sdk_app_id: &'a str,
	#[serde(rename = "sdkEncData")]
	sdk_enc_data: &'a str,
	#[serde(rename = "sdkEphemPubKey")]
	sdk_ephem_pub_key: serde_json::Value,
	#[serde(rename = "sdkReferenceNumber")]
	sdk_reference_number: &'a str,
	#[serde(rename = "sdkTransID")]
	sdk_trans_id: &'a str,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::threeds::{ChallengeParameters, DirectoryServerData};

	const DIRECTORY_SERVER_DATA: &str = "eyJkaXJlY3RvcnlTZXJ2ZXJJRCI6IjEiLCJkaXJlY3RvcnlTZXJ2ZXJQdWJsaWNLZXkiOiIyIiwiZGlyZWN0b3J5U2VydmVyUm9vdENBcyI6WyIzIl0sInRocmVlRFNTZXJ2ZXJUcmFuc0lEIjoiNCIsInNjaGVtZSI6IjUiLCJtZXNzYWdlVmVyc2lvbiI6IjYifQ";

	#[test]
	fn unpadded_payload_decodes_after_padding() {
		assert_ne!(DIRECTORY_SERVER_DATA.len() % 4, 0);

		let data: DirectoryServerData =
			decode(DIRECTORY_SERVER_DATA).expect("Unpadded fixture should decode.");
		let padded: DirectoryServerData = decode(&format!("{DIRECTORY_SERVER_DATA}=="))
			.expect("Padded fixture should decode too.");

		assert_eq!(data, padded);
		assert_eq!(data.id, "1");
		assert_eq!(data.public_key, "2");
		assert_eq!(data.root_certificates, vec!["3".to_owned()]);
		assert_eq!(data.transaction_id, "4");
		assert_eq!(data.scheme.as_deref(), Some("5"));
		assert_eq!(data.message_version, "6");
	}

	#[test]
	fn challenge_parameters_decode() {
		let parameters: ChallengeParameters = decode(
			"eyJhY3NUcmFuc0lEIjoiMSIsImFjc1JlZmVyZW5jZU51bWJlciI6IjIiLCJhY3NTaWduZWRDb250ZW50IjoiMyIsInRocmVlRFNTZXJ2ZXJUcmFuc0lEIjoiNCJ9",
		)
		.expect("Challenge fixture should decode.");

		assert_eq!(parameters.acs_transaction_id, "1");
		assert_eq!(parameters.acs_reference_number, "2");
		assert_eq!(parameters.acs_signed_content, "3");
		assert_eq!(parameters.three_ds_server_transaction_id, "4");
	}

	#[test]
	fn invalid_base64_is_rejected() {
		let err = decode::<DirectoryServerData>("%%%")
			.expect_err("Non-base64 input should not decode.");

		assert!(matches!(err, CodecError::Base64(_)));
		assert_eq!(
			Error::from(err).code,
			FailureCode::Internal(FailureScope::Mobile)
		);
	}

	#[test]
	fn malformed_json_reports_its_path() {
		let payload = STANDARD.encode(r#"{"directoryServerID":1}"#);
		let err = decode::<DirectoryServerData>(&payload)
			.expect_err("A numeric identifier should not decode.");

		match err {
			CodecError::Json(e) => assert_eq!(e.path().to_string(), "directoryServerID"),
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn challenge_tokens_are_exact_literals() {
		assert_eq!(
			SourceToken::challenge_result(true).as_str(),
			"gway_req_eyJib2R5Ijoie1widHJhbnNTdGF0dXNcIjpcIllcIn0ifQ=="
		);
		assert_eq!(
			SourceToken::challenge_result(false).as_str(),
			"gway_req_eyJib2R5Ijoie1widHJhbnNTdGF0dXNcIjpcIk5cIn0ifQ=="
		);

		let accepted = decode_token(CHALLENGE_ACCEPTED_TOKEN)
			.expect("Literal challenge token should decode as a legacy envelope.");

		assert_eq!(accepted.body, r#"{"transStatus":"Y"}"#);
		assert_eq!(accepted.url, None);
		assert_eq!(encode(&accepted).expect("Envelope should encode.").as_str(), CHALLENGE_ACCEPTED_TOKEN);
	}

	#[test]
	fn authentication_request_matches_recorded_token() {
		let parameters = AuthenticationRequestParameters {
			device_data: "1".into(),
			sdk_app_id: "2".into(),
			sdk_ephemeral_public_key: r#"{"kty": "EC"}"#.into(),
			sdk_reference_number: "3".into(),
			sdk_transaction_id: "4".into(),
		};
		let body = encode_authentication_request(&parameters)
			.expect("Authentication request should encode.");
		let token = encode(&SourceEnvelope::new(body)).expect("Envelope should encode.");

		assert_eq!(
			token.as_str(),
			"gway_req_eyJib2R5Ijoie1wiZGV2aWNlQ2hhbm5lbFwiOlwiYXBwXCIsXCJzZGtBcHBJRFwiOlwiMlwiLFwic2RrRW5jRGF0YVwiOlwiMVwiLFwic2RrRXBoZW1QdWJLZXlcIjp7XCJrdHlcIjpcIkVDXCJ9LFwic2RrUmVmZXJlbmNlTnVtYmVyXCI6XCIzXCIsXCJzZGtUcmFuc0lEXCI6XCI0XCJ9In0="
		);
	}

	#[test]
	fn invalid_ephemeral_key_is_rejected() {
		let parameters = AuthenticationRequestParameters {
			device_data: "1".into(),
			sdk_app_id: "2".into(),
			sdk_ephemeral_public_key: "not-json".into(),
			sdk_reference_number: "3".into(),
			sdk_transaction_id: "4".into(),
		};

		assert!(encode_authentication_request(&parameters).is_err());
	}

	#[test]
	fn fingerprint_timeout_envelope_matches_wire_form() {
		let url = "https://example.com/fingerprint";
		let token =
			encode(&SourceEnvelope::fingerprint_timeout(url)).expect("Envelope should encode.");

		assert_eq!(
			token.as_str(),
			"gway_req_eyJib2R5IjoieyBcInRocmVlRFMyRmluZ2VycHJpbnRUaW1lb3V0XCI6IHRydWUgfSIsImhlYWRlcnMiOnsiQ29udGVudC1UeXBlIjoiYXBwbGljYXRpb24vanNvbiJ9LCJ1cmwiOiJodHRwczovL2V4YW1wbGUuY29tL2ZpbmdlcnByaW50In0="
		);

		let decoded = decode_token(&token).expect("Timeout token should decode.");

		assert_eq!(decoded, SourceEnvelope::fingerprint_timeout(url));
	}

	#[test]
	fn fingerprint_timeout_quotes_the_url_verbatim() {
		let token = encode(&SourceEnvelope::fingerprint_timeout("example.com"))
			.expect("Envelope should encode.");

		assert_eq!(
			token.as_str(),
			"gway_req_eyJib2R5IjoieyBcInRocmVlRFMyRmluZ2VycHJpbnRUaW1lb3V0XCI6IHRydWUgfSIsImhlYWRlcnMiOnsiQ29udGVudC1UeXBlIjoiYXBwbGljYXRpb24vanNvbiJ9LCJ1cmwiOiJleGFtcGxlLmNvbSJ9"
		);
	}

	#[test]
	fn legacy_envelope_with_null_url_decodes() {
		let token = format!("{SOURCE_TOKEN_PREFIX}{}", STANDARD.encode(r#"{"url":null,"body":"{}"}"#));
		let envelope = decode_token(&token).expect("Legacy envelope should decode.");

		assert_eq!(envelope, SourceEnvelope::new("{}"));
		assert!(matches!(decode_token("tok_123"), Err(CodecError::MissingPrefix)));
	}
}
