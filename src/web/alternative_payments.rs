//! Alternative-payment redirects presented through the web coordinator.
//!
//! Authorization and tokenization pages live beneath the checkout root at
//! `{project}/{invoice}/redirect/{gateway configuration}[/tokenized/{token}]` and
//! `{project}/{customer}/{token}/redirect/{gateway configuration}`. The page ends on a callback
//! URL that carries either a gateway `token` or an `error_code`.

// self
use crate::{
	_prelude::*,
	cancel::CancellationToken,
	codec::SourceToken,
	config::AlternativePaymentsConfig,
	web::{
		WebAuthenticationCallback, WebAuthenticationCoordinator, WebAuthenticationRequest,
		redirect::{self, TOKEN_QUERY_ITEM},
	},
};

const CUSTOMER_ID_QUERY_ITEM: &str = "customer_id";
const ERROR_CODE_QUERY_ITEM: &str = "error_code";
const TOKEN_ID_QUERY_ITEM: &str = "token_id";

/// Authorizes an invoice with an alternative payment method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlternativePaymentAuthorizationRequest {
	/// Invoice identifier.
	pub invoice_id: String,
	/// Gateway configuration handling the payment.
	pub gateway_configuration_id: String,
	/// Customer token to charge instead of asking for a new payment.
	pub token_id: Option<String>,
	/// Extra values forwarded as `additional_data[<key>]` query items.
	pub additional_data: BTreeMap<String, String>,
}
impl AlternativePaymentAuthorizationRequest {
	/// Request without a customer token or additional data.
	pub fn new(invoice_id: impl Into<String>, gateway_configuration_id: impl Into<String>) -> Self {
		Self {
			invoice_id: invoice_id.into(),
			gateway_configuration_id: gateway_configuration_id.into(),
			token_id: None,
			additional_data: BTreeMap::new(),
		}
	}

	/// Charges an existing customer token.
	pub fn with_token_id(mut self, token_id: impl Into<String>) -> Self {
		self.token_id = Some(token_id.into());

		self
	}

	/// Adds one additional-data entry.
	pub fn with_additional_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.additional_data.insert(key.into(), value.into());

		self
	}
}

/// Saves an alternative payment method on a customer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlternativePaymentTokenizationRequest {
	/// Customer identifier.
	pub customer_id: String,
	/// Customer token to fill.
	pub token_id: String,
	/// Gateway configuration handling the payment method.
	pub gateway_configuration_id: String,
	/// Extra values forwarded as `additional_data[<key>]` query items.
	pub additional_data: BTreeMap<String, String>,
}
impl AlternativePaymentTokenizationRequest {
	/// Request without additional data.
	pub fn new(
		customer_id: impl Into<String>,
		token_id: impl Into<String>,
		gateway_configuration_id: impl Into<String>,
	) -> Self {
		Self {
			customer_id: customer_id.into(),
			token_id: token_id.into(),
			gateway_configuration_id: gateway_configuration_id.into(),
			additional_data: BTreeMap::new(),
		}
	}

	/// Adds one additional-data entry.
	pub fn with_additional_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.additional_data.insert(key.into(), value.into());

		self
	}
}

/// Values read from the URL an alternative-payment page returned to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlternativePaymentResponse {
	/// Source to submit to the gateway. Empty when the page returned none.
	pub gateway_token: SourceToken,
	/// Customer token the payment method was saved on.
	pub token_id: Option<String>,
	/// Customer owning `token_id`.
	pub customer_id: Option<String>,
}
impl AlternativePaymentResponse {
	/// Parses a return URL.
	///
	/// An `error_code` query item wins over any token and is mapped through
	/// [`FailureCode::from_gateway`].
	pub fn from_return_url(url: &Url) -> Result<Self> {
		if let Some(code) = redirect::query_item(url, ERROR_CODE_QUERY_ITEM) {
			return Err(Error::new(FailureCode::from_gateway(&code)));
		}

		Ok(Self {
			gateway_token: SourceToken::new(
				redirect::query_item(url, TOKEN_QUERY_ITEM).unwrap_or_default(),
			),
			token_id: redirect::query_item(url, TOKEN_ID_QUERY_ITEM),
			customer_id: redirect::query_item(url, CUSTOMER_ID_QUERY_ITEM),
		})
	}
}

/// Runs alternative-payment pages in web sessions.
#[derive(Clone, Debug)]
pub struct AlternativePaymentsService {
	coordinator: WebAuthenticationCoordinator,
	config: AlternativePaymentsConfig,
	callback: Option<WebAuthenticationCallback>,
	prefers_ephemeral_session: bool,
}
impl AlternativePaymentsService {
	/// Presents pages beneath `config` through `coordinator`.
	pub fn new(coordinator: WebAuthenticationCoordinator, config: AlternativePaymentsConfig) -> Self {
		Self { coordinator, config, callback: None, prefers_ephemeral_session: true }
	}

	/// Sets the callback every page waits for.
	pub fn with_callback(mut self, callback: WebAuthenticationCallback) -> Self {
		self.callback = Some(callback);

		self
	}

	/// Chooses whether pages share browser state.
	pub fn with_ephemeral_session(mut self, ephemeral: bool) -> Self {
		self.prefers_ephemeral_session = ephemeral;

		self
	}

	/// Redirect settings.
	pub fn config(&self) -> &AlternativePaymentsConfig {
		&self.config
	}

	/// Page authorizing `request`.
	pub fn authorization_url(&self, request: &AlternativePaymentAuthorizationRequest) -> Result<Url> {
		let mut segments = vec![
			request.invoice_id.as_str(),
			"redirect",
			request.gateway_configuration_id.as_str(),
		];

		if let Some(token_id) = &request.token_id {
			segments.extend(["tokenized", token_id.as_str()]);
		}

		Ok(self.config.redirect_url(&segments, &request.additional_data)?)
	}

	/// Page tokenizing `request`.
	pub fn tokenization_url(&self, request: &AlternativePaymentTokenizationRequest) -> Result<Url> {
		let segments = [
			request.customer_id.as_str(),
			request.token_id.as_str(),
			"redirect",
			request.gateway_configuration_id.as_str(),
		];

		Ok(self.config.redirect_url(&segments, &request.additional_data)?)
	}

	/// Authorizes an invoice through its alternative-payment page.
	pub async fn authorize(
		&self,
		request: &AlternativePaymentAuthorizationRequest,
		cancel: &CancellationToken,
	) -> Result<AlternativePaymentResponse> {
		let url = self.authorization_url(request)?;

		self.authenticate(url, cancel).await
	}

	/// Saves an alternative payment method on a customer token.
	pub async fn tokenize(
		&self,
		request: &AlternativePaymentTokenizationRequest,
		cancel: &CancellationToken,
	) -> Result<AlternativePaymentResponse> {
		let url = self.tokenization_url(request)?;

		self.authenticate(url, cancel).await
	}

	/// Presents an arbitrary alternative-payment page and parses where it returned to.
	pub async fn authenticate(
		&self,
		url: Url,
		cancel: &CancellationToken,
	) -> Result<AlternativePaymentResponse> {
		let mut request =
			WebAuthenticationRequest::new(url).with_ephemeral_session(self.prefers_ephemeral_session);

		if let Some(callback) = &self.callback {
			request = request.with_callback(callback.clone());
		}

		let returned = self.coordinator.authenticate(request, cancel).await?;

		AlternativePaymentResponse::from_return_url(&returned)
	}
}
