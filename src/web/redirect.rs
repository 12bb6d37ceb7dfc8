//! [`ThreeDsService`] adapter that performs redirects through the web coordinator.

// self
use crate::{
	_prelude::*,
	cancel::CancellationToken,
	codec::SourceToken,
	threeds::{
		AuthenticationRequestParameters, ChallengeParameters, CleanupFuture, DirectoryServerData,
		ThreeDsFuture, ThreeDsService,
	},
	web::{WebAuthenticationCallback, WebAuthenticationCoordinator, WebAuthenticationRequest},
};

pub(super) const TOKEN_QUERY_ITEM: &str = "token";

/// Delegates native 3DS work to `N` and runs redirects in a web session.
///
/// The source token is read from the `token` query item of the URL the session returns to; a
/// missing item yields an empty token.
pub struct WebRedirectThreeDsService<N>
where
	N: ThreeDsService,
{
	native: N,
	coordinator: WebAuthenticationCoordinator,
	callback: Option<WebAuthenticationCallback>,
	prefers_ephemeral_session: bool,
}
impl<N> WebRedirectThreeDsService<N>
where
	N: ThreeDsService,
{
	/// Combines a native delegate with a coordinator.
	pub fn new(native: N, coordinator: WebAuthenticationCoordinator) -> Self {
		Self { native, coordinator, callback: None, prefers_ephemeral_session: true }
	}

	/// Sets the callback every redirect waits for.
	pub fn with_callback(mut self, callback: WebAuthenticationCallback) -> Self {
		self.callback = Some(callback);

		self
	}

	/// Chooses whether redirects share browser state.
	pub fn with_ephemeral_session(mut self, ephemeral: bool) -> Self {
		self.prefers_ephemeral_session = ephemeral;

		self
	}

	/// Wrapped native delegate.
	pub fn native(&self) -> &N {
		&self.native
	}
}
impl<N> ThreeDsService for WebRedirectThreeDsService<N>
where
	N: ThreeDsService,
{
	fn version(&self) -> Option<String> {
		self.native.version()
	}

	fn authentication_request_parameters<'a>(
		&'a self,
		data: &'a DirectoryServerData,
	) -> ThreeDsFuture<'a, AuthenticationRequestParameters> {
		self.native.authentication_request_parameters(data)
	}

	fn perform_challenge<'a>(
		&'a self,
		parameters: &'a ChallengeParameters,
	) -> ThreeDsFuture<'a, bool> {
		self.native.perform_challenge(parameters)
	}

	fn redirect<'a>(
		&'a self,
		url: &'a Url,
		timeout: Option<Duration>,
	) -> ThreeDsFuture<'a, SourceToken> {
		Box::pin(async move {
			let mut request = WebAuthenticationRequest::new(url.clone())
				.with_ephemeral_session(self.prefers_ephemeral_session);

			if let Some(callback) = &self.callback {
				request = request.with_callback(callback.clone());
			}
			if let Some(timeout) = timeout {
				request = request.with_timeout(timeout);
			}

			// Callers abort by dropping this future; the coordinator dismisses the session then.
			let returned = self.coordinator.authenticate(request, &CancellationToken::new()).await?;

			Ok(token_from_return_url(&returned))
		})
	}

	fn clean(&self) -> CleanupFuture<'_> {
		self.native.clean()
	}
}
impl<N> Debug for WebRedirectThreeDsService<N>
where
	N: ThreeDsService,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WebRedirectThreeDsService")
			.field("coordinator", &self.coordinator)
			.field("callback", &self.callback)
			.field("prefers_ephemeral_session", &self.prefers_ephemeral_session)
			.finish()
	}
}

fn token_from_return_url(url: &Url) -> SourceToken {
	SourceToken::new(query_item(url, TOKEN_QUERY_ITEM).unwrap_or_default())
}

/// First value of the `name` query item, percent-decoded.
pub(super) fn query_item(url: &Url, name: &str) -> Option<String> {
	url.query_pairs().find(|(item, _)| item == name).map(|(_, value)| value.into_owned())
}
