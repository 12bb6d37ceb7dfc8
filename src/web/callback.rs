//! Return-address matching for interactive web sessions.

// self
use crate::_prelude::*;

/// Address the platform session watches for to detect completion.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WebAuthenticationCallback {
	/// Any URL using this custom scheme.
	Scheme(String),
	/// HTTPS URLs with exactly this host and path.
	Https {
		/// Expected host.
		host: String,
		/// Expected path, always starting with `/`.
		path: String,
	},
}
impl WebAuthenticationCallback {
	/// Matches URLs by custom scheme only.
	pub fn scheme(scheme: impl Into<String>) -> Self {
		Self::Scheme(scheme.into().to_ascii_lowercase())
	}

	/// Matches HTTPS URLs by host and path.
	pub fn https(host: impl Into<String>, path: impl Into<String>) -> Self {
		let path = path.into();
		let path = if path.starts_with('/') { path } else { format!("/{path}") };

		Self::Https { host: host.into().to_ascii_lowercase(), path }
	}

	/// Returns `true` when `url` is addressed to this callback.
	///
	/// Components are compared after URL normalization, never as raw strings.
	pub fn matches(&self, url: &Url) -> bool {
		match self {
			Self::Scheme(scheme) => url.scheme().eq_ignore_ascii_case(scheme),
			Self::Https { host, path } =>
				url.scheme() == "https"
					&& url.host_str().is_some_and(|h| h.eq_ignore_ascii_case(host))
					&& url.path() == path,
		}
	}
}
