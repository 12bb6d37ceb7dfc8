//! Tunables for the broker, the web-authentication coordinator, and the HTTP gateway.

// crates.io
use url::Host;
// self
use crate::{
	_prelude::*, error::ConfigError, resolver::DEFAULT_WEB_FINGERPRINT_TIMEOUT, retry::RetryStrategy,
};

/// Default upper bound for capture confirmation.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(180);
/// Default delay between capture polls.
pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_secs(3);
/// Default spacing between two interactive web sessions.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);
/// Default minimum session age before a platform cancel is issued.
pub const DEFAULT_CANCEL_DELAY: Duration = Duration::from_millis(300);
/// Default retry policy for transient gateway request failures.
pub const DEFAULT_REQUEST_RETRY: RetryStrategy =
	RetryStrategy::exponential(3, Duration::from_millis(100), 3.0);

/// Broker-wide settings.
#[derive(Clone, Debug, PartialEq)]
pub struct BrokerConfig {
	/// Upper bound on resolve-and-resubmit cycles per authorization. `None` trusts the gateway to
	/// terminate the exchange.
	pub max_authorization_iterations: Option<usize>,
	/// Bound on web fingerprint loads.
	pub web_fingerprint_timeout: Duration,
	/// Capture polling bounds.
	pub capture: CaptureConfig,
}
impl BrokerConfig {
	/// Caps the number of customer actions resolved per authorization.
	pub fn with_max_authorization_iterations(mut self, limit: usize) -> Self {
		self.max_authorization_iterations = Some(limit);

		self
	}

	/// Overrides the web fingerprint timeout.
	pub fn with_web_fingerprint_timeout(mut self, timeout: Duration) -> Self {
		self.web_fingerprint_timeout = timeout;

		self
	}

	/// Overrides the capture polling bounds.
	pub fn with_capture(mut self, capture: CaptureConfig) -> Self {
		self.capture = capture;

		self
	}
}
impl Default for BrokerConfig {
	fn default() -> Self {
		Self {
			max_authorization_iterations: None,
			web_fingerprint_timeout: DEFAULT_WEB_FINGERPRINT_TIMEOUT,
			capture: CaptureConfig::default(),
		}
	}
}

/// Capture confirmation bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
	/// Longest the broker waits for a capture, whatever the caller asks for.
	pub maximum_timeout: Duration,
	/// Delay between polls.
	pub interval: Duration,
}
impl CaptureConfig {
	/// Caller's timeout clamped to [`CaptureConfig::maximum_timeout`].
	pub fn effective_timeout(&self, requested: Option<Duration>) -> Duration {
		requested.map_or(self.maximum_timeout, |timeout| timeout.min(self.maximum_timeout))
	}

	/// Fixed-interval strategy with an unbounded retry count.
	pub fn strategy(&self) -> RetryStrategy {
		RetryStrategy::fixed(self.interval)
	}
}
impl Default for CaptureConfig {
	fn default() -> Self {
		Self { maximum_timeout: DEFAULT_CAPTURE_TIMEOUT, interval: DEFAULT_CAPTURE_INTERVAL }
	}
}

/// Timing knobs for [`WebAuthenticationCoordinator`](crate::web::WebAuthenticationCoordinator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WebAuthenticationConfig {
	/// Minimum gap between one session completing and the next one starting.
	pub settle_delay: Duration,
	/// Minimum session age before the platform session is asked to cancel.
	pub cancel_delay: Duration,
}
impl WebAuthenticationConfig {
	/// Overrides the settle delay.
	pub fn with_settle_delay(mut self, delay: Duration) -> Self {
		self.settle_delay = delay;

		self
	}

	/// Overrides the cancel delay.
	pub fn with_cancel_delay(mut self, delay: Duration) -> Self {
		self.cancel_delay = delay;

		self
	}
}
impl Default for WebAuthenticationConfig {
	fn default() -> Self {
		Self { settle_delay: DEFAULT_SETTLE_DELAY, cancel_delay: DEFAULT_CANCEL_DELAY }
	}
}

/// Redacted credential wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);
impl Secret {
	/// Wraps a secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Connection settings for the HTTP gateway.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
	/// API root; every endpoint is resolved beneath it.
	pub base_url: Url,
	/// Project identifier sent as the basic-auth user.
	pub project_id: String,
	/// Optional private key sent as the basic-auth password.
	pub private_key: Option<Secret>,
	/// Optional per-request timeout.
	pub request_timeout: Option<Duration>,
	/// Retry policy for network failures, local timeouts, and 5xx responses.
	pub retry: RetryStrategy,
}
impl GatewayConfig {
	/// Starts a builder for the provided API root and project.
	pub fn builder(base_url: Url, project_id: impl Into<String>) -> GatewayConfigBuilder {
		GatewayConfigBuilder {
			base_url,
			project_id: project_id.into(),
			private_key: None,
			request_timeout: None,
			retry: DEFAULT_REQUEST_RETRY,
		}
	}

	/// Redirect settings for alternative payments served from `checkout_base_url` on behalf of
	/// this project.
	pub fn alternative_payments(
		&self,
		checkout_base_url: Url,
	) -> Result<AlternativePaymentsConfig, ConfigError> {
		AlternativePaymentsConfig::new(checkout_base_url, self.project_id.clone())
	}

	/// Resolves `segments` beneath the API root, percent-encoding each one.
	pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ConfigError> {
		let mut url = self.base_url.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::NotABase { url: self.base_url.to_string() })?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}
}

/// Builder for [`GatewayConfig`].
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	base_url: Url,
	project_id: String,
	private_key: Option<Secret>,
	request_timeout: Option<Duration>,
	retry: RetryStrategy,
}
impl GatewayConfigBuilder {
	/// Sets the private key.
	pub fn private_key(mut self, key: impl Into<String>) -> Self {
		self.private_key = Some(Secret::new(key));

		self
	}

	/// Sets the per-request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Overrides the retry policy. Use a zero retry budget to disable retries.
	pub fn retry(mut self, strategy: RetryStrategy) -> Self {
		self.retry = strategy;

		self
	}

	/// Validates and returns the configuration.
	///
	/// The API root must use HTTPS unless it points at a loopback host.
	pub fn build(self) -> Result<GatewayConfig, ConfigError> {
		if self.project_id.trim().is_empty() {
			return Err(ConfigError::MissingProjectId);
		}
		if self.base_url.cannot_be_a_base() {
			return Err(ConfigError::NotABase { url: self.base_url.to_string() });
		}
		if self.base_url.scheme() != "https" && !is_loopback(&self.base_url) {
			return Err(ConfigError::InsecureEndpoint { url: self.base_url.to_string() });
		}

		Ok(GatewayConfig {
			base_url: self.base_url,
			project_id: self.project_id,
			private_key: self.private_key,
			request_timeout: self.request_timeout,
			retry: self.retry,
		})
	}
}

/// Where alternative-payment redirect pages are served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlternativePaymentsConfig {
	/// Checkout root. Its path is replaced by the redirect path.
	pub base_url: Url,
	/// Project identifier, always the first path segment.
	pub project_id: String,
}
impl AlternativePaymentsConfig {
	/// Validates the checkout root and project.
	///
	/// The root must use HTTPS unless it points at a loopback host.
	pub fn new(base_url: Url, project_id: impl Into<String>) -> Result<Self, ConfigError> {
		let project_id = project_id.into();

		if project_id.trim().is_empty() {
			return Err(ConfigError::MissingProjectId);
		}
		if base_url.cannot_be_a_base() {
			return Err(ConfigError::NotABase { url: base_url.to_string() });
		}
		if base_url.scheme() != "https" && !is_loopback(&base_url) {
			return Err(ConfigError::InsecureEndpoint { url: base_url.to_string() });
		}

		Ok(Self { base_url, project_id })
	}

	/// Builds `{root}/{project}/{segments..}` with every `additional_data` entry appended as an
	/// `additional_data[<key>]` query item.
	pub fn redirect_url(
		&self,
		segments: &[&str],
		additional_data: &BTreeMap<String, String>,
	) -> Result<Url, ConfigError> {
		let mut url = self.base_url.clone();

		url.set_query(None);
		url.set_fragment(None);
		url.path_segments_mut()
			.map_err(|_| ConfigError::NotABase { url: self.base_url.to_string() })?
			.clear()
			.push(&self.project_id)
			.extend(segments);

		if !additional_data.is_empty() {
			let mut query = url.query_pairs_mut();

			for (key, value) in additional_data {
				query.append_pair(&format!("additional_data[{key}]"), value);
			}
		}

		Ok(url)
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Ipv4(ip)) => ip.is_loopback(),
		Some(Host::Ipv6(ip)) => ip.is_loopback(),
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		None => false,
	}
}
