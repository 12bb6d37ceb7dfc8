//! Broker facade driving invoice authorization and native alternative-payment capture.

pub mod authorization;
pub mod capture;

mod metrics;

pub use metrics::FlowMetrics;

// self
use crate::{
	_prelude::*, config::BrokerConfig, gateway::InvoicesGateway, resolver::CustomerActionResolver,
};
#[cfg(feature = "reqwest")] use crate::http::HttpInvoicesGateway;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's reqwest-backed gateway.
pub type ReqwestBroker = PaymentBroker<HttpInvoicesGateway>;

/// Coordinates authorization and capture against a single gateway.
///
/// The broker owns the gateway handle, the customer-action resolver, and the counters shared by
/// every clone, so the flow implementations only deal with sequencing.
pub struct PaymentBroker<G>
where
	G: ?Sized + InvoicesGateway,
{
	/// Gateway used for every outbound invoice call.
	pub gateway: Arc<G>,
	/// Broker settings.
	pub config: BrokerConfig,
	/// Resolver that turns customer actions into source tokens.
	pub resolver: CustomerActionResolver,
	/// Counters for authorization loops.
	pub authorization_metrics: Arc<FlowMetrics>,
	/// Counters for capture confirmations.
	pub capture_metrics: Arc<FlowMetrics>,
}
impl<G> PaymentBroker<G>
where
	G: ?Sized + InvoicesGateway,
{
	/// Creates a broker with default settings.
	pub fn new(gateway: impl Into<Arc<G>>) -> Self {
		let config = BrokerConfig::default();

		Self {
			gateway: gateway.into(),
			resolver: CustomerActionResolver::new()
				.with_fingerprint_timeout(config.web_fingerprint_timeout),
			config,
			authorization_metrics: Default::default(),
			capture_metrics: Default::default(),
		}
	}

	/// Replaces the broker settings.
	pub fn with_config(mut self, config: BrokerConfig) -> Self {
		self.resolver = self.resolver.with_fingerprint_timeout(config.web_fingerprint_timeout);
		self.config = config;

		self
	}
}
impl<G> Clone for PaymentBroker<G>
where
	G: ?Sized + InvoicesGateway,
{
	fn clone(&self) -> Self {
		Self {
			gateway: self.gateway.clone(),
			config: self.config.clone(),
			resolver: self.resolver.clone(),
			authorization_metrics: self.authorization_metrics.clone(),
			capture_metrics: self.capture_metrics.clone(),
		}
	}
}
impl<G> Debug for PaymentBroker<G>
where
	G: ?Sized + InvoicesGateway,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PaymentBroker")
			.field("config", &self.config)
			.field("resolver", &self.resolver)
			.finish()
	}
}
