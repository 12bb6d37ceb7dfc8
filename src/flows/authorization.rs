//! Invoice authorization loop.
//!
//! [`PaymentBroker::authorize_invoice`] submits the request, resolves every customer action the
//! gateway asks for, and resubmits with the resulting source until the gateway stops asking or
//! fails. Each round works on a fresh copy of the request.

// self
use crate::{
	_prelude::*,
	cancel::CancellationToken,
	flows::PaymentBroker,
	gateway::{InvoiceAuthorizationRequest, InvoicesGateway},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	threeds::ThreeDsService,
};

impl<G> PaymentBroker<G>
where
	G: ?Sized + InvoicesGateway,
{
	/// Authorizes an invoice, resolving customer actions through `delegate`.
	///
	/// Calls to the gateway are strictly sequential. The delegate is cleaned up once the loop
	/// finishes, whatever the outcome.
	pub async fn authorize_invoice(
		&self,
		request: InvoiceAuthorizationRequest,
		delegate: &dyn ThreeDsService,
		cancel: &CancellationToken,
	) -> Result<()> {
		const KIND: FlowKind = FlowKind::Authorization;

		let span = FlowSpan::new(KIND, "authorize_invoice");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.authorization_metrics.record_attempt();

		let invoice_id = request.invoice_id.clone();
		let result = span.instrument(self.run_authorization(request, delegate, cancel)).await;

		delegate.clean().await;

		if let Err(e) = &result {
			obs::record_invoice_failure_event(KIND, "authorize_invoice", &invoice_id, e);
		}

		self.authorization_metrics.record_result(&result);
		obs::record_flow_result(KIND, &result);

		result
	}

	async fn run_authorization(
		&self,
		request: InvoiceAuthorizationRequest,
		delegate: &dyn ThreeDsService,
		cancel: &CancellationToken,
	) -> Result<()> {
		let mut request = match (&request.third_party_sdk_version, delegate.version()) {
			(None, Some(version)) => request.with_third_party_sdk_version(version),
			_ => request,
		};
		let mut resolved = 0_usize;

		loop {
			let action =
				cancel.run_until_cancelled(self.gateway.authorize_invoice(&request)).await?;
			let Some(action) = action else {
				return Ok(());
			};

			if self.config.max_authorization_iterations.is_some_and(|limit| resolved >= limit) {
				return Err(Error::generic(format!(
					"Gateway requested more than {resolved} customer actions for invoice `{}`.",
					request.invoice_id
				)));
			}

			let source = self.resolver.resolve(&action, delegate, cancel).await?;

			request = request.with_source(source);
			resolved += 1;
		}
	}
}
