//! Native alternative-payment capture confirmation.

// self
use crate::{
	_prelude::*,
	cancel::CancellationToken,
	flows::PaymentBroker,
	gateway::{InvoicesGateway, NativeAlternativePaymentCaptureRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	retry::RetryPoller,
};

/// Returns `true` for failures worth another capture poll.
///
/// Matching is exact: gateway-side timeouts and internals are terminal.
pub fn is_retriable_capture_failure(code: &FailureCode) -> bool {
	matches!(
		code,
		FailureCode::NetworkUnreachable
			| FailureCode::Timeout(FailureScope::Mobile)
			| FailureCode::Internal(FailureScope::Mobile)
	)
}

impl<G> PaymentBroker<G>
where
	G: ?Sized + InvoicesGateway,
{
	/// Polls the gateway until the payment is captured.
	///
	/// The wait is bounded by the request's timeout, clamped to the configured maximum. Transient
	/// failures are retried at the configured interval; any other failure ends polling at once.
	pub async fn capture_native_alternative_payment(
		&self,
		request: NativeAlternativePaymentCaptureRequest,
		cancel: &CancellationToken,
	) -> Result<()> {
		const KIND: FlowKind = FlowKind::Capture;

		let span = FlowSpan::new(KIND, "capture_native_alternative_payment");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.capture_metrics.record_attempt();

		let capture = self.config.capture;
		let timeout = capture.effective_timeout(request.timeout);
		let gateway = self.gateway.as_ref();
		let request = &request;
		let result = span
			.instrument(async {
				let response = RetryPoller::run(
					move || gateway.capture_native_alternative_payment(request),
					|result| match result {
						Ok(response) => !response.is_captured(),
						Err(e) if is_retriable_capture_failure(&e.code) => {
							obs::record_failure_event(KIND, "capture_poll", e);

							true
						},
						Err(_) => false,
					},
					timeout,
					Error::timeout(format!(
						"Capture of invoice `{}` did not complete within {timeout:?}.",
						request.invoice_id
					)),
					&capture.strategy(),
					cancel,
				)
				.await?;

				if response.is_captured() {
					Ok(())
				} else {
					Err(Error::timeout("Capture polling stopped before the payment was captured."))
				}
			})
			.await;

		if let Err(e) = &result {
			obs::record_failure_event(KIND, "capture_native_alternative_payment", e);
		}

		self.capture_metrics.record_result(&result);
		obs::record_flow_result(KIND, &result);

		result
	}
}
