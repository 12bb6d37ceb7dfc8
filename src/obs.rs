//! Optional observability hooks for authorization, customer-action, capture, and web flows.
//!
//! # Feature Flags
//!
//! - `tracing` wraps every broker operation in a `payment_action_broker.flow` span carrying
//!   `flow` and `stage` fields, and emits a `warn` event with the failure code when an operation
//!   fails. Authorization failures also carry the `invoice_id`.
//! - `metrics` increments `payment_action_broker_flow_total`, labeled by `flow` and `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Invoice authorization loop.
	Authorization,
	/// Resolution of a single customer action.
	CustomerAction,
	/// Native alternative-payment capture polling.
	Capture,
	/// Interactive web authentication session.
	WebAuthentication,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Authorization => "authorization",
			FlowKind::CustomerAction => "customer_action",
			FlowKind::Capture => "capture",
			FlowKind::WebAuthentication => "web_authentication",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Caller cancelled the operation.
	Cancelled,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
			FlowOutcome::Cancelled => "cancelled",
		}
	}
}
impl FlowOutcome {
	/// Classifies a finished operation.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => FlowOutcome::Success,
			Err(e) if e.is_cancelled() => FlowOutcome::Cancelled,
			Err(_) => FlowOutcome::Failure,
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
