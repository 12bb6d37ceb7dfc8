// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for one kind of broker operation.
#[derive(Debug, Default)]
pub struct FlowMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	cancelled: AtomicU64,
}
impl FlowMetrics {
	/// Returns the number of started operations.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of operations that succeeded.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of operations that failed, cancellations included.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of operations the caller cancelled.
	pub fn cancellations(&self) -> u64 {
		self.cancelled.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_result<T>(&self, result: &crate::error::Result<T>) {
		match result {
			Ok(_) => self.record_success(),
			Err(e) => {
				self.record_failure();

				if e.is_cancelled() {
					self.cancelled.fetch_add(1, Ordering::Relaxed);
				}
			},
		}
	}
}
