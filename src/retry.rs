//! Bounded retry-with-timeout executor used for polling.

// self
use crate::{_prelude::*, cancel::CancellationToken};

/// Delay curve applied between attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IntervalFunction {
	/// Same delay before every retry.
	Linear {
		/// Delay between attempts.
		interval: Duration,
	},
	/// Delay multiplied by `rate` after every retry.
	Exponential {
		/// Delay before the first retry.
		interval: Duration,
		/// Growth factor.
		rate: f64,
	},
}

/// Retry policy: how long to wait between attempts and how many retries are allowed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryStrategy {
	/// Delay curve.
	pub function: IntervalFunction,
	/// Retries allowed after the first attempt.
	pub maximum_retries: usize,
	/// Lower bound applied to every computed delay.
	pub minimum_interval: Duration,
	/// Optional upper bound applied to every computed delay.
	pub maximum_interval: Option<Duration>,
}
impl RetryStrategy {
	/// Fixed delay with an unbounded retry count.
	pub const fn fixed(interval: Duration) -> Self {
		Self {
			function: IntervalFunction::Linear { interval },
			maximum_retries: usize::MAX,
			minimum_interval: Duration::ZERO,
			maximum_interval: None,
		}
	}

	/// Exponential backoff with the provided retry budget.
	pub const fn exponential(maximum_retries: usize, interval: Duration, rate: f64) -> Self {
		Self {
			function: IntervalFunction::Exponential { interval, rate },
			maximum_retries,
			minimum_interval: Duration::ZERO,
			maximum_interval: None,
		}
	}

	/// Caps the number of retries.
	pub fn with_maximum_retries(mut self, maximum_retries: usize) -> Self {
		self.maximum_retries = maximum_retries;

		self
	}

	/// Sets the lower bound for computed delays.
	pub fn with_minimum_interval(mut self, interval: Duration) -> Self {
		self.minimum_interval = interval;

		self
	}

	/// Sets the upper bound for computed delays.
	pub fn with_maximum_interval(mut self, interval: Duration) -> Self {
		self.maximum_interval = Some(interval);

		self
	}

	/// Delay to wait before retry number `attempt` (zero-based).
	pub fn interval(&self, attempt: usize) -> Duration {
		let raw = match self.function {
			IntervalFunction::Linear { interval } => interval,
			IntervalFunction::Exponential { interval, rate } => {
				let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);

				Duration::try_from_secs_f64(interval.as_secs_f64() * rate.powi(exponent))
					.unwrap_or(Duration::MAX)
			},
		};
		let raw = raw.max(self.minimum_interval);

		match self.maximum_interval {
			Some(maximum) => raw.min(maximum),
			None => raw,
		}
	}
}

/// Runs an operation repeatedly until a predicate is satisfied, a timeout elapses, or the caller
/// cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct RetryPoller;
impl RetryPoller {
	/// Polls `operation` under `strategy`.
	///
	/// The operation runs once immediately. While `should_continue` approves the latest result and
	/// retries remain, the poller waits the strategy's interval and tries again. The latest result
	/// is returned once polling stops. If `timeout` elapses first the call fails with
	/// `timeout_error`; cancellation fails with a cancellation error instead.
	pub async fn run<T, Op, Fut, P>(
		mut operation: Op,
		mut should_continue: P,
		timeout: Duration,
		timeout_error: Error,
		strategy: &RetryStrategy,
		cancel: &CancellationToken,
	) -> Result<T>
	where
		Op: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
		P: FnMut(&Result<T>) -> bool,
	{
		let polling = async move {
			let mut attempt = 0;

			loop {
				let result = operation().await;

				if !should_continue(&result) || attempt >= strategy.maximum_retries {
					return result;
				}

				tokio::time::sleep(strategy.interval(attempt)).await;

				attempt += 1;
			}
		};

		cancel
			.run_until_cancelled(async move {
				match tokio::time::timeout(timeout, polling).await {
					Ok(result) => result,
					Err(_) => Err(timeout_error),
				}
			})
			.await
	}
}
