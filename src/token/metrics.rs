// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token refreshes and store reconciliation.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	store_adoptions: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the total number of refresh calls issued.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that produced a new access token.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed refresh calls.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how often a persisted record replaced the in-memory token.
	pub fn store_adoptions(&self) -> u64 {
		self.store_adoptions.load(Ordering::Relaxed)
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

	pub(crate) fn record_store_adoption(&self) {
		self.store_adoptions.fetch_add(1, Ordering::Relaxed);
	}
}
