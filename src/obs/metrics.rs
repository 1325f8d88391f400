// std
use std::sync::atomic::{AtomicU64, Ordering};

// self
use crate::{flows::FlowKind, obs::FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oidc_agent_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Thread-safe per-flow counters kept on each agent instance.
#[derive(Debug, Default)]
pub struct FlowMetrics {
	refresh: FlowCounters,
	password: FlowCounters,
	code: FlowCounters,
	device: FlowCounters,
}
impl FlowMetrics {
	/// Returns the total number of attempts for a flow kind.
	pub fn attempts(&self, kind: FlowKind) -> u64 {
		self.counters(kind).attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of successful runs for a flow kind.
	pub fn successes(&self, kind: FlowKind) -> u64 {
		self.counters(kind).success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed runs for a flow kind.
	pub fn failures(&self, kind: FlowKind) -> u64 {
		self.counters(kind).failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self, kind: FlowKind) {
		self.counters(kind).attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self, kind: FlowKind) {
		self.counters(kind).success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self, kind: FlowKind) {
		self.counters(kind).failure.fetch_add(1, Ordering::Relaxed);
	}

	fn counters(&self, kind: FlowKind) -> &FlowCounters {
		match kind {
			FlowKind::Refresh => &self.refresh,
			FlowKind::Password => &self.password,
			FlowKind::Code => &self.code,
			FlowKind::Device => &self.device,
		}
	}
}

#[derive(Debug, Default)]
struct FlowCounters {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_flow_outcome_noop_without_metrics() {
		record_flow_outcome(FlowKind::Password, FlowOutcome::Failure);
	}

	#[test]
	fn flow_metrics_count_per_kind() {
		let metrics = FlowMetrics::default();

		metrics.record_attempt(FlowKind::Refresh);
		metrics.record_attempt(FlowKind::Refresh);
		metrics.record_success(FlowKind::Refresh);
		metrics.record_failure(FlowKind::Device);

		assert_eq!(metrics.attempts(FlowKind::Refresh), 2);
		assert_eq!(metrics.successes(FlowKind::Refresh), 1);
		assert_eq!(metrics.failures(FlowKind::Refresh), 0);
		assert_eq!(metrics.failures(FlowKind::Device), 1);
		assert_eq!(metrics.attempts(FlowKind::Password), 0);
	}
}
