// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
///
/// Refresh waiters and reused tokens get their own `outcome` labels so dashboards can tell a
/// single-flight renewal apart from one network call per expired request.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"session_request_flow_total",
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

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_outcomes_carry_distinct_labels() {
		let labels = [
			FlowOutcome::Attempt,
			FlowOutcome::Success,
			FlowOutcome::Failure,
			FlowOutcome::Joined,
			FlowOutcome::Reused,
		]
		.map(FlowOutcome::as_str);

		assert_eq!(labels, ["attempt", "success", "failure", "joined", "reused"]);

		for outcome in [FlowOutcome::Joined, FlowOutcome::Reused] {
			record_flow_outcome(FlowKind::Refresh, outcome);
		}
	}
}
