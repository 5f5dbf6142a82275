//! Single-flight refresh coordination with ordered waiter fan-out.
//!
//! The first caller that observes an expired session becomes the *leader*: it marks the
//! coordinator in flight and performs the one refresh call. Every caller arriving while the
//! leader is in flight registers a one-shot channel and waits. When the leader settles, the
//! in-flight flag is cleared and the waiter list is drained in the same critical section, and each
//! waiter receives a clone of the leader's outcome in registration order.
//!
//! The state lives inside each coordinator instance, so independent clients never share it.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use futures::channel::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Result broadcast to every participant of one refresh.
pub type RefreshOutcome = Result<TokenSecret, RefreshFailure>;

/// Cloneable refresh failure shared by the leader and all waiters.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshFailure {
	/// No refresh token is stored.
	#[error("No refresh token is stored.")]
	NoRefreshToken,
	/// Refresh endpoint rejected the renewal or could not be reached.
	#[error("{reason}")]
	Rejected {
		/// Human-readable failure summary.
		reason: String,
	},
	/// Leader was dropped before it settled.
	#[error("Token refresh was abandoned before it settled.")]
	Abandoned,
}
impl From<RefreshFailure> for Error {
	fn from(failure: RefreshFailure) -> Self {
		match failure {
			RefreshFailure::NoRefreshToken => Error::NoRefreshToken,
			other => Error::RefreshFailed { reason: other.to_string() },
		}
	}
}

/// Registration order of a waiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaiterId(pub u64);

#[derive(Debug, Default)]
struct RefreshState {
	in_flight: bool,
	next_waiter: u64,
	waiters: Vec<(WaiterId, oneshot::Sender<RefreshOutcome>)>,
}

/// Owns the in-flight flag and the ordered waiter queue.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Joins the current refresh or becomes its leader.
	pub fn enter(&self) -> RefreshTicket<'_> {
		let mut state = self.state.lock();

		if state.in_flight {
			let id = WaiterId(state.next_waiter);
			let (tx, rx) = oneshot::channel();

			state.next_waiter += 1;
			state.waiters.push((id, tx));
			self.metrics.record_waiter();

			RefreshTicket::Waiter(RefreshWaiter { id, rx })
		} else {
			state.in_flight = true;

			RefreshTicket::Leader(RefreshLeader { coordinator: self, settled: false })
		}
	}

	/// Returns `true` while a leader holds the refresh.
	pub fn is_in_flight(&self) -> bool {
		self.state.lock().in_flight
	}

	/// Number of callers currently waiting on the leader.
	pub fn waiting(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Shared counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	fn settle(&self, outcome: &RefreshOutcome) -> Vec<WaiterId> {
		let waiters = {
			let mut state = self.state.lock();

			state.in_flight = false;

			std::mem::take(&mut state.waiters)
		};
		let mut served = Vec::with_capacity(waiters.len());

		for (id, tx) in waiters {
			// A waiter whose receiver is gone has been dropped by its caller; nothing to deliver.
			let _ = tx.send(outcome.clone());

			served.push(id);
		}

		served
	}
}

/// Role handed out by [`RefreshCoordinator::enter`].
#[derive(Debug)]
pub enum RefreshTicket<'a> {
	/// Caller must perform the refresh and settle it.
	Leader(RefreshLeader<'a>),
	/// Caller must wait for the leader's outcome.
	Waiter(RefreshWaiter),
}

/// Exclusive right to run the one in-flight refresh.
///
/// Dropping the leader without calling [`settle`](Self::settle) rejects every waiter with
/// [`RefreshFailure::Abandoned`] and clears the in-flight flag.
#[derive(Debug)]
pub struct RefreshLeader<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl RefreshLeader<'_> {
	/// Clears the in-flight flag, fans the outcome out to every waiter, and returns it.
	pub fn settle(self, outcome: RefreshOutcome) -> RefreshOutcome {
		self.settle_with_report(outcome).0
	}

	/// Like [`settle`](Self::settle) but also reports the waiters served, in delivery order.
	pub fn settle_with_report(mut self, outcome: RefreshOutcome) -> (RefreshOutcome, Vec<WaiterId>) {
		self.settled = true;

		let served = self.coordinator.settle(&outcome);

		(outcome, served)
	}
}
impl Drop for RefreshLeader<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.settle(&Err(RefreshFailure::Abandoned));
		}
	}
}

/// Pending registration on an in-flight refresh.
#[derive(Debug)]
pub struct RefreshWaiter {
	id: WaiterId,
	rx: oneshot::Receiver<RefreshOutcome>,
}
impl RefreshWaiter {
	/// Registration order of this waiter.
	pub fn id(&self) -> WaiterId {
		self.id
	}

	/// Waits for the leader's outcome.
	pub async fn wait(self) -> RefreshOutcome {
		self.rx.await.unwrap_or(Err(RefreshFailure::Abandoned))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn leader(ticket: RefreshTicket<'_>) -> RefreshLeader<'_> {
		match ticket {
			RefreshTicket::Leader(leader) => leader,
			RefreshTicket::Waiter(_) => panic!("First entrant should lead the refresh."),
		}
	}

	fn waiter(ticket: RefreshTicket<'_>) -> RefreshWaiter {
		match ticket {
			RefreshTicket::Waiter(waiter) => waiter,
			RefreshTicket::Leader(_) => panic!("Entrants during a refresh should wait."),
		}
	}

	#[test]
	fn only_the_first_entrant_leads() {
		let coordinator = RefreshCoordinator::default();
		let lead = leader(coordinator.enter());
		let waiters: Vec<_> = (0..4).map(|_| waiter(coordinator.enter())).collect();

		assert!(coordinator.is_in_flight());
		assert_eq!(coordinator.waiting(), 4);
		assert_eq!(coordinator.metrics().waiters(), 4);

		let outcome = lead.settle(Ok(TokenSecret::new("fresh")));

		assert_eq!(outcome, Ok(TokenSecret::new("fresh")));
		assert!(!coordinator.is_in_flight());
		assert_eq!(coordinator.waiting(), 0);

		for waiter in waiters {
			let received = futures::executor::block_on(waiter.wait());

			assert_eq!(received, Ok(TokenSecret::new("fresh")));
		}
	}

	#[test]
	fn waiters_are_served_in_registration_order() {
		let coordinator = RefreshCoordinator::default();
		let lead = leader(coordinator.enter());
		let ids: Vec<_> = (0..5).map(|_| waiter(coordinator.enter())).map(|w| w.id()).collect();
		let (_, served) = lead.settle_with_report(Ok(TokenSecret::new("t")));

		assert_eq!(served, ids);
		assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
	}

	#[test]
	fn failure_reaches_every_waiter() {
		let coordinator = RefreshCoordinator::default();
		let lead = leader(coordinator.enter());
		let first = waiter(coordinator.enter());
		let second = waiter(coordinator.enter());
		let failure = RefreshFailure::Rejected { reason: "refresh token revoked".into() };

		lead.settle(Err(failure.clone()));

		assert_eq!(futures::executor::block_on(first.wait()), Err(failure.clone()));
		assert_eq!(futures::executor::block_on(second.wait()), Err(failure));
	}

	#[test]
	fn dropped_leader_releases_waiters() {
		let coordinator = RefreshCoordinator::default();
		let lead = leader(coordinator.enter());
		let pending = waiter(coordinator.enter());

		drop(lead);

		assert!(!coordinator.is_in_flight());
		assert_eq!(futures::executor::block_on(pending.wait()), Err(RefreshFailure::Abandoned));

		// The next entrant starts a new refresh rather than joining a dead one.
		assert!(matches!(coordinator.enter(), RefreshTicket::Leader(_)));
	}

	#[test]
	fn refresh_failures_map_onto_client_errors() {
		assert!(matches!(Error::from(RefreshFailure::NoRefreshToken), Error::NoRefreshToken));
		assert!(matches!(
			Error::from(RefreshFailure::Rejected { reason: "nope".into() }),
			Error::RefreshFailed { reason } if reason == "nope"
		));
	}
}
