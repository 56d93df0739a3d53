//! Supervisor-visible lifecycle phase and the per-attempt init signal.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

/// Supervisor-visible lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicePhase {
	Stopped,
	Starting,
	Running,
	Stopping,
}

impl ServicePhase {
	fn from_raw(raw: u8) -> Self {
		match raw {
			0 => Self::Stopped,
			1 => Self::Starting,
			2 => Self::Running,
			_ => Self::Stopping,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Stopped => "stopped",
			Self::Starting => "starting",
			Self::Running => "running",
			Self::Stopping => "stopping",
		}
	}
}

/// Legal phase transitions: the start/stop cycle, plus Starting→Stopping for
/// a stop that races a still-initializing start.
fn is_legal(from: ServicePhase, to: ServicePhase) -> bool {
	matches!(
		(from, to),
		(ServicePhase::Stopped, ServicePhase::Starting)
			| (ServicePhase::Starting, ServicePhase::Running)
			| (ServicePhase::Starting, ServicePhase::Stopping)
			| (ServicePhase::Running, ServicePhase::Stopping)
			| (ServicePhase::Stopping, ServicePhase::Stopped)
	)
}

/// Runtime state shared between the supervisor control path and the
/// background initializer. Every mutation is individually idempotent: phase
/// advances use compare-exchange and the init signal fires at most once per
/// armed attempt, so a race between stop and late initialization writes is
/// harmless.
pub struct RuntimeState {
	phase: AtomicU8,
	init_signaled: AtomicBool,
	init_tx: watch::Sender<bool>,
}

impl RuntimeState {
	pub fn new() -> Self {
		let (init_tx, _) = watch::channel(false);
		Self {
			phase: AtomicU8::new(ServicePhase::Stopped as u8),
			init_signaled: AtomicBool::new(false),
			init_tx,
		}
	}

	pub fn phase(&self) -> ServicePhase {
		ServicePhase::from_raw(self.phase.load(Ordering::Acquire))
	}

	/// Advances `from` → `to`. Returns false, harmlessly, when the phase has
	/// already moved on or the transition is not part of the cycle.
	pub fn advance(&self, from: ServicePhase, to: ServicePhase) -> bool {
		if !is_legal(from, to) {
			return false;
		}
		self.phase
			.compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
			.is_ok()
	}

	/// Re-arms the init signal for a new start attempt.
	pub fn arm_init(&self) {
		self.init_signaled.store(false, Ordering::Release);
		self.init_tx.send_replace(false);
	}

	/// Signals init-complete; fires at most once per armed attempt. Returns
	/// whether this call was the one that fired.
	pub fn signal_init(&self) -> bool {
		if self.init_signaled.swap(true, Ordering::AcqRel) {
			return false;
		}
		self.init_tx.send_replace(true);
		true
	}

	/// Bounded wait for the current attempt's init signal; never waits
	/// indefinitely.
	pub async fn wait_for_init(&self, bound: Duration) -> bool {
		let mut rx = self.init_tx.subscribe();
		tokio::time::timeout(bound, rx.wait_for(|done| *done))
			.await
			.map(|result| result.is_ok())
			.unwrap_or(false)
	}
}

impl Default for RuntimeState {
	fn default() -> Self {
		Self::new()
	}
}
