//! Classifies session-change events and issues console transfers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::monitor::SessionMonitor;
use crate::session::{SessionChangeReason, SessionEvent};
use crate::transfer::SessionTransfer;

/// Fixed wait before acting on a disconnect so the OS can finish the
/// session-state transition.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Decides, per event, whether a console transfer is warranted.
pub struct SessionDispatcher {
	monitor: Arc<SessionMonitor>,
	transfer: Arc<dyn SessionTransfer>,
}

impl SessionDispatcher {
	pub fn new(monitor: Arc<SessionMonitor>, transfer: Arc<dyn SessionTransfer>) -> Self {
		Self { monitor, transfer }
	}

	/// Processes one session-change event. Downstream failures are logged and
	/// swallowed so later events keep flowing.
	pub async fn process_event(&self, event: SessionEvent) {
		debug!(
			target = "rdpmon.dispatch",
			reason = event.reason.name(),
			session_id = event.session_id,
			"session change"
		);

		match event.reason {
			SessionChangeReason::RemoteDisconnect => self.handle_remote_disconnect(event.session_id).await,
			SessionChangeReason::RemoteConnect
			| SessionChangeReason::ConsoleConnect
			| SessionChangeReason::ConsoleDisconnect
			| SessionChangeReason::Logon
			| SessionChangeReason::Logoff => {
				info!(
					target = "rdpmon.dispatch",
					reason = event.reason.name(),
					session_id = event.session_id,
					"session state changed"
				);
			}
			SessionChangeReason::Lock | SessionChangeReason::Unlock => {
				debug!(
					target = "rdpmon.dispatch",
					reason = event.reason.name(),
					session_id = event.session_id,
					"session lock state changed"
				);
			}
			SessionChangeReason::RemoteControl | SessionChangeReason::Unknown => {
				debug!(
					target = "rdpmon.dispatch",
					reason = event.reason.name(),
					session_id = event.session_id,
					"unhandled session event"
				);
			}
		}
	}

	async fn handle_remote_disconnect(&self, session_id: u32) {
		info!(target = "rdpmon.dispatch", session_id, "remote session disconnected");

		if !self.monitor.is_running() {
			debug!(target = "rdpmon.dispatch", session_id, "monitor is not running; ignoring disconnect");
			return;
		}
		if !self.monitor.auto_transfer() {
			info!(target = "rdpmon.dispatch", session_id, "auto-transfer disabled; no action taken");
			return;
		}

		tokio::time::sleep(SETTLE_DELAY).await;

		let outcome = self.transfer.transfer(session_id).await;
		if outcome.success {
			info!(target = "rdpmon.dispatch", session_id, "session transferred to console after disconnect");
		} else {
			error!(
				target = "rdpmon.dispatch",
				session_id,
				message = %outcome.message,
				"session transfer failed"
			);
		}
	}
}
