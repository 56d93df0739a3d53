//! Monitor lifecycle: registration against the host notification source.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

/// Opaque handle identifying the registrable target (a window handle in GUI
/// hosts; any host-addressable context otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistrationContext(pub isize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationScope {
	CurrentSession,
	AllSessions,
}

/// Subscription seam over the host session-notification source.
pub trait SessionNotifications: Send + Sync {
	fn register(&self, context: RegistrationContext, scope: NotificationScope) -> bool;
	fn unregister(&self, context: RegistrationContext) -> bool;
}

/// Registration for hosts that deliver session changes straight to the
/// service callback; there is nothing to subscribe against, so registration
/// always succeeds.
#[derive(Debug, Default)]
pub struct DirectNotifications;

impl SessionNotifications for DirectNotifications {
	fn register(&self, _context: RegistrationContext, _scope: NotificationScope) -> bool {
		true
	}

	fn unregister(&self, _context: RegistrationContext) -> bool {
		true
	}
}

/// Owns the monitoring state; mutated only through `start`/`stop`.
pub struct SessionMonitor {
	notifications: Arc<dyn SessionNotifications>,
	registered: AtomicBool,
	running: AtomicBool,
	auto_transfer: AtomicBool,
}

impl SessionMonitor {
	pub fn new(notifications: Arc<dyn SessionNotifications>) -> Self {
		Self {
			notifications,
			registered: AtomicBool::new(false),
			running: AtomicBool::new(false),
			auto_transfer: AtomicBool::new(true),
		}
	}

	/// Registers for session notifications. Returns false as a no-op when
	/// already monitoring, and false when the registration is refused.
	pub fn start(&self, context: RegistrationContext) -> bool {
		if self.registered.load(Ordering::Acquire) {
			warn!(target = "rdpmon.monitor", "session monitor is already running");
			return false;
		}

		info!(target = "rdpmon.monitor", "starting session monitoring");
		if self.notifications.register(context, NotificationScope::AllSessions) {
			self.registered.store(true, Ordering::Release);
			self.running.store(true, Ordering::Release);
			info!(target = "rdpmon.monitor", "session monitoring started");
			true
		} else {
			warn!(target = "rdpmon.monitor", "failed to register for session notifications");
			false
		}
	}

	/// Unregisters from session notifications. Returns false as a no-op when
	/// not monitoring. The registered flag stays set if the source refuses
	/// the unregistration, since the registration is then still live.
	pub fn stop(&self, context: RegistrationContext) -> bool {
		if !self.registered.load(Ordering::Acquire) {
			warn!(target = "rdpmon.monitor", "session monitor is not running");
			return false;
		}

		self.running.store(false, Ordering::Release);
		if self.notifications.unregister(context) {
			self.registered.store(false, Ordering::Release);
			info!(target = "rdpmon.monitor", "session monitoring stopped");
			true
		} else {
			warn!(target = "rdpmon.monitor", "failed to unregister session notifications");
			false
		}
	}

	pub fn is_monitoring(&self) -> bool {
		self.registered.load(Ordering::Acquire)
	}

	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}

	pub fn auto_transfer(&self) -> bool {
		self.auto_transfer.load(Ordering::Acquire)
	}

	pub fn set_auto_transfer(&self, enabled: bool) {
		self.auto_transfer.store(enabled, Ordering::Release);
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;

	use super::*;

	#[derive(Default)]
	struct RecordingNotifications {
		registers: AtomicUsize,
		unregisters: AtomicUsize,
		refuse_register: AtomicBool,
		refuse_unregister: AtomicBool,
	}

	impl SessionNotifications for RecordingNotifications {
		fn register(&self, _context: RegistrationContext, scope: NotificationScope) -> bool {
			assert_eq!(scope, NotificationScope::AllSessions);
			self.registers.fetch_add(1, Ordering::SeqCst);
			!self.refuse_register.load(Ordering::SeqCst)
		}

		fn unregister(&self, _context: RegistrationContext) -> bool {
			self.unregisters.fetch_add(1, Ordering::SeqCst);
			!self.refuse_unregister.load(Ordering::SeqCst)
		}
	}

	fn monitor() -> (Arc<RecordingNotifications>, SessionMonitor) {
		let source = Arc::new(RecordingNotifications::default());
		let monitor = SessionMonitor::new(source.clone());
		(source, monitor)
	}

	#[test]
	fn start_then_stop_toggles_monitoring() {
		let (source, monitor) = monitor();
		let ctx = RegistrationContext::default();

		assert!(!monitor.is_monitoring());
		assert!(monitor.start(ctx));
		assert!(monitor.is_monitoring());
		assert!(monitor.stop(ctx));
		assert!(!monitor.is_monitoring());
		assert_eq!(source.registers.load(Ordering::SeqCst), 1);
		assert_eq!(source.unregisters.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn repeated_start_while_running_is_a_noop() {
		let (source, monitor) = monitor();
		let ctx = RegistrationContext::default();

		assert!(monitor.start(ctx));
		assert!(!monitor.start(ctx));
		assert!(monitor.is_monitoring());
		assert_eq!(source.registers.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn repeated_stop_while_stopped_is_a_noop() {
		let (source, monitor) = monitor();
		let ctx = RegistrationContext::default();

		assert!(!monitor.stop(ctx));
		assert!(monitor.start(ctx));
		assert!(monitor.stop(ctx));
		assert!(!monitor.stop(ctx));
		assert_eq!(source.unregisters.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn refused_registration_leaves_monitor_stopped() {
		let (source, monitor) = monitor();
		source.refuse_register.store(true, Ordering::SeqCst);

		assert!(!monitor.start(RegistrationContext::default()));
		assert!(!monitor.is_monitoring());
		assert!(!monitor.is_running());
	}

	#[test]
	fn refused_unregistration_keeps_the_registration_live() {
		let (source, monitor) = monitor();
		let ctx = RegistrationContext::default();

		assert!(monitor.start(ctx));
		source.refuse_unregister.store(true, Ordering::SeqCst);
		assert!(!monitor.stop(ctx));
		assert!(monitor.is_monitoring());
		assert!(!monitor.is_running());
	}
}
