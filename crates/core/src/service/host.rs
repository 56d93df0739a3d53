//! Service host: reports started immediately, initializes in the background.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::EnabledFlag;
use crate::dispatch::SessionDispatcher;
use crate::monitor::{RegistrationContext, SessionMonitor, SessionNotifications};
use crate::service::state::{RuntimeState, ServicePhase};
use crate::session::SessionEvent;
use crate::transfer::SessionTransfer;

/// Short yield before real initialization so the start callback returns to
/// the supervisor first.
const INIT_YIELD: Duration = Duration::from_millis(100);

/// Hosts the session monitor behind the supervisor's start/stop callbacks.
///
/// `on_start` flips the phase to Starting and returns without blocking; a
/// spawned task reads the enabled flag, registers the monitor, and advances
/// to Running. The init-complete signal fires exactly once per start attempt,
/// on every path out of initialization.
#[derive(Clone)]
pub struct MonitorService {
	inner: Arc<Inner>,
}

struct Inner {
	state: RuntimeState,
	config: EnabledFlag,
	notifications: Arc<dyn SessionNotifications>,
	transfer: Arc<dyn SessionTransfer>,
	context: RegistrationContext,
	monitor: Mutex<Option<Arc<SessionMonitor>>>,
	dispatcher: Mutex<Option<Arc<SessionDispatcher>>>,
}

impl MonitorService {
	pub fn new(
		config: EnabledFlag,
		notifications: Arc<dyn SessionNotifications>,
		transfer: Arc<dyn SessionTransfer>,
	) -> Self {
		Self {
			inner: Arc::new(Inner {
				state: RuntimeState::new(),
				config,
				notifications,
				transfer,
				context: RegistrationContext::default(),
				monitor: Mutex::new(None),
				dispatcher: Mutex::new(None),
			}),
		}
	}

	/// Supervisor start callback. Returns immediately; initialization runs on
	/// a background task.
	pub fn on_start(&self) {
		if !self.inner.state.advance(ServicePhase::Stopped, ServicePhase::Starting) {
			warn!(
				target = "rdpmon.service",
				phase = self.inner.state.phase().name(),
				"start requested while not stopped; ignoring"
			);
			return;
		}

		info!(target = "rdpmon.service", "service start accepted; initializing in background");
		self.inner.state.arm_init();

		let inner = Arc::clone(&self.inner);
		tokio::spawn(async move {
			inner.initialize().await;
		});
	}

	/// Delivers one session-change notification from the host.
	pub async fn on_session_change(&self, reason_code: u32, session_id: u32) {
		let event = SessionEvent::from_code(reason_code, session_id);
		let dispatcher = self.inner.dispatcher.lock().clone();
		match dispatcher {
			Some(dispatcher) => dispatcher.process_event(event).await,
			None => {
				debug!(
					target = "rdpmon.service",
					reason = event.reason.name(),
					session_id,
					"session change before monitoring is up; dropped"
				);
			}
		}
	}

	/// Supervisor stop callback. Safe to call at any phase, including while
	/// initialization is still in flight.
	pub fn on_stop(&self) {
		let state = &self.inner.state;
		let accepted = state.advance(ServicePhase::Running, ServicePhase::Stopping)
			|| state.advance(ServicePhase::Starting, ServicePhase::Stopping);
		if !accepted {
			debug!(
				target = "rdpmon.service",
				phase = state.phase().name(),
				"stop requested while not running; ignoring"
			);
			return;
		}

		info!(target = "rdpmon.service", "stopping service");
		let monitor = self.inner.monitor.lock().take();
		self.inner.dispatcher.lock().take();

		if let Some(monitor) = monitor {
			if !monitor.stop(self.inner.context) {
				warn!(target = "rdpmon.service", "session notifications may still be registered");
			}
		}

		state.advance(ServicePhase::Stopping, ServicePhase::Stopped);
		info!(target = "rdpmon.service", "service stopped");
	}

	/// Supervisor shutdown callback; same cleanup as a stop.
	pub fn on_shutdown(&self) {
		self.on_stop();
	}

	/// Bounded wait for the current start attempt's initialization.
	pub async fn wait_until_ready(&self, bound: Duration) -> bool {
		self.inner.state.wait_for_init(bound).await
	}

	pub fn phase(&self) -> ServicePhase {
		self.inner.state.phase()
	}

	pub fn is_monitoring(&self) -> bool {
		self.inner
			.monitor
			.lock()
			.as_ref()
			.map(|monitor| monitor.is_monitoring())
			.unwrap_or(false)
	}
}

impl Inner {
	async fn initialize(&self) {
		tokio::time::sleep(INIT_YIELD).await;

		if !self.config.is_enabled() {
			info!(target = "rdpmon.service", "monitoring disabled by configuration; idling");
			self.finish_init();
			return;
		}

		let monitor = Arc::new(SessionMonitor::new(Arc::clone(&self.notifications)));
		if monitor.start(self.context) {
			let dispatcher = Arc::new(SessionDispatcher::new(
				Arc::clone(&monitor),
				Arc::clone(&self.transfer),
			));

			// A stop may have raced initialization. The phase check and the
			// slot install happen under the monitor lock: a racing on_stop
			// advances the phase before taking the slot, so either the
			// install sees the advanced phase here or the stop's take sees
			// the installed monitor.
			let mut slot = self.monitor.lock();
			if matches!(self.state.phase(), ServicePhase::Stopping | ServicePhase::Stopped) {
				drop(slot);
				info!(target = "rdpmon.service", "stop requested during initialization; unwinding");
				monitor.stop(self.context);
			} else {
				*slot = Some(monitor);
				*self.dispatcher.lock() = Some(dispatcher);
				drop(slot);
				info!(target = "rdpmon.service", "session monitoring initialized");
			}
		} else {
			warn!(target = "rdpmon.service", "session monitor failed to start; service stays up without monitoring");
		}

		self.finish_init();
	}

	fn finish_init(&self) {
		self.state.advance(ServicePhase::Starting, ServicePhase::Running);
		if self.state.signal_init() {
			debug!(target = "rdpmon.service", phase = self.state.phase().name(), "initialization complete");
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use async_trait::async_trait;
	use tempfile::TempDir;
	use tokio::time::Instant;

	use super::*;
	use crate::dispatch::SETTLE_DELAY;
	use crate::error::Outcome;
	use crate::monitor::NotificationScope;

	#[derive(Default)]
	struct CountingNotifications {
		registers: AtomicUsize,
		unregisters: AtomicUsize,
	}

	impl SessionNotifications for CountingNotifications {
		fn register(&self, _context: RegistrationContext, _scope: NotificationScope) -> bool {
			self.registers.fetch_add(1, Ordering::SeqCst);
			true
		}

		fn unregister(&self, _context: RegistrationContext) -> bool {
			self.unregisters.fetch_add(1, Ordering::SeqCst);
			true
		}
	}

	#[derive(Default)]
	struct CountingTransfer {
		calls: AtomicUsize,
		last_session: AtomicUsize,
	}

	#[async_trait]
	impl SessionTransfer for CountingTransfer {
		async fn transfer(&self, session_id: u32) -> Outcome {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.last_session.store(session_id as usize, Ordering::SeqCst);
			Outcome::ok("transferred")
		}
	}

	struct Fixture {
		_tmp: TempDir,
		notifications: Arc<CountingNotifications>,
		transfer: Arc<CountingTransfer>,
		service: MonitorService,
	}

	fn fixture(enabled: bool) -> Fixture {
		let tmp = TempDir::new().expect("temp dir should be created");
		let config = EnabledFlag::new(tmp.path().join("config.json"));
		config.set_enabled(enabled).expect("flag should be written");

		let notifications = Arc::new(CountingNotifications::default());
		let transfer = Arc::new(CountingTransfer::default());
		let service = MonitorService::new(
			config,
			notifications.clone() as Arc<dyn SessionNotifications>,
			transfer.clone() as Arc<dyn SessionTransfer>,
		);
		Fixture {
			_tmp: tmp,
			notifications,
			transfer,
			service,
		}
	}

	#[tokio::test(start_paused = true)]
	async fn start_returns_before_initialization_completes() {
		let fx = fixture(true);

		fx.service.on_start();
		assert_eq!(fx.service.phase(), ServicePhase::Starting);

		assert!(fx.service.wait_until_ready(Duration::from_secs(2)).await);
		assert_eq!(fx.service.phase(), ServicePhase::Running);
		assert!(fx.service.is_monitoring());
	}

	#[tokio::test(start_paused = true)]
	async fn disabled_flag_runs_without_monitoring() {
		let fx = fixture(false);

		fx.service.on_start();
		assert!(fx.service.wait_until_ready(Duration::from_secs(2)).await);
		assert_eq!(fx.service.phase(), ServicePhase::Running);
		assert!(!fx.service.is_monitoring());
		assert_eq!(fx.notifications.registers.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn repeated_start_is_ignored() {
		let fx = fixture(true);

		fx.service.on_start();
		assert!(fx.service.wait_until_ready(Duration::from_secs(2)).await);

		fx.service.on_start();
		assert_eq!(fx.service.phase(), ServicePhase::Running);
		assert_eq!(fx.notifications.registers.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn stop_during_initialization_unwinds_the_registration() {
		let fx = fixture(true);

		fx.service.on_start();
		fx.service.on_stop();

		// Let the background initializer run to completion.
		tokio::time::sleep(Duration::from_millis(300)).await;

		assert_eq!(
			fx.notifications.registers.load(Ordering::SeqCst),
			fx.notifications.unregisters.load(Ordering::SeqCst)
		);
		assert_eq!(fx.service.phase(), ServicePhase::Stopped);
		assert!(!fx.service.is_monitoring());
		assert!(fx.service.wait_until_ready(Duration::from_secs(1)).await);
	}

	#[tokio::test(start_paused = true)]
	async fn stop_tears_down_monitoring() {
		let fx = fixture(true);

		fx.service.on_start();
		assert!(fx.service.wait_until_ready(Duration::from_secs(2)).await);
		assert!(fx.service.is_monitoring());

		fx.service.on_stop();
		assert_eq!(fx.service.phase(), ServicePhase::Stopped);
		assert!(!fx.service.is_monitoring());
		assert_eq!(fx.notifications.unregisters.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn remote_disconnect_triggers_one_transfer_after_the_settle_delay() {
		let fx = fixture(true);

		fx.service.on_start();
		assert!(fx.service.wait_until_ready(Duration::from_secs(2)).await);

		let before = Instant::now();
		fx.service.on_session_change(0x4, 3).await;
		assert!(before.elapsed() >= SETTLE_DELAY);
		assert_eq!(fx.transfer.calls.load(Ordering::SeqCst), 1);
		assert_eq!(fx.transfer.last_session.load(Ordering::SeqCst), 3);

		fx.service.on_session_change(0x3, 3).await;
		assert_eq!(fx.transfer.calls.load(Ordering::SeqCst), 1);
	}

	/// Issues a stop from inside the registration call, landing it between
	/// the registration succeeding and the initializer publishing the
	/// monitor.
	#[derive(Default)]
	struct StopDuringRegister {
		service: Mutex<Option<MonitorService>>,
		registers: AtomicUsize,
		unregisters: AtomicUsize,
	}

	impl SessionNotifications for StopDuringRegister {
		fn register(&self, _context: RegistrationContext, _scope: NotificationScope) -> bool {
			self.registers.fetch_add(1, Ordering::SeqCst);
			if let Some(service) = self.service.lock().clone() {
				service.on_stop();
			}
			true
		}

		fn unregister(&self, _context: RegistrationContext) -> bool {
			self.unregisters.fetch_add(1, Ordering::SeqCst);
			true
		}
	}

	#[tokio::test(start_paused = true)]
	async fn stop_landing_mid_registration_never_leaks_the_registration() {
		let tmp = TempDir::new().expect("temp dir should be created");
		let config = EnabledFlag::new(tmp.path().join("config.json"));
		config.set_enabled(true).expect("flag should be written");

		let notifications = Arc::new(StopDuringRegister::default());
		let transfer = Arc::new(CountingTransfer::default());
		let service = MonitorService::new(
			config,
			notifications.clone() as Arc<dyn SessionNotifications>,
			transfer as Arc<dyn SessionTransfer>,
		);
		*notifications.service.lock() = Some(service.clone());

		service.on_start();
		assert!(service.wait_until_ready(Duration::from_secs(2)).await);

		assert_eq!(service.phase(), ServicePhase::Stopped);
		assert!(!service.is_monitoring());
		assert_eq!(
			notifications.registers.load(Ordering::SeqCst),
			notifications.unregisters.load(Ordering::SeqCst)
		);
	}

	#[tokio::test(start_paused = true)]
	async fn events_before_start_are_dropped() {
		let fx = fixture(true);

		fx.service.on_session_change(0x4, 3).await;
		assert_eq!(fx.transfer.calls.load(Ordering::SeqCst), 0);
	}
}
