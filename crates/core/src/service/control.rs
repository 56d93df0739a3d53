//! Service install/uninstall/start/stop orchestration over a control backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EnabledFlag;
use crate::error::{MonitorError, Outcome, Result};

pub const SERVICE_NAME: &str = "rdpmon";
pub const SERVICE_DISPLAY_NAME: &str = "RDP Session Monitor";
pub const SERVICE_DESCRIPTION: &str =
	"Monitors remote desktop sessions and transfers disconnected sessions back to the local console.";

/// Status-poll cadence for start/stop convergence.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Ceiling on waiting for a started service to reach Running.
pub const START_TIMEOUT: Duration = Duration::from_secs(60);
/// Ceiling on waiting for a stopped service to reach Stopped.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(30);
/// Wait for an in-flight transition in the same direction as the request.
const SAME_DIRECTION_WAIT: Duration = Duration::from_secs(30);
/// Wait for an in-flight transition in the opposite direction; proceed anyway
/// once it elapses.
const OPPOSITE_DIRECTION_WAIT: Duration = Duration::from_secs(10);
/// Settle after create/delete so the control manager catches up.
const REMOVAL_SETTLE: Duration = Duration::from_secs(2);
/// Settle between the stop and start halves of a restart.
const RESTART_SETTLE: Duration = Duration::from_secs(1);
/// Failure-count reset window for recovery actions, in seconds.
const FAILURE_RESET_SECS: u32 = 86_400;
const RECOVERY_RESTART_DELAY_MS: u32 = 60_000;

/// One automatic recovery step configured on the installed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryAction {
	pub delay_ms: u32,
}

fn recovery_actions() -> [RecoveryAction; 3] {
	[RecoveryAction {
		delay_ms: RECOVERY_RESTART_DELAY_MS,
	}; 3]
}

/// Service state as reported by the control manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
	NotInstalled,
	Stopped,
	StartPending,
	Running,
	StopPending,
	Paused,
}

impl ServiceStatus {
	pub fn name(&self) -> &'static str {
		match self {
			Self::NotInstalled => "not installed",
			Self::Stopped => "stopped",
			Self::StartPending => "start pending",
			Self::Running => "running",
			Self::StopPending => "stop pending",
			Self::Paused => "paused",
		}
	}
}

/// Registration parameters for the installed service.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
	pub name: String,
	pub display_name: String,
	pub description: String,
	pub executable: PathBuf,
}

/// Seam over the OS service control manager. Production uses the `sc` tool;
/// tests script statuses and record issued commands.
#[async_trait]
pub trait ServiceControlBackend: Send + Sync {
	fn is_elevated(&self) -> bool;
	async fn create(&self, definition: &ServiceDefinition) -> Result<()>;
	async fn delete(&self, name: &str) -> Result<()>;
	async fn set_description(&self, name: &str, description: &str) -> Result<()>;
	async fn set_failure_actions(&self, name: &str, reset_secs: u32, actions: &[RecoveryAction]) -> Result<()>;
	async fn query_status(&self, name: &str) -> Result<ServiceStatus>;
	async fn start(&self, name: &str) -> Result<()>;
	async fn stop(&self, name: &str) -> Result<()>;
}

/// Point-in-time view of the installed service.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
	pub installed: bool,
	pub status: ServiceStatus,
	pub display_name: String,
}

/// Orchestrates service registration and state changes. Every public
/// operation returns an [`Outcome`]; already-in-state requests succeed
/// without issuing commands.
pub struct ServiceInstaller {
	backend: Arc<dyn ServiceControlBackend>,
	config: EnabledFlag,
}

impl ServiceInstaller {
	pub fn new(backend: Arc<dyn ServiceControlBackend>, config: EnabledFlag) -> Self {
		Self { backend, config }
	}

	pub async fn install(&self, executable: Option<&Path>) -> Outcome {
		self.install_inner(executable)
			.await
			.unwrap_or_else(Outcome::from)
	}

	pub async fn uninstall(&self) -> Outcome {
		self.uninstall_inner().await.unwrap_or_else(Outcome::from)
	}

	pub async fn start(&self) -> Outcome {
		self.start_inner().await.unwrap_or_else(Outcome::from)
	}

	pub async fn stop(&self) -> Outcome {
		self.stop_inner().await.unwrap_or_else(Outcome::from)
	}

	pub async fn restart(&self) -> Outcome {
		self.restart_inner().await.unwrap_or_else(Outcome::from)
	}

	/// Persists the enabled flag; takes effect on the next service start.
	pub fn enable(&self) -> Outcome {
		match self.config.set_enabled(true) {
			Ok(()) => Outcome::ok("monitoring enabled; takes effect on next service start"),
			Err(err) => Outcome::from(err),
		}
	}

	pub fn disable(&self) -> Outcome {
		match self.config.set_enabled(false) {
			Ok(()) => Outcome::ok("monitoring disabled; takes effect on next service start"),
			Err(err) => Outcome::from(err),
		}
	}

	pub async fn status(&self) -> StatusReport {
		let status = self
			.backend
			.query_status(SERVICE_NAME)
			.await
			.unwrap_or(ServiceStatus::NotInstalled);
		StatusReport {
			installed: status != ServiceStatus::NotInstalled,
			status,
			display_name: SERVICE_DISPLAY_NAME.to_string(),
		}
	}

	fn require_elevation(&self) -> Result<()> {
		if self.backend.is_elevated() {
			Ok(())
		} else {
			Err(MonitorError::PermissionDenied(
				"service management requires administrative privileges".into(),
			))
		}
	}

	async fn install_inner(&self, executable: Option<&Path>) -> Result<Outcome> {
		self.require_elevation()?;

		let executable = resolve_executable(executable)?;
		info!(
			target = "rdpmon.control",
			executable = %executable.display(),
			"installing service"
		);

		// Reinstall over an existing registration so the binary path and
		// recovery settings are always current. Marked-for-deletion still
		// counts as a successful removal here; creation proceeds after the
		// settle.
		if self.backend.query_status(SERVICE_NAME).await? != ServiceStatus::NotInstalled {
			info!(target = "rdpmon.control", "existing registration found; removing first");
			self.remove_registration().await?;
			tokio::time::sleep(REMOVAL_SETTLE).await;
		}

		let definition = ServiceDefinition {
			name: SERVICE_NAME.to_string(),
			display_name: SERVICE_DISPLAY_NAME.to_string(),
			description: SERVICE_DESCRIPTION.to_string(),
			executable,
		};
		self.backend.create(&definition).await?;

		// Description and recovery settings are cosmetic relative to the
		// registration itself; log and continue on failure.
		if let Err(err) = self.backend.set_description(SERVICE_NAME, SERVICE_DESCRIPTION).await {
			warn!(target = "rdpmon.control", error = %err, "failed to set service description");
		}
		if let Err(err) = self
			.backend
			.set_failure_actions(SERVICE_NAME, FAILURE_RESET_SECS, &recovery_actions())
			.await
		{
			warn!(target = "rdpmon.control", error = %err, "failed to set recovery actions");
		}

		self.config.set_enabled(true)?;
		tokio::time::sleep(REMOVAL_SETTLE).await;

		Ok(Outcome::ok("service installed"))
	}

	async fn uninstall_inner(&self) -> Result<Outcome> {
		self.require_elevation()?;

		if self.backend.query_status(SERVICE_NAME).await? == ServiceStatus::NotInstalled {
			return Ok(Outcome::already("service is not installed"));
		}

		info!(target = "rdpmon.control", "uninstalling service");
		let removed = self.remove_registration().await?;
		tokio::time::sleep(REMOVAL_SETTLE).await;

		if removed {
			Ok(Outcome::ok("service uninstalled"))
		} else {
			Ok(Outcome::ok("service marked for deletion"))
		}
	}

	/// Stops (best effort) and deletes the registration. Returns false when
	/// deletion reports the marked-for-deletion state, which still counts as
	/// a successful removal request.
	async fn remove_registration(&self) -> Result<bool> {
		if matches!(
			self.backend.query_status(SERVICE_NAME).await?,
			ServiceStatus::Running | ServiceStatus::StartPending | ServiceStatus::StopPending
		) {
			if let Err(err) = self.backend.stop(SERVICE_NAME).await {
				warn!(target = "rdpmon.control", error = %err, "failed to stop service before removal");
			} else {
				self.wait_for_status(ServiceStatus::Stopped, STOP_TIMEOUT).await;
			}
		}

		match self.backend.delete(SERVICE_NAME).await {
			Ok(()) => Ok(true),
			Err(MonitorError::ExternalTool(message)) if message.contains("marked for deletion") => {
				info!(target = "rdpmon.control", "service marked for deletion; removal completes on its own");
				Ok(false)
			}
			Err(err) => Err(err),
		}
	}

	async fn start_inner(&self) -> Result<Outcome> {
		self.require_elevation()?;

		match self.backend.query_status(SERVICE_NAME).await? {
			ServiceStatus::NotInstalled => {
				return Err(MonitorError::NotFound("service is not installed".into()));
			}
			ServiceStatus::Running => return Ok(Outcome::already("service is already running")),
			ServiceStatus::StartPending => {
				info!(target = "rdpmon.control", "start already in progress; waiting");
				if self.wait_for_status(ServiceStatus::Running, SAME_DIRECTION_WAIT).await {
					return Ok(Outcome::ok("service started"));
				}
			}
			ServiceStatus::StopPending => {
				info!(target = "rdpmon.control", "stop in progress; waiting before starting");
				self.wait_for_status(ServiceStatus::Stopped, OPPOSITE_DIRECTION_WAIT).await;
			}
			ServiceStatus::Stopped | ServiceStatus::Paused => {}
		}

		info!(target = "rdpmon.control", "starting service");
		self.backend.start(SERVICE_NAME).await?;

		let deadline = tokio::time::Instant::now() + START_TIMEOUT;
		loop {
			match self.backend.query_status(SERVICE_NAME).await? {
				ServiceStatus::Running => return Ok(Outcome::ok("service started")),
				ServiceStatus::Stopped => {
					return Err(MonitorError::ExternalTool(
						"service stopped unexpectedly during startup".into(),
					));
				}
				status => {
					debug!(target = "rdpmon.control", status = status.name(), "waiting for service to start");
				}
			}
			if tokio::time::Instant::now() >= deadline {
				return Err(MonitorError::Timeout(format!(
					"service did not reach running within {}s",
					START_TIMEOUT.as_secs()
				)));
			}
			tokio::time::sleep(POLL_INTERVAL).await;
		}
	}

	async fn stop_inner(&self) -> Result<Outcome> {
		self.require_elevation()?;

		match self.backend.query_status(SERVICE_NAME).await? {
			ServiceStatus::NotInstalled => {
				return Err(MonitorError::NotFound("service is not installed".into()));
			}
			ServiceStatus::Stopped => return Ok(Outcome::already("service is already stopped")),
			ServiceStatus::StopPending => {
				info!(target = "rdpmon.control", "stop already in progress; waiting");
				if self.wait_for_status(ServiceStatus::Stopped, SAME_DIRECTION_WAIT).await {
					return Ok(Outcome::ok("service stopped"));
				}
			}
			ServiceStatus::StartPending => {
				info!(target = "rdpmon.control", "start in progress; waiting before stopping");
				self.wait_for_status(ServiceStatus::Running, OPPOSITE_DIRECTION_WAIT).await;
			}
			ServiceStatus::Running | ServiceStatus::Paused => {}
		}

		info!(target = "rdpmon.control", "stopping service");
		self.backend.stop(SERVICE_NAME).await?;

		let deadline = tokio::time::Instant::now() + STOP_TIMEOUT;
		loop {
			match self.backend.query_status(SERVICE_NAME).await? {
				ServiceStatus::Stopped => return Ok(Outcome::ok("service stopped")),
				status => {
					debug!(target = "rdpmon.control", status = status.name(), "waiting for service to stop");
				}
			}
			if tokio::time::Instant::now() >= deadline {
				return Err(MonitorError::Timeout(format!(
					"service did not reach stopped within {}s",
					STOP_TIMEOUT.as_secs()
				)));
			}
			tokio::time::sleep(POLL_INTERVAL).await;
		}
	}

	async fn restart_inner(&self) -> Result<Outcome> {
		let stopped = self.stop_inner().await?;
		debug!(target = "rdpmon.control", outcome = stopped.kind.name(), "restart: stop half done");
		tokio::time::sleep(RESTART_SETTLE).await;
		self.start_inner().await?;
		Ok(Outcome::ok("service restarted"))
	}

	/// Polls until the service reports `target` or `bound` elapses.
	async fn wait_for_status(&self, target: ServiceStatus, bound: Duration) -> bool {
		let deadline = tokio::time::Instant::now() + bound;
		loop {
			match self.backend.query_status(SERVICE_NAME).await {
				Ok(status) if status == target => return true,
				Ok(_) => {}
				Err(err) => {
					warn!(target = "rdpmon.control", error = %err, "status query failed while waiting");
					return false;
				}
			}
			if tokio::time::Instant::now() >= deadline {
				return false;
			}
			tokio::time::sleep(POLL_INTERVAL).await;
		}
	}
}

fn resolve_executable(explicit: Option<&Path>) -> Result<PathBuf> {
	let path = match explicit {
		Some(path) => path.to_path_buf(),
		None => {
			let current = std::env::current_exe()?;
			current.with_file_name(format!("rdpmon{}", std::env::consts::EXE_SUFFIX))
		}
	};
	if path.is_file() {
		Ok(path)
	} else {
		Err(MonitorError::NotFound(format!(
			"service executable not found at {}",
			path.display()
		)))
	}
}
