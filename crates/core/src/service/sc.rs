//! Control backend shelling out to the `sc` service-control tool.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::service::control::{RecoveryAction, ServiceControlBackend, ServiceDefinition, ServiceStatus};

#[cfg(windows)]
const SC_TOOL: &str = "sc.exe";
#[cfg(not(windows))]
const SC_TOOL: &str = "sc";

// Well-known tool exit codes.
const EXIT_ACCESS_DENIED: i32 = 5;
const EXIT_SERVICE_DOES_NOT_EXIST: i32 = 1060;
const EXIT_MARKED_FOR_DELETION: i32 = 1072;

/// Production backend driving the OS service control manager through the
/// `sc` command line tool.
#[derive(Debug, Default)]
pub struct ScBackend;

impl ScBackend {
	async fn run(&self, args: &[&str]) -> Result<String> {
		debug!(target = "rdpmon.control", tool = SC_TOOL, ?args, "running control tool");

		let output = Command::new(SC_TOOL).args(args).output().await.map_err(|err| {
			if err.kind() == std::io::ErrorKind::NotFound {
				MonitorError::NotFound(format!("{SC_TOOL} not found on PATH"))
			} else {
				MonitorError::Io(err)
			}
		})?;

		let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
		if output.status.success() {
			return Ok(stdout);
		}

		let code = output.status.code();
		let stderr = String::from_utf8_lossy(&output.stderr);
		let detail = if stderr.trim().is_empty() {
			stdout.trim().to_string()
		} else {
			stderr.trim().to_string()
		};
		Err(match code {
			Some(EXIT_ACCESS_DENIED) => MonitorError::PermissionDenied(detail),
			Some(EXIT_SERVICE_DOES_NOT_EXIST) => MonitorError::NotFound(detail),
			Some(EXIT_MARKED_FOR_DELETION) => {
				MonitorError::ExternalTool(format!("service is marked for deletion: {detail}"))
			}
			Some(code) => MonitorError::ExternalTool(format!("{SC_TOOL} exited with {code}: {detail}")),
			None => MonitorError::ExternalTool(format!("{SC_TOOL} terminated by signal: {detail}")),
		})
	}
}

#[async_trait]
impl ServiceControlBackend for ScBackend {
	fn is_elevated(&self) -> bool {
		is_elevated()
	}

	async fn create(&self, definition: &ServiceDefinition) -> Result<()> {
		let bin_path = definition.executable.display().to_string();
		self.run(&[
			"create",
			&definition.name,
			"binPath=",
			&bin_path,
			"start=",
			"auto",
			"DisplayName=",
			&definition.display_name,
		])
		.await?;
		Ok(())
	}

	async fn delete(&self, name: &str) -> Result<()> {
		self.run(&["delete", name]).await?;
		Ok(())
	}

	async fn set_description(&self, name: &str, description: &str) -> Result<()> {
		self.run(&["description", name, description]).await?;
		Ok(())
	}

	async fn set_failure_actions(&self, name: &str, reset_secs: u32, actions: &[RecoveryAction]) -> Result<()> {
		let reset = reset_secs.to_string();
		let actions = format_failure_actions(actions);
		self.run(&[
			"failure",
			name,
			"reset=",
			&reset,
			"actions=",
			&actions,
		])
		.await?;
		Ok(())
	}

	async fn query_status(&self, name: &str) -> Result<ServiceStatus> {
		match self.run(&["query", name]).await {
			Ok(output) => Ok(parse_query_state(&output).unwrap_or(ServiceStatus::NotInstalled)),
			Err(MonitorError::NotFound(_)) => Ok(ServiceStatus::NotInstalled),
			Err(err) => Err(err),
		}
	}

	async fn start(&self, name: &str) -> Result<()> {
		self.run(&["start", name]).await?;
		Ok(())
	}

	async fn stop(&self, name: &str) -> Result<()> {
		self.run(&["stop", name]).await?;
		Ok(())
	}
}

/// Formats the recovery actions the way the tool expects:
/// `restart/60000/restart/60000/restart/60000`.
fn format_failure_actions(actions: &[RecoveryAction]) -> String {
	actions
		.iter()
		.map(|action| format!("restart/{}", action.delay_ms))
		.collect::<Vec<_>>()
		.join("/")
}

/// Extracts the service state from `sc query` output. The relevant line
/// looks like `STATE : 4 RUNNING`.
fn parse_query_state(output: &str) -> Option<ServiceStatus> {
	let line = output
		.lines()
		.map(str::trim)
		.find(|line| line.starts_with("STATE"))?;
	let code = line.split(':').nth(1)?.trim().split_whitespace().next()?;
	match code {
		"1" => Some(ServiceStatus::Stopped),
		"2" => Some(ServiceStatus::StartPending),
		"3" => Some(ServiceStatus::StopPending),
		"4" => Some(ServiceStatus::Running),
		"7" => Some(ServiceStatus::Paused),
		_ => None,
	}
}

#[cfg(windows)]
fn is_elevated() -> bool {
	// `net session` succeeds only from an elevated shell.
	std::process::Command::new("net")
		.arg("session")
		.output()
		.map(|output| output.status.success())
		.unwrap_or(false)
}

#[cfg(unix)]
fn is_elevated() -> bool {
	std::process::Command::new("id")
		.arg("-u")
		.output()
		.map(|output| String::from_utf8_lossy(&output.stdout).trim() == "0")
		.unwrap_or(false)
}

#[cfg(not(any(windows, unix)))]
fn is_elevated() -> bool {
	false
}
