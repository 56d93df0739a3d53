//! Console transfer executor: moves a session's desktop to the local console.

use async_trait::async_trait;

use crate::error::Outcome;

/// Issues the idempotent "move session to console" primitive and reports its
/// exit status. Retry policy, if any, belongs to the caller.
#[async_trait]
pub trait SessionTransfer: Send + Sync {
	async fn transfer(&self, session_id: u32) -> Outcome;
}

/// Production executor backed by the OS transfer tool.
#[derive(Debug, Default)]
pub struct ConsoleTransfer;

#[async_trait]
impl SessionTransfer for ConsoleTransfer {
	async fn transfer(&self, session_id: u32) -> Outcome {
		#[cfg(windows)]
		{
			run_tscon(session_id).await
		}

		#[cfg(not(windows))]
		{
			tracing::debug!(target = "rdpmon.transfer", session_id, "transfer primitive unavailable on this platform");
			Outcome::failed(
				crate::error::OutcomeKind::ExternalTool,
				format!("session transfer requires a Windows host (session {session_id})"),
			)
		}
	}
}

#[cfg(windows)]
async fn run_tscon(session_id: u32) -> Outcome {
	use crate::error::OutcomeKind;

	tracing::info!(target = "rdpmon.transfer", session_id, "transferring session to console");

	let output = match tokio::process::Command::new("tscon")
		.arg(session_id.to_string())
		.arg("/dest:console")
		.output()
		.await
	{
		Ok(output) => output,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
			return Outcome::failed(OutcomeKind::NotFound, "tscon not found on PATH");
		}
		Err(err) => return Outcome::failed(OutcomeKind::ExternalTool, format!("failed to run tscon: {err}")),
	};

	if output.status.success() {
		Outcome::ok(format!("session {session_id} transferred to console"))
	} else {
		let stderr = String::from_utf8_lossy(&output.stderr);
		Outcome::failed(
			OutcomeKind::ExternalTool,
			format!("tscon exited with {}: {}", output.status, stderr.trim()),
		)
	}
}
