//! Error taxonomy and the structured outcomes crossing component boundaries.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Internal error type; helpers propagate these with `?` and public
/// operations map them into an [`Outcome`] at the boundary.
#[derive(Debug, Error)]
pub enum MonitorError {
	#[error("permission denied: {0}")]
	PermissionDenied(String),

	#[error("not found: {0}")]
	NotFound(String),

	#[error("timed out: {0}")]
	Timeout(String),

	#[error("external tool failed: {0}")]
	ExternalTool(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error("{0}")]
	Unknown(String),
}

/// Classification carried alongside every operation result so callers can
/// branch without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
	Ok,
	AlreadyInState,
	PermissionDenied,
	NotFound,
	Timeout,
	ExternalTool,
	Unknown,
}

impl OutcomeKind {
	pub fn name(&self) -> &'static str {
		match self {
			Self::Ok => "ok",
			Self::AlreadyInState => "already_in_state",
			Self::PermissionDenied => "permission_denied",
			Self::NotFound => "not_found",
			Self::Timeout => "timeout",
			Self::ExternalTool => "external_tool",
			Self::Unknown => "unknown",
		}
	}
}

impl std::fmt::Display for OutcomeKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

/// Structured result of a public operation. Nothing crosses a component
/// boundary as a panic or raw error.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
	pub success: bool,
	pub kind: OutcomeKind,
	pub message: String,
}

impl Outcome {
	pub fn ok(message: impl Into<String>) -> Self {
		Self {
			success: true,
			kind: OutcomeKind::Ok,
			message: message.into(),
		}
	}

	/// Success for an operation that found the system already in the target
	/// state and issued no command.
	pub fn already(message: impl Into<String>) -> Self {
		Self {
			success: true,
			kind: OutcomeKind::AlreadyInState,
			message: message.into(),
		}
	}

	pub fn failed(kind: OutcomeKind, message: impl Into<String>) -> Self {
		Self {
			success: false,
			kind,
			message: message.into(),
		}
	}

	pub fn is_noop(&self) -> bool {
		self.kind == OutcomeKind::AlreadyInState
	}
}

impl From<MonitorError> for Outcome {
	fn from(err: MonitorError) -> Self {
		let kind = match &err {
			MonitorError::PermissionDenied(_) => OutcomeKind::PermissionDenied,
			MonitorError::NotFound(_) => OutcomeKind::NotFound,
			MonitorError::Timeout(_) => OutcomeKind::Timeout,
			MonitorError::ExternalTool(_) => OutcomeKind::ExternalTool,
			MonitorError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => OutcomeKind::NotFound,
			MonitorError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => OutcomeKind::PermissionDenied,
			_ => OutcomeKind::Unknown,
		};
		Self::failed(kind, err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn already_in_state_counts_as_success() {
		let outcome = Outcome::already("service is already running");
		assert!(outcome.success);
		assert!(outcome.is_noop());
	}

	#[test]
	fn errors_map_to_matching_kinds() {
		let outcome = Outcome::from(MonitorError::Timeout("status did not converge".into()));
		assert!(!outcome.success);
		assert_eq!(outcome.kind, OutcomeKind::Timeout);

		let outcome = Outcome::from(MonitorError::PermissionDenied("elevation required".into()));
		assert_eq!(outcome.kind, OutcomeKind::PermissionDenied);
	}

	#[test]
	fn io_not_found_maps_to_not_found() {
		let err = MonitorError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"));
		assert_eq!(Outcome::from(err).kind, OutcomeKind::NotFound);
	}

	#[test]
	fn unexpected_errors_preserve_the_message() {
		let outcome = Outcome::from(MonitorError::Unknown("something odd".into()));
		assert_eq!(outcome.kind, OutcomeKind::Unknown);
		assert_eq!(outcome.message, "something odd");
	}
}
