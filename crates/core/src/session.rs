//! Session-change events delivered by the host notification source.

use std::time::SystemTime;

use serde::Serialize;

/// Why a session changed state, decoded from the OS reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionChangeReason {
	ConsoleConnect,
	ConsoleDisconnect,
	RemoteConnect,
	RemoteDisconnect,
	Logon,
	Logoff,
	Lock,
	Unlock,
	RemoteControl,
	Unknown,
}

impl SessionChangeReason {
	/// Decodes a raw session-change reason code (WTS numbering).
	pub fn from_code(code: u32) -> Self {
		match code {
			0x1 => Self::ConsoleConnect,
			0x2 => Self::ConsoleDisconnect,
			0x3 => Self::RemoteConnect,
			0x4 => Self::RemoteDisconnect,
			0x5 => Self::Logon,
			0x6 => Self::Logoff,
			0x7 => Self::Lock,
			0x8 => Self::Unlock,
			0x9 => Self::RemoteControl,
			_ => Self::Unknown,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::ConsoleConnect => "console connect",
			Self::ConsoleDisconnect => "console disconnect",
			Self::RemoteConnect => "remote connect",
			Self::RemoteDisconnect => "remote disconnect",
			Self::Logon => "logon",
			Self::Logoff => "logoff",
			Self::Lock => "lock",
			Self::Unlock => "unlock",
			Self::RemoteControl => "remote control",
			Self::Unknown => "unknown",
		}
	}
}

/// One session-change notification; produced once, consumed once.
#[derive(Debug, Clone, Copy)]
pub struct SessionEvent {
	pub reason: SessionChangeReason,
	pub session_id: u32,
	pub timestamp: SystemTime,
}

impl SessionEvent {
	pub fn new(reason: SessionChangeReason, session_id: u32) -> Self {
		Self {
			reason,
			session_id,
			timestamp: SystemTime::now(),
		}
	}

	pub fn from_code(code: u32, session_id: u32) -> Self {
		Self::new(SessionChangeReason::from_code(code), session_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reason_codes_decode_to_known_reasons() {
		assert_eq!(SessionChangeReason::from_code(0x1), SessionChangeReason::ConsoleConnect);
		assert_eq!(SessionChangeReason::from_code(0x4), SessionChangeReason::RemoteDisconnect);
		assert_eq!(SessionChangeReason::from_code(0x8), SessionChangeReason::Unlock);
		assert_eq!(SessionChangeReason::from_code(0x9), SessionChangeReason::RemoteControl);
	}

	#[test]
	fn unrecognized_codes_decode_to_unknown() {
		assert_eq!(SessionChangeReason::from_code(0), SessionChangeReason::Unknown);
		assert_eq!(SessionChangeReason::from_code(0xFF), SessionChangeReason::Unknown);
	}

	#[test]
	fn event_from_code_carries_the_session_id() {
		let event = SessionEvent::from_code(0x4, 3);
		assert_eq!(event.reason, SessionChangeReason::RemoteDisconnect);
		assert_eq!(event.session_id, 3);
	}
}
