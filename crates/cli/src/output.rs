//! Structured command results printed as text or JSON.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	Text,
	Json,
}

#[derive(Debug, Serialize)]
pub struct CommandError {
	pub kind: String,
	pub message: String,
}

/// Envelope for every command's result, stable across output formats.
#[derive(Debug, Serialize)]
pub struct CommandResult<T: Serialize> {
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

impl<T: Serialize> CommandResult<T> {
	pub fn success(command: impl Into<String>, data: T) -> Self {
		Self {
			ok: true,
			command: command.into(),
			data: Some(data),
			error: None,
		}
	}

	pub fn failure(command: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			ok: false,
			command: command.into(),
			data: None,
			error: Some(CommandError {
				kind: kind.into(),
				message: message.into(),
			}),
		}
	}
}

pub fn print_result<T: Serialize>(format: OutputFormat, result: &CommandResult<T>) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => {
			if let Some(error) = &result.error {
				eprintln!("Error [{}]: {}", error.kind, error.message);
			} else if let Some(data) = &result.data {
				if let Ok(json) = serde_json::to_string_pretty(data) {
					println!("{json}");
				}
			}
		}
	}
}
