//! Argument definitions for the `rdpmon` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "rdpmon", about = "RDP session monitor service", version)]
pub struct Cli {
	/// Increase log verbosity (repeat for more detail)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	pub verbose: u8,

	/// Output format for command results
	#[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
	pub format: OutputFormat,

	/// Configuration file path (defaults to the system location)
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
	/// Register the service with the OS service manager
	Install {
		/// Service executable path (defaults to a sibling of this binary)
		#[arg(long)]
		path: Option<PathBuf>,
	},
	/// Remove the service registration
	Uninstall,
	/// Start the installed service
	Start {
		/// Do not fall back to running in the foreground when the service
		/// fails to start
		#[arg(long)]
		no_fallback: bool,
	},
	/// Stop the installed service
	Stop,
	/// Stop then start the installed service
	Restart,
	/// Enable monitoring (takes effect on next service start)
	Enable,
	/// Disable monitoring (takes effect on next service start)
	Disable,
	/// Report the installed service status
	Status,
	/// Run the monitor in the foreground, reading session events from stdin
	Run,
	/// Transfer one session to the local console and exit
	Transfer {
		/// Session id to transfer
		session_id: u32,
	},
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;

	#[test]
	fn install_accepts_an_explicit_path() {
		let cli = Cli::parse_from(["rdpmon", "install", "--path", "/opt/rdpmon/rdpmon"]);
		match cli.command {
			Commands::Install { path } => {
				assert_eq!(path, Some(PathBuf::from("/opt/rdpmon/rdpmon")));
			}
			other => panic!("unexpected command: {other:?}"),
		}
	}

	#[test]
	fn start_parses_the_no_fallback_flag() {
		let cli = Cli::parse_from(["rdpmon", "start", "--no-fallback"]);
		match cli.command {
			Commands::Start { no_fallback } => assert!(no_fallback),
			other => panic!("unexpected command: {other:?}"),
		}
	}

	#[test]
	fn transfer_requires_a_session_id() {
		let cli = Cli::parse_from(["rdpmon", "transfer", "3"]);
		match cli.command {
			Commands::Transfer { session_id } => assert_eq!(session_id, 3),
			other => panic!("unexpected command: {other:?}"),
		}
		assert!(Cli::try_parse_from(["rdpmon", "transfer"]).is_err());
	}

	#[test]
	fn global_flags_parse_after_the_subcommand() {
		let cli = Cli::parse_from(["rdpmon", "status", "--format", "json", "-vv"]);
		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.format, OutputFormat::Json);
	}
}
