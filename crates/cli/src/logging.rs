//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. `RDPMON_LOG` overrides the
/// verbosity-derived default filter.
pub fn init(verbosity: u8) {
	let default_level = match verbosity {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_env("RDPMON_LOG")
		.unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
