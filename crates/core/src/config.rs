//! Persisted enabled-flag store, read once per service start attempt.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

const CONFIG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
	schema: u32,
	#[serde(rename = "MonitoringEnabled", default)]
	monitoring_enabled: bool,
}

impl Default for ConfigFile {
	fn default() -> Self {
		Self {
			schema: CONFIG_SCHEMA_VERSION,
			monitoring_enabled: false,
		}
	}
}

/// File-backed store for the `MonitoringEnabled` flag.
#[derive(Debug, Clone)]
pub struct EnabledFlag {
	path: PathBuf,
}

impl EnabledFlag {
	pub fn new(path: PathBuf) -> Self {
		Self { path }
	}

	/// Store at the well-known system path, honoring the `RDPMON_CONFIG`
	/// override.
	pub fn at_default_path() -> Self {
		Self::new(default_config_path())
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Reads the flag; a missing or unreadable file counts as disabled.
	pub fn is_enabled(&self) -> bool {
		let file = fs::read_to_string(&self.path)
			.ok()
			.and_then(|content| serde_json::from_str::<ConfigFile>(&content).ok());

		match file {
			Some(file) => {
				debug!(
					target = "rdpmon.config",
					path = %self.path.display(),
					enabled = file.monitoring_enabled,
					"read enabled flag"
				);
				file.monitoring_enabled
			}
			None => {
				warn!(
					target = "rdpmon.config",
					path = %self.path.display(),
					"no readable configuration; monitoring disabled"
				);
				false
			}
		}
	}

	pub fn set_enabled(&self, enabled: bool) -> Result<()> {
		let mut file = fs::read_to_string(&self.path)
			.ok()
			.and_then(|content| serde_json::from_str::<ConfigFile>(&content).ok())
			.unwrap_or_default();
		file.schema = CONFIG_SCHEMA_VERSION;
		file.monitoring_enabled = enabled;

		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
		debug!(target = "rdpmon.config", path = %self.path.display(), enabled, "wrote enabled flag");
		Ok(())
	}
}

fn default_config_path() -> PathBuf {
	if let Some(path) = std::env::var_os("RDPMON_CONFIG") {
		return PathBuf::from(path);
	}

	#[cfg(windows)]
	{
		std::env::var_os("ProgramData")
			.map(PathBuf::from)
			.unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"))
			.join("rdpmon")
			.join("config.json")
	}

	#[cfg(not(windows))]
	{
		PathBuf::from("/var/lib/rdpmon/config.json")
	}
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn missing_file_reads_as_disabled() {
		let tmp = TempDir::new().expect("temp dir should be created");
		let flag = EnabledFlag::new(tmp.path().join("config.json"));
		assert!(!flag.is_enabled());
	}

	#[test]
	fn set_enabled_round_trips() {
		let tmp = TempDir::new().expect("temp dir should be created");
		let flag = EnabledFlag::new(tmp.path().join("nested").join("config.json"));

		flag.set_enabled(true).expect("flag should be written");
		assert!(flag.is_enabled());

		flag.set_enabled(false).expect("flag should be written");
		assert!(!flag.is_enabled());
	}

	#[test]
	fn garbage_content_reads_as_disabled() {
		let tmp = TempDir::new().expect("temp dir should be created");
		let path = tmp.path().join("config.json");
		fs::write(&path, "not json").expect("file should be written");
		assert!(!EnabledFlag::new(path).is_enabled());
	}

	#[test]
	fn written_file_uses_the_wire_key() {
		let tmp = TempDir::new().expect("temp dir should be created");
		let path = tmp.path().join("config.json");
		let flag = EnabledFlag::new(path.clone());

		flag.set_enabled(true).expect("flag should be written");
		let content = fs::read_to_string(&path).expect("file should be readable");
		assert!(content.contains("\"MonitoringEnabled\": true"));
	}
}
