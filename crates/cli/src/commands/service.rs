//! Service management commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use rdpmon::{EnabledFlag, Outcome, ScBackend, ServiceInstaller};
use tracing::warn;

use crate::cli::Cli;
use crate::commands::run;
use crate::output::{CommandResult, print_result};

fn installer(config: EnabledFlag) -> ServiceInstaller {
	ServiceInstaller::new(Arc::new(ScBackend::default()), config)
}

fn finish(cli: &Cli, command: &str, outcome: Outcome) -> Result<()> {
	let result = if outcome.success {
		CommandResult::success(command, outcome)
	} else {
		CommandResult::failure(command, outcome.kind.name(), outcome.message.clone())
	};
	print_result(cli.format, &result);
	if result.ok {
		Ok(())
	} else {
		bail!("{command} failed");
	}
}

pub async fn install(cli: &Cli, config: EnabledFlag, path: Option<&Path>) -> Result<()> {
	let outcome = installer(config).install(path).await;
	finish(cli, "install", outcome)
}

pub async fn uninstall(cli: &Cli, config: EnabledFlag) -> Result<()> {
	let outcome = installer(config).uninstall().await;
	finish(cli, "uninstall", outcome)
}

/// Starts the installed service; unless `--no-fallback` was given, a start
/// failure falls back to running the monitor in the foreground.
pub async fn start(cli: &Cli, config: EnabledFlag, no_fallback: bool) -> Result<()> {
	let outcome = installer(config.clone()).start().await;
	if !outcome.success && !no_fallback {
		warn!(
			target = "rdpmon.cli",
			message = %outcome.message,
			"service start failed; running in the foreground instead"
		);
		return run::run_host(config).await;
	}
	finish(cli, "start", outcome)
}

pub async fn stop(cli: &Cli, config: EnabledFlag) -> Result<()> {
	let outcome = installer(config).stop().await;
	finish(cli, "stop", outcome)
}

pub async fn restart(cli: &Cli, config: EnabledFlag) -> Result<()> {
	let outcome = installer(config).restart().await;
	finish(cli, "restart", outcome)
}

pub fn enable(cli: &Cli, config: EnabledFlag) -> Result<()> {
	let outcome = installer(config).enable();
	finish(cli, "enable", outcome)
}

pub fn disable(cli: &Cli, config: EnabledFlag) -> Result<()> {
	let outcome = installer(config).disable();
	finish(cli, "disable", outcome)
}

pub async fn status(cli: &Cli, config: EnabledFlag) -> Result<()> {
	let report = installer(config).status().await;
	print_result(cli.format, &CommandResult::success("status", report));
	Ok(())
}
