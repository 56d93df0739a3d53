//! Command routing.

pub mod run;
pub mod service;
pub mod transfer;

use anyhow::Result;
use rdpmon::EnabledFlag;

use crate::cli::{Cli, Commands};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = match &cli.config {
		Some(path) => EnabledFlag::new(path.clone()),
		None => EnabledFlag::at_default_path(),
	};

	match &cli.command {
		Commands::Install { path } => service::install(&cli, config, path.as_deref()).await,
		Commands::Uninstall => service::uninstall(&cli, config).await,
		Commands::Start { no_fallback } => service::start(&cli, config, *no_fallback).await,
		Commands::Stop => service::stop(&cli, config).await,
		Commands::Restart => service::restart(&cli, config).await,
		Commands::Enable => service::enable(&cli, config),
		Commands::Disable => service::disable(&cli, config),
		Commands::Status => service::status(&cli, config).await,
		Commands::Run => run::run_host(config).await,
		Commands::Transfer { session_id } => transfer::transfer(&cli, *session_id).await,
	}
}
