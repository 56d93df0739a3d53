use clap::Parser;
use rdpmon_cli::{args, cli::Cli, commands, logging};
use tracing::error;

#[tokio::main]
async fn main() {
	let argv = args::normalize(std::env::args().collect());
	let cli = Cli::parse_from(argv);
	logging::init(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		error!(target = "rdpmon.cli", error = %err, "command failed");
		std::process::exit(1);
	}
}
