//! One-shot console transfer.

use anyhow::{Result, bail};
use rdpmon::{ConsoleTransfer, SessionTransfer};

use crate::cli::Cli;
use crate::output::{CommandResult, print_result};

pub async fn transfer(cli: &Cli, session_id: u32) -> Result<()> {
	let outcome = ConsoleTransfer.transfer(session_id).await;
	let result = if outcome.success {
		CommandResult::success("transfer", outcome)
	} else {
		CommandResult::failure("transfer", outcome.kind.name(), outcome.message.clone())
	};
	print_result(cli.format, &result);
	if result.ok {
		Ok(())
	} else {
		bail!("transfer failed");
	}
}
