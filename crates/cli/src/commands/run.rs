//! Foreground monitor host fed by line-delimited session events on stdin.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rdpmon::{ConsoleTransfer, DirectNotifications, EnabledFlag, MonitorService};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const READY_WAIT: Duration = Duration::from_secs(30);

/// Runs the monitor in the foreground. Each stdin line carries one event as
/// `<reason_code> <session_id>`; EOF or Ctrl-C stops the service.
pub async fn run_host(config: EnabledFlag) -> Result<()> {
	let service = MonitorService::new(
		config,
		Arc::new(DirectNotifications),
		Arc::new(ConsoleTransfer),
	);

	service.on_start();
	if !service.wait_until_ready(READY_WAIT).await {
		warn!(target = "rdpmon.cli", "initialization did not complete in time; continuing anyway");
	}
	info!(target = "rdpmon.cli", phase = service.phase().name(), "monitor running; reading events from stdin");

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		tokio::select! {
			line = lines.next_line() => match line? {
				Some(line) => {
					let line = line.trim();
					if line.is_empty() {
						continue;
					}
					match parse_event(line) {
						Some((reason_code, session_id)) => {
							service.on_session_change(reason_code, session_id).await;
						}
						None => warn!(target = "rdpmon.cli", line, "unparseable event line; skipped"),
					}
				}
				None => break,
			},
			_ = tokio::signal::ctrl_c() => {
				info!(target = "rdpmon.cli", "interrupt received");
				break;
			}
		}
	}

	service.on_stop();
	Ok(())
}

/// Parses `<reason_code> <session_id>`; the reason code may be decimal or
/// `0x`-prefixed hex.
fn parse_event(line: &str) -> Option<(u32, u32)> {
	let mut parts = line.split_whitespace();
	let reason = parse_u32(parts.next()?)?;
	let session = parse_u32(parts.next()?)?;
	if parts.next().is_some() {
		return None;
	}
	Some((reason, session))
}

fn parse_u32(token: &str) -> Option<u32> {
	if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
		u32::from_str_radix(hex, 16).ok()
	} else {
		token.parse().ok()
	}
}
