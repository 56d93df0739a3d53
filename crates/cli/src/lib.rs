//! CLI wiring for the `rdpmon` binary.

pub mod args;
pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;
