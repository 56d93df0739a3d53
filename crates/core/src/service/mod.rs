//! Supervisor-facing service lifecycle: phase state machine, background-
//! initializing host, and install/control orchestration.

pub mod control;
pub mod host;
pub mod sc;
pub mod state;
