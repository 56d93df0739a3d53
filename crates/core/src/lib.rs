//! Session monitoring and service lifecycle for unattended remote desktops.
//!
//! Watches remote-desktop session state changes and transfers a disconnected
//! remote session back to the local console so unattended automation keeps an
//! active desktop. The service host reports itself started immediately and
//! performs real initialization on a background task, keeping the supervisor's
//! startup deadline honest no matter how long registration takes.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod monitor;
pub mod service;
pub mod session;
pub mod transfer;

pub use config::EnabledFlag;
pub use dispatch::SessionDispatcher;
pub use error::{MonitorError, Outcome, OutcomeKind, Result};
pub use monitor::{
	DirectNotifications, NotificationScope, RegistrationContext, SessionMonitor, SessionNotifications,
};
pub use service::control::{
	RecoveryAction, ServiceControlBackend, ServiceDefinition, ServiceInstaller, ServiceStatus,
	StatusReport,
};
pub use service::host::MonitorService;
pub use service::sc::ScBackend;
pub use service::state::ServicePhase;
pub use session::{SessionChangeReason, SessionEvent};
pub use transfer::{ConsoleTransfer, SessionTransfer};
