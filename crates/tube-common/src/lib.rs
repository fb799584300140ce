//! Process plumbing shared by the tube binaries: log setup and shutdown signals.

pub mod logging;
pub mod shutdown;

pub use logging::{init_tracing, LogFormat, LoggingSettings};
pub use shutdown::shutdown_signal;
