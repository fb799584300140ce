pub mod config;
pub mod error;
pub mod jitter;
pub mod queue;
pub mod worker;

pub use config::{WorkerConfig, WorkerSettings};
pub use error::{Result, WorkerError};
pub use jitter::IdleJitter;
pub use queue::JobQueue;
pub use worker::{Worker, WorkerReport};
