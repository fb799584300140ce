//! Tube monitor: polls beanstalkd for per-tube backlog and derives how many
//! consumer replicas each tube should run.

pub mod config;
pub mod monitor;
pub mod policy;
pub mod sink;

mod error;

pub use config::ScalerConfig;
pub use error::{Result, ScalerError};
pub use monitor::{TubeMonitor, TubeStatsSource};
pub use policy::{desired_replicas, ReplicaPolicy, ScalingDecision};
pub use sink::{LogSink, ReplicaSink};
