use crate::{policy::ScalingDecision, Result};
use async_trait::async_trait;
use tracing::info;

/// Destination for scaling decisions, e.g. an orchestrator API
#[async_trait]
pub trait ReplicaSink: Send {
    async fn apply(&mut self, decision: &ScalingDecision) -> Result<()>;
}

/// Records each decision as a log event
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ReplicaSink for LogSink {
    async fn apply(&mut self, decision: &ScalingDecision) -> Result<()> {
        info!(
            tube = %decision.tube,
            deployment = %decision.deployment,
            jobs_ready = decision.jobs_ready,
            watching = decision.watching,
            replicas = decision.replicas,
            "Setting replicas to {}",
            decision.replicas
        );
        Ok(())
    }
}
