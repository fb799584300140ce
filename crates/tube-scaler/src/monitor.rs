use crate::{
    policy::{ReplicaPolicy, ScalingDecision},
    sink::ReplicaSink,
    Result,
};
use async_trait::async_trait;
use beanstalk_client::{BeanstalkClient, ClientError, TubeName, TubeStats};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where tube statistics come from
#[async_trait]
pub trait TubeStatsSource: Send {
    async fn list_tubes(&mut self) -> std::result::Result<Vec<TubeName>, ClientError>;

    async fn stats_tube(&mut self, tube: &TubeName) -> std::result::Result<TubeStats, ClientError>;
}

#[async_trait]
impl<T> TubeStatsSource for BeanstalkClient<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn list_tubes(&mut self) -> std::result::Result<Vec<TubeName>, ClientError> {
        BeanstalkClient::list_tubes(self).await
    }

    async fn stats_tube(&mut self, tube: &TubeName) -> std::result::Result<TubeStats, ClientError> {
        BeanstalkClient::stats_tube(self, tube).await
    }
}

/// Periodically turns tube backlogs into replica counts
pub struct TubeMonitor<Q, S> {
    source: Q,
    sink: S,
    policy: ReplicaPolicy,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl<Q: TubeStatsSource, S: ReplicaSink> TubeMonitor<Q, S> {
    pub fn new(source: Q, sink: S, policy: ReplicaPolicy, poll_interval: Duration) -> Self {
        TubeMonitor {
            source,
            sink,
            policy,
            poll_interval,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Inspect every tube once and hand each decision to the sink
    ///
    /// Failing to list tubes, or losing the connection, is fatal. A tube whose
    /// stats the server refuses, or whose decision the sink rejects, is logged
    /// and skipped.
    pub async fn poll_once(&mut self) -> Result<Vec<ScalingDecision>> {
        let tubes = self.source.list_tubes().await?;
        debug!("Inspecting {} tubes", tubes.len());

        let mut decisions = Vec::with_capacity(tubes.len());

        for tube in tubes {
            let stats = match self.source.stats_tube(&tube).await {
                Ok(stats) => stats,
                Err(e) if e.is_connection_error() => return Err(e.into()),
                Err(e) => {
                    warn!(tube = %tube, "Can't fetch stats: {}", e);
                    continue;
                }
            };

            let decision = self.policy.decide(&tube, &stats);
            if let Err(e) = self.sink.apply(&decision).await {
                warn!(tube = %tube, "Failed to apply scaling decision: {}", e);
                continue;
            }
            decisions.push(decision);
        }

        Ok(decisions)
    }

    /// Poll until cancelled or the server becomes unreachable
    pub async fn run(mut self) -> Result<()> {
        info!("Polling tubes every {:?}", self.poll_interval);

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = interval.tick() => {
                    self.poll_once().await?;
                }
            }
        }

        info!("Tube monitor stopped");
        Ok(())
    }
}
