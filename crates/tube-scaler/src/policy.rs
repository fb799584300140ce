use beanstalk_client::{TubeName, TubeStats};

/// Ready jobs one consumer replica is expected to absorb
pub const JOBS_PER_REPLICA: u64 = 10;

/// Replica count for a backlog of `ready` jobs under the default policy
///
/// An idle tube scales to zero; any backlog keeps at least one consumer.
pub fn desired_replicas(ready: u64) -> u64 {
    ReplicaPolicy::default().replicas_for(ready)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaPolicy {
    pub jobs_per_replica: u64,
    pub min_replicas: u64,
    /// Prepended to the tube name to form the deployment name
    pub deployment_prefix: String,
}

impl Default for ReplicaPolicy {
    fn default() -> Self {
        ReplicaPolicy {
            jobs_per_replica: JOBS_PER_REPLICA,
            min_replicas: 1,
            deployment_prefix: "consumer-".to_string(),
        }
    }
}

impl ReplicaPolicy {
    pub fn replicas_for(&self, ready: u64) -> u64 {
        if ready == 0 {
            return 0;
        }
        (ready / self.jobs_per_replica.max(1)).max(self.min_replicas)
    }

    pub fn decide(&self, tube: &TubeName, stats: &TubeStats) -> ScalingDecision {
        ScalingDecision {
            tube: tube.clone(),
            deployment: format!("{}{}", self.deployment_prefix, tube),
            jobs_ready: stats.current_jobs_ready,
            watching: stats.current_watching,
            replicas: self.replicas_for(stats.current_jobs_ready),
        }
    }
}

/// Target replica count for one tube's consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingDecision {
    pub tube: TubeName,
    pub deployment: String,
    pub jobs_ready: u64,
    pub watching: u64,
    pub replicas: u64,
}
