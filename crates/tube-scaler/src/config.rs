use crate::policy::ReplicaPolicy;
use crate::{Result, ScalerError};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub use tube_common::{LogFormat, LoggingSettings};

/// Prefix for environment overrides, e.g. `TUBE_SCALER__POLL_INTERVAL_SECS`
pub const ENV_PREFIX: &str = "TUBE_SCALER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerConfig {
    pub server: ServerSettings,
    pub poll_interval_secs: u64,
    pub jobs_per_replica: u64,
    /// Deployment name is this prefix followed by the tube name
    pub deployment_prefix: String,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        let policy = ReplicaPolicy::default();
        ScalerConfig {
            server: ServerSettings {
                host: "beanstalkd".to_string(),
                port: beanstalk_client::DEFAULT_PORT,
            },
            poll_interval_secs: 5,
            jobs_per_replica: policy.jobs_per_replica,
            deployment_prefix: policy.deployment_prefix,
            logging: LoggingSettings::default(),
        }
    }
}

impl ScalerConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, std::env::vars().collect())
    }

    pub fn load_with_env(path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&ScalerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .source(Some(env)),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(ScalerError::Config("server host must not be empty".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ScalerError::Config(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.jobs_per_replica == 0 {
            return Err(ScalerError::Config(
                "jobs_per_replica must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn policy(&self) -> ReplicaPolicy {
        ReplicaPolicy {
            jobs_per_replica: self.jobs_per_replica,
            deployment_prefix: self.deployment_prefix.clone(),
            ..ReplicaPolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_match_autoscaler() {
        let config = ScalerConfig::load_with_env(None, env(&[])).unwrap();
        config.validate().unwrap();

        assert_eq!(config.server_address(), "beanstalkd:11300");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.policy(), ReplicaPolicy::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = ScalerConfig::load_with_env(
            None,
            env(&[
                ("TUBE_SCALER__POLL_INTERVAL_SECS", "30"),
                ("TUBE_SCALER__DEPLOYMENT_PREFIX", "worker-"),
                ("TUBE_SCALER__SERVER__HOST", "queue"),
            ]),
        )
        .unwrap();

        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.server_address(), "queue:11300");
        assert_eq!(config.policy().deployment_prefix, "worker-");
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = ScalerConfig::default();
        config.poll_interval_secs = 0;

        assert!(matches!(config.validate(), Err(ScalerError::Config(_))));
    }
}
