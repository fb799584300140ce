//! Worker configuration
//!
//! Layers, lowest precedence first: built-in defaults, an optional YAML file,
//! `TUBE_WORKER__*` environment variables, then `QUEUE` for the tube name.
//! Command line flags are applied on top by the binary before validation.

use crate::jitter::IdleJitter;
use crate::{Result, WorkerError};
use beanstalk_client::TubeName;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub use tube_common::{LogFormat, LoggingSettings};

/// Environment variable holding the tube to consume from
pub const QUEUE_ENV: &str = "QUEUE";

/// Prefix for the remaining environment overrides, e.g. `TUBE_WORKER__SERVER__HOST`
pub const ENV_PREFIX: &str = "TUBE_WORKER";

/// Raw worker configuration, as read from its sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Queue server connection settings
    pub server: ServerSettings,
    /// Tube to consume from
    pub tube: Option<String>,
    /// Identifier attached to every log line (hostname and pid if unset)
    pub worker_id: Option<String>,
    /// Pause between cycles
    pub idle: IdleSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// The pause is `n * unit_ms` milliseconds with `n` uniform in `min_units..=max_units`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleSettings {
    pub min_units: u32,
    pub max_units: u32,
    pub unit_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            server: ServerSettings::default(),
            tube: None,
            worker_id: None,
            idle: IdleSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "beanstalkd".to_string(),
            port: beanstalk_client::DEFAULT_PORT,
        }
    }
}

impl Default for IdleSettings {
    fn default() -> Self {
        IdleSettings {
            min_units: 1,
            max_units: 5,
            unit_ms: 1000,
        }
    }
}

/// Configuration after validation; everything the worker needs to start
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub server_address: String,
    pub tube: TubeName,
    pub worker_id: String,
    pub jitter: IdleJitter,
}

impl WorkerConfig {
    /// Load configuration from an optional file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, std::env::vars().collect())
    }

    /// Load configuration from an optional file and the given environment
    pub fn load_with_env(path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let queue = env.get(QUEUE_ENV).cloned();

        let mut builder = Config::builder().add_source(Config::try_from(&WorkerConfig::default())?);

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
            .set_override_option("tube", queue)?
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Check the configuration and resolve it into [`WorkerSettings`]
    pub fn validate(&self) -> Result<WorkerSettings> {
        let tube = match self.tube.as_deref().map(str::trim) {
            None => {
                return Err(WorkerError::Config(format!(
                    "no tube configured: set {} or pass --tube",
                    QUEUE_ENV
                )))
            }
            Some("") => {
                return Err(WorkerError::Config(format!("{} must not be empty", QUEUE_ENV)))
            }
            Some(name) => TubeName::new(name).map_err(|e| WorkerError::Config(e.to_string()))?,
        };

        if self.server.host.trim().is_empty() {
            return Err(WorkerError::Config("server host must not be empty".to_string()));
        }

        let jitter = IdleJitter::new(
            self.idle.min_units,
            self.idle.max_units,
            Duration::from_millis(self.idle.unit_ms),
        )?;

        Ok(WorkerSettings {
            server_address: self.server_address(),
            tube,
            worker_id: self.generate_worker_id(),
            jitter,
        })
    }

    /// Get server address as `host:port`
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn generate_worker_id(&self) -> String {
        if let Some(id) = &self.worker_id {
            return id.clone();
        }

        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        format!("{}-{}", hostname, std::process::id())
    }
}
