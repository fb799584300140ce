use beanstalk_client::ClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    /// Missing or invalid settings, detected before any network call
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// The queue server could not be reached or the session broke
    #[error("Queue connection error: {0}")]
    Connection(#[from] ClientError),
}

impl WorkerError {
    pub fn is_config_error(&self) -> bool {
        matches!(self, WorkerError::Config(_) | WorkerError::ConfigSource(_))
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
