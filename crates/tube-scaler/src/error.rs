use beanstalk_client::ClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScalerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Queue connection error: {0}")]
    Connection(#[from] ClientError),

    #[error("Failed to apply replica count for {deployment}: {reason}")]
    Sink { deployment: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ScalerError>;
