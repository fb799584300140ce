mod client;

#[cfg(any(test, feature = "fake-server"))]
pub mod fake;

pub use client::BeanstalkClient;
pub use beanstalk_protocol::{Job, JobId, TubeName, TubeStats, DEFAULT_PORT, DEFAULT_TUBE};

use beanstalk_protocol::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: cannot reach {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection closed by server")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Server rejected {command}: {reply}")]
    Server { command: &'static str, reply: String },

    #[error("Unexpected reply to {command}: {reply}")]
    UnexpectedResponse { command: &'static str, reply: String },

    #[error("Job {0} not found")]
    JobNotFound(JobId),

    #[error("Tube {0} not found")]
    TubeNotFound(TubeName),

    #[error("Refusing to ignore {0}: it is the only watched tube")]
    NotIgnored(TubeName),

    #[error("Invalid YAML body: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ClientError {
    /// True when the session itself is unusable, as opposed to a per-command
    /// rejection such as an unknown job id.
    pub fn is_connection_error(&self) -> bool {
        match self {
            ClientError::Connection { .. } | ClientError::ConnectionClosed => true,
            ClientError::Protocol(ProtocolError::Io(_)) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
