//! Wire types and framing for the beanstalkd text protocol.
//!
//! Only the subset of commands needed by a consumer and a tube monitor is
//! modelled: tube selection, reservation, deletion and tube statistics.

mod codec;
mod message;
mod tube;

pub use codec::BeanstalkCodec;
pub use message::{Command, Job, JobId, Response, TubeStats};
pub use tube::TubeName;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid tube name {name:?}: {reason}")]
    InvalidTubeName { name: String, reason: &'static str },

    #[error("Response header exceeds 224 bytes (got {0})")]
    HeaderTooLong(usize),

    #[error("Job body too large: {0} bytes")]
    BodyTooLarge(usize),

    #[error("Malformed response header: {0:?}")]
    MalformedHeader(String),

    #[error("Body for {0:?} is not terminated by CRLF")]
    MissingBodyTerminator(String),

    #[error("Unexpected response: {0:?}")]
    UnexpectedResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Longest header line the server ever sends, CRLF excluded.
pub const MAX_HEADER_LEN: usize = 224;

/// Upper bound accepted for a job or YAML body: 1MB.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Tube every fresh connection uses and watches.
pub const DEFAULT_TUBE: &str = "default";

/// Well-known beanstalkd port.
pub const DEFAULT_PORT: u16 = 11300;
