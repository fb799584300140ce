use crate::TubeName;
use bytes::Bytes;
use serde::Deserialize;
use std::fmt;

/// Server-assigned job identifier
pub type JobId = u64;

/// Commands sent by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Tube that subsequent `put`s go to
    Use(TubeName),

    /// Add a tube to the reservation watch list
    Watch(TubeName),

    /// Remove a tube from the watch list
    Ignore(TubeName),

    /// Block until a job is ready on any watched tube
    Reserve,

    /// Like `Reserve`, but give up after the given number of seconds
    ReserveWithTimeout(u32),

    /// Remove a job permanently
    Delete(JobId),

    ListTubes,

    StatsTube(TubeName),

    /// Close the connection
    Quit,
}

impl Command {
    /// Command keyword as it appears on the wire
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Use(_) => "use",
            Command::Watch(_) => "watch",
            Command::Ignore(_) => "ignore",
            Command::Reserve => "reserve",
            Command::ReserveWithTimeout(_) => "reserve-with-timeout",
            Command::Delete(_) => "delete",
            Command::ListTubes => "list-tubes",
            Command::StatsTube(_) => "stats-tube",
            Command::Quit => "quit",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Use(tube)
            | Command::Watch(tube)
            | Command::Ignore(tube)
            | Command::StatsTube(tube) => write!(f, "{} {}", self.keyword(), tube),
            Command::ReserveWithTimeout(secs) => write!(f, "{} {}", self.keyword(), secs),
            Command::Delete(id) => write!(f, "{} {}", self.keyword(), id),
            Command::Reserve | Command::ListTubes | Command::Quit => f.write_str(self.keyword()),
        }
    }
}

/// Replies sent by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Using(TubeName),
    Watching(u32),
    Reserved { id: JobId, body: Bytes },
    Deleted,
    /// YAML payload of `list-tubes` / `stats-tube`
    Ok(Bytes),
    NotFound,
    NotIgnored,
    TimedOut,
    DeadlineSoon,
    OutOfMemory,
    InternalError,
    BadFormat,
    UnknownCommand,
}

impl Response {
    /// True for the generic error replies any command may receive.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Response::OutOfMemory
                | Response::InternalError
                | Response::BadFormat
                | Response::UnknownCommand
        )
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Response::Using(tube) => format!("USING {}", tube),
            Response::Watching(count) => format!("WATCHING {}", count),
            Response::Reserved { id, body } => format!("RESERVED {} {}", id, body.len()),
            Response::Deleted => "DELETED".to_string(),
            Response::Ok(body) => format!("OK {}", body.len()),
            Response::NotFound => "NOT_FOUND".to_string(),
            Response::NotIgnored => "NOT_IGNORED".to_string(),
            Response::TimedOut => "TIMED_OUT".to_string(),
            Response::DeadlineSoon => "DEADLINE_SOON".to_string(),
            Response::OutOfMemory => "OUT_OF_MEMORY".to_string(),
            Response::InternalError => "INTERNAL_ERROR".to_string(),
            Response::BadFormat => "BAD_FORMAT".to_string(),
            Response::UnknownCommand => "UNKNOWN_COMMAND".to_string(),
        }
    }
}

/// A reserved job. Owned by the consumer until it is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub body: Bytes,
}

/// Subset of the `stats-tube` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TubeStats {
    pub name: Option<TubeName>,
    pub current_jobs_urgent: u64,
    pub current_jobs_ready: u64,
    pub current_jobs_reserved: u64,
    pub current_jobs_delayed: u64,
    pub current_jobs_buried: u64,
    pub total_jobs: u64,
    pub current_using: u64,
    pub current_watching: u64,
    pub current_waiting: u64,
}
