use crate::{ClientError, Result};
use beanstalk_protocol::{BeanstalkCodec, Command, Job, JobId, Response, TubeName, TubeStats};

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

/// Async client for a beanstalkd server
///
/// One client owns one connection. Requests are strictly sequential: each
/// command waits for its reply before the next one is sent.
pub struct BeanstalkClient<T = TcpStream> {
    framed: Framed<T, BeanstalkCodec>,
}

impl BeanstalkClient<TcpStream> {
    /// Connect to a server at `addr` (`host:port`)
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| ClientError::Connection { addr: addr.clone(), source })?;

        debug!("Connected to beanstalkd at {}", addr);

        Ok(Self::from_transport(stream))
    }
}

impl<T> BeanstalkClient<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already established transport
    pub fn from_transport(io: T) -> Self {
        BeanstalkClient {
            framed: Framed::new(io, BeanstalkCodec),
        }
    }

    /// Set the tube that `put` commands on this connection go to
    pub async fn use_tube(&mut self, tube: &TubeName) -> Result<()> {
        match self.request(Command::Use(tube.clone())).await? {
            Response::Using(using) if &using == tube => Ok(()),
            other => Err(unexpected("use", &other)),
        }
    }

    /// Add `tube` to the watch list. Returns the number of watched tubes.
    pub async fn watch(&mut self, tube: &TubeName) -> Result<u32> {
        match self.request(Command::Watch(tube.clone())).await? {
            Response::Watching(count) => Ok(count),
            other => Err(unexpected("watch", &other)),
        }
    }

    /// Drop `tube` from the watch list. Returns the number of watched tubes.
    pub async fn ignore(&mut self, tube: &TubeName) -> Result<u32> {
        match self.request(Command::Ignore(tube.clone())).await? {
            Response::Watching(count) => Ok(count),
            Response::NotIgnored => Err(ClientError::NotIgnored(tube.clone())),
            other => Err(unexpected("ignore", &other)),
        }
    }

    /// Wait, without a deadline, for a job on any watched tube
    pub async fn reserve(&mut self) -> Result<Job> {
        match self.request(Command::Reserve).await? {
            Response::Reserved { id, body } => Ok(Job { id, body }),
            other => Err(unexpected("reserve", &other)),
        }
    }

    /// Wait at most `timeout_secs` for a job. `Ok(None)` when none arrived.
    pub async fn reserve_with_timeout(&mut self, timeout_secs: u32) -> Result<Option<Job>> {
        match self.request(Command::ReserveWithTimeout(timeout_secs)).await? {
            Response::Reserved { id, body } => Ok(Some(Job { id, body })),
            Response::TimedOut => Ok(None),
            other => Err(unexpected("reserve-with-timeout", &other)),
        }
    }

    /// Permanently remove a job
    pub async fn delete(&mut self, id: JobId) -> Result<()> {
        match self.request(Command::Delete(id)).await? {
            Response::Deleted => Ok(()),
            Response::NotFound => Err(ClientError::JobNotFound(id)),
            other => Err(unexpected("delete", &other)),
        }
    }

    /// Names of all tubes currently known to the server
    pub async fn list_tubes(&mut self) -> Result<Vec<TubeName>> {
        match self.request(Command::ListTubes).await? {
            Response::Ok(body) => Ok(serde_yaml::from_slice(&body)?),
            other => Err(unexpected("list-tubes", &other)),
        }
    }

    /// Statistics for a single tube
    pub async fn stats_tube(&mut self, tube: &TubeName) -> Result<TubeStats> {
        match self.request(Command::StatsTube(tube.clone())).await? {
            Response::Ok(body) => Ok(serde_yaml::from_slice(&body)?),
            Response::NotFound => Err(ClientError::TubeNotFound(tube.clone())),
            other => Err(unexpected("stats-tube", &other)),
        }
    }

    /// Ask the server to close the connection
    pub async fn quit(mut self) -> Result<()> {
        self.framed.send(Command::Quit).await?;
        self.framed.close().await?;
        Ok(())
    }

    async fn request(&mut self, command: Command) -> Result<Response> {
        let keyword = command.keyword();
        debug!(command = %command, "Sending command");

        self.framed.send(command).await?;

        match self.framed.next().await {
            Some(Ok(response)) if response.is_server_error() => Err(ClientError::Server {
                command: keyword,
                reply: response.describe(),
            }),
            Some(Ok(response)) => Ok(response),
            Some(Err(e)) => Err(e.into()),
            None => Err(ClientError::ConnectionClosed),
        }
    }
}

fn unexpected(command: &'static str, response: &Response) -> ClientError {
    ClientError::UnexpectedResponse {
        command,
        reply: response.describe(),
    }
}
