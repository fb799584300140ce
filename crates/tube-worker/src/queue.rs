use async_trait::async_trait;
use beanstalk_client::{BeanstalkClient, ClientError, Job, JobId, TubeName};
use tokio::io::{AsyncRead, AsyncWrite};

/// The three queue operations the worker loop depends on
#[async_trait]
pub trait JobQueue: Send {
    /// Make `tube` the only source of subsequent reservations
    async fn select(&mut self, tube: &TubeName) -> Result<(), ClientError>;

    /// Wait, without a deadline, for the next job
    async fn reserve(&mut self) -> Result<Job, ClientError>;

    /// Acknowledge a job by removing it from the server
    async fn delete(&mut self, id: JobId) -> Result<(), ClientError>;
}

#[async_trait]
impl<T> JobQueue for BeanstalkClient<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn select(&mut self, tube: &TubeName) -> Result<(), ClientError> {
        // `use` only affects producers; reservations follow the watch list
        self.use_tube(tube).await?;
        self.watch(tube).await?;
        if !tube.is_default() {
            self.ignore(&TubeName::default_tube()).await?;
        }
        Ok(())
    }

    async fn reserve(&mut self) -> Result<Job, ClientError> {
        BeanstalkClient::reserve(self).await
    }

    async fn delete(&mut self, id: JobId) -> Result<(), ClientError> {
        BeanstalkClient::delete(self, id).await
    }
}
