use crate::{jitter::IdleJitter, queue::JobQueue, Result};
use beanstalk_client::TubeName;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Consumer that claims and acknowledges jobs from a single tube
///
/// One job is outstanding at most: every reservation is deleted before the
/// next one is requested.
pub struct Worker<Q> {
    queue: Q,
    tube: TubeName,
    jitter: IdleJitter,
    shutdown: CancellationToken,
}

/// Summary returned when the worker stops on request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub jobs_deleted: u64,
}

impl<Q: JobQueue> Worker<Q> {
    pub fn new(queue: Q, tube: TubeName, jitter: IdleJitter) -> Self {
        Self::with_cancellation_token(queue, tube, jitter, CancellationToken::new())
    }

    pub fn with_cancellation_token(
        queue: Q,
        tube: TubeName,
        jitter: IdleJitter,
        shutdown: CancellationToken,
    ) -> Self {
        Worker {
            queue,
            tube,
            jitter,
            shutdown,
        }
    }

    /// Token that stops [`Worker::run`] when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run reserve/delete/idle cycles until cancelled or a queue error occurs
    ///
    /// Cancellation is honoured while waiting for a job and while idling.
    /// A job that has been reserved is always deleted first.
    pub async fn run(mut self) -> Result<WorkerReport> {
        self.queue.select(&self.tube).await?;
        info!(tube = %self.tube, "Consuming from tube");

        let mut rng = StdRng::from_entropy();
        let mut report = WorkerReport::default();

        loop {
            let job = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                job = self.queue.reserve() => job?,
            };

            self.queue.delete(job.id).await?;
            report.jobs_deleted += 1;
            info!(tube = %self.tube, job_id = job.id, "Remove job from {}", self.tube);

            let pause = self.jitter.sample(&mut rng);
            debug!(?pause, "Idling before next reservation");

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!(jobs_deleted = report.jobs_deleted, "Worker stopped");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkerError;
    use async_trait::async_trait;
    use beanstalk_client::{ClientError, Job, JobId};
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Select(String),
        Reserve,
        Delete(JobId),
    }

    enum Step {
        Job(JobId),
        Fail,
    }

    /// In-memory queue. Once the scripted steps run out, `reserve` parks
    /// forever, like a server with an empty tube.
    struct FakeQueue {
        steps: VecDeque<Step>,
        fail_select: bool,
        fail_delete: bool,
        calls: Arc<Mutex<Vec<(Call, Instant)>>>,
        drained: Arc<Notify>,
    }

    impl FakeQueue {
        fn new(steps: Vec<Step>) -> Self {
            FakeQueue {
                steps: steps.into(),
                fail_select: false,
                fail_delete: false,
                calls: Arc::new(Mutex::new(Vec::new())),
                drained: Arc::new(Notify::new()),
            }
        }

        fn with_jobs(ids: &[JobId]) -> Self {
            Self::new(ids.iter().map(|id| Step::Job(*id)).collect())
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push((call, Instant::now()));
        }
    }

    #[async_trait]
    impl JobQueue for FakeQueue {
        async fn select(&mut self, tube: &TubeName) -> std::result::Result<(), ClientError> {
            self.record(Call::Select(tube.to_string()));
            if self.fail_select {
                return Err(ClientError::ConnectionClosed);
            }
            Ok(())
        }

        async fn reserve(&mut self) -> std::result::Result<Job, ClientError> {
            self.record(Call::Reserve);
            match self.steps.pop_front() {
                Some(Step::Job(id)) => Ok(Job {
                    id,
                    body: format!("payload-{}", id).into_bytes().into(),
                }),
                Some(Step::Fail) => Err(ClientError::ConnectionClosed),
                None => {
                    self.drained.notify_one();
                    std::future::pending().await
                }
            }
        }

        async fn delete(&mut self, id: JobId) -> std::result::Result<(), ClientError> {
            self.record(Call::Delete(id));
            if self.fail_delete {
                return Err(ClientError::JobNotFound(id));
            }
            Ok(())
        }
    }

    fn jobs_tube() -> TubeName {
        TubeName::new("jobs").unwrap()
    }

    fn calls_of(calls: &Arc<Mutex<Vec<(Call, Instant)>>>) -> Vec<Call> {
        calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_drains_tube_then_blocks() {
        let queue = FakeQueue::with_jobs(&[1, 2, 3]);
        let calls = queue.calls.clone();
        let drained = queue.drained.clone();

        let worker = Worker::new(queue, jobs_tube(), IdleJitter::default());
        let shutdown = worker.cancellation_token();
        let handle = tokio::spawn(worker.run());

        drained.notified().await;
        assert_eq!(
            calls_of(&calls),
            vec![
                Call::Select("jobs".to_string()),
                Call::Reserve,
                Call::Delete(1),
                Call::Reserve,
                Call::Delete(2),
                Call::Reserve,
                Call::Delete(3),
                Call::Reserve,
            ]
        );

        shutdown.cancel();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.jobs_deleted, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_between_cycles_is_one_to_five_seconds() {
        let ids: Vec<JobId> = (1..=40).collect();
        let queue = FakeQueue::with_jobs(&ids);
        let calls = queue.calls.clone();
        let drained = queue.drained.clone();

        let worker = Worker::new(queue, jobs_tube(), IdleJitter::default());
        let shutdown = worker.cancellation_token();
        let handle = tokio::spawn(worker.run());

        drained.notified().await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        let calls = calls.lock().unwrap();
        let gaps: Vec<Duration> = calls
            .windows(2)
            .filter_map(|pair| match (&pair[0], &pair[1]) {
                ((Call::Delete(_), deleted_at), (Call::Reserve, reserved_at)) => {
                    Some(*reserved_at - *deleted_at)
                }
                _ => None,
            })
            .collect();

        assert_eq!(gaps.len(), 40);
        // The paused clock jumps straight to each timer, give or take a tick
        for gap in gaps {
            let secs = gap.as_secs();
            assert!((1..=5).contains(&secs), "gap {:?} out of range", gap);
            assert!(gap - Duration::from_secs(secs) < Duration::from_millis(2), "gap {:?}", gap);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reserve_error_stops_without_delete() {
        let queue = FakeQueue::new(vec![Step::Job(1), Step::Fail, Step::Job(2)]);
        let calls = queue.calls.clone();

        let result = Worker::new(queue, jobs_tube(), IdleJitter::default()).run().await;

        assert!(matches!(result, Err(WorkerError::Connection(ClientError::ConnectionClosed))));
        assert_eq!(
            calls_of(&calls),
            vec![
                Call::Select("jobs".to_string()),
                Call::Reserve,
                Call::Delete(1),
                Call::Reserve,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_error_is_fatal() {
        let mut queue = FakeQueue::with_jobs(&[5, 6]);
        queue.fail_delete = true;
        let calls = queue.calls.clone();

        let result = Worker::new(queue, jobs_tube(), IdleJitter::default()).run().await;

        assert!(matches!(result, Err(WorkerError::Connection(ClientError::JobNotFound(5)))));
        assert_eq!(
            calls_of(&calls),
            vec![Call::Select("jobs".to_string()), Call::Reserve, Call::Delete(5)]
        );
    }

    #[tokio::test]
    async fn test_select_error_prevents_reserve() {
        let mut queue = FakeQueue::with_jobs(&[1]);
        queue.fail_select = true;
        let calls = queue.calls.clone();

        let result = Worker::new(queue, jobs_tube(), IdleJitter::default()).run().await;

        assert!(matches!(result, Err(WorkerError::Connection(_))));
        assert_eq!(calls_of(&calls), vec![Call::Select("jobs".to_string())]);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_job() {
        let queue = FakeQueue::with_jobs(&[]);
        let drained = queue.drained.clone();

        let worker = Worker::new(queue, jobs_tube(), IdleJitter::default());
        let shutdown = worker.cancellation_token();
        let handle = tokio::spawn(worker.run());

        drained.notified().await;
        shutdown.cancel();

        assert_eq!(handle.await.unwrap().unwrap(), WorkerReport { jobs_deleted: 0 });
    }

    #[tokio::test]
    async fn test_cancel_during_idle_skips_next_reserve() {
        let queue = FakeQueue::with_jobs(&[1, 2]);
        let calls = queue.calls.clone();
        // Long enough that only cancellation can end the pause
        let jitter = IdleJitter::new(3600, 3600, Duration::from_secs(1)).unwrap();

        let worker = Worker::new(queue, jobs_tube(), jitter);
        let shutdown = worker.cancellation_token();
        let handle = tokio::spawn(worker.run());

        while !calls_of(&calls).contains(&Call::Delete(1)) {
            tokio::task::yield_now().await;
        }
        shutdown.cancel();

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.jobs_deleted, 1);
        assert_eq!(calls_of(&calls).iter().filter(|c| **c == Call::Reserve).count(), 1);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_one_line_per_deleted_job() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let queue = FakeQueue::with_jobs(&[1, 2, 3]);
        let drained = queue.drained.clone();

        let worker = Worker::new(queue, jobs_tube(), IdleJitter::default());
        let shutdown = worker.cancellation_token();
        let handle = tokio::spawn(worker.run());

        drained.notified().await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let removals: Vec<&str> = output
            .lines()
            .filter(|line| line.contains("Remove job from jobs"))
            .collect();

        assert_eq!(removals.len(), 3);
        for (line, id) in removals.iter().zip(1..) {
            assert!(line.contains("tube=jobs"), "missing tube field: {}", line);
            assert!(line.contains(&format!("job_id={}", id)), "missing job id: {}", line);
        }
    }
}
