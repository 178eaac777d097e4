//! Serial work queue.
//!
//! Every message application runs through one [`SerialQueue`]: tasks
//! execute one at a time, in submission order, each to completion
//! before the next starts. A task that fails or panics does not stop
//! the queue.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{IngestError, IngestResult};
use crate::metrics::set_queue_depth;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Handle for submitting tasks. Cheap to clone.
#[derive(Clone)]
pub struct SerialQueue {
    tx: mpsc::UnboundedSender<Job>,
    depth: Arc<AtomicUsize>,
}

/// Completion of one submitted task.
///
/// Resolves to the task's output once it has run. Dropping a submission
/// does not cancel the task.
pub struct Submission<T> {
    rx: Option<oneshot::Receiver<T>>,
}

impl<T> Future for Submission<T> {
    type Output = IngestResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.rx.as_mut() {
            None => Poll::Ready(Err(IngestError::QueueClosed)),
            Some(rx) => rx
                .poll_unpin(cx)
                .map(|res| res.map_err(|_| IngestError::TaskAborted)),
        }
    }
}

/// Background task draining the queue.
pub struct QueueWorker {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl SerialQueue {
    /// Create a queue and spawn its worker on the current runtime.
    pub fn start() -> (SerialQueue, QueueWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let depth = Arc::new(AtomicUsize::new(0));

        let handle = tokio::spawn(run_worker(rx, shutdown_rx, depth.clone()));

        (
            SerialQueue { tx, depth },
            QueueWorker {
                handle,
                shutdown_tx,
            },
        )
    }

    /// Enqueue a task.
    ///
    /// Enqueueing happens immediately, so the submission order of tasks
    /// is the order of `submit` calls, whether or not the returned
    /// [`Submission`] is ever awaited.
    pub fn submit<F, T>(&self, task: F) -> Submission<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let output = task.await;
            // Submitter may have stopped waiting
            let _ = result_tx.send(output);
        });

        self.depth.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(job).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Submission { rx: None };
        }
        // Read after the send so a concurrent worker decrement is not undone
        set_queue_depth(self.depth.load(Ordering::SeqCst));

        Submission {
            rx: Some(result_rx),
        }
    }

    /// Tasks waiting or running.
    pub fn pending(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl QueueWorker {
    /// Stop admitting tasks, run everything already queued, then return.
    pub async fn shutdown(self) -> IngestResult<()> {
        let _ = self.shutdown_tx.send(true);
        self.handle
            .await
            .map_err(|e| IngestError::Internal(format!("queue worker failed: {e}")))
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Job>,
    mut shutdown_rx: watch::Receiver<bool>,
    depth: Arc<AtomicUsize>,
) {
    debug!("Serial queue started");
    let mut watching = true;

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed(), if watching => {
                match changed {
                    Ok(()) if *shutdown_rx.borrow() => {
                        info!(pending = depth.load(Ordering::SeqCst), "🛑 Serial queue closing, draining pending tasks");
                        rx.close();
                        watching = false;
                    }
                    Ok(()) => {}
                    Err(_) => watching = false,
                }
            }

            job = rx.recv() => {
                let Some(job) = job else { break };

                if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                    error!("Queued task panicked");
                }

                depth.fetch_sub(1, Ordering::SeqCst);
                set_queue_depth(depth.load(Ordering::SeqCst));
            }
        }
    }

    debug!("Serial queue stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MessageApplier;
    use crate::services::test_support::{RecordingStore, StoreOp, StubDecoder, message, transfer_tx};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[tokio::test]
    async fn test_tasks_run_in_submission_order_without_overlap() {
        let (queue, worker) = SerialQueue::start();
        let log = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(false));

        let submissions: Vec<_> = (0..5)
            .map(|i| {
                let log = log.clone();
                let running = running.clone();
                queue.submit(async move {
                    assert!(!running.swap(true, Ordering::SeqCst), "tasks overlapped");
                    log.lock().unwrap().push(format!("start {i}"));
                    // Later tasks finish faster; order must still hold
                    tokio::time::sleep(Duration::from_millis(5 * (5 - i))).await;
                    log.lock().unwrap().push(format!("end {i}"));
                    running.store(false, Ordering::SeqCst);
                    i
                })
            })
            .collect();

        for (i, submission) in submissions.into_iter().enumerate() {
            assert_eq!(submission.await.unwrap(), i as u64);
        }

        let expected: Vec<String> = (0..5)
            .flat_map(|i| [format!("start {i}"), format!("end {i}")])
            .collect();
        assert_eq!(*log.lock().unwrap(), expected);
        worker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_task_does_not_block_later_tasks() {
        let (queue, worker) = SerialQueue::start();

        let first = queue.submit(async { Err::<u32, &str>("boom") });
        let second = queue.submit(async { Ok::<u32, &str>(2) });

        assert_eq!(first.await.unwrap(), Err("boom"));
        assert_eq!(second.await.unwrap(), Ok(2));
        worker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_task_is_isolated() {
        let (queue, worker) = SerialQueue::start();

        let first = queue.submit(async {
            let missing: Option<()> = None;
            missing.expect("task blew up")
        });
        let second = queue.submit(async { 42 });

        let err: IngestResult<()> = first.await;
        assert!(matches!(err, Err(IngestError::TaskAborted)));
        assert_eq!(second.await.unwrap(), 42);
        assert_eq!(queue.pending(), 0);
        worker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_then_rejects() {
        let (queue, worker) = SerialQueue::start();
        let done = Arc::new(AtomicUsize::new(0));

        let submissions: Vec<_> = (0..3)
            .map(|_| {
                let done = done.clone();
                queue.submit(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        worker.shutdown().await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 3);
        for submission in submissions {
            submission.await.unwrap();
        }

        let late = queue.submit(async { 1 });
        assert!(matches!(late.await, Err(IngestError::QueueClosed)));
        assert!(queue.is_closed());
    }

    fn gauge_value(rendered: &str, name: &str) -> Option<f64> {
        rendered
            .lines()
            .find_map(|line| line.strip_prefix(name)?.strip_prefix(' ')?.trim().parse().ok())
    }

    #[tokio::test]
    async fn test_depth_gauge_tracks_pending_tasks() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let (queue, worker) = SerialQueue::start();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        // Nothing runs until the test yields, so both tasks are pending
        let (first, second) = metrics::with_local_recorder(&recorder, || {
            let first = queue.submit(async move {
                let _ = release_rx.await;
            });
            let second = queue.submit(async {});
            (first, second)
        });
        assert_eq!(queue.pending(), 2);
        assert_eq!(gauge_value(&handle.render(), "queue_depth"), Some(2.0));

        release_tx.send(()).unwrap();
        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(queue.pending(), 0);

        worker.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_messages_never_interleave() {
        let store = Arc::new(RecordingStore::yielding());
        let applier = Arc::new(MessageApplier::new(store.clone(), Arc::new(StubDecoder)));
        let (queue, worker) = SerialQueue::start();

        let mut submitters = Vec::new();
        for height in 1..=8u64 {
            let queue = queue.clone();
            let applier = applier.clone();
            submitters.push(tokio::spawn(async move {
                let txs = vec![transfer_tx(1), transfer_tx(2), transfer_tx(3)];
                queue
                    .submit(async move { applier.apply(message(height, txs, vec![])).await })
                    .await
            }));
        }
        for submitter in submitters {
            submitter.await.unwrap().unwrap().unwrap();
        }

        // Each block is followed by exactly its own three transactions
        let ops = store.ops();
        assert_eq!(ops.len(), 8 * 4);
        for chunk in ops.chunks(4) {
            assert!(matches!(chunk[0], StoreOp::Block(_)));
            assert!(chunk[1..].iter().all(|op| matches!(op, StoreOp::Tx(_))));
        }
        worker.shutdown().await.unwrap();
    }
}
