use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Fixed-size pool of consumer tasks behind a bounded job channel.
///
/// `send` applies backpressure by blocking when the channel is full. The
/// channel doubles as the shutdown signal: [`shutdown`](Self::shutdown) closes
/// the sender, workers drain the remaining jobs and exit, and the call joins
/// them all.
pub struct WorkerPool<T> {
    tx: Option<mpsc::Sender<T>>,
    handles: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new<F, Fut>(capacity: usize, workers: usize, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let handler = handler.clone();
                tokio::spawn(async move {
                    loop {
                        // Hold the lock only while receiving, not while the
                        // handler runs.
                        let job = { rx.lock().await.recv().await };
                        match job {
                            Some(job) => handler(job).await,
                            None => break,
                        }
                    }
                    tracing::debug!(worker, "worker drained, exiting");
                })
            })
            .collect();

        Self {
            tx: Some(tx),
            handles,
        }
    }

    /// Enqueues a job, waiting while the channel is at capacity. Fails only
    /// after [`shutdown`](Self::shutdown) has closed the channel.
    pub async fn send(&self, job: T) -> Result<(), mpsc::error::SendError<T>> {
        match &self.tx {
            Some(tx) => tx.send(job).await,
            None => Err(mpsc::error::SendError(job)),
        }
    }

    /// Closes the channel and waits for every worker to finish its backlog.
    pub async fn shutdown(mut self) {
        self.tx.take();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "worker task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn processes_all_jobs_before_shutdown_returns() {
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        let pool = WorkerPool::new(4, 2, move |_job: u32| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        for job in 0..20u32 {
            pool.send(job).await.unwrap();
        }
        pool.shutdown().await;
        assert_eq!(done.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn full_channel_applies_backpressure() {
        let gate = Arc::new(Notify::new());
        let release = Arc::clone(&gate);
        let pool = WorkerPool::new(1, 1, move |_job: u32| {
            let gate = Arc::clone(&release);
            async move {
                gate.notified().await;
            }
        });

        // First job is picked up by the (blocked) worker, second fills the
        // channel; the third cannot be enqueued without waiting.
        pool.send(1).await.unwrap();
        pool.send(2).await.unwrap();
        let blocked =
            tokio::time::timeout(std::time::Duration::from_millis(50), pool.send(3)).await;
        assert!(blocked.is_err());

        gate.notify_waiters();
        gate.notify_one();
        gate.notify_one();
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn send_after_shutdown_fails() {
        let pool = WorkerPool::new(1, 1, |_job: u32| async {});
        let tx = pool.tx.clone();
        pool.shutdown().await;
        let tx = tx.unwrap();
        assert!(tx.send(1).await.is_err());
    }
}
