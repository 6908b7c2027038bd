use crate::config::AgentConfig;
use crate::pool::WorkerPool;
use crate::reporter::Reporter;
use crate::sampler::Sampler;
use std::sync::Arc;
use telemon_common::model::MetricUpdate;
use tokio::signal;
use tokio::time::{interval, Duration};

/// Drives the two agent timers until the cancellation signal arrives.
///
/// The poll tick increments PollCount and pushes it synchronously; the report
/// tick fans the sampler output across the worker pool. On shutdown the job
/// channel is closed and the workers drain before `run` returns.
pub struct Agent {
    config: AgentConfig,
    sampler: Box<dyn Sampler>,
    reporter: Arc<Reporter>,
}

impl Agent {
    pub fn new(config: AgentConfig, sampler: Box<dyn Sampler>, reporter: Reporter) -> Self {
        Self {
            config,
            sampler,
            reporter: Arc::new(reporter),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let capacity = std::thread::available_parallelism().map_or(4, |n| n.get());
        let reporter = Arc::clone(&self.reporter);
        let pool = WorkerPool::new(
            capacity,
            self.config.report_workers,
            move |job: MetricUpdate| {
                let reporter = Arc::clone(&reporter);
                async move {
                    if let Err(e) = reporter.send(&job).await {
                        tracing::warn!(id = %job.id, error = %e, "dropping update");
                    }
                }
            },
        );

        let mut poll_tick = interval(Duration::from_secs(self.config.poll_interval_secs));
        let mut report_tick = interval(Duration::from_secs(self.config.report_interval_secs));
        let mut poll_count: i64 = 0;

        tracing::info!(
            poll_secs = self.config.poll_interval_secs,
            report_secs = self.config.report_interval_secs,
            workers = self.config.report_workers,
            "starting poll/report loop"
        );

        loop {
            tokio::select! {
                _ = poll_tick.tick() => {
                    poll_count += 1;
                    let update = MetricUpdate::counter("PollCount", 1);
                    if let Err(e) = self.reporter.send(&update).await {
                        tracing::warn!(polls = poll_count, error = %e, "poll update failed");
                    }
                }
                _ = report_tick.tick() => {
                    let samples = self.sampler.sample();
                    tracing::debug!(count = samples.len(), "report tick");
                    for update in samples {
                        if pool.send(update).await.is_err() {
                            tracing::warn!("job channel closed, stopping report");
                            break;
                        }
                    }
                }
                _ = signal::ctrl_c() => {
                    tracing::info!("shutting down gracefully");
                    break;
                }
            }
        }

        pool.shutdown().await;
        tracing::info!(polls = poll_count, "agent stopped");
        Ok(())
    }
}
