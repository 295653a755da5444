use std::{
    fmt,
    time::{Duration, Instant},
};

use futures::{channel::mpsc::Receiver, StreamExt};
use tokio::time::MissedTickBehavior;

use crate::{
    metrics::{TransferStage, METRICS},
    report::{Report, ReportLabel},
};

/// Totals of the worker iterations observed by [`ReportCollector`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub successes: u64,
    pub failures: u64,
}

impl ReportSummary {
    fn add_status(&mut self, label: &ReportLabel) {
        match label {
            ReportLabel::ActionDone(_) => self.successes += 1,
            ReportLabel::ActionFailed { .. } => self.failures += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }

    pub fn tps(&self, duration: Duration) -> f64 {
        self.successes as f64 / duration.as_secs_f64()
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} successful, {} failures. {} total.",
            self.successes,
            self.failures,
            self.total()
        )
    }
}

/// Aggregates reports from all workers and periodically logs the progress.
///
/// Finishes once every report sender is dropped, i.e. when all workers have stopped.
#[derive(Debug)]
pub struct ReportCollector {
    reports_stream: Receiver<Report>,
    report_interval: Duration,
}

impl ReportCollector {
    pub fn new(reports_stream: Receiver<Report>, report_interval: Duration) -> Self {
        Self {
            reports_stream,
            report_interval,
        }
    }

    pub async fn run(mut self) -> ReportSummary {
        let start = Instant::now();
        let mut summary = ReportSummary::default();
        let mut timer = tokio::time::interval(self.report_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        timer.tick().await;

        loop {
            tokio::select! {
                report = self.reports_stream.next() => {
                    let Some(report) = report else {
                        break;
                    };
                    tracing::trace!("Report: {report:?}");
                    summary.add_status(&report.label);
                    METRICS.observe_transfer(
                        TransferStage::Worker,
                        report.label.is_done(),
                        report.time,
                    );
                }
                _ = timer.tick() => {
                    let elapsed = start.elapsed();
                    METRICS.tps.set(summary.tps(elapsed));
                    tracing::info!(
                        "Progress after {elapsed:?}: {summary} (TPS: {:.2})",
                        summary.tps(elapsed)
                    );
                }
            }
        }

        let elapsed = start.elapsed();
        METRICS.tps.set(summary.tps(elapsed));
        tracing::info!(
            "All workers stopped after {elapsed:?}: {summary} (TPS: {:.2})",
            summary.tps(elapsed)
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use futures::{channel::mpsc, SinkExt};
    use spammer_eth_client::{Address, H256};

    use super::*;
    use crate::{
        metrics::{TransferLabels, TransferOutcome},
        submitter::SubmissionResult,
    };

    fn worker_transfers(outcome: TransferOutcome) -> u64 {
        let labels = TransferLabels {
            stage: TransferStage::Worker,
            outcome,
        };
        METRICS.transfers[&labels].get()
    }

    fn report(label: ReportLabel) -> Report {
        Report {
            worker_index: 1,
            from: Address::repeat_byte(1),
            to: Address::repeat_byte(2),
            label,
            time: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn collector_counts_reports_until_senders_are_dropped() {
        let (mut sender, receiver) = mpsc::channel(16);
        let collector = ReportCollector::new(receiver, Duration::from_secs(30));
        let collector_task = tokio::spawn(collector.run());
        let successes_before = worker_transfers(TransferOutcome::Success);
        let failures_before = worker_transfers(TransferOutcome::Failure);

        let done = ReportLabel::ActionDone(SubmissionResult {
            tx_hash: H256::repeat_byte(3),
            block_number: 1.into(),
            gas_used: 21_000.into(),
        });
        let failed = ReportLabel::ActionFailed {
            error: "broadcast failed".to_owned(),
        };
        for label in [done.clone(), failed, done] {
            sender.send(report(label)).await.unwrap();
        }
        drop(sender);

        let summary = collector_task.await.unwrap();
        assert_eq!(
            summary,
            ReportSummary {
                successes: 2,
                failures: 1,
            }
        );
        assert_eq!(summary.total(), 3);
        // Metrics are global, so concurrently running tests may add to the counters.
        assert!(worker_transfers(TransferOutcome::Success) >= successes_before + 2);
        assert!(worker_transfers(TransferOutcome::Failure) > failures_before);
    }

    #[test]
    fn summary_display() {
        let summary = ReportSummary {
            successes: 5,
            failures: 1,
        };
        assert_eq!(summary.to_string(), "5 successful, 1 failures. 6 total.");
        assert_eq!(summary.tps(Duration::from_secs(2)), 2.5);
    }
}
