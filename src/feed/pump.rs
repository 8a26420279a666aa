//! Applies queued feed reports to the performance index.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::HostFeedMessage;
use crate::perf::{PerformanceIndex, ReportOutcome};

/// Consumer side of the shared feed channel.
#[derive(Debug)]
pub struct FeedPump {
    rx: mpsc::Receiver<HostFeedMessage>,
    index: Arc<PerformanceIndex>,
}

impl FeedPump {
    pub fn new(rx: mpsc::Receiver<HostFeedMessage>, index: Arc<PerformanceIndex>) -> Self {
        Self { rx, index }
    }

    /// Apply every report queued right now. Returns how many were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.rx.try_recv() {
            if self.apply(&message) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next report and apply it.
    ///
    /// Returns whether it was applied, or `None` once every sender is gone.
    /// Cancel safe: a report is either applied or still queued.
    pub async fn next(&mut self) -> Option<bool> {
        let message = self.rx.recv().await?;
        Some(self.apply(&message))
    }

    /// Apply reports as they arrive until every sender is gone.
    pub async fn run(mut self) {
        while self.next().await.is_some() {}
        tracing::debug!("feed pump stopped");
    }

    /// Spawn [`run`](Self::run) on the current tokio runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    fn apply(&self, message: &HostFeedMessage) -> bool {
        match self
            .index
            .apply_report(&message.host, message.epoch, &message.report)
        {
            ReportOutcome::Applied { records } => {
                tracing::trace!(host = %message.host, records, "host report applied");
                true
            }
            ReportOutcome::Stale => {
                tracing::debug!(host = %message.host, epoch = message.epoch, "stale host report dropped");
                false
            }
        }
    }
}
