//! Per-host enrichment feeds.
//!
//! A feed delivers the machine-state reports of one host. Feeds never touch
//! the performance index directly: they push [`HostFeedMessage`]s into one
//! bounded channel shared by all hosts, and the [`FeedPump`] applies them
//! under the index's locking discipline.

mod file;
mod pump;
mod reconciler;

pub use file::FileFeedConnector;
pub use pump::FeedPump;
pub use reconciler::{FeedReconciler, ReconcileOutcome};

use std::fmt::Debug;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use topowatch_types::RawHostReport;

use crate::error::FeedError;

/// One report, tagged with the host registration it was produced under.
#[derive(Debug, Clone, PartialEq)]
pub struct HostFeedMessage {
    pub host: String,
    pub epoch: u64,
    pub report: RawHostReport,
}

/// Create the shared feed channel.
pub fn feed_channel(
    capacity: usize,
) -> (mpsc::Sender<HostFeedMessage>, mpsc::Receiver<HostFeedMessage>) {
    mpsc::channel(capacity.max(1))
}

/// Where a feed subscription delivers the reports of its host.
#[derive(Debug, Clone)]
pub struct FeedSink {
    host: String,
    epoch: u64,
    tx: mpsc::Sender<HostFeedMessage>,
}

impl FeedSink {
    pub fn new(host: impl Into<String>, epoch: u64, tx: mpsc::Sender<HostFeedMessage>) -> Self {
        Self {
            host: host.into(),
            epoch,
            tx,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Queue a report without blocking.
    ///
    /// Returns `Ok(false)` when the channel is full and the report was
    /// dropped.
    pub fn push(&self, report: RawHostReport) -> Result<bool, FeedError> {
        let message = HostFeedMessage {
            host: self.host.clone(),
            epoch: self.epoch,
            report,
        };
        match self.tx.try_send(message) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                tracing::debug!(host = %self.host, "feed channel full, report dropped");
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(FeedError::ChannelClosed),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A live feed subscription for one host.
pub trait FeedSubscription: Send + Debug {
    /// Stop delivering reports. Reports already queued are discarded by the
    /// pump once the host is unregistered.
    fn cancel(&mut self);
}

/// Establishes feed subscriptions.
pub trait FeedConnector: Send + Debug {
    /// Subscribe to the reports of `host`, delivering them into `sink`.
    fn connect(
        &mut self,
        host: &str,
        sink: FeedSink,
    ) -> Result<Box<dyn FeedSubscription>, FeedError>;
}

/// Accepts every subscription and never delivers a report.
///
/// Used when no feed transport is configured: hosts are still tracked, and
/// their usage stays unknown.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleConnector;

#[derive(Debug)]
struct IdleSubscription;

impl FeedSubscription for IdleSubscription {
    fn cancel(&mut self) {}
}

impl FeedConnector for IdleConnector {
    fn connect(
        &mut self,
        _host: &str,
        _sink: FeedSink,
    ) -> Result<Box<dyn FeedSubscription>, FeedError> {
        Ok(Box::new(IdleSubscription))
    }
}
