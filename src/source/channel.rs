//! Channel-based data source.
//!
//! Receives raw snapshots through a bounded tokio channel. A bus adapter
//! decodes the inventory and pushes it; the monitor polls without blocking.

use tokio::sync::mpsc;
use topowatch_types::RawSnapshot;

use super::DataSource;

/// A data source fed by an in-process producer.
///
/// # Example
///
/// ```
/// use topowatch::{ChannelSource, DataSource};
/// use topowatch_types::RawSnapshot;
///
/// let (tx, mut source) = ChannelSource::create("bus-adapter", 4);
/// tx.try_send(RawSnapshot::default()).unwrap();
/// assert!(source.poll().is_some());
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<RawSnapshot>,
    description: String,
    last_error: Option<String>,
}

impl ChannelSource {
    pub fn new(receiver: mpsc::Receiver<RawSnapshot>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
            last_error: None,
        }
    }

    /// Create a sender and the source it feeds.
    pub fn create(source_description: &str, capacity: usize) -> (mpsc::Sender<RawSnapshot>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx, source_description))
    }
}

impl DataSource for ChannelSource {
    /// Returns the newest pending snapshot, skipping older ones still queued.
    fn poll(&mut self) -> Option<RawSnapshot> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => latest = Some(snapshot),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.last_error = Some("producer disconnected".to_string());
                    break;
                }
            }
        }
        latest
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
