//! Data source abstraction for receiving raw inventory snapshots.
//!
//! Acquiring snapshots from the bus is the job of an external introspection
//! layer. This module only defines how decoded snapshots reach the monitor:
//! from files an exporter writes, or from a channel an adapter pushes into.

mod channel;
mod file;

pub use channel::ChannelSource;
pub use file::FileSource;

use std::fmt::Debug;

use topowatch_types::RawSnapshot;

/// Trait for receiving raw snapshots from various sources.
///
/// # Example
///
/// ```
/// use topowatch::{DataSource, FileSource};
///
/// let mut source = FileSource::new("monitor.json");
/// if let Some(snapshot) = source.poll() {
///     println!("Got {} records", snapshot.len());
/// }
/// ```
pub trait DataSource: Send + Debug {
    /// Poll for the next snapshot.
    ///
    /// Returns `Some(snapshot)` if new data is available, `None` otherwise.
    /// This method should be non-blocking.
    fn poll(&mut self) -> Option<RawSnapshot>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;

    /// Returns the error message of the last failed poll, if any.
    fn error(&self) -> Option<&str>;
}
