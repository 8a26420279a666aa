//! Output backends for emitting cycle reports.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::monitor::CycleReport;

/// Output destination for cycle reports.
#[derive(Debug, Clone)]
pub enum Output {
    /// Write reports to a JSON file.
    ///
    /// The file is overwritten with each report.
    File(PathBuf),

    /// Send reports through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    Channel(mpsc::Sender<CycleReport>),
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use topowatch::Output;
    ///
    /// let output = Output::file("topology.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// This is how a persistence layer receives the reports.
    ///
    /// # Example
    ///
    /// ```rust
    /// use topowatch::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    ///
    /// // Later, receive reports
    /// // while let Some(report) = rx.recv().await {
    /// //     println!("generation {}", report.generation);
    /// // }
    /// ```
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<CycleReport>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Output::Channel(tx), rx)
    }

    /// Emit a report to this output.
    pub async fn emit(&self, report: &CycleReport) -> std::io::Result<()> {
        match self {
            Output::File(path) => {
                let json = serde_json::to_string_pretty(report)?;
                tokio::fs::write(path, json).await?;
            }
            Output::Channel(tx) => {
                // Best effort send (don't block if channel is full)
                if tx.try_send(report.clone()).is_err() {
                    tracing::debug!(generation = report.generation, "report channel full or closed");
                }
            }
        }
        Ok(())
    }
}
