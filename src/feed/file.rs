//! File-backed host feeds.
//!
//! Each host agent writes its latest machine state to
//! `<dir>/machine_state_<host>.json`. A subscription polls that file and
//! pushes every changed report into the feed channel.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use topowatch_types::RawHostReport;

use super::{FeedConnector, FeedSink, FeedSubscription};
use crate::error::{FeedError, SourceError};

/// Connects host feeds to per-host report files in one directory.
#[derive(Debug, Clone)]
pub struct FileFeedConnector {
    dir: PathBuf,
    interval: Duration,
}

impl FileFeedConnector {
    pub fn new(dir: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            interval,
        }
    }

    /// Report file of `host`.
    pub fn report_path(&self, host: &str) -> PathBuf {
        self.dir.join(format!("machine_state_{host}.json"))
    }
}

impl FeedConnector for FileFeedConnector {
    fn connect(
        &mut self,
        host: &str,
        sink: FeedSink,
    ) -> Result<Box<dyn FeedSubscription>, FeedError> {
        let path = self.report_path(host);
        if !path.is_file() {
            return Err(FeedError::Unavailable {
                host: host.to_string(),
                reason: format!("{} not found", path.display()),
            });
        }
        let runtime = Handle::try_current().map_err(|e| FeedError::Unavailable {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(host, path = %path.display(), "watching host report file");
        let task = runtime.spawn(poll_report_file(path, self.interval, sink));
        Ok(Box::new(TaskSubscription { task }))
    }
}

#[derive(Debug)]
struct TaskSubscription {
    task: JoinHandle<()>,
}

impl FeedSubscription for TaskSubscription {
    fn cancel(&mut self) {
        self.task.abort();
    }
}

impl Drop for TaskSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_report(path: &Path) -> Result<RawHostReport, SourceError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

async fn poll_report_file(path: PathBuf, interval: Duration, sink: FeedSink) {
    let mut ticker = tokio::time::interval(interval);
    let mut last_modified: Option<SystemTime> = None;

    loop {
        ticker.tick().await;

        let modified = tokio::fs::metadata(&path)
            .await
            .ok()
            .and_then(|meta| meta.modified().ok());
        if modified.is_none() || modified == last_modified {
            continue;
        }

        match read_report(&path).await {
            Ok(report) => match sink.push(report) {
                Ok(true) => last_modified = modified,
                // Channel full: the same file is read again next tick.
                Ok(false) => {}
                Err(_) => break,
            },
            Err(err) => {
                tracing::debug!(host = sink.host(), error = %err, "unreadable host report");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::feed_channel;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn missing_report_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut connector = FileFeedConnector::new(dir.path(), Duration::from_millis(10));
        let (tx, _rx) = feed_channel(4);

        let result = connector.connect("H1", FeedSink::new("H1", 1, tx));

        assert!(matches!(result, Err(FeedError::Unavailable { ref host, .. }) if host == "H1"));
    }

    #[tokio::test]
    async fn report_file_is_pushed() {
        let dir = TempDir::new().unwrap();
        let mut connector = FileFeedConnector::new(dir.path(), Duration::from_millis(10));
        let mut file = std::fs::File::create(connector.report_path("H1")).unwrap();
        writeln!(
            file,
            r#"{{ "cpuLoad": 42.0, "memory": {{ "total": "100", "available": "60" }} }}"#
        )
        .unwrap();
        let (tx, mut rx) = feed_channel(4);

        let mut subscription = connector
            .connect("H1", FeedSink::new("H1", 9, tx))
            .unwrap();
        let message = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(message.host, "H1");
        assert_eq!(message.epoch, 9);
        assert_eq!(message.report.cpu_load, Some(42.0));

        subscription.cancel();
        let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert!(closed.is_none());
    }

    #[tokio::test]
    async fn report_dropped_on_a_full_channel_is_retried() {
        let dir = TempDir::new().unwrap();
        let mut connector = FileFeedConnector::new(dir.path(), Duration::from_millis(10));
        let mut file = std::fs::File::create(connector.report_path("robot-a")).unwrap();
        writeln!(file, r#"{{ "cpuLoad": 7.0 }}"#).unwrap();
        let (tx, mut rx) = feed_channel(1);
        let filler = FeedSink::new("other", 1, tx.clone());
        assert_eq!(filler.push(RawHostReport::default()), Ok(true));

        let _subscription = connector
            .connect("robot-a", FeedSink::new("hname-1", 2, tx))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(rx.recv().await.unwrap().host, "other");
        let message = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("report is pushed again once the channel has room")
            .unwrap();
        assert_eq!(message.host, "hname-1");
        assert_eq!(message.report.cpu_load, Some(7.0));
    }
}
