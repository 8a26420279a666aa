//! File-based data source.
//!
//! Reads snapshots either from a single JSON file that an exporter keeps
//! overwriting, or from a directory of recorded snapshots that is replayed
//! one file per poll.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use topowatch_types::RawSnapshot;

use super::DataSource;
use crate::error::SourceError;

#[derive(Debug)]
enum Mode {
    /// Re-read whenever the modification time changes.
    Watch { last_modified: Option<SystemTime> },
    /// Files still to replay, in name order.
    Replay { pending: Vec<PathBuf>, loaded: bool },
}

/// A data source that reads raw snapshots from JSON files.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    last_error: Option<String>,
    mode: Mode,
}

impl FileSource {
    /// Create a source for `path`: a snapshot file, or a directory of them.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let (description, mode) = if path.is_dir() {
            (
                format!("replay: {}", path.display()),
                Mode::Replay {
                    pending: Vec::new(),
                    loaded: false,
                },
            )
        } else {
            (
                format!("file: {}", path.display()),
                Mode::Watch {
                    last_modified: None,
                },
            )
        };
        Self {
            path,
            description,
            last_error: None,
            mode,
        }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once a replay directory has no files left.
    pub fn is_exhausted(&self) -> bool {
        matches!(&self.mode, Mode::Replay { pending, loaded: true } if pending.is_empty())
    }

    fn record<T>(&mut self, result: Result<T, SourceError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Some(value)
            }
            Err(err) => {
                tracing::debug!(source = %self.description, error = %err, "snapshot poll failed");
                self.last_error = Some(err.to_string());
                None
            }
        }
    }

    fn poll_watch(&mut self) -> Option<RawSnapshot> {
        let Mode::Watch { last_modified } = &self.mode else {
            return None;
        };
        let current = modified_time(&self.path);

        let changed = match (last_modified, &current) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(last), Some(current)) => current > last,
        };
        if !changed {
            return None;
        }

        let snapshot = self.record(read_snapshot(&self.path))?;
        self.mode = Mode::Watch {
            last_modified: current,
        };
        Some(snapshot)
    }

    fn poll_replay(&mut self) -> Option<RawSnapshot> {
        if let Mode::Replay { loaded: false, .. } = &self.mode {
            let listing = self.record(list_snapshots(&self.path))?;
            self.mode = Mode::Replay {
                pending: listing,
                loaded: true,
            };
        }

        let next = match &mut self.mode {
            Mode::Replay { pending, .. } if !pending.is_empty() => pending.remove(0),
            _ => return None,
        };
        self.record(read_snapshot(&next))
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

fn read_snapshot(path: &Path) -> Result<RawSnapshot, SourceError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn list_snapshots(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    if files.is_empty() {
        return Err(SourceError::EmptyDirectory(dir.display().to_string()));
    }
    files.sort();
    Ok(files)
}

impl DataSource for FileSource {
    fn poll(&mut self) -> Option<RawSnapshot> {
        match self.mode {
            Mode::Watch { .. } => self.poll_watch(),
            Mode::Replay { .. } => self.poll_replay(),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
