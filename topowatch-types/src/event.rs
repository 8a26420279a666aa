//! Transition log events.

use std::fmt;

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Level {
    Info,
    Warning,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Critical => "critical",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One human-readable entry of the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEvent {
    pub message: String,
    pub level: Level,
}

impl LogEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Level::Info,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Level::Warning,
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Level::Critical,
        }
    }

    /// The bracketed tag at the start of the message, e.g. `NEW PROCESS`.
    pub fn tag(&self) -> Option<&str> {
        let rest = self.message.strip_prefix('[')?;
        rest.split_once(']').map(|(tag, _)| tag)
    }
}
