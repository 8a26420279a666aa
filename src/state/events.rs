//! The per-cycle transition log.

use topowatch_types::{Level, LogEvent};

/// Ordered log of transition events, drained once per cycle.
///
/// Every pushed event is mirrored to `tracing` at the matching level so the
/// operator sees transitions on the console as they happen. The drained
/// events are what downstream sinks persist.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<LogEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: LogEvent) {
        match event.level {
            Level::Info => tracing::info!(target: "topowatch::events", "{}", event.message),
            Level::Warning => tracing::warn!(target: "topowatch::events", "{}", event.message),
            Level::Critical => tracing::error!(target: "topowatch::events", "{}", event.message),
        }
        self.events.push(event);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogEvent::info(message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(LogEvent::warning(message));
    }

    pub fn critical(&mut self, message: impl Into<String>) {
        self.push(LogEvent::critical(message));
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEvent> {
        self.events.iter()
    }

    /// Take every event logged so far, leaving the log empty.
    pub fn drain(&mut self) -> Vec<LogEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_log_in_order() {
        let mut log = EventLog::new();
        log.info("[NEW HOST] start monitoring host H1");
        log.critical("[STOPPED HOST] stop monitoring host H2");

        let events = log.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, Level::Info);
        assert_eq!(events[1].level, Level::Critical);
        assert!(log.is_empty());
    }
}
