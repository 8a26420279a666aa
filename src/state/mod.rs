//! Generation-over-generation entity state.
//!
//! Each poll cycle replaces the current keyed set of every entity kind and
//! derives what appeared and what vanished relative to the immediately
//! previous generation. Nothing older than one generation is retained.

mod events;

pub use events::EventLog;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use topowatch_types::{Client, EntityKind, LogEvent, Process, Service, Topic};

/// An entity kind whose records are diffed generation over generation.
pub trait Tracked: Clone {
    /// Primary key, unique within one snapshot.
    type Key: Ord + Clone;

    const KIND: EntityKind;

    fn key(&self) -> Self::Key;

    /// Info event for a record absent from the previous generation.
    fn appeared(&self) -> LogEvent;

    /// Warning event for a record absent from the current generation.
    fn vanished(&self) -> LogEvent;
}

impl Tracked for Process {
    type Key = i64;
    const KIND: EntityKind = EntityKind::Process;

    fn key(&self) -> i64 {
        self.pid
    }

    fn appeared(&self) -> LogEvent {
        LogEvent::info(format!(
            "[NEW PROCESS] start monitoring process with id={} and uname=\"{}\" on host={}",
            self.pid, self.uname, self.hname
        ))
    }

    fn vanished(&self) -> LogEvent {
        LogEvent::warning(format!(
            "[DROPPED PROCESS] dropped process with id={} and uname=\"{}\" on host={}",
            self.pid, self.uname, self.hname
        ))
    }
}

impl Tracked for Service {
    type Key = String;
    const KIND: EntityKind = EntityKind::Service;

    fn key(&self) -> String {
        self.sname.clone()
    }

    fn appeared(&self) -> LogEvent {
        LogEvent::info(format!(
            "[NEW SERVICE] with pid={} and sname=\"{}\" on host={}",
            self.pid, self.sname, self.hname
        ))
    }

    fn vanished(&self) -> LogEvent {
        LogEvent::warning(format!(
            "[DROPPED SERVICE] with pid={} and sname=\"{}\" on host={}",
            self.pid, self.sname, self.hname
        ))
    }
}

impl Tracked for Client {
    type Key = String;
    const KIND: EntityKind = EntityKind::Client;

    fn key(&self) -> String {
        self.sid.clone()
    }

    fn appeared(&self) -> LogEvent {
        LogEvent::info(format!(
            "[NEW CLIENT] with sid={} and uname=\"{}\" for service \"{}\" on host={}",
            self.sid, self.uname, self.sname, self.hname
        ))
    }

    fn vanished(&self) -> LogEvent {
        LogEvent::warning(format!(
            "[DROPPED CLIENT] with sid={} and uname=\"{}\" for service \"{}\" on host={}",
            self.sid, self.uname, self.sname, self.hname
        ))
    }
}

impl Tracked for Topic {
    type Key = String;
    const KIND: EntityKind = EntityKind::Topic;

    fn key(&self) -> String {
        self.tid.clone()
    }

    fn appeared(&self) -> LogEvent {
        LogEvent::info(format!(
            "[NEW {}] for topic \"{}\" with tid={} and uname=\"{}\" on host={}",
            self.direction.label(),
            self.tname,
            self.tid,
            self.uname,
            self.hname
        ))
    }

    fn vanished(&self) -> LogEvent {
        LogEvent::warning(format!(
            "[STOPPED {}] for topic \"{}\" with tid={} and uname=\"{}\" on host={}",
            self.direction.label(),
            self.tname,
            self.tid,
            self.uname,
            self.hname
        ))
    }
}

/// Current, previous, dropped and new records of one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation<K: Ord, E> {
    pub current: BTreeMap<K, E>,
    pub previous: BTreeMap<K, E>,
    /// Records of the previous generation whose key is gone.
    pub dropped: BTreeMap<K, E>,
    /// Records of the current generation whose key is new.
    pub new: BTreeMap<K, E>,
}

impl<K: Ord, E> Default for Generation<K, E> {
    fn default() -> Self {
        Self {
            current: BTreeMap::new(),
            previous: BTreeMap::new(),
            dropped: BTreeMap::new(),
            new: BTreeMap::new(),
        }
    }
}

impl<E: Tracked> Generation<E::Key, E> {
    /// Replace the current generation with `records` and log the transitions.
    ///
    /// Duplicate keys within one batch resolve last-write-wins. An empty batch
    /// is a real update: every previously current record is dropped.
    pub fn update<I>(&mut self, records: I, log: &mut EventLog)
    where
        I: IntoIterator<Item = E>,
    {
        let current: BTreeMap<E::Key, E> = records.into_iter().map(|r| (r.key(), r)).collect();
        let previous = std::mem::replace(&mut self.current, current);

        self.dropped = previous
            .iter()
            .filter(|(key, _)| !self.current.contains_key(*key))
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();
        self.new = self
            .current
            .iter()
            .filter(|(key, _)| !previous.contains_key(*key))
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();
        self.previous = previous;

        for record in self.dropped.values() {
            log.push(record.vanished());
        }
        for record in self.new.values() {
            log.push(record.appeared());
        }

        tracing::debug!(
            kind = %E::KIND,
            current = self.current.len(),
            new = self.new.len(),
            dropped = self.dropped.len(),
            "generation updated"
        );
    }
}

impl<K: Ord, E> Generation<K, E> {
    /// Keys present in both the current and the previous generation.
    pub fn retained(&self) -> impl Iterator<Item = &K> {
        self.current
            .keys()
            .filter(move |key| self.previous.contains_key(*key))
    }
}

/// Entity state of all four tracked kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshotSet {
    pub processes: Generation<i64, Process>,
    pub services: Generation<String, Service>,
    pub clients: Generation<String, Client>,
    pub topics: Generation<String, Topic>,
}

impl EntitySnapshotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct hosts referenced by the current processes.
    pub fn process_hosts(&self) -> BTreeSet<String> {
        self.processes
            .current
            .values()
            .filter(|p| !p.hname.is_empty())
            .map(|p| p.hname.clone())
            .collect()
    }

    /// Current process ids grouped by host.
    pub fn pids_by_host(&self) -> BTreeMap<String, BTreeSet<i64>> {
        let mut by_host: BTreeMap<String, BTreeSet<i64>> = BTreeMap::new();
        for process in self.processes.current.values() {
            by_host
                .entry(process.hname.clone())
                .or_default()
                .insert(process.pid);
        }
        by_host
    }
}
