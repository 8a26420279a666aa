//! The performance index: live per-(host, pid) counters from host feeds.
//!
//! The index is written by feed reports arriving independently of the poll
//! loop and read in bulk by the graph builder. Buckets are per host, so
//! reports for different hosts never contend.
//!
//! Locking: the host map sits behind an `RwLock`; each bucket behind its own
//! `Mutex`. Writers hold the map's read lock while they lock a bucket, so
//! removing a host (which needs the write lock) waits for in-flight writes
//! and a write can never recreate a removed host.

mod report;
mod usage;

pub use report::{host_from_report, record_from_report};
pub use usage::{cpu_usage, disk_usage, ram_usage, round_to, Usage, HEALTH_THRESHOLD};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use topowatch_types::{Host, PerformanceRecord, RawHostReport};

#[derive(Debug)]
struct HostBucket {
    epoch: u64,
    host: Option<Host>,
    tracked: BTreeSet<i64>,
    records: BTreeMap<i64, PerformanceRecord>,
}

impl HostBucket {
    fn new(epoch: u64) -> Self {
        Self {
            epoch,
            host: None,
            tracked: BTreeSet::new(),
            records: BTreeMap::new(),
        }
    }
}

/// Result of applying one host report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The report was applied; `records` tracked processes were upserted.
    Applied { records: usize },
    /// The host is not registered, or was re-registered since the feed began.
    Stale,
}

/// Thread-safe store of host state and process performance records.
#[derive(Debug, Default)]
pub struct PerformanceIndex {
    hosts: RwLock<BTreeMap<String, Mutex<HostBucket>>>,
    next_epoch: AtomicU64,
}

impl PerformanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start accepting data for `hname`, discarding anything held for it.
    ///
    /// Returns the registration epoch feed reports must carry.
    pub fn register_host(&self, hname: &str) -> u64 {
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed) + 1;
        self.hosts
            .write()
            .insert(hname.to_string(), Mutex::new(HostBucket::new(epoch)));
        epoch
    }

    /// Stop accepting data for `hname` and drop its entries.
    pub fn remove_host(&self, hname: &str) -> bool {
        self.hosts.write().remove(hname).is_some()
    }

    pub fn is_registered(&self, hname: &str) -> bool {
        self.hosts.read().contains_key(hname)
    }

    /// Current registration epoch of `hname`.
    pub fn epoch(&self, hname: &str) -> Option<u64> {
        self.hosts.read().get(hname).map(|bucket| bucket.lock().epoch)
    }

    /// Registered hosts, in name order.
    pub fn hosts(&self) -> Vec<String> {
        self.hosts.read().keys().cloned().collect()
    }

    /// Replace the set of pids whose reports are accepted for `hname`.
    pub fn track_pids(&self, hname: &str, pids: BTreeSet<i64>) {
        if let Some(bucket) = self.hosts.read().get(hname) {
            bucket.lock().tracked = pids;
        }
    }

    /// Overwrite the record of `(hname, pid)`.
    ///
    /// A no-op returning `false` when the host is not registered.
    pub fn upsert(&self, hname: &str, pid: i64, record: PerformanceRecord) -> bool {
        let hosts = self.hosts.read();
        let Some(bucket) = hosts.get(hname) else {
            return false;
        };
        bucket.lock().records.insert(pid, record);
        true
    }

    /// Apply a feed report for `hname` taken under registration `epoch`.
    ///
    /// Updates the host record and upserts every tracked process listed in
    /// the report. Reports from an outdated registration are dropped.
    pub fn apply_report(&self, hname: &str, epoch: u64, report: &RawHostReport) -> ReportOutcome {
        let hosts = self.hosts.read();
        let Some(bucket) = hosts.get(hname) else {
            return ReportOutcome::Stale;
        };
        let mut bucket = bucket.lock();
        if bucket.epoch != epoch {
            return ReportOutcome::Stale;
        }

        bucket.host = Some(host_from_report(hname, report));

        let mut applied = 0;
        for process in &report.process {
            let Some(record) = record_from_report(hname, process) else {
                continue;
            };
            if bucket.tracked.contains(&record.pid) {
                bucket.records.insert(record.pid, record);
                applied += 1;
            }
        }
        ReportOutcome::Applied { records: applied }
    }

    pub fn record(&self, hname: &str, pid: i64) -> Option<PerformanceRecord> {
        let hosts = self.hosts.read();
        let bucket = hosts.get(hname)?.lock();
        bucket.records.get(&pid).cloned()
    }

    /// Number of performance records across all hosts.
    pub fn len(&self) -> usize {
        self.hosts
            .read()
            .values()
            .map(|bucket| bucket.lock().records.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consistent-per-host copy of the whole index for one graph build.
    pub fn snapshot(&self) -> PerfSnapshot {
        let hosts = self.hosts.read();
        let mut snapshot = PerfSnapshot::default();
        for (hname, bucket) in hosts.iter() {
            let bucket = bucket.lock();
            if let Some(host) = &bucket.host {
                snapshot.hosts.insert(hname.clone(), host.clone());
            }
            if !bucket.records.is_empty() {
                snapshot.records.insert(hname.clone(), bucket.records.clone());
            }
        }
        snapshot
    }
}

/// Point-in-time copy of the performance index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerfSnapshot {
    pub hosts: BTreeMap<String, Host>,
    pub records: BTreeMap<String, BTreeMap<i64, PerformanceRecord>>,
}

impl PerfSnapshot {
    pub fn host(&self, hname: &str) -> Option<&Host> {
        self.hosts.get(hname)
    }

    pub fn record(&self, hname: &str, pid: i64) -> Option<&PerformanceRecord> {
        self.records.get(hname)?.get(&pid)
    }

    /// Insert a record directly. Used to build graphs from fixed inputs.
    pub fn insert_record(&mut self, record: PerformanceRecord) {
        self.records
            .entry(record.hname.clone())
            .or_default()
            .insert(record.pid, record);
    }

    pub fn insert_host(&mut self, host: Host) {
        self.hosts.insert(host.hname.clone(), host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use topowatch_types::{RawHostProcess, RawMemory, RawProcessCpu};

    fn report(pids: &[i64]) -> RawHostReport {
        RawHostReport {
            cpu_load: Some(50.0),
            memory: Some(RawMemory {
                total: Some(100),
                available: Some(40),
            }),
            process: pids
                .iter()
                .map(|pid| RawHostProcess {
                    id: Some(*pid),
                    cpu: Some(RawProcessCpu {
                        cpu_load: Some(10.0),
                        ..Default::default()
                    }),
                    memory: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn upsert_for_unregistered_host_is_noop() {
        let index = PerformanceIndex::new();
        assert!(!index.upsert("H1", 1, PerformanceRecord::unknown("H1", 1)));
        assert!(index.is_empty());

        index.register_host("H1");
        assert!(index.upsert("H1", 1, PerformanceRecord::unknown("H1", 1)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn removal_prunes_host_entries() {
        let index = PerformanceIndex::new();
        index.register_host("H1");
        index.register_host("H2");
        index.upsert("H1", 1, PerformanceRecord::unknown("H1", 1));
        index.upsert("H2", 2, PerformanceRecord::unknown("H2", 2));

        assert!(index.remove_host("H1"));

        assert!(index.record("H1", 1).is_none());
        assert!(index.record("H2", 2).is_some());
        assert_eq!(index.hosts(), vec!["H2".to_string()]);
    }

    #[test]
    fn reports_only_upsert_tracked_pids() {
        let index = PerformanceIndex::new();
        let epoch = index.register_host("H1");
        index.track_pids("H1", BTreeSet::from([42]));

        let outcome = index.apply_report("H1", epoch, &report(&[42, 43, 44]));

        assert_eq!(outcome, ReportOutcome::Applied { records: 1 });
        assert_eq!(index.record("H1", 42).map(|r| r.cpu_load), Some(10.0));
        assert!(index.record("H1", 43).is_none());

        let snapshot = index.snapshot();
        assert_eq!(snapshot.host("H1").map(|h| h.total_memory), Some(100));
    }

    #[test]
    fn stale_epoch_loses_silently() {
        let index = PerformanceIndex::new();
        let old = index.register_host("H1");
        index.remove_host("H1");
        assert_eq!(index.apply_report("H1", old, &report(&[])), ReportOutcome::Stale);

        let new = index.register_host("H1");
        assert_ne!(old, new);
        index.track_pids("H1", BTreeSet::from([1]));
        assert_eq!(index.apply_report("H1", old, &report(&[1])), ReportOutcome::Stale);
        assert!(index.snapshot().hosts.is_empty());
        assert_eq!(
            index.apply_report("H1", new, &report(&[1])),
            ReportOutcome::Applied { records: 1 }
        );
    }

    #[test]
    fn concurrent_writers_on_different_hosts() {
        let index = Arc::new(PerformanceIndex::new());
        let hosts: Vec<String> = (0..8).map(|i| format!("H{i}")).collect();
        for host in &hosts {
            index.register_host(host);
        }

        let handles: Vec<_> = hosts
            .iter()
            .cloned()
            .map(|host| {
                let index = index.clone();
                std::thread::spawn(move || {
                    for pid in 0..100 {
                        index.upsert(&host, pid, PerformanceRecord::unknown(host.as_str(), pid));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(index.len(), 800);
        assert_eq!(index.snapshot().records.len(), 8);
    }
}
