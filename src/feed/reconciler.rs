//! Keeps one feed subscription per host referenced by the current processes.

use std::collections::BTreeMap;

use tokio::sync::mpsc;

use super::{FeedConnector, FeedSink, FeedSubscription, HostFeedMessage};
use crate::perf::PerformanceIndex;
use crate::state::{EntitySnapshotSet, EventLog};

/// Hosts whose feed changed during one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Hosts whose subscription failed; they are retried next cycle.
    pub failed: Vec<String>,
}

/// Adds and removes host feeds as hosts appear and vanish.
#[derive(Debug)]
pub struct FeedReconciler {
    connector: Box<dyn FeedConnector>,
    active: BTreeMap<String, Box<dyn FeedSubscription>>,
    tx: mpsc::Sender<HostFeedMessage>,
}

impl FeedReconciler {
    pub fn new(connector: Box<dyn FeedConnector>, tx: mpsc::Sender<HostFeedMessage>) -> Self {
        Self {
            connector,
            active: BTreeMap::new(),
            tx,
        }
    }

    /// Hosts with a live subscription.
    pub fn active_hosts(&self) -> Vec<String> {
        self.active.keys().cloned().collect()
    }

    /// Bring the active feeds in line with the hosts of the current processes.
    ///
    /// Removed hosts are cancelled and pruned from the index. Added hosts are
    /// registered, then connected; a failed connection unregisters the host
    /// again so it shows up as added on the next cycle. Tracked pids of every
    /// active host are refreshed.
    pub fn reconcile(
        &mut self,
        entities: &EntitySnapshotSet,
        index: &PerformanceIndex,
        log: &mut EventLog,
    ) -> ReconcileOutcome {
        self.reconcile_with(entities, index, log, |host| host.to_string())
    }

    /// Like [`reconcile`](Self::reconcile), but the connector is asked for
    /// `address(host)` instead of `host`.
    ///
    /// Entity host names may be pseudonyms. The index, the sink and the log
    /// keep using them; only the connection goes to the real host.
    pub fn reconcile_with<F>(
        &mut self,
        entities: &EntitySnapshotSet,
        index: &PerformanceIndex,
        log: &mut EventLog,
        address: F,
    ) -> ReconcileOutcome
    where
        F: Fn(&str) -> String,
    {
        let wanted = entities.process_hosts();
        let pids = entities.pids_by_host();
        let mut outcome = ReconcileOutcome::default();

        let to_remove: Vec<String> = self
            .active
            .keys()
            .filter(|host| !wanted.contains(*host))
            .cloned()
            .collect();
        for host in to_remove {
            if let Some(mut subscription) = self.active.remove(&host) {
                subscription.cancel();
            }
            index.remove_host(&host);
            log.info(format!("[STOPPED HOST] stop monitoring host {host}"));
            outcome.removed.push(host);
        }

        let to_add: Vec<String> = wanted
            .iter()
            .filter(|host| !self.active.contains_key(*host))
            .cloned()
            .collect();
        for host in to_add {
            let epoch = index.register_host(&host);
            index.track_pids(&host, pids.get(&host).cloned().unwrap_or_default());
            let sink = FeedSink::new(host.clone(), epoch, self.tx.clone());

            match self.connector.connect(&address(&host), sink) {
                Ok(subscription) => {
                    self.active.insert(host.clone(), subscription);
                    log.info(format!("[NEW HOST] start monitoring host {host}"));
                    outcome.added.push(host);
                }
                Err(err) => {
                    index.remove_host(&host);
                    tracing::warn!(host = %host, error = %err, "feed subscription failed");
                    log.critical(format!("[STOPPED HOST] stop monitoring host {host}"));
                    outcome.failed.push(host);
                }
            }
        }

        for host in self.active.keys() {
            index.track_pids(host, pids.get(host).cloned().unwrap_or_default());
        }

        outcome
    }

    /// Cancel every subscription.
    pub fn shutdown(&mut self, index: &PerformanceIndex) {
        for (host, mut subscription) in std::mem::take(&mut self.active) {
            subscription.cancel();
            index.remove_host(&host);
        }
    }
}

impl Drop for FeedReconciler {
    fn drop(&mut self) {
        for subscription in self.active.values_mut() {
            subscription.cancel();
        }
    }
}
