//! The monitor: one poll cycle per inventory snapshot.
//!
//! A cycle applies queued feed reports, redacts and normalizes the snapshot,
//! advances the entity generations, rebuilds every graph, reconciles the
//! host feeds and drains the transition log into a [`CycleReport`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use topowatch_types::{LogEvent, RawSnapshot, SchemaVersion};

use crate::feed::{feed_channel, FeedConnector, FeedPump, FeedReconciler, IdleConnector};
use crate::graph::Topology;
use crate::normalize::{LayerPolicy, Normalizer};
use crate::output::Output;
use crate::perf::{PerfSnapshot, PerformanceIndex};
use crate::redact::{RedactField, Redactor};
use crate::source::DataSource;
use crate::state::{EntitySnapshotSet, EventLog};

/// Default capacity of the shared feed channel.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// Everything one cycle produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub version: SchemaVersion,
    /// Cycle counter, starting at 1.
    pub generation: u64,
    /// Unix timestamp in milliseconds when the cycle ran.
    pub timestamp_ms: u64,
    pub entities: EntitySnapshotSet,
    pub performance: PerfSnapshot,
    pub events: Vec<LogEvent>,
    pub topology: Topology,
}

/// Aggregates entity state, performance data and graphs across cycles.
#[derive(Debug)]
pub struct Monitor {
    normalizer: Normalizer,
    redactor: Option<Redactor>,
    entities: EntitySnapshotSet,
    index: Arc<PerformanceIndex>,
    reconciler: FeedReconciler,
    pump: Option<FeedPump>,
    log: EventLog,
    generation: u64,
}

impl Monitor {
    /// A monitor with the strict layer policy and no feeds.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    /// Number of cycles run so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entities(&self) -> &EntitySnapshotSet {
        &self.entities
    }

    /// The shared performance index.
    pub fn index(&self) -> &Arc<PerformanceIndex> {
        &self.index
    }

    /// Hosts with a live feed subscription.
    pub fn active_hosts(&self) -> Vec<String> {
        self.reconciler.active_hosts()
    }

    /// Run one cycle over `raw`.
    pub fn cycle(&mut self, raw: &RawSnapshot) -> CycleReport {
        if let Some(pump) = self.pump.as_mut() {
            pump.drain();
        }

        let normalized = match self.redactor.as_mut() {
            Some(redactor) => {
                let mut redacted = raw.clone();
                redactor.apply(&mut redacted);
                self.normalizer.normalize(&redacted, &mut self.log)
            }
            None => self.normalizer.normalize(raw, &mut self.log),
        };

        self.entities
            .processes
            .update(normalized.processes, &mut self.log);
        self.entities.topics.update(normalized.topics, &mut self.log);
        self.entities
            .services
            .update(normalized.services, &mut self.log);
        self.entities
            .clients
            .update(normalized.clients, &mut self.log);

        let performance = self.index.snapshot();
        let topology = Topology::build(&self.entities, &performance);

        let redactor = self.redactor.as_ref();
        let outcome =
            self.reconciler
                .reconcile_with(&self.entities, &self.index, &mut self.log, |host| {
                    redactor
                        .and_then(|r| r.original(RedactField::Hname, host))
                        .unwrap_or(host)
                        .to_string()
                });

        self.generation += 1;
        tracing::debug!(
            generation = self.generation,
            processes = self.entities.processes.current.len(),
            topics = self.entities.topics.current.len(),
            hosts_added = outcome.added.len(),
            hosts_removed = outcome.removed.len(),
            hosts_failed = outcome.failed.len(),
            "cycle complete"
        );

        CycleReport {
            version: SchemaVersion::CURRENT,
            generation: self.generation,
            timestamp_ms: current_timestamp_ms(),
            entities: self.entities.clone(),
            performance,
            events: self.log.drain(),
            topology,
        }
    }

    /// Poll `source` every `interval` until `shutdown` turns true.
    ///
    /// Each new snapshot runs one cycle whose report goes to every output.
    /// Feed reports are applied as they arrive between cycles. All feeds are
    /// cancelled on return; the monitor can cycle or run again afterwards.
    pub async fn run(
        &mut self,
        mut source: Box<dyn DataSource>,
        outputs: Vec<Output>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval_timer = tokio::time::interval(interval);
        tracing::info!(source = source.description(), ?interval, "monitor started");

        loop {
            tokio::select! {
                _ = interval_timer.tick() => {
                    let Some(raw) = source.poll() else {
                        if let Some(err) = source.error() {
                            tracing::warn!(source = source.description(), error = err, "no snapshot");
                        }
                        continue;
                    };
                    let report = self.cycle(&raw);
                    for output in outputs.iter() {
                        if let Err(err) = output.emit(&report).await {
                            tracing::warn!(error = %err, "failed to emit report");
                        }
                    }
                }
                _ = next_feed_report(&mut self.pump) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.reconciler.shutdown(&self.index);
        tracing::info!(generation = self.generation, "monitor stopped");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn start(
        mut self,
        source: Box<dyn DataSource>,
        outputs: Vec<Output>,
        interval: Duration,
    ) -> MonitorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            self.run(source, outputs, interval, stop_rx).await;
            self
        });
        MonitorHandle { stop_tx, task }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a [`Monitor`].
#[derive(Debug, Default)]
pub struct MonitorBuilder {
    policy: LayerPolicy,
    redactor: Option<Redactor>,
    connector: Option<Box<dyn FeedConnector>>,
    feed_capacity: Option<usize>,
}

impl MonitorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer_policy(mut self, policy: LayerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Redact snapshots before normalization. A no-op redactor is ignored.
    pub fn redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = (!redactor.is_noop()).then_some(redactor);
        self
    }

    /// How host feeds are established. Defaults to [`IdleConnector`].
    pub fn connector(mut self, connector: Box<dyn FeedConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Monitor {
        let index = Arc::new(PerformanceIndex::new());
        let (tx, rx) = feed_channel(self.feed_capacity.unwrap_or(DEFAULT_FEED_CAPACITY));
        let connector = self
            .connector
            .unwrap_or_else(|| Box::new(IdleConnector));

        Monitor {
            normalizer: Normalizer::new(self.policy),
            redactor: self.redactor,
            entities: EntitySnapshotSet::new(),
            reconciler: FeedReconciler::new(connector, tx),
            pump: Some(FeedPump::new(rx, Arc::clone(&index))),
            index,
            log: EventLog::new(),
            generation: 0,
        }
    }
}

/// Handle for a monitor running in the background.
#[derive(Debug)]
pub struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<Monitor>,
}

impl MonitorHandle {
    /// Stop the monitor and get it back once the current cycle finished.
    pub async fn stop(self) -> Result<Monitor, tokio::task::JoinError> {
        let _ = self.stop_tx.send(true);
        self.task.await
    }
}

/// Apply the next feed report. Never completes once the channel is closed.
async fn next_feed_report(pump: &mut Option<FeedPump>) {
    if let Some(pump) = pump.as_mut() {
        if pump.next().await.is_some() {
            return;
        }
    }
    std::future::pending::<()>().await
}

fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
