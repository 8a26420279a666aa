//! # topowatch
//!
//! A topology and health monitor for publish/subscribe middleware.
//!
//! Each poll cycle takes one inventory snapshot of the bus (processes,
//! topics, services, clients), diffs it against the previous generation,
//! enriches processes with per-host performance data, and rebuilds the
//! host, process, topic and client/server graphs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌─────────┐   ┌────────┐
//! │  source  │──▶│ normalize │──▶│   state   │──▶│  graph  │──▶│ output │
//! │ (input)  │   │ (validate)│   │(generation)   │(project)│   │        │
//! └──────────┘   └───────────┘   └─────┬─────┘   └────▲────┘   └────────┘
//!                                      │ hosts        │
//!                                ┌─────▼─────┐   ┌────┴────┐
//!                                │   feed    │──▶│  perf   │
//!                                │(per host) │   │ (index) │
//!                                └───────────┘   └─────────┘
//! ```
//!
//! - **[`source`]**: where snapshots come from ([`DataSource`] trait)
//! - **[`normalize`]**: raw records to typed entities, rejecting invalid ones
//! - **[`state`]**: current, previous, new and dropped sets per entity kind
//! - **[`feed`]**: one enrichment feed per host, reconciled every cycle
//! - **[`perf`]**: the performance index the feeds write into
//! - **[`graph`]**: the topology projections
//! - **[`monitor`]**: the poll cycle tying everything together
//!
//! ## Usage
//!
//! ```
//! use topowatch::Monitor;
//! use topowatch_types::{RawLayer, RawProcess, RawSnapshot, RawTopic};
//!
//! let raw = RawSnapshot {
//!     processes: vec![RawProcess {
//!         pid: Some(42),
//!         hname: Some("robot".into()),
//!         ..Default::default()
//!     }],
//!     topics: vec![RawTopic {
//!         tid: Some("7".into()),
//!         pid: Some(42),
//!         hname: Some("robot".into()),
//!         tname: Some("camera".into()),
//!         direction: Some("publisher".into()),
//!         layer: vec![RawLayer::new("shm", true)],
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//!
//! let mut monitor = Monitor::new();
//! let report = monitor.cycle(&raw);
//!
//! assert_eq!(report.generation, 1);
//! assert!(report.topology.topic.node("camera").is_some());
//! ```
//!
//! ### Running in the background
//!
//! ```no_run
//! use std::time::Duration;
//! use topowatch::{FileSource, Monitor, Output};
//!
//! # tokio_test::block_on(async {
//! let source = Box::new(FileSource::new("monitor.json"));
//! let handle = Monitor::new().start(
//!     source,
//!     vec![Output::file("topology.json")],
//!     Duration::from_secs(1),
//! );
//! // ...
//! let monitor = handle.stop().await.unwrap();
//! # });
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod graph;
pub mod monitor;
pub mod normalize;
pub mod output;
pub mod perf;
pub mod redact;
pub mod source;
pub mod state;

// Re-export main types for convenience
pub use config::{LogFormat, RedactSettings, Settings};
pub use error::{FeedError, RedactError, SourceError, ValidationError};
pub use feed::{
    FeedConnector, FeedPump, FeedReconciler, FeedSink, FeedSubscription, FileFeedConnector,
    HostFeedMessage, IdleConnector, ReconcileOutcome,
};
pub use graph::{Topology, TopicTreeItem};
pub use monitor::{CycleReport, Monitor, MonitorBuilder, MonitorHandle};
pub use normalize::{LayerPolicy, NormalizedSnapshot, Normalizer};
pub use output::Output;
pub use perf::{PerfSnapshot, PerformanceIndex};
pub use redact::{RedactField, Redactor};
pub use source::{ChannelSource, DataSource, FileSource};
pub use state::{EntitySnapshotSet, EventLog, Generation};
