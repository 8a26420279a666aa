//! Topology graph projections.
//!
//! Each projection is a pure function of the current entity sets and a
//! performance snapshot. Graphs are rebuilt from scratch every cycle; no
//! node or edge survives into the next one.
//!
//! A publisher and a subscriber are paired when their topic names are equal;
//! a client and a service when their service names are equal. Iteration is
//! over key-ordered maps, so every projection is independent of the order in
//! which the bus listed its records.

mod arcs;
mod client_server;
mod host;
mod process;
mod topic;
mod tree;

pub use arcs::{apply_cpu_arcs, apply_health_arcs, usage_detail, HEALTH_SLICE};
pub use client_server::client_server_graph;
pub use host::host_graph;
pub use process::{process_graph, process_node_id};
pub use topic::topic_graph;
pub use tree::{topic_tree, TopicTreeItem};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use topowatch_types::{GraphSet, Topic};

use crate::perf::PerfSnapshot;
use crate::state::EntitySnapshotSet;

/// Host-graph edges never get thicker than this.
pub const MAX_EDGE_THICKNESS: u32 = 20;

/// Host node radius growth per publisher topic.
pub const RADIUS_STEP: u32 = 5;

/// Every publisher with the subscribers of its topic name, publishers in `tid` order.
pub(crate) fn pairings(topics: &BTreeMap<String, Topic>) -> Vec<(&Topic, Vec<&Topic>)> {
    let mut subscribers: BTreeMap<&str, Vec<&Topic>> = BTreeMap::new();
    for topic in topics.values().filter(|t| t.is_subscriber()) {
        subscribers.entry(topic.tname.as_str()).or_default().push(topic);
    }

    topics
        .values()
        .filter(|t| t.is_publisher())
        .map(|publisher| {
            let subs = subscribers
                .get(publisher.tname.as_str())
                .cloned()
                .unwrap_or_default();
            (publisher, subs)
        })
        .collect()
}

/// All projections of one generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub host: GraphSet,
    pub process: GraphSet,
    pub topic: GraphSet,
    pub client_server: GraphSet,
    pub topic_tree: Vec<TopicTreeItem>,
}

impl Topology {
    /// Build every projection from the current generation.
    pub fn build(entities: &EntitySnapshotSet, perf: &PerfSnapshot) -> Self {
        let topics = &entities.topics.current;
        Self {
            host: host_graph(topics, perf),
            process: process_graph(topics, perf),
            topic: topic_graph(topics, perf),
            client_server: client_server_graph(
                &entities.clients.current,
                &entities.services.current,
                perf,
            ),
            topic_tree: topic_tree(topics),
        }
    }

    /// True when every projection is empty.
    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
            && self.process.is_empty()
            && self.topic.is_empty()
            && self.client_server.is_empty()
            && self.topic_tree.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_topic(
    tid: &str,
    hname: &str,
    pid: i64,
    tname: &str,
    direction: topowatch_types::Direction,
    tsize: i64,
    dfreq: i64,
) -> Topic {
    Topic {
        tid: tid.to_string(),
        pid,
        hname: hname.to_string(),
        pname: format!("pname{pid}"),
        uname: format!("uname{pid}"),
        tname: tname.to_string(),
        direction,
        layer: Some("shm".to_string()),
        tsize,
        dfreq,
        dclock: 0,
        rclock: 0,
        message_drops: 0,
        connections_loc: 0,
        connections_ext: 0,
        throughput: crate::normalize::throughput(dfreq, tsize),
    }
}
