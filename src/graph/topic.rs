//! Pub/sub-topic graph: endpoint nodes wired through topic-name nodes.

use std::collections::{BTreeMap, BTreeSet};

use topowatch_types::{GraphEdge, GraphNode, GraphSet, StatValue, Topic};

use super::arcs::apply_cpu_arcs;
use crate::perf::PerfSnapshot;

/// Fold the current topics into the pub/sub-topic graph.
///
/// Every topic record becomes a node keyed by `tid` and an edge to (for
/// publishers) or from (for subscribers) a highlighted node keyed by the
/// topic name. The topic-name node is rewritten by every record sharing the
/// name; the record with the greatest `tid` is the one that remains.
///
/// A `tid` equal to some current topic name would merge the endpoint into
/// that name node. Such endpoints are keyed by [`endpoint_id`] instead.
pub fn topic_graph(topics: &BTreeMap<String, Topic>, perf: &PerfSnapshot) -> GraphSet {
    let mut graph = GraphSet::new();
    let names: BTreeSet<&str> = topics.values().map(|t| t.tname.as_str()).collect();

    for topic in topics.values() {
        let id = if names.contains(topic.tid.as_str()) {
            tracing::warn!(tid = %topic.tid, "topic id equals a topic name");
            endpoint_id(&topic.tid)
        } else {
            topic.tid.clone()
        };

        let mut node = GraphNode::new(id.clone(), topic.uname.clone());
        node.subtitle = Some(topic.hname.clone());
        node.mainstat = Some(StatValue::Int(topic.pid));
        node.secondarystat = Some(StatValue::Text(topic.tname.clone()));
        apply_cpu_arcs(&mut node, perf.record(&topic.hname, topic.pid));
        node.set_detail("pname", topic.pname.clone());
        node.set_detail("uname", topic.uname.clone());
        node.set_detail("dfreq", topic.dfreq);
        node.set_detail("tsize", topic.tsize);
        graph.nodes.insert(id.clone(), node);

        let mut name_node = GraphNode::new(topic.tname.clone(), topic.tname.clone());
        name_node.highlighted = true;
        name_node.subtitle = topic.layer.clone();
        name_node.mainstat = Some(StatValue::Int(topic.throughput));
        graph.nodes.insert(topic.tname.clone(), name_node);

        let (source, target) = if topic.is_publisher() {
            (&id, &topic.tname)
        } else {
            (&topic.tname, &id)
        };
        let mut edge = GraphEdge::new(format!("{source}_{target}"), source.clone(), target.clone());
        edge.mainstat = Some(StatValue::Int(topic.message_drops));
        graph.edges.insert(edge.id.clone(), edge);
    }

    graph
}

/// Node id of a topic endpoint whose `tid` collides with a topic name.
pub fn endpoint_id(tid: &str) -> String {
    format!("tid:{tid}")
}
