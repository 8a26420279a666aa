//! Process graph: one node per `(host, pid)`, edges between paired processes.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use topowatch_types::{GraphEdge, GraphNode, GraphSet, StatValue, Topic};

use super::arcs::{accumulate, append_text, apply_cpu_arcs};
use super::pairings;
use crate::perf::PerfSnapshot;

/// Node id of the process owning `topic`.
pub fn process_node_id(topic: &Topic) -> String {
    format!("{}_{}", topic.hname, topic.pid)
}

/// Fold the current topics into the process graph.
///
/// A process owning several topics gets one node whose `mainstat` lists the
/// additional topic names. Edge thickness counts pairings and is not capped.
pub fn process_graph(topics: &BTreeMap<String, Topic>, perf: &PerfSnapshot) -> GraphSet {
    let mut graph = GraphSet::new();

    for topic in topics.values() {
        let id = process_node_id(topic);
        if let Some(node) = graph.nodes.get_mut(&id) {
            append_text(&mut node.mainstat, &topic.tname);
            continue;
        }

        let title = if topic.uname.is_empty() {
            &topic.pname
        } else {
            &topic.uname
        };
        let mut node = GraphNode::new(id.clone(), title.clone());
        node.subtitle = Some(topic.hname.clone());
        node.mainstat = Some(StatValue::Text(topic.pid.to_string()));
        node.secondarystat = Some(StatValue::Text(topic.tname.clone()));
        apply_cpu_arcs(&mut node, perf.record(&topic.hname, topic.pid));
        node.set_detail("pname", topic.pname.clone());
        node.set_detail("uname", topic.uname.clone());
        graph.nodes.insert(id, node);
    }

    for (publisher, subscribers) in pairings(topics) {
        let source = process_node_id(publisher);
        for subscriber in subscribers {
            let target = process_node_id(subscriber);
            if source == target {
                continue;
            }

            match graph.edges.entry(format!("{source}_{target}")) {
                Entry::Occupied(mut entry) => {
                    let edge = entry.get_mut();
                    edge.thickness += 1;
                    accumulate(&mut edge.mainstat, publisher.throughput);
                    append_text(&mut edge.secondarystat, &publisher.tname);
                }
                Entry::Vacant(entry) => {
                    let mut edge =
                        GraphEdge::new(entry.key().clone(), source.clone(), target.clone());
                    edge.mainstat = Some(StatValue::Int(publisher.throughput));
                    edge.secondarystat = Some(StatValue::Text(publisher.tname.clone()));
                    entry.insert(edge);
                }
            }
        }
    }

    graph
}
