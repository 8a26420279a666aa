//! Host graph: one node per host, edges for cross-host publications.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use topowatch_types::{GraphEdge, GraphNode, GraphSet, Host, StatValue, Topic};

use super::arcs::{accumulate, apply_health_arcs, usage_detail};
use super::{pairings, MAX_EDGE_THICKNESS, RADIUS_STEP};
use crate::perf::{cpu_usage, disk_usage, ram_usage, PerfSnapshot};

/// Fold the current topics into the host graph.
///
/// Same-host pairings add `tsize * dfreq` to the host node's `mainstat`.
/// Cross-host pairings accumulate into the edge `"<pub host>_<sub host>"`,
/// whose thickness grows by one per pairing up to the cap.
pub fn host_graph(topics: &BTreeMap<String, Topic>, perf: &PerfSnapshot) -> GraphSet {
    let mut graph = GraphSet::new();

    for topic in topics.values() {
        if !graph.nodes.contains_key(&topic.hname) {
            let node = host_node(&topic.hname, perf.host(&topic.hname));
            graph.nodes.insert(topic.hname.clone(), node);
        }
    }

    for (publisher, subscribers) in pairings(topics) {
        let weight = publisher.bandwidth();
        for subscriber in subscribers {
            if publisher.hname == subscriber.hname {
                if let Some(node) = graph.nodes.get_mut(&publisher.hname) {
                    accumulate(&mut node.mainstat, weight);
                }
                continue;
            }

            let id = format!("{}_{}", publisher.hname, subscriber.hname);
            match graph.edges.entry(id) {
                Entry::Occupied(mut entry) => {
                    let edge = entry.get_mut();
                    accumulate(&mut edge.mainstat, weight);
                    edge.thickness = (edge.thickness + 1).min(MAX_EDGE_THICKNESS);
                }
                Entry::Vacant(entry) => {
                    let mut edge = GraphEdge::new(
                        entry.key().clone(),
                        publisher.hname.clone(),
                        subscriber.hname.clone(),
                    );
                    edge.mainstat = Some(StatValue::Int(weight));
                    entry.insert(edge);
                }
            }
        }

        if let Some(node) = graph.nodes.get_mut(&publisher.hname) {
            node.radius += RADIUS_STEP;
        }
    }

    graph
}

fn host_node(hname: &str, host: Option<&Host>) -> GraphNode {
    let unreported;
    let host = match host {
        Some(host) => host,
        None => {
            unreported = Host::unknown(hname);
            &unreported
        }
    };

    let ram = ram_usage(host);
    let disk = disk_usage(host);
    let cpu = cpu_usage(host);

    let mut node = GraphNode::new(hname, hname);
    node.mainstat = Some(StatValue::Int(0));
    node.secondarystat = disk.percent().map(StatValue::Float);
    if !host.os.is_empty() {
        node.subtitle = Some(host.os.clone());
    }

    apply_health_arcs(&mut node, "ram", ram);
    apply_health_arcs(&mut node, "disk", disk);
    apply_health_arcs(&mut node, "cpu", cpu);

    node.set_detail("hname", hname);
    node.set_detail("ram", usage_detail(ram));
    node.set_detail("disk", usage_detail(disk));
    node.set_detail("cpu", usage_detail(cpu));
    node
}
