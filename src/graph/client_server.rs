//! Client/server graph: clients wired to the service they call.

use std::collections::BTreeMap;

use topowatch_types::{Client, GraphEdge, GraphNode, GraphSet, Service, StatValue};

use super::arcs::apply_cpu_arcs;
use crate::perf::PerfSnapshot;

/// Fold current clients and services into the client/server graph.
///
/// Client and service nodes are both keyed by `sid`. A client is paired with
/// the service of the same `sname`.
pub fn client_server_graph(
    clients: &BTreeMap<String, Client>,
    services: &BTreeMap<String, Service>,
    perf: &PerfSnapshot,
) -> GraphSet {
    let mut graph = GraphSet::new();

    for service in services.values() {
        let mut node = GraphNode::new(service.sid.clone(), service.sname.clone());
        node.subtitle = Some(service.hname.clone());
        node.mainstat = Some(StatValue::Int(service.pid));
        node.secondarystat = Some(StatValue::Text(service.uname.clone()));
        apply_cpu_arcs(&mut node, perf.record(&service.hname, service.pid));
        node.set_detail("role", "server");
        node.set_detail("pname", service.pname.clone());
        graph.nodes.insert(service.sid.clone(), node);
    }

    for client in clients.values() {
        let mut node = GraphNode::new(client.sid.clone(), client.uname.clone());
        node.subtitle = Some(client.hname.clone());
        node.mainstat = Some(StatValue::Int(client.pid));
        node.secondarystat = Some(StatValue::Text(client.sname.clone()));
        apply_cpu_arcs(&mut node, perf.record(&client.hname, client.pid));
        node.set_detail("role", "client");
        node.set_detail("pname", client.pname.clone());
        node.set_detail("version", client.version);
        graph.nodes.insert(client.sid.clone(), node);

        if let Some(service) = services.get(&client.sname) {
            let id = format!("{}_{}", client.sid, service.sid);
            let mut edge = GraphEdge::new(id.clone(), client.sid.clone(), service.sid.clone());
            edge.mainstat = Some(StatValue::Text(service.sname.clone()));
            graph.edges.insert(id, edge);
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use topowatch_types::PerformanceRecord;

    fn service(sname: &str, sid: &str, pid: i64) -> Service {
        Service {
            sname: sname.into(),
            sid: sid.into(),
            pid,
            hname: "H1".into(),
            ..Default::default()
        }
    }

    fn client(sid: &str, sname: &str, pid: i64) -> Client {
        Client {
            sid: sid.into(),
            sname: sname.into(),
            pid,
            hname: "H2".into(),
            ..Default::default()
        }
    }

    #[test]
    fn clients_pair_by_service_name() {
        let services: BTreeMap<_, _> = [service("math", "s1", 1), service("echo", "s2", 2)]
            .into_iter()
            .map(|s| (s.sname.clone(), s))
            .collect();
        let clients: BTreeMap<_, _> = [client("c1", "math", 3), client("c2", "missing", 4)]
            .into_iter()
            .map(|c| (c.sid.clone(), c))
            .collect();

        let graph = client_server_graph(&clients, &services, &PerfSnapshot::default());

        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges["c1_s1"];
        assert_eq!(edge.source, "c1");
        assert_eq!(edge.target, "s1");
    }

    #[test]
    fn nodes_carry_cpu_arcs() {
        let services: BTreeMap<_, _> = [service("math", "s1", 1)]
            .into_iter()
            .map(|s| (s.sname.clone(), s))
            .collect();
        let mut perf = PerfSnapshot::default();
        let mut record = PerformanceRecord::unknown("H1", 1);
        record.cpu_load = 50.0;
        perf.insert_record(record);

        let graph = client_server_graph(&BTreeMap::new(), &services, &perf);

        assert_eq!(graph.nodes["s1"].arc("cpu_used"), Some(0.5));
        assert_eq!(graph.nodes["s1"].arc("cpu_unused"), Some(0.5));
    }
}
