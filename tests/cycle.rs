//! Whole-cycle behaviour of the monitor.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use topowatch::{
    ChannelSource, FeedConnector, FeedError, FeedSink, FeedSubscription, LayerPolicy, Monitor,
    Output, RedactField, Redactor, Topology,
};
use topowatch_types::{
    Level, RawClient, RawHostProcess, RawHostReport, RawLayer, RawMemory, RawProcess,
    RawProcessCpu, RawService, RawSnapshot, RawTopic, StatValue,
};

fn process(pid: i64, hname: &str) -> RawProcess {
    RawProcess {
        pid: Some(pid),
        hname: Some(hname.into()),
        pname: Some(format!("/usr/bin/node{pid}")),
        uname: Some(format!("node{pid}")),
        ..Default::default()
    }
}

fn topic(
    tid: &str,
    pid: i64,
    hname: &str,
    tname: &str,
    direction: &str,
    tsize: i64,
    dfreq: i64,
) -> RawTopic {
    RawTopic {
        tid: Some(tid.into()),
        pid: Some(pid),
        hname: Some(hname.into()),
        tname: Some(tname.into()),
        direction: Some(direction.into()),
        layer: vec![RawLayer::new("shm", true)],
        tsize: Some(tsize),
        dfreq: Some(dfreq),
        ..Default::default()
    }
}

fn int(stat: &Option<StatValue>) -> Option<i64> {
    stat.as_ref().and_then(StatValue::as_i64)
}

#[test]
fn same_host_pairing_accumulates_on_the_node() {
    let raw = RawSnapshot {
        processes: vec![process(1, "H1"), process(2, "H1")],
        topics: vec![
            topic("10", 1, "H1", "camera", "publisher", 10, 2000),
            topic("11", 2, "H1", "camera", "subscriber", 0, 0),
        ],
        ..Default::default()
    };

    let report = Monitor::new().cycle(&raw);
    let host = &report.topology.host;

    assert_eq!(host.nodes.len(), 1);
    assert_eq!(int(&host.nodes["H1"].mainstat), Some(20_000));
    assert!(host.edges.is_empty());
}

#[test]
fn cross_host_pairings_share_one_edge() {
    let mut raw = RawSnapshot {
        processes: vec![process(1, "H1"), process(2, "H2")],
        topics: vec![
            topic("10", 1, "H1", "camera", "publisher", 10, 2000),
            topic("20", 2, "H2", "camera", "subscriber", 0, 0),
        ],
        ..Default::default()
    };
    let mut monitor = Monitor::new();

    let report = monitor.cycle(&raw);
    let edge = report.topology.host.edge("H1_H2").unwrap();
    assert_eq!(int(&edge.mainstat), Some(20_000));
    assert_eq!(edge.thickness, 1);

    raw.processes.push(process(3, "H1"));
    raw.topics
        .push(topic("12", 3, "H1", "camera", "publisher", 10, 2000));

    let report = monitor.cycle(&raw);
    let edge = report.topology.host.edge("H1_H2").unwrap();
    assert_eq!(int(&edge.mainstat), Some(40_000));
    assert_eq!(edge.thickness, 2);
    assert_eq!(report.topology.host.edges.len(), 1);
}

#[test]
fn vanished_process_is_dropped_with_one_warning() {
    let mut monitor = Monitor::new();
    monitor.cycle(&RawSnapshot {
        processes: vec![process(7, "H1"), process(8, "H1")],
        ..Default::default()
    });

    let report = monitor.cycle(&RawSnapshot {
        processes: vec![process(8, "H1")],
        ..Default::default()
    });

    assert!(report.entities.processes.dropped.contains_key(&7));
    let warnings: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.level == Level::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("id=7"));
    assert!(warnings[0].message.contains("host=H1"));
}

#[test]
fn missing_performance_record_leaves_cpu_arcs_unset() {
    let raw = RawSnapshot {
        processes: vec![process(42, "H1")],
        topics: vec![topic("1", 42, "H1", "camera", "publisher", 10, 2000)],
        ..Default::default()
    };

    let report = Monitor::new().cycle(&raw);
    let node = report.topology.process.node("H1_42").unwrap();

    assert_eq!(node.arc("cpu_used"), None);
    assert_eq!(node.arc("cpu_unused"), None);
    assert_eq!(node.arcs().count(), 0);
}

#[test]
fn generations_satisfy_set_algebra() {
    let batches: Vec<Vec<i64>> = vec![
        vec![1, 2, 3],
        vec![2, 3, 4],
        vec![],
        vec![5],
        vec![5, 6, 1],
        vec![5, 6, 1],
    ];
    let mut monitor = Monitor::new();

    for pids in batches {
        let raw = RawSnapshot {
            processes: pids.iter().map(|pid| process(*pid, "H1")).collect(),
            ..Default::default()
        };
        let report = monitor.cycle(&raw);
        let g = &report.entities.processes;

        let current: BTreeSet<i64> = g.current.keys().copied().collect();
        let previous: BTreeSet<i64> = g.previous.keys().copied().collect();
        let new: BTreeSet<i64> = g.new.keys().copied().collect();
        let dropped: BTreeSet<i64> = g.dropped.keys().copied().collect();
        let retained: BTreeSet<i64> = current.intersection(&previous).copied().collect();

        assert!(dropped.is_disjoint(&new));
        assert_eq!(&dropped | &retained, previous);
        assert_eq!(&new | &retained, current);
        assert_eq!(g.retained().copied().collect::<BTreeSet<_>>(), retained);
    }
}

#[test]
fn thickness_is_capped() {
    let mut raw = RawSnapshot {
        processes: vec![process(1, "H1"), process(2, "H2")],
        topics: vec![topic("sub", 2, "H2", "lidar", "subscriber", 0, 0)],
        ..Default::default()
    };
    for i in 0..30 {
        raw.topics
            .push(topic(&format!("pub{i:02}"), 1, "H1", "lidar", "publisher", 1, 1000));
    }

    let report = Monitor::new().cycle(&raw);
    let edge = report.topology.host.edge("H1_H2").unwrap();

    assert_eq!(edge.thickness, 20);
    assert_eq!(int(&edge.mainstat), Some(30_000));
    assert!(report
        .topology
        .host
        .edges
        .values()
        .all(|e| e.thickness <= 20));
}

fn mixed_inventory() -> RawSnapshot {
    RawSnapshot {
        processes: vec![process(1, "H1"), process(2, "H2"), process(3, "H3")],
        topics: vec![
            topic("a", 1, "H1", "camera", "publisher", 100, 30_000),
            topic("b", 2, "H2", "camera", "subscriber", 0, 0),
            topic("c", 3, "H3", "camera", "subscriber", 0, 0),
            topic("d", 3, "H3", "odom", "publisher", 48, 100_000),
            topic("e", 1, "H1", "odom", "subscriber", 0, 0),
            topic("f", 2, "H2", "odom", "publisher", 48, 50_000),
            topic("g", 2, "H2", "odom", "subscriber", 0, 0),
        ],
        services: vec![RawService {
            sname: Some("planner".into()),
            sid: Some("s1".into()),
            pid: Some(1),
            hname: Some("H1".into()),
            ..Default::default()
        }],
        clients: vec![RawClient {
            sid: Some("c1".into()),
            sname: Some("planner".into()),
            pid: Some(2),
            hname: Some("H2".into()),
            ..Default::default()
        }],
    }
}

#[test]
fn graphs_do_not_depend_on_record_order() {
    let base = mixed_inventory();
    let expected = Monitor::new().cycle(&base).topology;

    let mut reversed = base.clone();
    reversed.processes.reverse();
    reversed.topics.reverse();

    let mut rotated = base.clone();
    rotated.topics.rotate_left(3);

    let mut interleaved = base.clone();
    interleaved.topics.sort_by_key(|t| t.tname.clone());

    for permutation in [reversed, rotated, interleaved] {
        let topology = Monitor::new().cycle(&permutation).topology;
        assert_eq!(topology, expected);
    }
}

#[test]
fn empty_input_yields_empty_graphs() {
    let report = Monitor::new().cycle(&RawSnapshot::default());

    assert_eq!(report.topology, Topology::default());
    assert!(report.topology.is_empty());
    assert!(report.events.is_empty());
}

#[test]
fn invalid_records_are_skipped_individually() {
    let mut raw = mixed_inventory();
    raw.topics.push(RawTopic {
        tid: Some("bad".into()),
        pid: Some(1),
        hname: Some("H1".into()),
        tname: Some("camera".into()),
        direction: Some("publisher".into()),
        layer: vec![RawLayer::new("shm", true), RawLayer::new("udp", true)],
        ..Default::default()
    });
    raw.processes.push(RawProcess::default());

    let strict = Monitor::new().cycle(&raw);
    assert_eq!(strict.entities.topics.current.len(), 7);
    assert_eq!(strict.entities.processes.current.len(), 3);
    assert_eq!(
        strict
            .events
            .iter()
            .filter(|e| e.message.starts_with("[INVALID"))
            .count(),
        2
    );

    let lenient = Monitor::builder()
        .layer_policy(LayerPolicy::FirstActive)
        .build()
        .cycle(&raw);
    assert_eq!(lenient.entities.topics.current["bad"].layer.as_deref(), Some("shm"));
}

/// Delivers a fixed report for each host as soon as the feed connects.
#[derive(Debug, Default)]
struct ReplayConnector {
    reports: BTreeMap<String, RawHostReport>,
    unreachable: BTreeSet<String>,
}

#[derive(Debug)]
struct Noop;

impl FeedSubscription for Noop {
    fn cancel(&mut self) {}
}

impl FeedConnector for ReplayConnector {
    fn connect(
        &mut self,
        host: &str,
        sink: FeedSink,
    ) -> Result<Box<dyn FeedSubscription>, FeedError> {
        if self.unreachable.contains(host) {
            return Err(FeedError::Unavailable {
                host: host.to_string(),
                reason: "agent offline".into(),
            });
        }
        if let Some(report) = self.reports.get(host) {
            sink.push(report.clone())?;
        }
        Ok(Box::new(Noop))
    }
}

fn host_report(total_memory: i64, pid: i64, cpu_load: f64) -> RawHostReport {
    RawHostReport {
        cpu_load: Some(25.0),
        memory: Some(RawMemory {
            total: Some(total_memory),
            available: Some(0),
        }),
        process: vec![
            RawHostProcess {
                id: Some(pid),
                cpu: Some(RawProcessCpu {
                    cpu_load: Some(cpu_load),
                    ..Default::default()
                }),
                memory: None,
            },
            RawHostProcess {
                id: Some(9999),
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

#[test]
fn feed_reports_enrich_the_next_cycle() {
    let mut connector = ReplayConnector::default();
    connector
        .reports
        .insert("H1".into(), host_report(0, 42, 37.5));
    let mut monitor = Monitor::builder().connector(Box::new(connector)).build();

    let raw = RawSnapshot {
        processes: vec![process(42, "H1")],
        topics: vec![topic("1", 42, "H1", "camera", "publisher", 10, 2000)],
        ..Default::default()
    };

    let first = monitor.cycle(&raw);
    assert!(first.performance.records.is_empty());

    let second = monitor.cycle(&raw);
    let node = second.topology.process.node("H1_42").unwrap();
    assert_eq!(node.arc("cpu_used"), Some(0.375));
    assert_eq!(node.arc("cpu_unused"), Some(0.625));
    assert!(second.performance.record("H1", 9999).is_none());

    let host = second.topology.host.node("H1").unwrap();
    assert_eq!(host.detail("ram"), Some(&StatValue::Text("unknown".into())));
    assert_eq!(host.arc("ram_ok"), None);
    assert_eq!(host.arc("ram_not_ok"), None);
    assert!(host.arc("cpu_ok").unwrap() > 0.0);
}

#[test]
fn unreachable_host_is_retried_every_cycle() {
    let mut connector = ReplayConnector::default();
    connector.unreachable.insert("H2".into());
    let mut monitor = Monitor::builder().connector(Box::new(connector)).build();

    let raw = RawSnapshot {
        processes: vec![process(1, "H1"), process(2, "H2")],
        ..Default::default()
    };

    for _ in 0..2 {
        let report = monitor.cycle(&raw);
        let critical: Vec<_> = report
            .events
            .iter()
            .filter(|e| e.level == Level::Critical)
            .collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].message, "[STOPPED HOST] stop monitoring host H2");
    }
    assert_eq!(monitor.active_hosts(), vec!["H1"]);
}

#[test]
fn pseudonymized_hosts_are_fed_from_their_real_name() {
    let mut connector = ReplayConnector::default();
    connector
        .reports
        .insert("H1".into(), host_report(0, 42, 50.0));
    let redactor = Redactor::new([], [RedactField::Hname]).unwrap();
    let mut monitor = Monitor::builder()
        .redactor(redactor)
        .connector(Box::new(connector))
        .build();

    let raw = RawSnapshot {
        processes: vec![process(42, "H1")],
        ..Default::default()
    };

    let first = monitor.cycle(&raw);
    assert!(first.events.iter().all(|e| e.level != Level::Critical));
    assert!(first
        .events
        .iter()
        .any(|e| e.message == "[NEW HOST] start monitoring host hname-1"));
    assert!(first.events.iter().all(|e| !e.message.contains("H1")));
    assert_eq!(monitor.active_hosts(), vec!["hname-1"]);

    let second = monitor.cycle(&raw);
    let node = second.topology.process.node("hname-1_42").unwrap();
    assert_eq!(node.arc("cpu_used"), Some(0.5));
    assert!(second.performance.record("H1", 42).is_none());
}

#[tokio::test]
async fn feeds_keep_flowing_after_a_stopped_run() {
    let mut connector = ReplayConnector::default();
    connector
        .reports
        .insert("H1".into(), host_report(0, 42, 20.0));
    let monitor = Monitor::builder().connector(Box::new(connector)).build();

    let raw = RawSnapshot {
        processes: vec![process(42, "H1")],
        ..Default::default()
    };
    let (tx, source) = ChannelSource::create("test", 4);
    let (output, mut rx) = Output::channel(4);
    tx.send(raw.clone()).await.unwrap();

    let handle = monitor.start(Box::new(source), vec![output], Duration::from_millis(10));
    assert_eq!(rx.recv().await.unwrap().generation, 1);
    let mut monitor = handle.stop().await.unwrap();
    assert!(monitor.active_hosts().is_empty());

    // The stopped run cancelled the feed; reconnect, then read its report.
    monitor.cycle(&raw);
    let report = monitor.cycle(&raw);
    let node = report.topology.process.node("H1_42").unwrap();
    assert_eq!(node.arc("cpu_used"), Some(0.2));
}
