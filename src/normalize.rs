//! Validation and field derivation for raw inventory snapshots.
//!
//! Each raw record is normalized on its own. A record that fails validation
//! is skipped with a warning event; the rest of its batch and every other
//! entity kind proceed unaffected.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use topowatch_types::{
    Client, Direction, EntityKind, Process, RawClient, RawLayer, RawProcess, RawService,
    RawSnapshot, RawTopic, Service, Topic,
};

use crate::error::ValidationError;
use crate::state::EventLog;

/// How a topic's transport layer is chosen from its declared layer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerPolicy {
    /// Exactly one layer must be active; anything else rejects the topic.
    #[default]
    Strict,
    /// The first active layer, or none when no layer is active.
    FirstActive,
}

impl FromStr for LayerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(LayerPolicy::Strict),
            "first_active" => Ok(LayerPolicy::FirstActive),
            other => Err(format!("unknown layer policy: {other}")),
        }
    }
}

/// The validated records of one snapshot, plus what was rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSnapshot {
    pub processes: Vec<Process>,
    pub topics: Vec<Topic>,
    pub services: Vec<Service>,
    pub clients: Vec<Client>,
    pub rejected: Vec<ValidationError>,
}

/// Turns raw snapshots into validated entities.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    policy: LayerPolicy,
}

impl Normalizer {
    pub fn new(policy: LayerPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> LayerPolicy {
        self.policy
    }

    /// Normalize every record of `raw`, logging rejections and duplicate pids.
    pub fn normalize(&self, raw: &RawSnapshot, log: &mut EventLog) -> NormalizedSnapshot {
        let mut out = NormalizedSnapshot::default();

        for record in &raw.processes {
            match normalize_process(record) {
                Ok(process) => out.processes.push(process),
                Err(err) => out.rejected.push(err),
            }
        }
        for record in &raw.topics {
            match normalize_topic(record, self.policy) {
                Ok(topic) => out.topics.push(topic),
                Err(err) => out.rejected.push(err),
            }
        }
        for record in &raw.services {
            match normalize_service(record) {
                Ok(service) => out.services.push(service),
                Err(err) => out.rejected.push(err),
            }
        }
        for record in &raw.clients {
            match normalize_client(record) {
                Ok(client) => out.clients.push(client),
                Err(err) => out.rejected.push(err),
            }
        }

        for err in &out.rejected {
            tracing::debug!(kind = %err.kind(), error = %err, "record rejected");
            log.warning(format!(
                "[INVALID {}] skipped record: {}",
                err.kind().as_str().to_ascii_uppercase(),
                err
            ));
        }

        flag_duplicate_pids(&out.processes, log);
        out
    }
}

/// Warn about any pid reported on more than one host.
fn flag_duplicate_pids(processes: &[Process], log: &mut EventLog) {
    let mut seen: BTreeMap<i64, &str> = BTreeMap::new();
    for process in processes {
        match seen.get(&process.pid) {
            Some(first) if *first != process.hname => {
                log.warning(format!(
                    "[DUPLICATE PID] process id={} reported on host={} and host={}",
                    process.pid, first, process.hname
                ));
            }
            Some(_) => {}
            None => {
                seen.insert(process.pid, &process.hname);
            }
        }
    }
}

/// `floor((dfreq / 1000) * tsize / 1000)`: kB/s from milli-Hz and bytes.
pub fn throughput(dfreq: i64, tsize: i64) -> i64 {
    ((dfreq as f64 / 1000.0) * tsize as f64 / 1000.0).floor() as i64
}

/// Resolve the single transport layer of a topic under `policy`.
pub fn select_layer(
    tid: &str,
    layers: &[RawLayer],
    policy: LayerPolicy,
) -> Result<Option<String>, ValidationError> {
    let mut active = layers.iter().filter(|layer| layer.active);
    match policy {
        LayerPolicy::FirstActive => Ok(active.find_map(|layer| layer.kind.clone())),
        LayerPolicy::Strict => {
            let active: Vec<&RawLayer> = active.collect();
            match active.as_slice() {
                [layer] => layer
                    .kind
                    .clone()
                    .map(Some)
                    .ok_or(ValidationError::MissingField {
                        kind: EntityKind::Topic,
                        field: "layer.type",
                    }),
                _ => Err(ValidationError::AmbiguousLayer {
                    tid: tid.to_string(),
                    active: active.len(),
                }),
            }
        }
    }
}

fn required<T: Clone>(
    value: &Option<T>,
    kind: EntityKind,
    field: &'static str,
) -> Result<T, ValidationError> {
    value
        .clone()
        .ok_or(ValidationError::MissingField { kind, field })
}

fn required_text(
    value: &Option<String>,
    kind: EntityKind,
    field: &'static str,
) -> Result<String, ValidationError> {
    match value {
        Some(text) if !text.is_empty() => Ok(text.clone()),
        _ => Err(ValidationError::MissingField { kind, field }),
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

pub fn normalize_process(raw: &RawProcess) -> Result<Process, ValidationError> {
    let kind = EntityKind::Process;
    Ok(Process {
        pid: required(&raw.pid, kind, "pid")?,
        hname: text(&raw.hname),
        pname: text(&raw.pname),
        uname: text(&raw.uname),
        rclock: raw.rclock.unwrap_or(0),
        state_severity: raw.state_severity.unwrap_or(0),
        state_severity_level: raw.state_severity_level.unwrap_or(0),
        state_info: text(&raw.state_info),
        tsync_state: raw.tsync_state.unwrap_or(0),
        tsync_mod_name: text(&raw.tsync_mod_name),
        component_init_state: raw.component_init_state.unwrap_or(0),
        component_init_info: text(&raw.component_init_info),
    })
}

pub fn normalize_topic(raw: &RawTopic, policy: LayerPolicy) -> Result<Topic, ValidationError> {
    let kind = EntityKind::Topic;
    let tid = required_text(&raw.tid, kind, "tid")?;
    let pid = required(&raw.pid, kind, "pid")?;
    let tname = required_text(&raw.tname, kind, "tname")?;
    let direction_text = required_text(&raw.direction, kind, "direction")?;
    let direction =
        Direction::from_str(&direction_text).map_err(|value| ValidationError::MalformedField {
            kind,
            field: "direction",
            value,
        })?;
    let layer = select_layer(&tid, &raw.layer, policy)?;

    let tsize = raw.tsize.unwrap_or(0);
    let dfreq = raw.dfreq.unwrap_or(0);

    Ok(Topic {
        tid,
        pid,
        hname: text(&raw.hname),
        pname: text(&raw.pname),
        uname: text(&raw.uname),
        tname,
        direction,
        layer,
        tsize,
        dfreq,
        dclock: raw.dclock.unwrap_or(0),
        rclock: raw.rclock.unwrap_or(0),
        message_drops: raw.message_drops.unwrap_or(0),
        connections_loc: raw.connections_loc.unwrap_or(0),
        connections_ext: raw.connections_ext.unwrap_or(0),
        throughput: throughput(dfreq, tsize),
    })
}

pub fn normalize_service(raw: &RawService) -> Result<Service, ValidationError> {
    let kind = EntityKind::Service;
    let sname = required_text(&raw.sname, kind, "sname")?;
    let pid = required(&raw.pid, kind, "pid")?;
    let sid = raw
        .sid
        .clone()
        .filter(|sid| !sid.is_empty())
        .unwrap_or_else(|| sname.clone());

    Ok(Service {
        sname,
        sid,
        pid,
        hname: text(&raw.hname),
        pname: text(&raw.pname),
        uname: text(&raw.uname),
        rclock: raw.rclock.unwrap_or(0),
    })
}

pub fn normalize_client(raw: &RawClient) -> Result<Client, ValidationError> {
    let kind = EntityKind::Client;
    Ok(Client {
        sid: required_text(&raw.sid, kind, "sid")?,
        pid: required(&raw.pid, kind, "pid")?,
        sname: required_text(&raw.sname, kind, "sname")?,
        hname: text(&raw.hname),
        pname: text(&raw.pname),
        uname: text(&raw.uname),
        version: raw.version.unwrap_or(0),
        rclock: raw.rclock.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use topowatch_types::Level;

    fn raw_topic(tid: &str, layers: Vec<RawLayer>) -> RawTopic {
        RawTopic {
            tid: Some(tid.into()),
            pid: Some(42),
            hname: Some("H1".into()),
            tname: Some("camera".into()),
            direction: Some("publisher".into()),
            layer: layers,
            tsize: Some(10),
            dfreq: Some(2000),
            ..Default::default()
        }
    }

    #[test]
    fn throughput_is_floored_kilobytes_per_second() {
        assert_eq!(throughput(2000, 10), 0);
        assert_eq!(throughput(10_000, 1_500), 15);
        assert_eq!(throughput(1_500, 999), 1);
        assert_eq!(throughput(0, 1_000_000), 0);
    }

    #[test]
    fn strict_policy_requires_exactly_one_active_layer() {
        let none = raw_topic("1", vec![RawLayer::new("shm", false)]);
        let two = raw_topic(
            "2",
            vec![RawLayer::new("shm", true), RawLayer::new("udp", true)],
        );
        let one = raw_topic(
            "3",
            vec![RawLayer::new("shm", false), RawLayer::new("udp", true)],
        );

        assert_eq!(
            normalize_topic(&none, LayerPolicy::Strict),
            Err(ValidationError::AmbiguousLayer {
                tid: "1".into(),
                active: 0
            })
        );
        assert!(matches!(
            normalize_topic(&two, LayerPolicy::Strict),
            Err(ValidationError::AmbiguousLayer { active: 2, .. })
        ));
        assert_eq!(
            normalize_topic(&one, LayerPolicy::Strict)
                .map(|t| t.layer)
                .ok()
                .flatten()
                .as_deref(),
            Some("udp")
        );
    }

    #[test]
    fn first_active_policy_tolerates_ambiguity() {
        let two = raw_topic(
            "2",
            vec![RawLayer::new("shm", true), RawLayer::new("udp", true)],
        );
        let none = raw_topic("1", Vec::new());

        let topic = normalize_topic(&two, LayerPolicy::FirstActive).unwrap();
        assert_eq!(topic.layer.as_deref(), Some("shm"));
        let topic = normalize_topic(&none, LayerPolicy::FirstActive).unwrap();
        assert_eq!(topic.layer, None);
    }

    #[test]
    fn bad_records_are_isolated() {
        let raw = RawSnapshot {
            processes: vec![
                RawProcess {
                    pid: Some(1),
                    hname: Some("H1".into()),
                    ..Default::default()
                },
                RawProcess {
                    hname: Some("H1".into()),
                    ..Default::default()
                },
            ],
            topics: vec![
                raw_topic("1", vec![RawLayer::new("shm", true)]),
                RawTopic {
                    direction: Some("sideways".into()),
                    ..raw_topic("2", vec![RawLayer::new("shm", true)])
                },
            ],
            services: vec![RawService {
                sname: Some("svc".into()),
                pid: Some(1),
                ..Default::default()
            }],
            clients: vec![RawClient {
                sid: Some("c1".into()),
                pid: Some(1),
                ..Default::default()
            }],
        };
        let mut log = EventLog::new();

        let out = Normalizer::default().normalize(&raw, &mut log);

        assert_eq!(out.processes.len(), 1);
        assert_eq!(out.topics.len(), 1);
        assert_eq!(out.services.len(), 1);
        assert_eq!(out.services[0].sid, "svc");
        assert!(out.clients.is_empty());
        assert_eq!(out.rejected.len(), 3);
        assert!(log.iter().all(|e| e.level == Level::Warning));
        assert_eq!(log.iter().filter(|e| e.tag() == Some("INVALID TOPIC")).count(), 1);
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let raw = RawTopic {
            tsize: None,
            dfreq: None,
            ..raw_topic("1", vec![RawLayer::new("shm", true)])
        };
        let topic = normalize_topic(&raw, LayerPolicy::Strict).unwrap();

        assert_eq!(topic.tsize, 0);
        assert_eq!(topic.message_drops, 0);
        assert_eq!(topic.throughput, 0);
    }

    #[test]
    fn duplicate_pid_across_hosts_is_flagged() {
        let raw = RawSnapshot {
            processes: vec![
                RawProcess {
                    pid: Some(9),
                    hname: Some("H1".into()),
                    ..Default::default()
                },
                RawProcess {
                    pid: Some(9),
                    hname: Some("H2".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let mut log = EventLog::new();

        let out = Normalizer::default().normalize(&raw, &mut log);

        assert_eq!(out.processes.len(), 2);
        let events = log.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].message,
            "[DUPLICATE PID] process id=9 reported on host=H1 and host=H2"
        );
    }
}
