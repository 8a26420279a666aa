//! Raw inventory and host-report records, before validation.
//!
//! These mirror what the bus introspection layer and the per-host machine
//! agents publish. Every field is optional: presence and shape are checked
//! by the normalizer, not by the decoder.

/// One poll of the bus inventory.
///
/// # Example
///
/// ```rust
/// use topowatch_types::{RawSnapshot, RawTopic};
///
/// let snapshot = RawSnapshot {
///     topics: vec![RawTopic {
///         tid: Some("1".into()),
///         tname: Some("camera".into()),
///         ..Default::default()
///     }],
///     ..Default::default()
/// };
/// assert_eq!(snapshot.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawSnapshot {
    pub processes: Vec<RawProcess>,
    pub topics: Vec<RawTopic>,
    pub services: Vec<RawService>,
    pub clients: Vec<RawClient>,
}

impl RawSnapshot {
    /// Total number of raw records across all kinds.
    pub fn len(&self) -> usize {
        self.processes.len() + self.topics.len() + self.services.len() + self.clients.len()
    }

    /// True when the bus reported nothing at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawProcess {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub pid: Option<i64>,
    pub hname: Option<String>,
    pub pname: Option<String>,
    pub uname: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub rclock: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub state_severity: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub state_severity_level: Option<i64>,
    pub state_info: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub tsync_state: Option<i64>,
    pub tsync_mod_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub component_init_state: Option<i64>,
    pub component_init_info: Option<String>,
}

/// One entry of a topic's declared transport layers.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawLayer {
    #[cfg_attr(
        feature = "serde",
        serde(rename = "type", deserialize_with = "crate::de::opt_id")
    )]
    pub kind: Option<String>,
    pub active: bool,
}

impl RawLayer {
    pub fn new(kind: impl Into<String>, active: bool) -> Self {
        Self {
            kind: Some(kind.into()),
            active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawTopic {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_id"))]
    pub tid: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub pid: Option<i64>,
    pub hname: Option<String>,
    pub pname: Option<String>,
    pub uname: Option<String>,
    pub tname: Option<String>,
    pub direction: Option<String>,
    pub layer: Vec<RawLayer>,
    /// Message size in bytes.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub tsize: Option<i64>,
    /// Publish frequency in milli-Hz.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub dfreq: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub dclock: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub rclock: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub message_drops: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub connections_loc: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub connections_ext: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawService {
    pub sname: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_id"))]
    pub sid: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub pid: Option<i64>,
    pub hname: Option<String>,
    pub pname: Option<String>,
    pub uname: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub rclock: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawClient {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_id"))]
    pub sid: Option<String>,
    pub sname: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub pid: Option<i64>,
    pub hname: Option<String>,
    pub pname: Option<String>,
    pub uname: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub version: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub rclock: Option<i64>,
}

/// A machine-state report pushed by one host's agent.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct RawHostReport {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_f64"))]
    pub cpu_load: Option<f64>,
    pub memory: Option<RawMemory>,
    pub disks: Vec<RawDisk>,
    pub networks: Vec<RawNetwork>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub number_of_cpu_cores: Option<i64>,
    pub operating_system: Option<String>,
    pub process: Vec<RawHostProcess>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawMemory {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub total: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub available: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawDisk {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub capacity: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub available: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawNetwork {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub send: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub receive: Option<i64>,
}

/// One process entry of a host report.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawHostProcess {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub id: Option<i64>,
    pub memory: Option<RawProcessMemory>,
    pub cpu: Option<RawProcessCpu>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct RawProcessMemory {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub current_working_set_size: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub peak_working_set_size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct RawProcessCpu {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub cpu_kernel_time: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub cpu_user_time: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_i64"))]
    pub cpu_creation_time: Option<i64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::opt_f64"))]
    pub cpu_load: Option<f64>,
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn host_report_accepts_stringified_integers() {
        let json = r#"{
            "cpuLoad": 12.5,
            "memory": { "total": "16000", "available": "4000" },
            "disks": [{ "capacity": "1000", "available": 250 }],
            "numberOfCpuCores": 8,
            "operatingSystem": "linux",
            "process": [{
                "id": 42,
                "memory": { "currentWorkingSetSize": "2048" },
                "cpu": { "cpuLoad": "3.5", "cpuUserTime": "17" }
            }]
        }"#;

        let report: RawHostReport = serde_json::from_str(json).unwrap();
        let memory = report.memory.unwrap();
        assert_eq!(memory.total, Some(16_000));
        assert_eq!(report.disks[0].available, Some(250));

        let process = &report.process[0];
        assert_eq!(process.id, Some(42));
        let cpu = process.cpu.as_ref().unwrap();
        assert_eq!(cpu.cpu_load, Some(3.5));
        assert_eq!(cpu.cpu_user_time, Some(17));
        assert_eq!(cpu.cpu_kernel_time, None);
    }

    #[test]
    fn malformed_numbers_decode_as_absent() {
        let json = r#"{ "pid": "not-a-pid", "hname": "H1", "rclock": true }"#;
        let process: RawProcess = serde_json::from_str(json).unwrap();

        assert_eq!(process.pid, None);
        assert_eq!(process.rclock, None);
        assert_eq!(process.hname.as_deref(), Some("H1"));
    }

    #[test]
    fn numeric_ids_become_strings() {
        let json = r#"{
            "topics": [{ "tid": 1234567890123, "tname": "t",
                         "layer": [{ "type": 1, "active": true }] }],
            "clients": [{ "sid": "abc", "sname": "svc" }]
        }"#;
        let snapshot: RawSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.topics[0].tid.as_deref(), Some("1234567890123"));
        assert_eq!(snapshot.topics[0].layer[0].kind.as_deref(), Some("1"));
        assert_eq!(snapshot.clients[0].sid.as_deref(), Some("abc"));
        assert!(snapshot.processes.is_empty());
    }
}
