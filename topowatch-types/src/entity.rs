//! Validated inventory entities, keyed and carrying derived fields.

use std::fmt;
use std::str::FromStr;

/// Sentinel for an integer counter the host agent did not report.
pub const UNKNOWN_INT: i64 = -1;

/// Sentinel for a float counter the host agent did not report.
pub const UNKNOWN_FLOAT: f64 = -1.0;

/// The entity kinds tracked generation over generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EntityKind {
    Process,
    Service,
    Client,
    Topic,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Process => "process",
            EntityKind::Service => "service",
            EntityKind::Client => "client",
            EntityKind::Topic => "topic",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a topic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    Publisher,
    Subscriber,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Publisher => "publisher",
            Direction::Subscriber => "subscriber",
        }
    }

    /// Upper-case label used in log event tags, e.g. `PUBLISHER`.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Publisher => "PUBLISHER",
            Direction::Subscriber => "SUBSCRIBER",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publisher" => Ok(Direction::Publisher),
            "subscriber" => Ok(Direction::Subscriber),
            other => Err(other.to_string()),
        }
    }
}

/// A process registered on the bus. Keyed by `pid`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Process {
    pub pid: i64,
    pub hname: String,
    pub pname: String,
    pub uname: String,
    pub rclock: i64,
    pub state_severity: i64,
    pub state_severity_level: i64,
    pub state_info: String,
    pub tsync_state: i64,
    pub tsync_mod_name: String,
    pub component_init_state: i64,
    pub component_init_info: String,
}

/// A service server. Keyed by `sname`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Service {
    pub sname: String,
    /// Server id; the service's name when the bus does not report one.
    pub sid: String,
    pub pid: i64,
    pub hname: String,
    pub pname: String,
    pub uname: String,
    pub rclock: i64,
}

/// A service client. Keyed by `sid`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Client {
    pub sid: String,
    pub pid: i64,
    pub hname: String,
    pub pname: String,
    pub uname: String,
    pub sname: String,
    pub version: i64,
    pub rclock: i64,
}

/// One publisher or subscriber endpoint of a topic. Keyed by `tid`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topic {
    pub tid: String,
    pub pid: i64,
    pub hname: String,
    pub pname: String,
    pub uname: String,
    pub tname: String,
    pub direction: Direction,
    /// Type of the single active transport layer.
    pub layer: Option<String>,
    /// Message size in bytes.
    pub tsize: i64,
    /// Publish frequency in milli-Hz.
    pub dfreq: i64,
    pub dclock: i64,
    pub rclock: i64,
    pub message_drops: i64,
    pub connections_loc: i64,
    pub connections_ext: i64,
    /// Derived bandwidth estimate in kB/s.
    pub throughput: i64,
}

impl Topic {
    pub fn is_publisher(&self) -> bool {
        self.direction == Direction::Publisher
    }

    pub fn is_subscriber(&self) -> bool {
        self.direction == Direction::Subscriber
    }

    /// Raw aggregation weight of a publication: `tsize * dfreq`.
    pub fn bandwidth(&self) -> i64 {
        self.tsize.saturating_mul(self.dfreq)
    }
}

/// Machine state of one host, taken from its agent's latest report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Host {
    pub hname: String,
    /// CPU load in percent.
    pub cpu_load: f64,
    pub total_memory: i64,
    pub available_memory: i64,
    pub capacity_disk: i64,
    pub available_disk: i64,
    pub network_send: i64,
    pub network_receive: i64,
    pub num_cpu_cores: i64,
    pub os: String,
}

impl Host {
    /// A host with every counter unknown.
    pub fn unknown(hname: impl Into<String>) -> Self {
        Self {
            hname: hname.into(),
            cpu_load: UNKNOWN_FLOAT,
            total_memory: UNKNOWN_INT,
            available_memory: UNKNOWN_INT,
            capacity_disk: UNKNOWN_INT,
            available_disk: UNKNOWN_INT,
            network_send: UNKNOWN_INT,
            network_receive: UNKNOWN_INT,
            num_cpu_cores: UNKNOWN_INT,
            os: String::new(),
        }
    }
}

/// Performance counters of one process, keyed by `(hname, pid)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerformanceRecord {
    pub hname: String,
    pub pid: i64,
    pub current_working_set_size: i64,
    pub peak_working_set_size: i64,
    pub cpu_kernel_time: i64,
    pub cpu_user_time: i64,
    pub cpu_creation_time: i64,
    /// CPU load in percent, or [`UNKNOWN_FLOAT`].
    pub cpu_load: f64,
}

impl PerformanceRecord {
    /// A record with every counter unknown.
    pub fn unknown(hname: impl Into<String>, pid: i64) -> Self {
        Self {
            hname: hname.into(),
            pid,
            current_working_set_size: UNKNOWN_INT,
            peak_working_set_size: UNKNOWN_INT,
            cpu_kernel_time: UNKNOWN_INT,
            cpu_user_time: UNKNOWN_INT,
            cpu_creation_time: UNKNOWN_INT,
            cpu_load: UNKNOWN_FLOAT,
        }
    }

    pub fn cpu_load_known(&self) -> Option<f64> {
        (self.cpu_load >= 0.0 && self.cpu_load.is_finite()).then_some(self.cpu_load)
    }
}
