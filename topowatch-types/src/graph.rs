//! Topology graph records.
//!
//! Nodes and edges have a fixed set of display fields plus an open
//! extension map. Extension keys follow a naming convention that sinks
//! rely on:
//!
//! - `arc__<name>`: a fraction in `[0, 1]`, drawn as a pie slice around the node
//! - `detail__<name>`: an auxiliary display value, never used in aggregation
//!
//! Consumers must tolerate extension keys they do not know.

use std::collections::BTreeMap;

/// Prefix of fractional health-indicator extension keys.
pub const ARC_PREFIX: &str = "arc__";

/// Prefix of display-only extension keys.
pub const DETAIL_PREFIX: &str = "detail__";

/// Default node fill colour.
pub const NODE_COLOR: &str = "#1E9BD7";

/// Default edge colour.
pub const EDGE_COLOR: &str = "#F07D00";

/// Radius of a freshly created node.
pub const DEFAULT_NODE_RADIUS: u32 = 50;

/// A display value: sinks render whichever variant they receive.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum StatValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl StatValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StatValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Int(v) => Some(*v as f64),
            StatValue::Float(v) => Some(*v),
            StatValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StatValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Int(v)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl From<String> for StatValue {
    fn from(v: String) -> Self {
        StatValue::Text(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::Text(v.to_string())
    }
}

/// A node of a topology projection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphNode {
    pub id: String,
    pub title: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub subtitle: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub mainstat: Option<StatValue>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub secondarystat: Option<StatValue>,
    pub color: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub icon: Option<String>,
    pub radius: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub highlighted: bool,
    /// `arc__*` and `detail__*` fields, flattened into the node when serialized.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub extensions: BTreeMap<String, StatValue>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: None,
            mainstat: None,
            secondarystat: None,
            color: NODE_COLOR.to_string(),
            icon: None,
            radius: DEFAULT_NODE_RADIUS,
            highlighted: false,
            extensions: BTreeMap::new(),
        }
    }

    /// Set `arc__<name>`, clamped into `[0, 1]`. Non-finite values are ignored.
    pub fn set_arc(&mut self, name: &str, fraction: f64) {
        if fraction.is_finite() {
            self.extensions.insert(
                format!("{ARC_PREFIX}{name}"),
                StatValue::Float(fraction.clamp(0.0, 1.0)),
            );
        }
    }

    pub fn arc(&self, name: &str) -> Option<f64> {
        self.extensions
            .get(&format!("{ARC_PREFIX}{name}"))
            .and_then(StatValue::as_f64)
    }

    /// Set `detail__<name>`.
    pub fn set_detail(&mut self, name: &str, value: impl Into<StatValue>) {
        self.extensions
            .insert(format!("{DETAIL_PREFIX}{name}"), value.into());
    }

    pub fn detail(&self, name: &str) -> Option<&StatValue> {
        self.extensions.get(&format!("{DETAIL_PREFIX}{name}"))
    }

    /// All `arc__*` entries, with the prefix stripped.
    pub fn arcs(&self) -> impl Iterator<Item = (&str, f64)> {
        self.extensions.iter().filter_map(|(key, value)| {
            let name = key.strip_prefix(ARC_PREFIX)?;
            Some((name, value.as_f64()?))
        })
    }
}

/// An edge of a topology projection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub mainstat: Option<StatValue>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub secondarystat: Option<StatValue>,
    pub thickness: u32,
    pub color: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub highlighted: bool,
}

impl GraphEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            mainstat: None,
            secondarystat: None,
            thickness: 1,
            color: EDGE_COLOR.to_string(),
            highlighted: false,
        }
    }
}

/// One complete projection: authoritative for "now", never a diff.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphSet {
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: BTreeMap<String, GraphEdge>,
}

impl GraphSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.get(id)
    }
}
