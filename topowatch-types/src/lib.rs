//! # topowatch-types
//!
//! Record types shared between the topowatch engine, the adapters that feed
//! it raw inventories, and the sinks that persist or render its output.
//!
//! ## Layers
//!
//! - **Raw** ([`RawSnapshot`], [`RawHostReport`]): what the bus introspection
//!   layer and the per-host agents deliver. Every field is optional; nothing
//!   has been validated yet.
//! - **Entities** ([`Process`], [`Service`], [`Client`], [`Topic`], [`Host`],
//!   [`PerformanceRecord`]): validated, keyed records with derived fields.
//! - **Graphs** ([`GraphNode`], [`GraphEdge`], [`GraphSet`]): topology
//!   projections with an open `arc__*` / `detail__*` extension map.
//! - **Events** ([`LogEvent`]): the human-readable transition log.
//!
//! ## Features
//!
//! - `serde`: (de)serialization of every type. Numeric fields of the raw
//!   records accept either JSON numbers or numeric strings, since host agents
//!   publish 64-bit integers as strings.
//!
//! ## Example
//!
//! ```rust
//! use topowatch_types::{GraphNode, StatValue};
//!
//! let mut node = GraphNode::new("H1", "H1");
//! node.mainstat = Some(StatValue::Int(20_000));
//! node.set_arc("cpu_used", 0.25);
//!
//! assert_eq!(node.arc("cpu_used"), Some(0.25));
//! assert!(node.extensions.contains_key("arc__cpu_used"));
//! ```

#[cfg(feature = "serde")]
mod de;
mod entity;
mod event;
mod graph;
mod raw;
mod version;

pub use entity::*;
pub use event::*;
pub use graph::*;
pub use raw::*;
pub use version::*;

/// Current schema version of the cycle report.
///
/// Increment this when making breaking changes to the report format.
pub const SCHEMA_VERSION: u32 = 1;
