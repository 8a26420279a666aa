//! Error types for the topowatch engine.

use thiserror::Error;
use topowatch_types::EntityKind;

use crate::redact::RedactField;

/// A raw record that cannot become an entity. Only that record is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required identity field is absent.
    #[error("{kind} record is missing required field `{field}`")]
    MissingField {
        kind: EntityKind,
        field: &'static str,
    },

    /// A field is present but cannot be interpreted.
    #[error("{kind} record has malformed field `{field}`: {value:?}")]
    MalformedField {
        kind: EntityKind,
        field: &'static str,
        value: String,
    },

    /// The topic does not declare exactly one active transport layer.
    #[error("topic {tid} has {active} active layers, expected exactly one")]
    AmbiguousLayer { tid: String, active: usize },
}

impl ValidationError {
    /// The entity kind of the rejected record.
    pub fn kind(&self) -> EntityKind {
        match self {
            ValidationError::MissingField { kind, .. } => *kind,
            ValidationError::MalformedField { kind, .. } => *kind,
            ValidationError::AmbiguousLayer { .. } => EntityKind::Topic,
        }
    }
}

/// Errors from per-host enrichment feeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The feed subscription could not be established. Retried next cycle.
    #[error("feed for host {host} unavailable: {reason}")]
    Unavailable { host: String, reason: String },

    /// The shared feed channel has no receiver anymore.
    #[error("feed channel closed")]
    ChannelClosed,
}

/// Invalid redaction rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedactError {
    #[error("field `{0}` identifies records and cannot be cleared; pseudonymize it instead")]
    IdentityCleared(RedactField),

    #[error("unknown redaction field `{0}`")]
    UnknownField(String),
}

/// Errors reading snapshots from a data source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No snapshot files in {0}")]
    EmptyDirectory(String),
}
