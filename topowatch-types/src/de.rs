//! Lenient decoding of the enumerated numeric and identifier fields.
//!
//! Host agents serialize protobuf messages to JSON, which renders 64-bit
//! integers as strings. Bus inventories may render topic and service ids as
//! numbers. Each helper accepts either form. A value that cannot be read as
//! the expected type decodes as absent so one odd field never fails a whole
//! snapshot; the normalizer decides whether absence is fatal for the record.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

pub(crate) fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Loose>::deserialize(d)? {
        Some(Loose::Int(v)) => Some(v),
        Some(Loose::Float(v)) if v.is_finite() => Some(v.trunc() as i64),
        Some(Loose::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

pub(crate) fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Loose>::deserialize(d)? {
        Some(Loose::Int(v)) => Some(v as f64),
        Some(Loose::Float(v)) if v.is_finite() => Some(v),
        Some(Loose::Text(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

pub(crate) fn opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Loose>::deserialize(d)? {
        Some(Loose::Int(v)) => Some(v.to_string()),
        Some(Loose::Float(v)) if v.is_finite() && v.fract() == 0.0 => Some(format!("{v:.0}")),
        Some(Loose::Text(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}
