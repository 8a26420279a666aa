//! Arc helpers shared by the projections.

use topowatch_types::{GraphNode, PerformanceRecord, StatValue};

use crate::perf::{round_to, Usage};

/// Each of the three host health resources takes a third of the circle.
pub const HEALTH_SLICE: f64 = 1.0 / 3.0;

/// Set `arc__cpu_used` / `arc__cpu_unused` from a performance record.
///
/// Without a record, or with an unknown load, neither key is set.
pub fn apply_cpu_arcs(node: &mut GraphNode, record: Option<&PerformanceRecord>) {
    let Some(load) = record.and_then(PerformanceRecord::cpu_load_known) else {
        return;
    };
    let used = round_to(load / 100.0, 5).clamp(0.0, 1.0);
    node.set_arc("cpu_used", used);
    node.set_arc("cpu_unused", 1.0 - used);
}

/// Set `arc__<resource>_ok` / `arc__<resource>_not_ok`.
///
/// Exactly one of the pair is a full slice; an unknown usage sets neither.
pub fn apply_health_arcs(node: &mut GraphNode, resource: &str, usage: Usage) {
    let Some(healthy) = usage.is_healthy() else {
        return;
    };
    let (ok, not_ok) = if healthy {
        (HEALTH_SLICE, 0.0)
    } else {
        (0.0, HEALTH_SLICE)
    };
    node.set_arc(&format!("{resource}_ok"), ok);
    node.set_arc(&format!("{resource}_not_ok"), not_ok);
}

/// `detail__<resource>` value for a usage: the ratio, or `"unknown"`.
pub fn usage_detail(usage: Usage) -> StatValue {
    match usage.ratio() {
        Some(ratio) => StatValue::Float(ratio),
        None => StatValue::Text("unknown".to_string()),
    }
}

/// Add `amount` to an integer stat, starting it when unset.
pub(crate) fn accumulate(stat: &mut Option<StatValue>, amount: i64) {
    *stat = Some(match stat.take() {
        Some(StatValue::Int(total)) => StatValue::Int(total.saturating_add(amount)),
        _ => StatValue::Int(amount),
    });
}

/// Append `", <text>"` to a stat's display string, starting it when unset.
pub(crate) fn append_text(stat: &mut Option<StatValue>, text: &str) {
    *stat = Some(match stat.take() {
        Some(StatValue::Text(existing)) => StatValue::Text(format!("{existing}, {text}")),
        Some(StatValue::Int(value)) => StatValue::Text(format!("{value}, {text}")),
        Some(StatValue::Float(value)) => StatValue::Text(format!("{value}, {text}")),
        None => StatValue::Text(text.to_string()),
    });
}
