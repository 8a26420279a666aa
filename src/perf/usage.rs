//! Resource usage ratios of a host.

use serde::{Deserialize, Serialize};
use topowatch_types::Host;

/// Usage at or below this ratio counts as healthy.
pub const HEALTH_THRESHOLD: f64 = 0.8;

/// A usage ratio in `[0, 1]`, or unknown when it cannot be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Usage {
    Known(f64),
    Unknown,
}

impl Usage {
    /// `(total - available) / total`, rounded to `places` decimals.
    ///
    /// Unknown when `total` is not positive, either input is negative (the
    /// "not reported" sentinel), or the result is not finite.
    pub fn of_capacity(total: i64, available: i64, places: i32) -> Self {
        if total <= 0 || available < 0 {
            return Usage::Unknown;
        }
        Self::from_ratio((total - available) as f64 / total as f64, places)
    }

    /// A CPU load in percent as a ratio.
    pub fn of_load(load_percent: f64, places: i32) -> Self {
        if load_percent < 0.0 {
            return Usage::Unknown;
        }
        Self::from_ratio(load_percent / 100.0, places)
    }

    fn from_ratio(ratio: f64, places: i32) -> Self {
        let rounded = round_to(ratio, places);
        if rounded.is_finite() {
            Usage::Known(rounded)
        } else {
            Usage::Unknown
        }
    }

    pub fn ratio(&self) -> Option<f64> {
        match self {
            Usage::Known(ratio) => Some(*ratio),
            Usage::Unknown => None,
        }
    }

    /// Usage in percent, one decimal.
    pub fn percent(&self) -> Option<f64> {
        self.ratio().map(|ratio| round_to(ratio * 100.0, 1))
    }

    /// `Some(true)` when within the health threshold, `None` when unknown.
    pub fn is_healthy(&self) -> Option<bool> {
        self.ratio().map(|ratio| ratio <= HEALTH_THRESHOLD)
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

pub fn ram_usage(host: &Host) -> Usage {
    Usage::of_capacity(host.total_memory, host.available_memory, 2)
}

pub fn disk_usage(host: &Host) -> Usage {
    Usage::of_capacity(host.capacity_disk, host.available_disk, 3)
}

pub fn cpu_usage(host: &Host) -> Usage {
    Usage::of_load(host.cpu_load, 2)
}
