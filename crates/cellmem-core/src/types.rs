//! Measurement and snapshot types shared by the sampler and the session.
//!
//! All memory quantities are whole megabytes (2^20 bytes, rounded down by
//! the backends). Deltas are signed: an interval that releases more than it
//! allocates reports a negative delta.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The resource a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Host,
    Device,
}

impl Axis {
    /// Row label used by the human-readable reports.
    pub fn label(self) -> &'static str {
        match self {
            Axis::Host => "Gen",
            Axis::Device => "GPU",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Host => f.write_str("host"),
            Axis::Device => f.write_str("device"),
        }
    }
}

/// A single point-in-time reading, produced and consumed within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySample {
    pub value_mb: u64,
    pub source: Axis,
}

impl MemorySample {
    pub fn host(value_mb: u64) -> Self {
        Self {
            value_mb,
            source: Axis::Host,
        }
    }

    pub fn device(value_mb: u64) -> Self {
        Self {
            value_mb,
            source: Axis::Device,
        }
    }

    /// Signed view used by the accounting arithmetic.
    pub fn as_i64(self) -> i64 {
        i64::try_from(self.value_mb).unwrap_or(i64::MAX)
    }
}

/// The three per-axis numbers of a finished interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisMetrics {
    pub used_delta: i64,
    pub peaked: i64,
    pub used: i64,
}

/// Immutable view of the latest interval, built on demand.
///
/// `None` marks a metric as Unavailable (no accelerator, or the probe
/// failed for that axis during the interval).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub gen_mem_used_delta: Option<i64>,
    pub gen_mem_peaked: Option<i64>,
    pub gen_mem_used: Option<i64>,
    pub gpu_mem_used_delta: Option<i64>,
    pub gpu_mem_peaked: Option<i64>,
    pub gpu_mem_used: Option<i64>,
    /// Wall-clock seconds between the interval's boundaries.
    pub time_delta: f64,
}

impl Snapshot {
    pub fn axis(&self, axis: Axis) -> Option<AxisMetrics> {
        let (delta, peaked, used) = match axis {
            Axis::Host => (
                self.gen_mem_used_delta,
                self.gen_mem_peaked,
                self.gen_mem_used,
            ),
            Axis::Device => (
                self.gpu_mem_used_delta,
                self.gpu_mem_peaked,
                self.gpu_mem_used,
            ),
        };
        Some(AxisMetrics {
            used_delta: delta?,
            peaked: peaked?,
            used: used?,
        })
    }

    pub fn host(&self) -> Option<AxisMetrics> {
        self.axis(Axis::Host)
    }

    pub fn device(&self) -> Option<AxisMetrics> {
        self.axis(Axis::Device)
    }

    /// True when no device metric carries a value.
    pub fn device_unavailable(&self) -> bool {
        self.gpu_mem_used_delta.is_none()
            && self.gpu_mem_peaked.is_none()
            && self.gpu_mem_used.is_none()
    }
}
