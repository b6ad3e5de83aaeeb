//! Running per-axis maxima shared between the sampler and the accountant.
//!
//! Each field is updated with a single atomic fetch-max, so a concurrent
//! reader sees either the old peak or the new one and never a torn value.
//! The accountant may read one tick stale; that window is accepted.

use std::sync::atomic::{AtomicI64, Ordering};

use cellmem_core::types::{Axis, MemorySample};

/// Marker for "no sample taken yet". Real readings are never negative,
/// so the first sample always wins the max.
const NO_SAMPLE: i64 = -1;

#[derive(Debug)]
pub struct PeakTracker {
    host_peak_mb: AtomicI64,
    device_peak_mb: AtomicI64,
}

impl Default for PeakTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PeakTracker {
    pub fn new() -> Self {
        Self {
            host_peak_mb: AtomicI64::new(NO_SAMPLE),
            device_peak_mb: AtomicI64::new(NO_SAMPLE),
        }
    }

    fn slot(&self, axis: Axis) -> &AtomicI64 {
        match axis {
            Axis::Host => &self.host_peak_mb,
            Axis::Device => &self.device_peak_mb,
        }
    }

    /// Fold one reading into the running maximum for its axis.
    pub fn record(&self, sample: MemorySample) {
        let value = sample.as_i64();
        self.slot(sample.source).fetch_max(value, Ordering::AcqRel);
        tracing::trace!(axis = %sample.source, value_mb = value, "peak sample");
    }

    /// Peak since the last reset, or `None` if nothing was recorded.
    pub fn peak(&self, axis: Axis) -> Option<i64> {
        let v = self.slot(axis).load(Ordering::Acquire);
        (v != NO_SAMPLE).then_some(v)
    }

    pub fn host_peak(&self) -> Option<i64> {
        self.peak(Axis::Host)
    }

    pub fn device_peak(&self) -> Option<i64> {
        self.peak(Axis::Device)
    }

    pub fn reset(&self) {
        self.host_peak_mb.store(NO_SAMPLE, Ordering::Release);
        self.device_peak_mb.store(NO_SAMPLE, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_wins_over_sentinel() {
        let t = PeakTracker::new();
        assert_eq!(t.host_peak(), None);
        t.record(MemorySample::host(0));
        assert_eq!(t.host_peak(), Some(0));
        assert_eq!(t.device_peak(), None);
    }

    #[test]
    fn peak_never_decreases_until_reset() {
        let t = PeakTracker::new();
        for v in [120, 150, 90, 149] {
            t.record(MemorySample::device(v));
        }
        assert_eq!(t.device_peak(), Some(150));
        t.reset();
        assert_eq!(t.device_peak(), None);
        t.record(MemorySample::device(7));
        assert_eq!(t.device_peak(), Some(7));
    }
}
