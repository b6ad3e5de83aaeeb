//! Interval Accountant: turns final readings, the running peak, and the
//! previous interval's readings into per-interval deltas.
//!
//! Per axis, with `final` the post-reclamation reading at interval end:
//! - `delta  = final - prev_final` (may be negative)
//! - `peaked = max(0, peak - final)`, with `peak = final` when the sampler
//!   never ticked
//! - `final` becomes the next interval's baseline.
//!
//! A failed final reading makes that axis Unavailable for the interval and
//! keeps the old baseline. The other axis is unaffected.

use std::time::Instant;

use serde::Serialize;

use cellmem_core::probe::Backends;
use cellmem_core::types::Snapshot;
use cellmem_sampler::PeakTracker;

/// Readings persisted across intervals. Updated once per completed interval.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IntervalState {
    pub prev_host_mb: Option<i64>,
    pub prev_device_mb: Option<i64>,
    pub last_used_host_mb: Option<i64>,
    pub last_used_device_mb: Option<i64>,
    pub last_delta_host_mb: Option<i64>,
    pub last_delta_device_mb: Option<i64>,
    pub last_peaked_host_mb: Option<i64>,
    pub last_peaked_device_mb: Option<i64>,
    pub last_duration_seconds: f64,
}

/// One value per axis; `None` is Unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerAxis {
    pub host: Option<i64>,
    pub device: Option<i64>,
}

impl PerAxis {
    pub fn new(host: Option<i64>, device: Option<i64>) -> Self {
        Self { host, device }
    }

    pub fn from_tracker(tracker: &PeakTracker) -> Self {
        Self {
            host: tracker.host_peak(),
            device: tracker.device_peak(),
        }
    }
}

impl IntervalState {
    /// State before any interval completed: the given readings are both the
    /// baseline and the reported usage, with zero deltas.
    pub fn initial(readings: PerAxis) -> Self {
        Self {
            prev_host_mb: readings.host,
            prev_device_mb: readings.device,
            last_used_host_mb: readings.host,
            last_used_device_mb: readings.device,
            last_delta_host_mb: readings.host.map(|_| 0),
            last_delta_device_mb: readings.device.map(|_| 0),
            last_peaked_host_mb: readings.host.map(|_| 0),
            last_peaked_device_mb: readings.device.map(|_| 0),
            last_duration_seconds: 0.0,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            gen_mem_used_delta: self.last_delta_host_mb,
            gen_mem_peaked: self.last_peaked_host_mb,
            gen_mem_used: self.last_used_host_mb,
            gpu_mem_used_delta: self.last_delta_device_mb,
            gpu_mem_peaked: self.last_peaked_device_mb,
            gpu_mem_used: self.last_used_device_mb,
            time_delta: self.last_duration_seconds,
        }
    }
}

struct AxisOutcome {
    prev: Option<i64>,
    used: Option<i64>,
    delta: Option<i64>,
    peaked: Option<i64>,
}

fn account_axis(prev: Option<i64>, final_mb: Option<i64>, peak: Option<i64>) -> AxisOutcome {
    match final_mb {
        Some(f) => AxisOutcome {
            prev: Some(f),
            used: Some(f),
            delta: prev.map(|p| f - p),
            peaked: Some((peak.unwrap_or(f) - f).max(0)),
        },
        None => AxisOutcome {
            prev,
            used: None,
            delta: None,
            peaked: None,
        },
    }
}

/// Fold one finished interval into `prior`.
pub fn account(
    prior: &IntervalState,
    finals: PerAxis,
    peaks: PerAxis,
    duration_seconds: f64,
) -> IntervalState {
    let host = account_axis(prior.prev_host_mb, finals.host, peaks.host);
    let device = account_axis(prior.prev_device_mb, finals.device, peaks.device);
    IntervalState {
        prev_host_mb: host.prev,
        prev_device_mb: device.prev,
        last_used_host_mb: host.used,
        last_used_device_mb: device.used,
        last_delta_host_mb: host.delta,
        last_delta_device_mb: device.delta,
        last_peaked_host_mb: host.peaked,
        last_peaked_device_mb: device.peaked,
        last_duration_seconds: duration_seconds,
    }
}

/// Owns the baseline between intervals and performs the end-of-interval
/// readings.
pub struct Accountant {
    backends: Backends,
    reclaim_before_reading: bool,
    state: IntervalState,
    started: Option<Instant>,
}

impl Accountant {
    /// Take the construction-time readings (after reclamation when enabled).
    pub fn new(backends: Backends, reclaim_before_reading: bool) -> Self {
        let mut acc = Self {
            backends,
            reclaim_before_reading,
            state: IntervalState::default(),
            started: None,
        };
        let initial = acc.final_readings();
        acc.state = IntervalState::initial(initial);
        acc
    }

    /// Record the wall-clock start. Touches no probe: the sampler's first
    /// tick does that.
    pub fn begin_interval(&mut self) -> Instant {
        let now = Instant::now();
        self.started = Some(now);
        now
    }

    /// Close the interval using the peaks in `tracker`.
    pub fn end_interval(&mut self, tracker: &PeakTracker) -> Snapshot {
        let duration = self
            .started
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let finals = self.final_readings();
        let peaks = PerAxis::from_tracker(tracker);
        self.state = account(&self.state, finals, peaks, duration);
        self.state.snapshot()
    }

    pub fn state(&self) -> &IntervalState {
        &self.state
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    fn final_readings(&self) -> PerAxis {
        if self.reclaim_before_reading {
            self.backends.host.reclaim();
            if let Some(device) = &self.backends.device {
                device.reclaim_cache();
            }
        }

        let host = match self.backends.host.used_mb() {
            Ok(mb) => Some(to_signed(mb)),
            Err(e) => {
                tracing::warn!(error = %e, "host reading failed; host metrics unavailable for this interval");
                None
            }
        };

        let device = self.backends.device.as_ref().and_then(|probe| match probe.used_mb() {
            Ok(mb) => Some(to_signed(mb)),
            Err(e) => {
                tracing::warn!(device = probe.name(), error = %e, "device reading failed; device metrics unavailable for this interval");
                None
            }
        });

        PerAxis { host, device }
    }
}

fn to_signed(mb: u64) -> i64 {
    i64::try_from(mb).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(host: i64, device: Option<i64>) -> IntervalState {
        IntervalState::initial(PerAxis::new(Some(host), device))
    }

    #[test]
    fn spike_above_final_is_reported_as_peaked() {
        let prior = state(100, None);
        let next = account(
            &prior,
            PerAxis::new(Some(120), None),
            PerAxis::new(Some(150), None),
            0.25,
        );
        assert_eq!(next.last_delta_host_mb, Some(20));
        assert_eq!(next.last_peaked_host_mb, Some(30));
        assert_eq!(next.prev_host_mb, Some(120));
        assert_eq!(next.last_duration_seconds, 0.25);
    }

    #[test]
    fn no_ticks_means_nothing_peaked() {
        let next = account(
            &state(100, Some(40)),
            PerAxis::new(Some(90), Some(45)),
            PerAxis::default(),
            0.0,
        );
        assert_eq!(next.last_peaked_host_mb, Some(0));
        assert_eq!(next.last_peaked_device_mb, Some(0));
        assert_eq!(next.last_delta_host_mb, Some(-10));
        assert_eq!(next.last_delta_device_mb, Some(5));
    }

    #[test]
    fn peak_below_final_clips_to_zero() {
        let next = account(
            &state(10, None),
            PerAxis::new(Some(50), None),
            PerAxis::new(Some(30), None),
            0.0,
        );
        assert_eq!(next.last_peaked_host_mb, Some(0));
    }

    #[test]
    fn failed_reading_keeps_the_old_baseline() {
        let prior = state(100, Some(200));
        let next = account(
            &prior,
            PerAxis::new(Some(110), None),
            PerAxis::new(Some(130), Some(260)),
            0.0,
        );
        assert_eq!(next.last_delta_device_mb, None);
        assert_eq!(next.last_used_device_mb, None);
        assert_eq!(next.prev_device_mb, Some(200));
        assert_eq!(next.last_delta_host_mb, Some(10));

        let after = account(
            &next,
            PerAxis::new(Some(110), Some(230)),
            PerAxis::default(),
            0.0,
        );
        assert_eq!(after.last_delta_device_mb, Some(30));
    }

    #[test]
    fn missing_baseline_leaves_delta_unavailable_once() {
        let prior = IntervalState::initial(PerAxis::new(None, None));
        let next = account(&prior, PerAxis::new(Some(70), None), PerAxis::default(), 0.0);
        assert_eq!(next.last_delta_host_mb, None);
        assert_eq!(next.last_used_host_mb, Some(70));
        assert_eq!(next.last_peaked_host_mb, Some(0));
        assert_eq!(next.prev_host_mb, Some(70));
    }

    #[test]
    fn initial_snapshot_has_zero_deltas() {
        let snap = state(512, None).snapshot();
        assert_eq!(snap.gen_mem_used, Some(512));
        assert_eq!(snap.gen_mem_used_delta, Some(0));
        assert_eq!(snap.gen_mem_peaked, Some(0));
        assert!(snap.device_unavailable());
        assert_eq!(snap.time_delta, 0.0);
    }

    #[test]
    fn begin_interval_takes_no_readings() {
        use cellmem_probe::ManualProbe;
        use std::sync::Arc;

        let host = ManualProbe::new(100);
        let device = ManualProbe::new(300);
        let mut acc = Accountant::new(
            Backends::new(Arc::new(host.clone()), Arc::new(device.clone())),
            true,
        );
        let before = (host.reads(), device.reads(), device.fast_reads(), host.reclaims());

        acc.begin_interval();

        let after = (host.reads(), device.reads(), device.fast_reads(), host.reclaims());
        assert_eq!(before, after);
        assert_eq!(acc.snapshot().gen_mem_used, Some(100));
    }
}
