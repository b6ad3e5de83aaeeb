//! The peak sampling loop.
//!
//! Polls the host probe and the device fast probe, folds both into a
//! [`PeakTracker`], sleeps, repeats. Stops when the cancel flag is set or the
//! iteration ceiling is passed, whichever comes first. No reclamation happens
//! here: the loop must stay the cheapest probe path there is.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use cellmem_core::config::LoggerConfig;
use cellmem_core::probe::Backends;
use cellmem_core::types::MemorySample;

use crate::tracking::PeakTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub poll_interval: Duration,
    /// Exact tick budget: the loop stops once `max_iterations` ticks have run.
    pub max_iterations: u64,
}

impl SamplerConfig {
    pub fn from_logger(cfg: &LoggerConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            max_iterations: cfg.max_iterations(),
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::from_logger(&LoggerConfig::default())
    }
}

/// How a sampler run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerOutcome {
    /// The cancel flag was observed.
    Cancelled { iterations: u64 },
    /// The ceiling was hit before any stop signal arrived. The peak recorded
    /// so far stays in the tracker and may understate the true peak.
    Runaway { iterations: u64 },
}

impl SamplerOutcome {
    pub fn iterations(self) -> u64 {
        match self {
            SamplerOutcome::Cancelled { iterations } | SamplerOutcome::Runaway { iterations } => {
                iterations
            }
        }
    }

    pub fn is_runaway(self) -> bool {
        matches!(self, SamplerOutcome::Runaway { .. })
    }
}

/// Run the loop on the calling thread until cancelled or the ceiling passes.
///
/// `iterations` is published after every tick so the owner can read progress
/// without joining.
pub fn run(
    cancel: &AtomicBool,
    tracker: &PeakTracker,
    backends: &Backends,
    cfg: SamplerConfig,
    iterations: &AtomicU64,
) -> SamplerOutcome {
    // Resolve the device once; a failure here only disables device sampling.
    let device = backends.device.as_ref().and_then(|probe| {
        match probe.current_device() {
            Ok(handle) => Some((probe, handle)),
            Err(e) => {
                tracing::debug!(error = %e, "device handle unavailable, sampling host only");
                None
            }
        }
    });

    let mut ticks: u64 = 0;
    loop {
        if cancel.load(Ordering::Acquire) {
            return SamplerOutcome::Cancelled { iterations: ticks };
        }
        if ticks >= cfg.max_iterations {
            tracing::warn!(
                iterations = ticks,
                max_iterations = cfg.max_iterations,
                "peak sampler stopped itself: the monitored interval ran far longer than expected \
                 (missed end boundary?); the reported peak may be understated"
            );
            return SamplerOutcome::Runaway { iterations: ticks };
        }

        if let Ok(mb) = backends.host.used_mb() {
            tracker.record(MemorySample::host(mb));
        }
        if let Some((probe, handle)) = device {
            if let Ok(mb) = probe.used_mb_fast(handle) {
                tracker.record(MemorySample::device(mb));
            }
        }

        thread::sleep(cfg.poll_interval);
        ticks += 1;
        iterations.store(ticks, Ordering::Release);
    }
}
