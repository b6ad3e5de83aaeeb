//! One in-flight sampler run on its own OS thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cellmem_core::probe::Backends;

use crate::sampler::{run, SamplerConfig, SamplerOutcome};
use crate::tracking::PeakTracker;

/// Handle to a detached sampler run.
///
/// The cancel flag is level-triggered: it stays set, so a loop that checks
/// late still exits on its next iteration. Dropping the handle neither
/// cancels nor joins the thread.
pub struct SamplerHandle {
    cancel: Arc<AtomicBool>,
    iterations: Arc<AtomicU64>,
    tracker: Arc<PeakTracker>,
    max_iterations: u64,
    started: Instant,
    thread: Option<JoinHandle<SamplerOutcome>>,
}

impl SamplerHandle {
    /// Spawn a sampler run over a fresh `tracker`.
    ///
    /// If the OS refuses to spawn a thread, the run is performed as zero
    /// ticks: the handle behaves as already finished and the tracker stays
    /// empty, which the accountant reports as `peaked = 0`.
    pub fn spawn(tracker: Arc<PeakTracker>, backends: Backends, cfg: SamplerConfig) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let iterations = Arc::new(AtomicU64::new(0));

        let thread = {
            let cancel = Arc::clone(&cancel);
            let iterations = Arc::clone(&iterations);
            let tracker = Arc::clone(&tracker);
            thread::Builder::new()
                .name("cellmem-peak-sampler".into())
                .spawn(move || run(&cancel, &tracker, &backends, cfg, &iterations))
        };

        let thread = match thread {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(error = %e, "could not spawn peak sampler thread; peaks will read as 0");
                None
            }
        };

        Self {
            cancel,
            iterations,
            tracker,
            max_iterations: cfg.max_iterations,
            started: Instant::now(),
            thread,
        }
    }

    /// Ask the loop to stop. Returns immediately.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Ticks completed so far.
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Acquire)
    }

    /// The run reached its iteration ceiling (it stopped, or is about to,
    /// without a cancel).
    pub fn hit_ceiling(&self) -> bool {
        self.iterations() >= self.max_iterations
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn tracker(&self) -> &Arc<PeakTracker> {
        &self.tracker
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Block until the loop ends. The session never calls this; it exists
    /// for tools that want the exact outcome.
    pub fn join(mut self) -> SamplerOutcome {
        let fallback = SamplerOutcome::Cancelled {
            iterations: self.iterations(),
        };
        match self.thread.take() {
            Some(t) => t.join().unwrap_or(fallback),
            None => fallback,
        }
    }
}

impl std::fmt::Debug for SamplerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerHandle")
            .field("cancelled", &self.is_cancelled())
            .field("iterations", &self.iterations())
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cellmem_probe::ManualProbe;

    #[test]
    fn cancel_stops_a_running_sampler() {
        let host = ManualProbe::new(64);
        let backends = Backends::host_only(Arc::new(host));
        let tracker = Arc::new(PeakTracker::new());
        let cfg = SamplerConfig {
            poll_interval: Duration::from_millis(1),
            max_iterations: 1_000_000,
        };

        let handle = SamplerHandle::spawn(Arc::clone(&tracker), backends, cfg);
        let deadline = Instant::now() + Duration::from_secs(5);
        while tracker.host_peak().is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        handle.cancel();
        let outcome = handle.join();

        assert!(!outcome.is_runaway());
        assert_eq!(tracker.host_peak(), Some(64));
    }
}
