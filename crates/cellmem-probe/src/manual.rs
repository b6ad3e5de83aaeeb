//! Caller-driven probes.
//!
//! `ManualProbe` reports whatever value it was last given and counts how it
//! was queried, so tests can script an interval's memory profile exactly.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use cellmem_core::error::{Error, Result};
use cellmem_core::id::DeviceHandle;
use cellmem_core::probe::{DeviceProbe, HostProbe};

const NO_RECLAIM_TARGET: u64 = u64::MAX;

#[derive(Debug)]
struct Inner {
    value_mb: AtomicU64,
    reclaim_target_mb: AtomicU64,
    failing: AtomicBool,
    reads: AtomicU64,
    fast_reads: AtomicU64,
    reclaims: AtomicU64,
}

/// Thread-safe scripted probe. Clones share the same reading.
#[derive(Debug, Clone)]
pub struct ManualProbe {
    inner: Arc<Inner>,
}

impl ManualProbe {
    pub fn new(value_mb: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                value_mb: AtomicU64::new(value_mb),
                reclaim_target_mb: AtomicU64::new(NO_RECLAIM_TARGET),
                failing: AtomicBool::new(false),
                reads: AtomicU64::new(0),
                fast_reads: AtomicU64::new(0),
                reclaims: AtomicU64::new(0),
            }),
        }
    }

    pub fn set(&self, value_mb: u64) {
        self.inner.value_mb.store(value_mb, Ordering::Release);
    }

    pub fn get(&self) -> u64 {
        self.inner.value_mb.load(Ordering::Acquire)
    }

    /// Make the next reclamation pass drop the reading to `value_mb`
    /// (one-shot).
    pub fn reclaim_to(&self, value_mb: u64) {
        self.inner
            .reclaim_target_mb
            .store(value_mb, Ordering::Release);
    }

    /// While set, every query fails with `BackendUnavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::Release);
    }

    /// Slow-path reads (`used_mb`), host or device.
    pub fn reads(&self) -> u64 {
        self.inner.reads.load(Ordering::Acquire)
    }

    pub fn fast_reads(&self) -> u64 {
        self.inner.fast_reads.load(Ordering::Acquire)
    }

    pub fn reclaims(&self) -> u64 {
        self.inner.reclaims.load(Ordering::Acquire)
    }

    fn read(&self, counter: &AtomicU64, fail: fn(String) -> Error) -> Result<u64> {
        counter.fetch_add(1, Ordering::AcqRel);
        if self.inner.failing.load(Ordering::Acquire) {
            return Err(fail("manual probe set to fail".into()));
        }
        Ok(self.get())
    }

    fn run_reclaim(&self) {
        self.inner.reclaims.fetch_add(1, Ordering::AcqRel);
        let target = self
            .inner
            .reclaim_target_mb
            .swap(NO_RECLAIM_TARGET, Ordering::AcqRel);
        if target != NO_RECLAIM_TARGET {
            self.set(target);
        }
    }
}

impl Default for ManualProbe {
    fn default() -> Self {
        Self::new(0)
    }
}

impl HostProbe for ManualProbe {
    fn used_mb(&self) -> Result<u64> {
        self.read(&self.inner.reads, |r| Error::host_unavailable(r))
    }

    fn reclaim(&self) {
        self.run_reclaim();
    }
}

impl DeviceProbe for ManualProbe {
    fn name(&self) -> &str {
        "manual"
    }

    fn used_mb(&self) -> Result<u64> {
        self.read(&self.inner.reads, |r| Error::device_unavailable(r))
    }

    fn used_mb_fast(&self, _handle: DeviceHandle) -> Result<u64> {
        self.read(&self.inner.fast_reads, |r| Error::device_unavailable(r))
    }

    fn reclaim_cache(&self) {
        self.run_reclaim();
    }
}

/// A backend that is present but never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingProbe;

impl HostProbe for FailingProbe {
    fn used_mb(&self) -> Result<u64> {
        Err(Error::host_unavailable("probe always fails"))
    }
}

impl DeviceProbe for FailingProbe {
    fn name(&self) -> &str {
        "failing"
    }

    fn current_device(&self) -> Result<DeviceHandle> {
        Err(Error::device_unavailable("no device selected"))
    }

    fn used_mb(&self) -> Result<u64> {
        Err(Error::device_unavailable("probe always fails"))
    }
}
