//! Pluggable measurement backend interfaces.
//!
//! Concrete probes live in `cellmem-probe`. Only traits and the injected
//! [`Backends`] pair live here so the sampler and session crates can depend
//! on the API without pulling in any OS query code.

use std::sync::Arc;

use crate::error::Result;
use crate::id::DeviceHandle;

/// Host (process) memory probe.
pub trait HostProbe: Send + Sync {
    /// Current usage in MB, rounded down.
    fn used_mb(&self) -> Result<u64>;

    /// Release whatever the host allocator is holding on to before a final
    /// reading. Invoked only when reclamation is enabled.
    fn reclaim(&self) {}
}

/// Accelerator memory probe.
pub trait DeviceProbe: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str {
        "device"
    }

    /// Resolve the currently selected accelerator. Called once per sampler
    /// run, never per tick.
    fn current_device(&self) -> Result<DeviceHandle> {
        Ok(DeviceHandle::new(0))
    }

    /// Usage in MB for the once-per-interval final reading. Allowed to be
    /// expensive (e.g. release unused cached blocks first).
    fn used_mb(&self) -> Result<u64>;

    /// Hot-loop variant: no cache release, no checks. Backends without a
    /// cheaper path inherit the slow one.
    fn used_mb_fast(&self, handle: DeviceHandle) -> Result<u64> {
        let _ = handle;
        self.used_mb()
    }

    /// Drop cached allocations before the final reading (when enabled).
    fn reclaim_cache(&self) {}
}

/// The backend pair injected into the sampler and the accountant.
///
/// `device == None` means no accelerator; every device metric then reports
/// Unavailable.
#[derive(Clone)]
pub struct Backends {
    pub host: Arc<dyn HostProbe>,
    pub device: Option<Arc<dyn DeviceProbe>>,
}

impl Backends {
    pub fn host_only(host: Arc<dyn HostProbe>) -> Self {
        Self { host, device: None }
    }

    pub fn new(host: Arc<dyn HostProbe>, device: Arc<dyn DeviceProbe>) -> Self {
        Self {
            host,
            device: Some(device),
        }
    }

    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("device", &self.device.as_ref().map(|d| d.name().to_string()))
            .finish_non_exhaustive()
    }
}
