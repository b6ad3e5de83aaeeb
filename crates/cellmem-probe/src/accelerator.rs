//! Process-wide accelerator backend, initialised once.
//!
//! Querying an accelerator usually needs a library-level init that must run
//! exactly once per process. [`init`] performs that registration; sessions
//! never read this global themselves, they receive a [`Backends`] built by
//! [`backends`] (or by hand).

use std::sync::Arc;

use once_cell::sync::OnceCell;

use cellmem_core::probe::{Backends, DeviceProbe, HostProbe};

static DEVICE: OnceCell<Option<Arc<dyn DeviceProbe>>> = OnceCell::new();

/// Install the process-wide device backend. `None` records "no accelerator".
///
/// Returns `false` (and changes nothing) if a backend was already installed.
pub fn init(device: Option<Arc<dyn DeviceProbe>>) -> bool {
    let name = device.as_ref().map(|d| d.name().to_string());
    let installed = DEVICE.set(device).is_ok();
    if installed {
        tracing::debug!(device = ?name, "accelerator backend initialised");
    } else {
        tracing::debug!("accelerator backend already initialised; ignoring init");
    }
    installed
}

/// True once [`init`] installed an actual device.
pub fn is_available() -> bool {
    matches!(DEVICE.get(), Some(Some(_)))
}

/// The installed device backend, if any.
pub fn device() -> Option<Arc<dyn DeviceProbe>> {
    DEVICE.get().and_then(|d| d.clone())
}

/// Pair `host` with the registered device (or none).
pub fn backends(host: Arc<dyn HostProbe>) -> Backends {
    Backends {
        host,
        device: device(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::ManualProbe;

    // The registry is process-global; keep every assertion about it in one test.
    #[test]
    fn init_happens_once() {
        let first = ManualProbe::new(512);
        assert!(init(Some(Arc::new(first))));
        assert!(is_available());

        assert!(!init(None));
        assert!(is_available());

        let b = backends(Arc::new(ManualProbe::new(1)));
        let dev = b.device.expect("registered device");
        assert_eq!(dev.used_mb().unwrap(), 512);
    }
}
