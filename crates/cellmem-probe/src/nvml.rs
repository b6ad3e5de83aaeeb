//! NVIDIA accelerator memory via NVML.
//!
//! Compiled only with the `nvml` feature. The library handle is initialised
//! once in [`NvmlProbe::new`]; register the probe through
//! [`crate::accelerator::init`] so every session shares it.

use std::sync::Arc;

use nvml_wrapper::error::NvmlError;
use nvml_wrapper::Nvml;

use cellmem_core::error::{Error, Result};
use cellmem_core::id::DeviceHandle;
use cellmem_core::probe::DeviceProbe;

const MB: u64 = 1 << 20;

/// Used memory of one NVIDIA device, in MB.
#[derive(Debug)]
pub struct NvmlProbe {
    nvml: Arc<Nvml>,
    index: u32,
}

impl NvmlProbe {
    /// Initialise NVML and select device 0.
    pub fn new() -> Result<Self> {
        Self::with_index(0)
    }

    /// Initialise NVML and select the device at `index`.
    ///
    /// Fails with [`Error::BackendUnavailable`] when the driver or library is
    /// missing, or when no device exists at `index`.
    pub fn with_index(index: u32) -> Result<Self> {
        let nvml = Nvml::init().map_err(init_error)?;
        let count = nvml
            .device_count()
            .map_err(|e| Error::device_unavailable(format!("device count: {e:?}")))?;
        if index >= count {
            return Err(Error::device_unavailable(format!(
                "no device at index {index} ({count} present)"
            )));
        }
        tracing::info!(devices = count, index, "NVML initialised");
        Ok(Self {
            nvml: Arc::new(nvml),
            index,
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    fn used_on(&self, index: u32) -> Result<u64> {
        let device = self
            .nvml
            .device_by_index(index)
            .map_err(|e| Error::device_unavailable(format!("device {index}: {e:?}")))?;
        let info = device
            .memory_info()
            .map_err(|e| Error::device_unavailable(format!("memory info {index}: {e:?}")))?;
        Ok(info.used / MB)
    }
}

fn init_error(e: NvmlError) -> Error {
    match e {
        NvmlError::DriverNotLoaded | NvmlError::LibraryNotFound => {
            Error::device_unavailable("NVML library or driver not present")
        }
        NvmlError::NoPermission => Error::device_unavailable("no permission to access NVML"),
        other => Error::device_unavailable(format!("NVML init: {other:?}")),
    }
}

impl DeviceProbe for NvmlProbe {
    fn name(&self) -> &str {
        "nvml"
    }

    fn current_device(&self) -> Result<DeviceHandle> {
        self.nvml
            .device_by_index(self.index)
            .map_err(|e| Error::device_unavailable(format!("device {}: {e:?}", self.index)))?;
        Ok(DeviceHandle::new(u64::from(self.index)))
    }

    fn used_mb(&self) -> Result<u64> {
        self.used_on(self.index)
    }

    fn used_mb_fast(&self, handle: DeviceHandle) -> Result<u64> {
        let index = u32::try_from(handle.get())
            .map_err(|_| Error::device_unavailable(format!("bad device handle {handle}")))?;
        self.used_on(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Runs on machines with or without a GPU: either a reading or a typed
    // device error, never a panic.
    #[test]
    fn init_reports_typed_outcome() {
        match NvmlProbe::new() {
            Ok(probe) => {
                let handle = probe.current_device().unwrap();
                assert_eq!(handle.get(), 0);
                assert!(probe.used_mb_fast(handle).is_ok());
            }
            Err(e) => assert!(matches!(
                e,
                Error::BackendUnavailable {
                    axis: cellmem_core::types::Axis::Device,
                    ..
                }
            )),
        }
    }

    #[test]
    fn out_of_range_index_is_unavailable() {
        let err = NvmlProbe::with_index(u32::MAX).unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable { .. }));
    }
}
