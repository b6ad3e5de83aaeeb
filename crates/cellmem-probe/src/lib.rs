#![forbid(unsafe_code)]
//! cellmem-probe: measurement backends.
//!
//! - [`host::ProcessRssProbe`]: resident set size of a process via `sysinfo`.
//! - [`accelerator`]: process-wide, initialise-once accelerator backend.
//! - [`manual`]: caller-driven probes for tests and demos.
//! - `nvml` (feature `nvml`): NVIDIA device memory.

pub mod accelerator;
pub mod host;
pub mod manual;
#[cfg(feature = "nvml")]
pub mod nvml;

pub use host::ProcessRssProbe;
pub use manual::{FailingProbe, ManualProbe};
#[cfg(feature = "nvml")]
pub use nvml::NvmlProbe;
