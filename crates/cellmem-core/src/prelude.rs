//! Convenient re-exports for downstream crates.

pub use crate::config::LoggerConfig;
pub use crate::error::{Error, Result};
pub use crate::id::{DeviceHandle, IntervalId, SubscriptionId};
pub use crate::probe::{Backends, DeviceProbe, HostProbe};
pub use crate::types::{Axis, AxisMetrics, MemorySample, Snapshot};
