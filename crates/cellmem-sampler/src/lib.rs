#![forbid(unsafe_code)]
//! cellmem-sampler: peak tracking and the background sampling loop.
//!
//! One sampler run owns one [`PeakTracker`]. The foreground thread talks to
//! the run only through the cancel flag in [`SamplerHandle`]; it never waits
//! for the loop to observe it.

pub mod handle;
pub mod sampler;
pub mod tracking;

pub use handle::SamplerHandle;
pub use sampler::{run, SamplerConfig, SamplerOutcome};
pub use tracking::PeakTracker;
