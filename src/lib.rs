#![forbid(unsafe_code)]
//! cellmem: per-interval host and accelerator memory logging.
//!
//! Facade over the workspace crates. Typical use:
//!
//! ```no_run
//! use std::sync::Arc;
//! use cellmem::prelude::*;
//!
//! let registry = Arc::new(HookRegistry::new());
//! let host = ProcessRssProbe::current()?;
//! let session = Session::new(
//!     LoggerConfig::from_env(),
//!     cellmem::accelerator::backends(Arc::new(host)),
//!     registry.clone(),
//!     Arc::new(StdoutSink),
//! )?;
//! session.start();
//! registry.run_cell(|| { /* monitored work */ });
//! println!("{:?}", session.data());
//! # Ok::<(), cellmem::error::Error>(())
//! ```

pub use cellmem_core::{config, error, id, probe, types};
pub use cellmem_probe::{accelerator, host, manual};
pub use cellmem_sampler as sampler;
pub use cellmem_session as session;

pub mod prelude {
    pub use cellmem_core::prelude::*;
    pub use cellmem_probe::{ManualProbe, ProcessRssProbe};
    pub use cellmem_session::{
        BoundaryHooks, BoundarySource, CollectingSink, HookRegistry, IntervalReport, ReportFormat,
        ReportSink, Session, SessionState, StdoutSink,
    };
}
