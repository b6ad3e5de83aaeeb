#![forbid(unsafe_code)]
//! cellmem-session: per-interval memory accounting for an interactive
//! session.
//!
//! A [`Session`] subscribes to a [`BoundarySource`] (pre/post execution
//! hooks), runs a background peak sampler during each interval, and on each
//! interval end computes the snapshot, emits a report to its
//! [`ReportSink`], and keeps the snapshot for [`Session::data`].

pub mod accountant;
pub mod controller;
pub mod events;
pub mod metrics;
pub mod report;

pub use accountant::{account, Accountant, IntervalState, PerAxis};
pub use controller::{Session, SessionState};
pub use events::{BoundaryHooks, BoundarySource, HookRegistry};
pub use report::{
    render, CollectingSink, IntervalReport, JsonLinesSink, ReportFormat, ReportSink, StdoutSink,
};
