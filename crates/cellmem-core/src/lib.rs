#![forbid(unsafe_code)]
//! cellmem-core: shared types, ids, configuration, errors, and backend traits.
//!
//! Nothing in this crate spawns threads or queries memory. Measurement
//! backends implement the traits in [`probe`]; the sampler and session
//! crates only ever see them through [`probe::Backends`].

pub mod config;
pub mod error;
pub mod id;
pub mod prelude;
pub mod probe;
pub mod types;
