use thiserror::Error;

use crate::types::Axis;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No backend for this axis, or the probe call itself failed. Callers
    /// degrade that axis to Unavailable; it never aborts an interval.
    #[error("{axis} memory backend unavailable: {reason}")]
    BackendUnavailable { axis: Axis, reason: String },

    /// Unsubscribing a hook that was never subscribed (or already removed).
    #[error("unsubscribe had no effect: hooks not subscribed")]
    UnsubscribeNoOp,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn host_unavailable(reason: impl Into<String>) -> Self {
        Error::BackendUnavailable {
            axis: Axis::Host,
            reason: reason.into(),
        }
    }

    pub fn device_unavailable(reason: impl Into<String>) -> Self {
        Error::BackendUnavailable {
            axis: Axis::Device,
            reason: reason.into(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}
