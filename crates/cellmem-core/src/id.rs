//! Strongly-typed identifiers.
//!
//! Downstream crates should *not* pass raw integers around for these.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

// 1-based sequence number of a completed interval within one session.
new_id!(IntervalId);
// Accelerator index handed to the fast probe.
new_id!(DeviceHandle);
// Registration returned by a boundary event source.
new_id!(SubscriptionId);

impl IntervalId {
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}
