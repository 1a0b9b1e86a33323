//! Type-safe identifier wrappers around `u64`.
//!
//! Every entity the engine indexes has a strongly-typed handle to prevent
//! accidental mixing of identifiers at compile time. Handles are allocated
//! from a process-wide monotonic counter, so an entity created later always
//! sorts after one created earlier. Board and registry maps are keyed by
//! these handles, which keeps iteration order deterministic.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Allocate the next identifier from the process-wide counter.
            pub fn next() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(1);
                Self(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            /// Return the inner `u64` value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Stable handle for an agent admitted to (or waiting to join) a board.
    AgentId
}

define_id! {
    /// Handle returned when a task is registered with the scheduler.
    TaskId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic() {
        let a = AgentId::next();
        let b = AgentId::next();
        assert!(b > a);
    }

    #[test]
    fn id_kinds_use_independent_counters() {
        let before = TaskId::next();
        let _ = AgentId::next();
        let _ = AgentId::next();
        let after = TaskId::next();
        assert!(after > before);
    }

    #[test]
    fn display_shows_raw_value() {
        assert_eq!(AgentId(42).to_string(), "42");
        assert_eq!(u64::from(TaskId(7)), 7);
    }
}
