//! Load-plan counts wrapped in NonZero newtypes
//!
//! A load test with zero clients or zero workers is meaningless, so those
//! values are rejected when parsed rather than checked later.

/// Error for a count that must be at least one
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} cannot be 0")]
pub struct ZeroCount(&'static str);

/// Generates a `NonZeroUsize` count newtype
///
/// Each type gets `ONE`, `new()`, `get()`, `Display`, `FromStr`,
/// `TryFrom<usize>`, and serde as a plain integer that rejects zero.
macro_rules! count_newtype {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident;
    ) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "usize", into = "usize")]
        $vis struct $name(std::num::NonZeroUsize);

        impl $name {
            pub const ONE: Self = Self(std::num::NonZeroUsize::MIN);

            /// `None` for zero
            #[must_use]
            pub const fn new(value: usize) -> Option<Self> {
                match std::num::NonZeroUsize::new(value) {
                    Some(nz) => Some(Self(nz)),
                    None => None,
                }
            }

            #[must_use]
            #[inline]
            pub const fn get(&self) -> usize {
                self.0.get()
            }
        }

        impl TryFrom<usize> for $name {
            type Error = $crate::types::config::ZeroCount;

            fn try_from(value: usize) -> Result<Self, Self::Error> {
                Self::new(value).ok_or($crate::types::config::ZeroCount(stringify!($name)))
            }
        }

        impl From<$name> for usize {
            fn from(count: $name) -> Self {
                count.get()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value: usize = s
                    .trim()
                    .parse()
                    .map_err(|e| format!("invalid {}: {}", stringify!($name), e))?;
                Self::try_from(value).map_err(|e| e.to_string())
            }
        }
    };
}

pub mod duration;
mod limits;

pub use duration::duration_millis_serde;
pub use limits::{ClientCount, WorkerCount};
