//! Logging macros, compiled away when the `tracing` feature is off.
//!
//! The crate logs through these instead of `tracing` directly so that a
//! default-features-off build carries no logging dependency at all.

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub use crate::{debug, warn};

#[cfg(feature = "tracing")]
pub use tracing::{debug, warn};
