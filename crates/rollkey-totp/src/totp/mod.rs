//! OTP crate: sub-modules.

pub mod clock;
pub mod core;
pub mod types;
pub mod uri;

// Re-export top-level items for convenience.
pub use clock::{Clock, FixedClock, SystemClock};
pub use types::*;
