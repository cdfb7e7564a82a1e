//! HCFD poller - change detection and subscriber fan-out
//!
//! - `cycle` - one fetch/evaluate/dedup/dispatch/record pass over both feeds
//! - `scheduler` - cancellable periodic driver for the cycle
//! - `wiring` - builds production dependencies from configuration
//! - `admin` - operator commands (token reset, subscriber count)

pub mod admin;
pub mod cycle;
pub mod scheduler;
pub mod wiring;

pub use cycle::*;
pub use scheduler::*;
