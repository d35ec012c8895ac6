//! Tick-driven session clocks.
//!
//! Nothing in this module reads the wall clock. A driver (the async
//! [`SessionRunner`](crate::session::SessionRunner), or a test) advances the
//! clocks by calling their tick methods at the nominal period.

mod clocks;
mod ticker;

pub use clocks::{SessionClocks, ATTEMPT_PERIOD, ELAPSED_PERIOD};
pub use ticker::Ticker;
