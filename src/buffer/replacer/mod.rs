//! Replacement policy.
//!
//! - [`ClockReplacer`] - clock / second-chance victim selection over the
//!   frame descriptor table

mod clock;

pub use clock::ClockReplacer;
