//! Plain data types shared by the meerkat crates.
//!
//! Nothing here does I/O or spawns work: these are the values monitors return,
//! the operator reports and the front ends display.

mod domain;
pub use domain::*;
