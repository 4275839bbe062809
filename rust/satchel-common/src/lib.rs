#![warn(missing_docs)]

//! This crate constitutes a library of light weight helpers that are shared
//! across the other satchel crates: a swappable source of "now" and opaque
//! identifier generation.

mod time;
pub use time::*;

mod id;
pub use id::*;
