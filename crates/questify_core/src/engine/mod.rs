//! Pure progression engine functions.
//!
//! # Responsibility
//! - Decide when a daily assignment is stale (`rotation`).
//! - Draw a bounded, duplicate-free quest set from the pool (`sampler`).
//! - Map cumulative XP to levels (`progression`).
//!
//! # Invariants
//! - Nothing in this module performs I/O or can fail.
//! - Time and randomness are always passed in by the caller.

pub mod progression;
pub mod rotation;
pub mod sampler;
