//! Heuristics module for the VRPTW.
//!
//! This module exports route construction, the genetic operators and the
//! evolutionary controller that drives them.

pub mod construction;
pub mod operators;
pub mod genetic;

pub use construction::*;
pub use operators::*;
pub use genetic::*;
