//! Cubefold IR interpreter.
//!
//! This module is a project for interpreting Cubefold IR: it executes a function's blocks from
//! the entry, one instruction at a time, so the effect of a pass can be checked by running the
//! function before and after it.

pub mod environment;
pub mod frame;
pub mod interpreter;
pub mod step;
