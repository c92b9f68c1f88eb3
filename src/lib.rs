//! The Cubefold command line interface (CLI) crate.
//!
//! This crate implements the `cubefold` command line tool.

#![deny(missing_docs)]

pub mod commands;

pub(crate) mod common;
