//! Cubefold file reader library.
//!
//! The `cubefold_reader` library supports reading .ir files: functions in the textual IR
//! format, optionally preceded by `test` and `set` lines and followed by `; run:` commands.

#![deny(missing_docs)]

pub use crate::error::{Location, ParseError, ParseResult};
pub use crate::options::parse_options;
pub use crate::parser::{parse_functions, parse_run_command, parse_test};
pub use crate::run_command::{Comparison, Invocation, RunCommand};
pub use crate::sourcemap::SourceMap;
pub use crate::testcommand::{TestCommand, TestOption};
pub use crate::testfile::{Comment, Details, TestFile};

mod error;
mod lexer;
mod options;
mod parser;
mod run_command;
mod sourcemap;
mod testcommand;
mod testfile;
