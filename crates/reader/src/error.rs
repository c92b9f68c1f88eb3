//! Parse errors and their source locations.

#![macro_use]

use std::fmt;
use thiserror::Error;

/// A line in the text being parsed.
///
/// Line 0 stands for options given on the command line; lines of a file count from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
    /// Line number.
    pub line_number: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.line_number {
            0 => f.write_str("command-line arguments"),
            n => write!(f, "{n}"),
        }
    }
}

/// Failure to read a test file, a function or a command-line option.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("{location}: {message}")]
pub struct ParseError {
    /// Where the parser gave up.
    pub location: Location,
    /// What it expected or rejected.
    pub message: String,
}

impl ParseError {
    /// Create an error at `location`.
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

/// Result of a parser operation.
pub type ParseResult<T> = Result<T, ParseError>;

// `Err(ParseError)` at a location, with a fixed message or `format!` arguments.
macro_rules! err {
    ( $loc:expr, $msg:literal ) => {
        Err($crate::ParseError::new($loc, format!($msg)))
    };

    ( $loc:expr, $msg:expr ) => {
        Err($crate::ParseError::new($loc, $msg))
    };

    ( $loc:expr, $fmt:literal, $( $arg:expr ),+ ) => {
        Err($crate::ParseError::new($loc, format!($fmt, $( $arg ),+)))
    };
}
