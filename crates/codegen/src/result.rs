//! Result and error types representing the outcome of running passes over a function.

use crate::verifier::VerifierErrors;
use thiserror::Error;

/// A pass pipeline error.
///
/// When a pipeline can't be built or leaves the function malformed, it returns one of these.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodegenError {
    /// A list of IR verifier errors.
    ///
    /// This always represents a bug, either in the code that generated the IR, or a bug in one
    /// of the passes.
    #[error("Verifier errors")]
    Verifier(#[from] VerifierErrors),

    /// A pipeline description named a pass that doesn't exist.
    #[error("Unknown pass '{0}'")]
    UnknownPass(String),
}

/// A convenient alias for a `Result` that uses `CodegenError` as the error type.
pub type CodegenResult<T> = Result<T, CodegenError>;
