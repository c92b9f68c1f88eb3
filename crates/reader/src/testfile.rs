//! Data structures representing a parsed test file.
//!
//! A test file is a `.ir` file which contains test commands and settings for running a
//! file-based test case.

use crate::error::Location;
use crate::sourcemap::SourceMap;
use crate::testcommand::TestCommand;
use cubefold_codegen::ir::Function;
use cubefold_codegen::ir::entities::AnyEntity;
use cubefold_codegen::settings::Flags;

/// A parsed test case.
///
/// This is the result of parsing a `.ir` file which contains a number of test commands and
/// settings followed by the functions that should be tested.
#[derive(Debug)]
pub struct TestFile<'a> {
    /// `test foo ...` lines.
    pub commands: Vec<TestCommand<'a>>,
    /// Settings from the `set` lines, applied on top of the defaults.
    pub flags: Flags,
    /// Comments appearing before the first function.
    /// These are all tagged as 'Function' scope for lack of a better entity.
    pub preamble_comments: Vec<Comment<'a>>,
    /// Parsed functions and additional details about each function.
    pub functions: Vec<(Function, Details<'a>)>,
}

/// Additional details about a function parsed from a text string.
/// These are useful for detecting test commands embedded in comments etc.
/// The details do not affect the semantics of the function.
#[derive(Debug)]
pub struct Details<'a> {
    /// Location of the `function` keyword that begins this function.
    pub location: Location,
    /// Annotation comments that appeared inside or after the function.
    pub comments: Vec<Comment<'a>>,
    /// Mapping of entity numbers to source locations.
    pub map: SourceMap,
}

/// A comment in a parsed function.
///
/// The comment belongs to the immediately preceding entity, whether that is a block header, an
/// instruction, or one of the preamble declarations.
///
/// Comments appearing inside the function but before the preamble, as well as comments appearing
/// after the function are tagged as `AnyEntity::Function`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Comment<'a> {
    /// The entity this comment is attached to.
    /// Comments always follow their entity.
    pub entity: AnyEntity,
    /// Text of the comment, including the leading `;`.
    pub text: &'a str,
}
