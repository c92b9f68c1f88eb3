//! Run commands.
//!
//! Functions in a `.ir` file can have *run commands* appended that control how a function is
//! invoked and tested within the `test interpret` context. The general syntax is:
//!
//! - `; run: %fn(arg, arg, ...) == result`
//! - `; run: %fn(arg, arg, ...) != [result, result]`
//! - `; run: %fn(arg, arg, ...)` or `; print: %fn(arg, arg, ...)` to print the results
//!
//! `parse_run_command` in the parser turns the comment text into a `RunCommand`.

use std::fmt::{self, Display, Formatter};

/// A run command appearing in a test file.
///
/// For parsing, see `Parser::parse_run_command`.
#[derive(PartialEq, Eq, Debug)]
pub enum RunCommand {
    /// Invoke a function and print its result.
    Print(Invocation),
    /// Invoke a function and compare its result to a value sequence.
    Run(Invocation, Comparison, Vec<i64>),
}

impl RunCommand {
    /// Run the [RunCommand]:
    ///  - for [RunCommand::Print], print the returned values from invoking the function.
    ///  - for [RunCommand::Run], compare the returned values from the invoked function and
    ///    return an `Err` with a descriptive string if the comparison fails.
    ///
    /// Accepts a function used for invoking the actual execution of the function. This function
    /// takes the name and arguments of the invocation.
    pub fn run<F>(&self, invoke_fn: F) -> Result<(), String>
    where
        F: FnOnce(&str, &[i64]) -> Result<Vec<i64>, String>,
    {
        match self {
            RunCommand::Print(invoke) => {
                let actual = invoke_fn(&invoke.func, &invoke.args)?;
                println!("{} -> {}", invoke, DisplayValues(&actual))
            }
            RunCommand::Run(invoke, compare, expected) => {
                let actual = invoke_fn(&invoke.func, &invoke.args)?;
                let matched = compare.apply(&actual, expected);
                if !matched {
                    let actual = DisplayValues(&actual);
                    return Err(format!("Failed test: {self}, actual: {actual}"));
                }
            }
        }
        Ok(())
    }
}

impl Display for RunCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            RunCommand::Print(invocation) => write!(f, "print: {invocation}"),
            RunCommand::Run(invocation, comparison, expected) => {
                let expected = DisplayValues(expected);
                write!(f, "run: {invocation} {comparison} {expected}")
            }
        }
    }
}

/// A function call; [RunCommand]s invoke an IR function using an [Invocation].
#[derive(Debug, PartialEq, Eq)]
pub struct Invocation {
    /// The name of the function to call. The run command is attached to a function already, so
    /// this is mostly informational.
    pub func: String,
    /// The arguments to be passed to the function when invoked.
    pub args: Vec<i64>,
}

impl Invocation {
    pub(crate) fn new(func: &str, args: Vec<i64>) -> Self {
        let func = func.to_string();
        Self { func, args }
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "%{}(", self.func)?;
        write_value_list(f, &self.args)?;
        write!(f, ")")
    }
}

/// A comparison between actual and expected results; e.g. `==`.
#[expect(missing_docs, reason = "self-describing variants")]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Comparison {
    Equals,
    NotEquals,
}

impl Comparison {
    /// Apply the comparison to the actual and expected value sequences.
    pub fn apply(&self, actual: &[i64], expected: &[i64]) -> bool {
        match self {
            Comparison::Equals => actual == expected,
            Comparison::NotEquals => actual != expected,
        }
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Comparison::Equals => write!(f, "=="),
            Comparison::NotEquals => write!(f, "!="),
        }
    }
}

/// Helper for displaying a result list: a single value is printed bare, anything else in
/// brackets.
struct DisplayValues<'a>(&'a [i64]);

impl<'a> Display for DisplayValues<'a> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.0.len() {
            1 => write!(f, "{}", self.0[0]),
            _ => {
                write!(f, "[")?;
                write_value_list(f, self.0)?;
                write!(f, "]")
            }
        }
    }
}

fn write_value_list(f: &mut Formatter<'_>, values: &[i64]) -> fmt::Result {
    for (i, val) in values.iter().enumerate() {
        match i {
            0 => write!(f, "{val}")?,
            _ => write!(f, ", {val}")?,
        }
    }
    Ok(())
}
