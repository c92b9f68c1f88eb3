//! `SubTest` trait.

use anyhow::Context as _;
use anyhow::{Result, bail};
use cubefold_codegen::ir::{AnyEntity, Function};
use cubefold_codegen::settings::Flags;
use cubefold_reader::{Comment, Details, TestFile};
use filecheck::{Checker, CheckerBuilder, NO_VARIABLES};
use log::info;
use similar::TextDiff;
use std::borrow::Cow;

/// Context for running a test on a single function.
pub struct Context<'a> {
    /// Comments from the preamble of the test file. These apply to all functions.
    pub preamble_comments: &'a [Comment<'a>],

    /// Additional details about the function from the parser.
    pub details: &'a Details<'a>,

    /// Settings for this test, from the `set` lines of the file.
    pub flags: &'a Flags,
}

/// Common interface for implementations of test commands.
///
/// Each `.ir` test file may contain multiple test commands, each represented by a `SubTest`
/// trait object.
pub trait SubTest {
    /// Name identifying this subtest. Typically the same as the test command.
    fn name(&self) -> &'static str;

    /// Should the verifier be run on the function before running the test?
    fn needs_verifier(&self) -> bool {
        true
    }

    /// Does this test mutate the function when it runs?
    /// This is used as a hint to avoid cloning the function needlessly.
    fn is_mutating(&self) -> bool {
        false
    }

    /// Runs the entire subtest for every function in the file, invoking [Self::run] for each.
    fn run_target(&self, testfile: &TestFile, flags: &Flags) -> Result<()> {
        for (func, details) in &testfile.functions {
            info!("Test: {}(%{})", self.name(), func.name);

            let context = Context {
                preamble_comments: &testfile.preamble_comments,
                details,
                flags,
            };

            self.run(Cow::Borrowed(func), &context)
                .with_context(|| format!("function %{}", func.name))?;
        }

        Ok(())
    }

    /// Run this test on `func`.
    fn run(&self, func: Cow<Function>, context: &Context) -> Result<()>;
}

/// Run filecheck on `text`, using directives extracted from `context`.
pub fn run_filecheck(text: &str, context: &Context) -> Result<()> {
    log::debug!(
        "Filecheck Input:\n\
         =======================\n\
         {text}\n\
         ======================="
    );
    let checker = build_filechecker(context)?;
    if checker
        .check(text, NO_VARIABLES)
        .context("filecheck failed")?
    {
        Ok(())
    } else {
        // Filecheck mismatch. Emit an explanation as output.
        let (_, explain) = checker
            .explain(text, NO_VARIABLES)
            .context("filecheck explain failed")?;
        bail!(
            "filecheck failed for function on line {}:\n{}{}",
            context.details.location.line_number,
            checker,
            explain
        );
    }
}

/// Build a filechecker using the directives in the file preamble and the function's comments.
pub fn build_filechecker(context: &Context) -> Result<Checker> {
    let mut builder = CheckerBuilder::new();
    // Preamble comments apply to all functions.
    for comment in context
        .preamble_comments
        .iter()
        .chain(&context.details.comments)
    {
        builder
            .directive(comment.text)
            .context("filecheck directive failed")?;
    }
    Ok(builder.finish())
}

/// Compare the printed function against the comments following it, line by line.
///
/// Comments starting with `;;` are ignored, so they can carry prose and run commands.
pub fn check_precise_output(actual: &str, context: &Context) -> Result<()> {
    let actual: Vec<_> = actual.lines().collect();
    let expected = context
        .details
        .comments
        .iter()
        .filter(|c| !c.text.starts_with(";;") && c.entity == AnyEntity::Function)
        .map(|c| {
            c.text
                .strip_prefix("; ")
                .or_else(|| c.text.strip_prefix(';'))
                .unwrap_or(c.text)
        })
        .collect::<Vec<_>>();

    if actual == expected {
        return Ok(());
    }

    bail!(
        "output of function on line {} does not match the text expectation\n\n{}",
        context.details.location.line_number,
        TextDiff::from_slices(&expected, &actual)
            .unified_diff()
            .header("expected", "actual")
    )
}
