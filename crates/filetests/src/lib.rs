//! File tests.
//!
//! This crate contains the main test driver as well as implementations of the
//! available filetest commands.

#![deny(missing_docs)]

use crate::runner::TestRunner;
use anyhow::Context as _;
use cubefold_codegen::ir::Function;
use cubefold_codegen::settings::{self, Flags};
use cubefold_codegen::{CodegenError, Pipeline, timing};
use cubefold_reader::{Location, TestCommand, parse_options, parse_test};
use std::path::Path;
use std::time;

mod match_directive;
mod runner;
mod runone;
mod subtest;

mod test_cube_fold;
mod test_dce;
mod test_interpret;
mod test_optimize;
mod test_verifier;

/// Main entry point for `cubefold test`.
///
/// Take a list of filenames which can be either `.ir` files or directories.
///
/// Files are interpreted as test cases and executed immediately.
///
/// Directories are scanned recursively for test cases ending in `.ir`.
pub fn run(verbose: bool, report_times: bool, files: &[String]) -> anyhow::Result<time::Duration> {
    let mut runner = TestRunner::new(verbose, report_times);

    for path in files.iter().map(Path::new) {
        if path.is_file() {
            runner.push_test(path);
        } else {
            runner.push_dir(path);
        }
    }

    runner.run()
}

/// Used for 'pass' subcommand.
/// Commands are interpreted as a pipeline of named passes, e.g. `cube-fold dce`, and run on
/// every function in `file`; an empty list runs the pipeline-start passes.
/// A non-empty `flag_set` replaces the `set` lines of the file.
/// The transformed functions are printed to stdout.
pub fn run_passes(
    verbose: bool,
    report_times: bool,
    passes: &[String],
    flag_set: &[String],
    file: &str,
) -> anyhow::Result<()> {
    let pipeline = if passes.is_empty() {
        Pipeline::pipeline_start()
    } else {
        passes.join(",").parse()?
    };

    let path = Path::new(file);
    let buffer = runone::read_to_string(path)?;
    let testfile =
        parse_test(&buffer).with_context(|| format!("failed to parse {}", path.display()))?;
    if testfile.functions.is_empty() {
        anyhow::bail!("no functions found in {}", path.display());
    }
    let flags = if flag_set.is_empty() {
        testfile.flags
    } else {
        let mut builder = settings::builder();
        parse_options(
            flag_set.iter().map(|x| x.as_str()),
            &mut builder,
            Location { line_number: 0 },
        )?;
        Flags::new(builder)
    };

    for (i, (func, _)) in testfile.functions.into_iter().enumerate() {
        if i != 0 {
            println!();
        }
        let mut comp_ctx = cubefold_codegen::Context::for_function(func);
        comp_ctx
            .verify_if(&flags)
            .map_err(|e| pretty_anyhow_error(&comp_ctx.func, e))?;
        let changed = comp_ctx
            .run_pipeline(&pipeline, &flags)
            .map_err(|e| pretty_anyhow_error(&comp_ctx.func, e))?;
        if verbose {
            println!(
                "; {}: {}",
                pipeline,
                if changed { "modified" } else { "unchanged" }
            );
        }
        print!("{}", comp_ctx.func);
    }

    if report_times {
        print!("{}", timing::take_current());
    }
    Ok(())
}

/// Create a new subcommand trait object to match `parsed.command`.
///
/// This function knows how to create all of the possible `test <foo>` commands that can appear in
/// a `.ir` test file.
fn new_subtest(parsed: &TestCommand) -> anyhow::Result<Box<dyn subtest::SubTest>> {
    match parsed.command {
        "cube_fold" => test_cube_fold::subtest(parsed),
        "dce" => test_dce::subtest(parsed),
        "interpret" => test_interpret::subtest(parsed),
        "optimize" => test_optimize::subtest(parsed),
        "verifier" => test_verifier::subtest(parsed),
        _ => anyhow::bail!("unknown test command '{}'", parsed.command),
    }
}

/// Attach the function to a pass error so verifier failures show the IR they complain about.
fn pretty_anyhow_error(func: &Function, err: CodegenError) -> anyhow::Error {
    match err {
        CodegenError::Verifier(errors) => {
            anyhow::anyhow!("{}\n{}", func.display(), errors)
        }
        err => err.into(),
    }
}
