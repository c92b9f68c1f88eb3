//! Run the tests in a single test file.

use crate::new_subtest;
use crate::subtest::SubTest;
use anyhow::Context as _;
use cubefold_codegen::ir::Function;
use cubefold_codegen::timing;
use cubefold_codegen::verify_function;
use cubefold_reader::{TestFile, parse_test};
use log::info;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time;

/// Read an entire file into a string. The path `-` reads stdin.
pub fn read_to_string(path: &Path) -> anyhow::Result<String> {
    let mut buffer = String::new();
    if path == Path::new("-") {
        io::stdin()
            .lock()
            .read_to_string(&mut buffer)
            .context("failed to read stdin to string")?;
    } else {
        buffer = fs::read_to_string(path)
            .with_context(|| format!("failed to read {} to string", path.display()))?;
    }
    Ok(buffer)
}

/// Load `path` and run the test in it.
///
/// If running this test causes a panic, it will propagate as normal.
pub fn run(path: &Path) -> anyhow::Result<time::Duration> {
    let _tt = timing::process_file();
    info!("---\nFile: {}", path.to_string_lossy());
    let started = time::Instant::now();
    let buffer = read_to_string(path)?;

    let testfile = parse_test(&buffer).context("failed to parse test file")?;

    if testfile.functions.is_empty() {
        anyhow::bail!("no functions found");
    }

    // Parse the test commands.
    let mut tests = testfile
        .commands
        .iter()
        .map(new_subtest)
        .collect::<anyhow::Result<Vec<_>>>()?;

    // Bail if the test has no runnable commands
    if tests.is_empty() {
        anyhow::bail!("no test commands found");
    }

    // Sort the tests so the mutators are at the end, and those that don't need the verifier are at
    // the front.
    tests.sort_by_key(|st| (st.is_mutating(), st.needs_verifier()));

    // Verify each function once, before the first test that needs it.
    let mut verified = false;
    for test in &tests {
        if test.needs_verifier() && !verified {
            verify_testfile(&testfile)?;
            verified = true;
        }
        run_subtest(test.as_ref(), &testfile)?;
    }

    Ok(started.elapsed())
}

fn run_subtest(test: &dyn SubTest, testfile: &TestFile) -> anyhow::Result<()> {
    test.run_target(testfile, &testfile.flags)
        .with_context(|| format!("test {}", test.name()))
}

// Verifies all functions in a testfile.
fn verify_testfile(testfile: &TestFile) -> anyhow::Result<()> {
    for (func, _) in &testfile.functions {
        verify_function(func).map_err(|errors| pretty_verifier_error(func, &errors))?;
    }
    Ok(())
}

fn pretty_verifier_error(
    func: &Function,
    errors: &cubefold_codegen::verifier::VerifierErrors,
) -> anyhow::Error {
    anyhow::anyhow!("function %{} failed to verify:\n{}", func.name, errors)
}
