//! Test command for checking the IR verifier.
//!
//! The `test verifier` test command looks for annotations on instructions like this:
//!
//! ```text
//!     v3 = iadd v1, v2 ; error: block does not end in a terminator
//! ```
//!
//! This annotation means that the verifier is expected to give an error for the annotated
//! instruction containing the substring "block does not end in a terminator". Annotations on a
//! block header or a stack slot declaration refer to that entity instead.

use crate::match_directive::match_directive;
use crate::subtest::{Context, SubTest};
use cubefold_codegen::ir::{AnyEntity, Function};
use cubefold_codegen::verify_function;
use cubefold_reader::TestCommand;
use std::borrow::Cow;

struct TestVerifier;

pub fn subtest(parsed: &TestCommand) -> anyhow::Result<Box<dyn SubTest>> {
    assert_eq!(parsed.command, "verifier");
    if !parsed.options.is_empty() {
        anyhow::bail!("No options allowed on {}", parsed);
    }
    Ok(Box::new(TestVerifier))
}

impl SubTest for TestVerifier {
    fn name(&self) -> &'static str {
        "verifier"
    }

    fn needs_verifier(&self) -> bool {
        false
    }

    fn run(&self, func: Cow<Function>, context: &Context) -> anyhow::Result<()> {
        // Scan source annotations for "error:" directives.
        let expected: Vec<(AnyEntity, &str)> = context
            .details
            .comments
            .iter()
            .filter_map(|comment| {
                match_directive(comment.text, "error:").map(|tail| (comment.entity, tail))
            })
            .collect();

        let mut errors = match verify_function(&func) {
            Ok(()) if expected.is_empty() => return Ok(()),
            Ok(()) => anyhow::bail!("passed, but expected errors: {:?}", expected),
            Err(errors) if expected.is_empty() => {
                anyhow::bail!("expected no error, but got:\n{}", errors)
            }
            Err(errors) => errors.0,
        };

        // For each expected error, find a suitable match and remove it.
        let mut problems = Vec::new();
        for (entity, message) in expected {
            match errors
                .iter()
                .position(|err| err.location == entity && err.message.contains(message))
            {
                Some(pos) => {
                    errors.swap_remove(pos);
                }
                None => problems.push(format!("  expected error {entity}: {message}")),
            }
        }

        // Report remaining errors.
        problems.extend(errors.iter().map(|err| format!("unexpected error {err}")));

        if problems.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("{}", problems.join("\n"))
        }
    }
}
