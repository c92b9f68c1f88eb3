//! Test command for testing the binomial cube folding pass.
//!
//! The `cube_fold` test command runs each function through a single invocation of the pass and
//! sends the result to `filecheck`. The expanded computation it replaced is left in place, so
//! tests can see which sum was rewritten.

use crate::subtest::{Context, SubTest, run_filecheck};
use cubefold_codegen::ir::Function;
use cubefold_reader::TestCommand;
use std::borrow::Cow;

struct TestCubeFold;

pub fn subtest(parsed: &TestCommand) -> anyhow::Result<Box<dyn SubTest>> {
    assert_eq!(parsed.command, "cube_fold");
    if !parsed.options.is_empty() {
        anyhow::bail!("No options allowed on {}", parsed);
    }
    Ok(Box::new(TestCubeFold))
}

impl SubTest for TestCubeFold {
    fn name(&self) -> &'static str {
        "cube_fold"
    }

    fn is_mutating(&self) -> bool {
        true
    }

    fn run(&self, func: Cow<Function>, context: &Context) -> anyhow::Result<()> {
        let mut comp_ctx = cubefold_codegen::Context::for_function(func.into_owned());
        let changed = comp_ctx
            .cube_fold(context.flags)
            .map_err(|e| crate::pretty_anyhow_error(&comp_ctx.func, e))?;
        log::debug!(
            "cube_fold: %{} {}",
            comp_ctx.func.name,
            if changed { "modified" } else { "unchanged" }
        );

        let text = comp_ctx.func.display().to_string();
        run_filecheck(&text, context)
    }
}
