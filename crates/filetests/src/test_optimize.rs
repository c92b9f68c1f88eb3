//! Test command for testing the optimization pipeline.
//!
//! The `optimize` test command runs each function through the passes selected by the
//! `opt_level` setting. The output for filecheck purposes is the resulting IR.
//!
//! With the `precise-output` flag the comments after the function must instead match the printed
//! function exactly, line by line.

use crate::subtest::{Context, SubTest, check_precise_output, run_filecheck};
use anyhow::Result;
use cubefold_codegen::ir::Function;
use cubefold_reader::{TestCommand, TestOption};
use std::borrow::Cow;

struct TestOptimize {
    precise_output: bool,
}

pub fn subtest(parsed: &TestCommand) -> Result<Box<dyn SubTest>> {
    assert_eq!(parsed.command, "optimize");
    let mut test = TestOptimize {
        precise_output: false,
    };
    for option in parsed.options.iter() {
        match option {
            TestOption::Flag("precise-output") => test.precise_output = true,
            _ => anyhow::bail!("unknown option on {}", parsed),
        }
    }
    Ok(Box::new(test))
}

impl SubTest for TestOptimize {
    fn name(&self) -> &'static str {
        "optimize"
    }

    fn is_mutating(&self) -> bool {
        true
    }

    fn run(&self, func: Cow<Function>, context: &Context) -> Result<()> {
        let mut comp_ctx = cubefold_codegen::Context::for_function(func.into_owned());

        comp_ctx
            .optimize(context.flags)
            .map_err(|e| crate::pretty_anyhow_error(&comp_ctx.func, e))?;

        let text = comp_ctx.func.display().to_string();

        if self.precise_output {
            check_precise_output(&text, context)
        } else {
            run_filecheck(&text, context)
        }
    }
}
