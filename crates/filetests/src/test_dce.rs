//! Test command for testing the DCE pass.
//!
//! The `dce` test command runs each function through the DCE pass.
//!
//! The resulting function is sent to `filecheck`.

use crate::subtest::{Context, SubTest, run_filecheck};
use cubefold_codegen::ir::Function;
use cubefold_reader::TestCommand;
use std::borrow::Cow;

struct TestDce;

pub fn subtest(parsed: &TestCommand) -> anyhow::Result<Box<dyn SubTest>> {
    assert_eq!(parsed.command, "dce");
    if !parsed.options.is_empty() {
        anyhow::bail!("No options allowed on {}", parsed);
    }
    Ok(Box::new(TestDce))
}

impl SubTest for TestDce {
    fn name(&self) -> &'static str {
        "dce"
    }

    fn is_mutating(&self) -> bool {
        true
    }

    fn run(&self, func: Cow<Function>, context: &Context) -> anyhow::Result<()> {
        let mut comp_ctx = cubefold_codegen::Context::for_function(func.into_owned());

        comp_ctx
            .eliminate_dead_code(context.flags)
            .map_err(|e| crate::pretty_anyhow_error(&comp_ctx.func, e))?;

        let text = comp_ctx.func.display().to_string();
        run_filecheck(&text, context)
    }
}
