//! Test command for interpreting IR files and verifying their results.
//!
//! The `interpret` test command interprets each function using the
//! [RunCommand](cubefold_reader::RunCommand)s attached to it. With the `optimized` flag the
//! function is first run through the optimization pipeline, so the run commands check the
//! transformed function instead.

use crate::subtest::{Context, SubTest};
use cubefold_codegen::ir::Function;
use cubefold_interpreter::environment::FunctionStore;
use cubefold_interpreter::interpreter::Interpreter;
use cubefold_reader::{TestCommand, TestOption, parse_run_command};
use log::trace;
use std::borrow::Cow;

/// Instructions a single run command may execute before it is considered stuck.
const FUEL: u64 = 1_000_000;

struct TestInterpret {
    optimized: bool,
}

pub fn subtest(parsed: &TestCommand) -> anyhow::Result<Box<dyn SubTest>> {
    assert_eq!(parsed.command, "interpret");
    let mut test = TestInterpret { optimized: false };
    for option in &parsed.options {
        match option {
            TestOption::Flag("optimized") => test.optimized = true,
            _ => anyhow::bail!("unknown option on {}", parsed),
        }
    }
    Ok(Box::new(test))
}

impl SubTest for TestInterpret {
    fn name(&self) -> &'static str {
        "interpret"
    }

    fn is_mutating(&self) -> bool {
        self.optimized
    }

    fn run(&self, func: Cow<Function>, context: &Context) -> anyhow::Result<()> {
        let func = if self.optimized {
            let mut comp_ctx = cubefold_codegen::Context::for_function(func.into_owned());
            comp_ctx
                .optimize(context.flags)
                .map_err(|e| crate::pretty_anyhow_error(&comp_ctx.func, e))?;
            Cow::Owned(comp_ctx.func)
        } else {
            func
        };

        let mut env = FunctionStore::default();
        env.add(func.name.clone(), &func);
        let interpreter = Interpreter::new().with_fuel(Some(FUEL));

        for comment in context.details.comments.iter() {
            if let Some(command) = parse_run_command(comment.text, &func.signature)? {
                trace!("Parsed run command: {}", command);

                command
                    .run(|func_name, run_args| {
                        interpreter
                            .call_by_name(&env, func_name, run_args)
                            .map_err(|e| format!("interpretation of %{func_name} failed: {e}"))
                    })
                    .map_err(|e| anyhow::anyhow!("{}", e))?;
            }
        }
        Ok(())
    }
}
