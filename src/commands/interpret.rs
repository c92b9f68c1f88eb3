//! The module that implements the `cubefold interpret` command.
//!
//! Every function in the given files is executed by the interpreter for each `; run:` or
//! `; print:` command attached to it.

use crate::common::{iterate_files, parse_settings, read_to_string};
use anyhow::{Context as _, Result};
use clap::Parser;
use cubefold_codegen::settings::Flags;
use cubefold_codegen::{Context, timing};
use cubefold_interpreter::environment::FunctionStore;
use cubefold_interpreter::interpreter::Interpreter;
use cubefold_reader::{parse_run_command, parse_test};
use log::debug;
use std::path::{Path, PathBuf};

/// Interprets IR files and checks their run commands.
#[derive(Parser)]
pub struct InterpretCommand {
    /// Specify input file(s) to be used. Use '-' for stdin.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Be more verbose
    #[arg(short, long)]
    verbose: bool,

    /// Print pass timing report
    #[arg(short = 'T')]
    time_passes: bool,

    /// Run the optimization pipeline before interpreting.
    #[arg(long)]
    optimized: bool,

    /// Maximum number of instructions a single run command may execute.
    #[arg(long, value_name = "N")]
    fuel: Option<u64>,

    /// Configure a setting, e.g. `--set opt_level=none`. Replaces the `set` lines of each file.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    settings: Vec<String>,
}

impl InterpretCommand {
    /// Executes the command.
    pub fn execute(self) -> Result<()> {
        let flags = if self.settings.is_empty() {
            None
        } else {
            Some(parse_settings(&self.settings)?)
        };

        let mut total = 0;
        let mut errors = 0;
        for file in iterate_files(&self.files) {
            total += 1;
            match self.interpret_file(&file, flags.as_ref()) {
                Ok(()) => {
                    if self.verbose {
                        println!("{}", file.display());
                    }
                }
                Err(e) => {
                    println!("{}: {:?}", file.display(), e);
                    errors += 1;
                }
            }
        }

        if self.verbose {
            match total {
                0 => println!("0 files"),
                1 => println!("1 file"),
                n => println!("{n} files"),
            }
        }
        if self.time_passes {
            print!("{}", timing::take_current());
        }

        match errors {
            0 => Ok(()),
            1 => anyhow::bail!("1 failure"),
            n => anyhow::bail!("{} failures", n),
        }
    }

    fn interpret_file(&self, path: &Path, flags: Option<&Flags>) -> Result<()> {
        let buffer = read_to_string(path)?;
        let test_file =
            parse_test(&buffer).with_context(|| format!("failed to parse {}", path.display()))?;
        let flags = flags.unwrap_or(&test_file.flags);

        let mut functions = Vec::with_capacity(test_file.functions.len());
        for (func, details) in test_file.functions.iter() {
            let mut ctx = Context::for_function(func.clone());
            if self.optimized {
                ctx.optimize(flags)
                    .with_context(|| format!("failed to optimize %{}", func.name))?;
            } else {
                ctx.verify_if(flags)
                    .with_context(|| format!("failed to verify %{}", func.name))?;
            }
            functions.push((ctx.func, details));
        }

        let mut env = FunctionStore::default();
        for (func, _) in functions.iter() {
            env.add(func.name.clone(), func);
        }
        let interpreter = Interpreter::new().with_fuel(self.fuel);

        for (func, details) in functions.iter() {
            for comment in details.comments.iter() {
                let Some(command) = parse_run_command(comment.text, &func.signature)? else {
                    continue;
                };
                debug!("%{}: {}", func.name, command);
                command
                    .run(|name, args| {
                        interpreter
                            .call_by_name(&env, name, args)
                            .map_err(|e| format!("interpretation of %{name} failed: {e}"))
                    })
                    .map_err(|s| anyhow::anyhow!("{}", s))?;
            }
        }
        Ok(())
    }
}
