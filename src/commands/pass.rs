//! The module that implements the `cubefold pass` command.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Runs a pipeline of passes on an IR file and prints the result.
#[derive(Parser)]
pub struct PassCommand {
    /// Be more verbose
    #[arg(short, long)]
    verbose: bool,

    /// Print pass timing report
    #[arg(short = 'T')]
    time_passes: bool,

    /// Configure a setting, e.g. `--set opt_level=none`. Replaces the `set` lines of the file.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    settings: Vec<String>,

    /// Specify an input file to be used. Use '-' for stdin.
    file: PathBuf,

    /// Passes to run, e.g. `cube-fold dce`. Defaults to the pipeline-start passes.
    passes: Vec<String>,
}

impl PassCommand {
    /// Executes the command.
    pub fn execute(self) -> Result<()> {
        cubefold_filetests::run_passes(
            self.verbose,
            self.time_passes,
            &self.passes,
            &self.settings,
            &self.file.display().to_string(),
        )
    }
}
