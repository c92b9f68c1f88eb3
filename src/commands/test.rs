//! The module that implements the `cubefold test` command.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Runs file tests.
#[derive(Parser)]
pub struct TestCommand {
    /// Be more verbose
    #[arg(short, long)]
    verbose: bool,

    /// Print pass timing report for test
    #[arg(short = 'T')]
    time_passes: bool,

    /// Test files or directories to scan for `.ir` files.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl TestCommand {
    /// Executes the command.
    pub fn execute(self) -> Result<()> {
        let files = self
            .files
            .iter()
            .map(|f| f.display().to_string())
            .collect::<Vec<_>>();
        cubefold_filetests::run(self.verbose, self.time_passes, &files)?;
        Ok(())
    }
}
