//! The `cubefold` command line tool.
//!
//! Parses, transforms, interprets and tests IR files.
//! See `cubefold --help` for usage.

use anyhow::Result;
use clap::Parser;
use cubefold_cli::commands::{CatCommand, InterpretCommand, PassCommand, TestCommand};

/// Binomial cube folding utility
#[derive(Parser)]
#[command(
    name = "cubefold",
    version,
    after_help = "Usage examples:\n\
                  \n  \
                  cubefold pass cubic.ir cube-fold dce\n  \
                  cubefold interpret --optimized cubic.ir\n  \
                  cubefold test crates/filetests/filetests\n"
)]
struct Cubefold {
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(Parser)]
enum Subcommand {
    /// Parses IR files and prints them back out
    Cat(CatCommand),

    /// Runs a pipeline of passes on an IR file
    Pass(PassCommand),

    /// Interprets IR files and checks their run commands
    Interpret(InterpretCommand),

    /// Runs file tests
    Test(TestCommand),
}

impl Cubefold {
    /// Executes the command.
    pub fn execute(self) -> Result<()> {
        match self.subcommand {
            Subcommand::Cat(c) => c.execute(),
            Subcommand::Pass(c) => c.execute(),
            Subcommand::Interpret(c) => c.execute(),
            Subcommand::Test(c) => c.execute(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    Cubefold::parse().execute()
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Cubefold::command().debug_assert()
}
