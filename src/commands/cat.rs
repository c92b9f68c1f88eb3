//! The module that implements the `cubefold cat` command.
//!
//! Read a sequence of IR files and print them again to stdout. This has the effect of
//! normalizing formatting, renumbering entities and removing comments.

use crate::common::read_to_string;
use anyhow::{Context, Result};
use clap::Parser;
use cubefold_reader::parse_functions;
use std::path::{Path, PathBuf};

/// Parses IR files and prints them back out.
#[derive(Parser)]
pub struct CatCommand {
    /// Specify input file(s) to be used. Use '-' for stdin.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl CatCommand {
    /// Executes the command.
    pub fn execute(self) -> Result<()> {
        for (i, f) in self.files.iter().enumerate() {
            if i != 0 {
                println!();
            }
            cat_one(f)?;
        }
        Ok(())
    }
}

fn cat_one(path: &Path) -> Result<()> {
    let buffer = read_to_string(path)?;
    let items =
        parse_functions(&buffer).with_context(|| format!("failed to parse {}", path.display()))?;

    for (idx, func) in items.into_iter().enumerate() {
        if idx != 0 {
            println!();
        }
        print!("{func}");
    }

    Ok(())
}
