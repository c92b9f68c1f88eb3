//! Common functionality shared between cubefold CLI commands.

use anyhow::{Context, Result};
use cubefold_codegen::settings::{self, Flags};
use cubefold_reader::{Location, parse_options};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read an entire file into a string.
pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut buffer = String::new();
    let path = path.as_ref();
    if path == Path::new("-") {
        let stdin = io::stdin();
        let mut stdin = stdin.lock();
        stdin
            .read_to_string(&mut buffer)
            .context("failed to read stdin to string")?;
    } else {
        let mut file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        file.read_to_string(&mut buffer)
            .with_context(|| format!("failed to read {} to string", path.display()))?;
    }
    Ok(buffer)
}

/// Parse `--set name=value` options on top of the default settings.
pub fn parse_settings(flag_set: &[String]) -> Result<Flags> {
    let mut flag_builder = settings::builder();
    parse_options(
        flag_set.iter().map(|x| x.as_str()),
        &mut flag_builder,
        Location { line_number: 0 },
    )?;
    Ok(Flags::new(flag_builder))
}

/// Iterate over all of the files passed as arguments, recursively iterating through directories.
///
/// Hidden entries and directories are skipped. A `-` argument is passed through unchanged so
/// callers can read it from stdin.
pub fn iterate_files(files: &[PathBuf]) -> impl Iterator<Item = PathBuf> + '_ {
    files.iter().flat_map(|file| {
        let stdin = (file.as_path() == Path::new("-")).then(|| file.clone());
        let walk = stdin
            .is_none()
            .then(|| WalkDir::new(file).sort_by_file_name())
            .into_iter()
            .flatten()
            .filter_map(|entry| match entry {
                Ok(d) => {
                    let hidden = d.file_name().to_str().is_some_and(|s| s.starts_with('.'));
                    (!hidden && !d.file_type().is_dir()).then(|| d.into_path())
                }
                Err(e) => {
                    println!("Unable to read file: {e}");
                    None
                }
            });
        stdin.into_iter().chain(walk)
    })
}
