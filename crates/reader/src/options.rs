//! Parsed representation of `set` commands.
//!
//! A test file can contain `set` commands that change the settings used by every test command
//! in the file. The same `name=value` syntax is accepted from the command line.

use crate::error::{Location, ParseResult};
use crate::testcommand::TestOption;
use cubefold_codegen::settings::{Configurable, SetError};

/// Parse an iterator of command line options and apply them to `config`.
pub fn parse_options<'a, I>(iter: I, config: &mut dyn Configurable, loc: Location) -> ParseResult<()>
where
    I: Iterator<Item = &'a str>,
{
    for opt in iter.map(TestOption::new) {
        match opt {
            TestOption::Flag(name) => match config.enable(name) {
                Ok(_) => {}
                Err(SetError::BadName(name)) => return err!(loc, "unknown flag '{}'", name),
                Err(_) => return err!(loc, "not a boolean flag: '{}'", opt),
            },
            TestOption::Value(name, value) => match config.set(name, value) {
                Ok(_) => {}
                Err(SetError::BadName(name)) => return err!(loc, "unknown setting '{}'", name),
                Err(SetError::BadType) => return err!(loc, "invalid setting type: '{}'", opt),
                Err(SetError::BadValue(expected)) => {
                    return err!(
                        loc,
                        "invalid setting value for '{}', expected {}",
                        opt,
                        expected
                    );
                }
            },
        }
    }
    Ok(())
}
