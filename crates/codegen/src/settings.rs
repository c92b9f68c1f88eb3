//! Shared settings module.
//!
//! This module defines data structures to access the settings defined for the passes.
//!
//! Settings are configured with a `Builder` and then frozen into an immutable `Flags` object:
//!
//! ```ignore
//! use cubefold_codegen::settings::{self, Configurable};
//!
//! let mut b = settings::builder();
//! b.set("opt_level", "none")?;
//!
//! let f = settings::Flags::new(b);
//! assert_eq!(f.opt_level(), settings::OptLevel::None);
//! ```

use core::fmt;
use core::str::FromStr;
use thiserror::Error;

/// A string-based configurator for settings groups.
///
/// The `Configurable` protocol allows settings to be modified by name before a finished `Flags`
/// struct is created.
pub trait Configurable {
    /// Set the string value of any setting by name.
    ///
    /// This can set any type of setting whether it is numeric, boolean, or enumerated.
    fn set(&mut self, name: &str, value: &str) -> SetResult<()>;

    /// Enable a boolean setting or apply a preset.
    ///
    /// If the identified setting isn't a boolean or a preset, a `BadType` error is returned.
    fn enable(&mut self, name: &str) -> SetResult<()>;
}

/// An error produced when changing a setting.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SetError {
    /// No setting by this name exists.
    #[error("No existing setting named '{0}'")]
    BadName(String),

    /// Type mismatch for setting (e.g., setting an enum setting as a bool).
    #[error("Trying to set a setting with the wrong type")]
    BadType,

    /// This is not a valid value for this setting.
    #[error("Unexpected value for a setting, expected {0}")]
    BadValue(String),
}

/// A result returned when changing a setting.
pub type SetResult<T> = Result<T, SetError>;

/// Optimization level for the pass pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum OptLevel {
    /// No optimization passes run.
    None,
    /// The pipeline-start passes run.
    #[default]
    Speed,
}

impl OptLevel {
    const NAMES: [&'static str; 2] = ["none", "speed"];
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Speed => "speed",
        })
    }
}

impl FromStr for OptLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "none" => Ok(Self::None),
            "speed" => Ok(Self::Speed),
            _ => Err(()),
        }
    }
}

/// Collect settings values before freezing them into `Flags`.
#[derive(Clone, Debug)]
pub struct Builder {
    opt_level: OptLevel,
    enable_verifier: bool,
}

/// Create a new builder with all settings at their default values.
pub fn builder() -> Builder {
    Builder {
        opt_level: OptLevel::default(),
        enable_verifier: true,
    }
}

fn parse_bool_value(value: &str) -> SetResult<bool> {
    match value {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(SetError::BadValue("bool".to_string())),
    }
}

impl Configurable for Builder {
    fn set(&mut self, name: &str, value: &str) -> SetResult<()> {
        match name {
            "opt_level" => {
                self.opt_level = value.parse().map_err(|()| {
                    SetError::BadValue(format!("any among {}", OptLevel::NAMES.join(", ")))
                })?;
            }
            "enable_verifier" => self.enable_verifier = parse_bool_value(value)?,
            _ => return Err(SetError::BadName(name.to_string())),
        }
        Ok(())
    }

    fn enable(&mut self, name: &str) -> SetResult<()> {
        match name {
            "enable_verifier" => {
                self.enable_verifier = true;
                Ok(())
            }
            "opt_level" => Err(SetError::BadType),
            _ => Err(SetError::BadName(name.to_string())),
        }
    }
}

/// Flags group `shared`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Flags {
    opt_level: OptLevel,
    enable_verifier: bool,
}

impl Flags {
    /// Create flags shared settings group.
    pub fn new(builder: Builder) -> Self {
        Self {
            opt_level: builder.opt_level,
            enable_verifier: builder.enable_verifier,
        }
    }

    /// Optimization level for the pass pipeline.
    pub fn opt_level(&self) -> OptLevel {
        self.opt_level
    }

    /// Run the IR verifier after every pass.
    pub fn enable_verifier(&self) -> bool {
        self.enable_verifier
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::new(builder())
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[shared]")?;
        writeln!(f, "opt_level = \"{}\"", self.opt_level)?;
        writeln!(f, "enable_verifier = {}", self.enable_verifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_default() {
        let b = builder();
        let f = Flags::new(b);
        assert_eq!(
            f.to_string(),
            "[shared]\nopt_level = \"speed\"\nenable_verifier = true\n"
        );
        assert_eq!(f.opt_level(), OptLevel::Speed);
        assert!(f.enable_verifier());
    }

    #[test]
    fn modify_bool() {
        let mut b = builder();
        assert_eq!(b.enable("not_there"), Err(SetError::BadName("not_there".to_string())));
        assert_eq!(b.set("enable_verifier", "false"), Ok(()));
        assert!(!Flags::new(b.clone()).enable_verifier());
        assert_eq!(b.enable("enable_verifier"), Ok(()));
        assert!(Flags::new(b).enable_verifier());
    }

    #[test]
    fn modify_string() {
        let mut b = builder();
        assert_eq!(
            b.set("not_there", "true"),
            Err(SetError::BadName("not_there".to_string()))
        );
        assert_eq!(
            b.set("enable_verifier", ""),
            Err(SetError::BadValue("bool".to_string()))
        );
        assert_eq!(
            b.set("opt_level", "true"),
            Err(SetError::BadValue("any among none, speed".to_string()))
        );
        assert_eq!(b.enable("opt_level"), Err(SetError::BadType));
        assert_eq!(b.set("opt_level", "none"), Ok(()));

        let f = Flags::new(b);
        assert_eq!(f.opt_level(), OptLevel::None);
    }
}
