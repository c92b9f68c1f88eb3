//! Named passes and pipelines.
//!
//! Passes are looked up by name so that pipelines can be described as text, e.g. on the command
//! line or in a test file: `cube-fold,dce`.

use crate::cube_fold::do_cube_fold;
use crate::dce::do_dce;
use crate::ir::Function;
use crate::result::CodegenError;
use core::fmt;
use core::str::FromStr;

/// A pass that can be named in a pipeline.
pub struct PassInfo {
    /// The name used in pipeline descriptions.
    pub name: &'static str,
    /// A one-line description of the pass.
    pub description: &'static str,
    run: fn(&mut Function) -> bool,
}

impl PassInfo {
    /// Run this pass on `func`, returning whether it modified the function.
    pub fn run(&self, func: &mut Function) -> bool {
        (self.run)(func)
    }

    /// Look up a pass by name.
    pub fn lookup(name: &str) -> Option<&'static Self> {
        PASSES.iter().find(|pass| pass.name == name)
    }

    /// All registered passes.
    pub fn all() -> &'static [Self] {
        &PASSES
    }
}

impl fmt::Debug for PassInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name)
    }
}

static PASSES: [PassInfo; 2] = [
    PassInfo {
        name: "cube-fold",
        description: "Rewrite an expanded binomial cube as (a + b)^3",
        run: do_cube_fold,
    },
    PassInfo {
        name: "dce",
        description: "Remove instructions whose results are unused",
        run: do_dce,
    },
];

/// An ordered list of passes.
#[derive(Debug, Default)]
pub struct Pipeline {
    passes: Vec<&'static PassInfo>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// The passes run at the start of the optimization pipeline: fold cubes, then clean up the
    /// expanded computation they replaced.
    pub fn pipeline_start() -> Self {
        let mut pipeline = Self::new();
        for name in ["cube-fold", "dce"] {
            pipeline.passes.extend(PassInfo::lookup(name));
        }
        pipeline
    }

    /// Append a pass to the pipeline.
    pub fn push(&mut self, pass: &'static PassInfo) {
        self.passes.push(pass);
    }

    /// The passes in this pipeline, in order.
    pub fn passes(&self) -> &[&'static PassInfo] {
        &self.passes
    }

    /// Is this pipeline empty?
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl FromStr for Pipeline {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, CodegenError> {
        let mut pipeline = Self::new();
        for name in s.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let pass =
                PassInfo::lookup(name).ok_or_else(|| CodegenError::UnknownPass(name.to_string()))?;
            pipeline.push(pass);
        }
        Ok(pipeline)
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, pass) in self.passes.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(pass.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let pipeline: Pipeline = "cube-fold, dce,,".parse().unwrap();
        assert_eq!(pipeline.to_string(), "cube-fold,dce");
        assert_eq!(
            Pipeline::pipeline_start().to_string(),
            pipeline.to_string()
        );
        assert!("".parse::<Pipeline>().unwrap().is_empty());
        assert_eq!(
            "dce,licm".parse::<Pipeline>().unwrap_err(),
            CodegenError::UnknownPass("licm".to_string())
        );
    }

    #[test]
    fn registry() {
        let names: Vec<_> = PassInfo::all().iter().map(|p| p.name).collect();
        assert_eq!(names, ["cube-fold", "dce"]);
        assert!(PassInfo::lookup("cube_fold").is_none());
    }
}
