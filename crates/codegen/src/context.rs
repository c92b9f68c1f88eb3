//! Pass context and main entry point.
//!
//! The `Context` struct holds the function being optimized and runs passes over it, verifying the
//! result after each pass when the `enable_verifier` setting asks for it.

use crate::ir::Function;
use crate::passes::Pipeline;
use crate::result::CodegenResult;
use crate::settings::{Flags, OptLevel};
use crate::timing;
use crate::verifier::{verify_function, VerifierResult};
use crate::{cube_fold, dce};

/// Persistent data structures and the pass pipeline.
#[derive(Default)]
pub struct Context {
    /// The function we're optimizing.
    pub func: Function,
}

impl Context {
    /// Allocate a new context.
    pub fn new() -> Self {
        Self::for_function(Function::new())
    }

    /// Allocate a new context with an existing Function.
    pub fn for_function(func: Function) -> Self {
        Self { func }
    }

    /// Clear all data structures in this context.
    pub fn clear(&mut self) {
        self.func.clear();
    }

    /// Run the verifier on the function.
    pub fn verify(&self) -> VerifierResult<()> {
        verify_function(&self.func)
    }

    /// Run the verifier only if the `enable_verifier` setting is true.
    pub fn verify_if(&self, flags: &Flags) -> CodegenResult<()> {
        if flags.enable_verifier() {
            self.verify()?;
        }
        Ok(())
    }

    /// Fold the first expanded binomial cube in the function.
    pub fn cube_fold(&mut self, flags: &Flags) -> CodegenResult<bool> {
        let changed = cube_fold::do_cube_fold(&mut self.func);
        self.verify_if(flags)?;
        Ok(changed)
    }

    /// Perform dead code elimination on the function.
    pub fn eliminate_dead_code(&mut self, flags: &Flags) -> CodegenResult<bool> {
        let changed = dce::do_dce(&mut self.func);
        self.verify_if(flags)?;
        Ok(changed)
    }

    /// Run every pass of `pipeline` in order, returning whether any of them changed the function.
    pub fn run_pipeline(&mut self, pipeline: &Pipeline, flags: &Flags) -> CodegenResult<bool> {
        let mut changed = false;
        for pass in pipeline.passes() {
            let modified = pass.run(&mut self.func);
            log::debug!(
                "{}: %{} {}",
                pass.name,
                self.func.name,
                if modified { "modified" } else { "unchanged" }
            );
            self.verify_if(flags)?;
            changed |= modified;
        }
        Ok(changed)
    }

    /// Run the optimization pipeline selected by the `opt_level` setting.
    pub fn optimize(&mut self, flags: &Flags) -> CodegenResult<bool> {
        let _tt = timing::optimize();
        self.verify_if(flags)?;
        match flags.opt_level() {
            OptLevel::None => Ok(false),
            OptLevel::Speed => self.run_pipeline(&Pipeline::pipeline_start(), flags),
        }
    }
}
