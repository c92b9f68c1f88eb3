//! A verifier for ensuring that functions are well formed.
//! It verifies:
//!
//! Block integrity
//!
//! - All instructions reached from the `block_insts` iterator must belong to
//!   the block as reported by `inst_block()`.
//! - Every block must end in a terminator instruction, and no other instruction
//!   can be a terminator.
//! - Only the entry block has parameters, and they match the function signature.
//!
//! Instruction integrity
//!
//! - Every value argument must refer to a valid value that is defined earlier in
//!   layout order. This makes the data flow graph acyclic.
//! - Stack slot and block references must be valid.
//! - Arithmetic operands have the same type as the result.
//! - `return` arguments match the signature's return types.

use crate::entity::SecondaryMap;
use crate::ir::entities::AnyEntity;
use crate::ir::{Block, Function, Inst, InstructionData, Opcode, Value};
use crate::timing;
use core::fmt;

/// A verifier error.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VerifierError {
    /// The entity causing the verifier error.
    pub location: AnyEntity,
    /// Optionally provide some context for the given location; e.g., for `inst42` provide
    /// `Some("v3 = iadd v1, v2")` for more comprehensible errors.
    pub context: Option<String>,
    /// The error message.
    pub message: String,
}

impl std::error::Error for VerifierError {}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.context {
            None => write!(f, "{}: {}", self.location, self.message),
            Some(context) => write!(f, "{} ({}): {}", self.location, context, self.message),
        }
    }
}

/// Convenience converter for making error-reporting less verbose.
impl<L, M> From<(L, M)> for VerifierError
where
    L: Into<AnyEntity>,
    M: Into<String>,
{
    fn from(items: (L, M)) -> Self {
        let (location, message) = items;
        Self {
            location: location.into(),
            context: None,
            message: message.into(),
        }
    }
}

/// Convenience converter for making error-reporting less verbose.
impl<L, C, M> From<(L, C, M)> for VerifierError
where
    L: Into<AnyEntity>,
    C: Into<String>,
    M: Into<String>,
{
    fn from(items: (L, C, M)) -> Self {
        let (location, context, message) = items;
        Self {
            location: location.into(),
            context: Some(context.into()),
            message: message.into(),
        }
    }
}

/// Result of a step in the verification process.
///
/// Functions that return `VerifierStepResult<()>` should also take a
/// mutable reference to `VerifierErrors` as argument in order to report
/// errors.
///
/// Here, `Ok` represents a step that **did not lead to a fatal error**,
/// meaning that the verification process may continue. However, other (non-fatal)
/// errors might have been reported through the previously mentioned `VerifierErrors`
/// argument.
pub type VerifierStepResult<T> = Result<T, ()>;

/// Result of a verification operation.
///
/// Unlike `VerifierStepResult<()>` which may be `Ok` while still having reported
/// errors, this type always returns `Err` if an error (fatal or not) was reported.
pub type VerifierResult<T> = Result<T, VerifierErrors>;

/// List of verifier errors.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct VerifierErrors(pub Vec<VerifierError>);

impl std::error::Error for VerifierErrors {}

impl VerifierErrors {
    /// Return a new `VerifierErrors` struct.
    #[inline]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Return whether no errors were reported.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return whether one or more errors were reported.
    #[inline]
    pub fn has_error(&self) -> bool {
        !self.0.is_empty()
    }

    /// Return a `VerifierStepResult` that is fatal if at least one error was reported,
    /// and non-fatal otherwise.
    #[inline]
    pub fn as_result(&self) -> VerifierStepResult<()> {
        if self.is_empty() { Ok(()) } else { Err(()) }
    }

    /// Report an error, adding it to the list of errors.
    pub fn report(&mut self, error: impl Into<VerifierError>) {
        self.0.push(error.into());
    }

    /// Report a fatal error and return `Err`.
    pub fn fatal(&mut self, error: impl Into<VerifierError>) -> VerifierStepResult<()> {
        self.report(error);
        Err(())
    }

    /// Report a non-fatal error and return `Ok`.
    pub fn nonfatal(&mut self, error: impl Into<VerifierError>) -> VerifierStepResult<()> {
        self.report(error);
        Ok(())
    }
}

impl From<Vec<VerifierError>> for VerifierErrors {
    fn from(v: Vec<VerifierError>) -> Self {
        Self(v)
    }
}

impl From<VerifierErrors> for Vec<VerifierError> {
    fn from(errors: VerifierErrors) -> Vec<VerifierError> {
        errors.0
    }
}

impl From<VerifierErrors> for VerifierResult<()> {
    fn from(errors: VerifierErrors) -> VerifierResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl fmt::Display for VerifierErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for err in &self.0 {
            writeln!(f, "- {err}")?;
        }
        Ok(())
    }
}

/// Verify `func`.
pub fn verify_function(func: &Function) -> VerifierResult<()> {
    let _tt = timing::verifier();
    let mut errors = VerifierErrors::default();
    let verifier = Verifier::new(func);
    let result = verifier.run(&mut errors);
    if errors.is_empty() {
        result.map_err(|_| {
            VerifierErrors::from(vec![VerifierError::from((
                AnyEntity::Function,
                "verification failed",
            ))])
        })
    } else {
        Err(errors)
    }
}

struct Verifier<'a> {
    func: &'a Function,
    /// Values whose definition has been seen so far in layout order.
    defined: SecondaryMap<Value, bool>,
}

impl<'a> Verifier<'a> {
    fn new(func: &'a Function) -> Self {
        Self {
            func,
            defined: SecondaryMap::with_capacity(func.dfg.num_values()),
        }
    }

    fn context(&self, inst: Inst) -> String {
        self.func.dfg.display_inst(inst).to_string()
    }

    fn run(mut self, errors: &mut VerifierErrors) -> VerifierStepResult<()> {
        self.entry_block(errors)?;
        for block in self.func.layout.blocks() {
            self.block_integrity(block, errors)?;
            for inst in self.func.layout.block_insts(block) {
                self.instruction_integrity(inst, errors)?;
                if let Some(result) = self.func.dfg.inst_result(inst) {
                    self.defined[result] = true;
                }
            }
        }
        errors.as_result()
    }

    fn entry_block(&mut self, errors: &mut VerifierErrors) -> VerifierStepResult<()> {
        let Some(entry) = self.func.layout.entry_block() else {
            return errors.fatal((AnyEntity::Function, "function has no entry block"));
        };
        let params = self.func.dfg.block_params(entry);
        if params.len() != self.func.signature.params.len() {
            return errors.fatal((
                entry,
                format!(
                    "entry block has {} parameters, the signature has {}",
                    params.len(),
                    self.func.signature.params.len()
                ),
            ));
        }
        for (i, (&param, &ty)) in params
            .iter()
            .zip(self.func.signature.params.iter())
            .enumerate()
        {
            let param_ty = self.func.dfg.value_type(param);
            if param_ty != ty {
                errors.report((
                    param,
                    format!("entry block parameter {i} has type {param_ty}, expected {ty}"),
                ));
            }
            self.defined[param] = true;
        }
        Ok(())
    }

    fn block_integrity(&self, block: Block, errors: &mut VerifierErrors) -> VerifierStepResult<()> {
        if Some(block) != self.func.layout.entry_block()
            && !self.func.dfg.block_params(block).is_empty()
        {
            errors.report((block, "only the entry block may have parameters"));
        }

        let Some(last) = self.func.layout.last_inst(block) else {
            return errors.fatal((block, "block has no instructions"));
        };
        for inst in self.func.layout.block_insts(block) {
            if self.func.layout.inst_block(inst) != Some(block) {
                return errors.fatal((inst, "instruction doesn't belong to its block"));
            }
            let opcode = self.func.dfg[inst].opcode();
            if inst == last && !opcode.is_terminator() {
                return errors.fatal((inst, self.context(inst), "block does not end in a terminator"));
            }
            if inst != last && opcode.is_terminator() {
                return errors.fatal((
                    inst,
                    self.context(inst),
                    "terminator in the middle of a block",
                ));
            }
        }
        Ok(())
    }

    fn instruction_integrity(
        &self,
        inst: Inst,
        errors: &mut VerifierErrors,
    ) -> VerifierStepResult<()> {
        let dfg = &self.func.dfg;
        for &arg in dfg.inst_args(inst) {
            if !dfg.value_is_valid(arg) {
                return errors.fatal((inst, format!("invalid value reference {arg}")));
            }
            if !self.defined[arg] {
                return errors.fatal((
                    inst,
                    self.context(inst),
                    format!("uses value {arg} before it is defined"),
                ));
            }
        }

        match dfg[inst] {
            InstructionData::Binary { args, .. } => {
                let ty = dfg.value_type(dfg.first_result(inst));
                for arg in args {
                    let arg_ty = dfg.value_type(arg);
                    if arg_ty != ty {
                        errors.report((
                            inst,
                            self.context(inst),
                            format!("operand {arg} has type {arg_ty}, expected {ty}"),
                        ));
                    }
                }
            }
            InstructionData::StackLoad { stack_slot, .. }
            | InstructionData::StackStore { stack_slot, .. } => {
                if !self.func.stack_slots.is_valid(stack_slot) {
                    return errors.fatal((
                        inst,
                        self.context(inst),
                        format!("invalid stack slot {stack_slot}"),
                    ));
                }
            }
            InstructionData::Jump { destination, .. } => {
                if !dfg.block_is_valid(destination)
                    || !self.func.layout.is_block_inserted(destination)
                {
                    return errors.fatal((
                        inst,
                        self.context(inst),
                        format!("invalid block reference {destination}"),
                    ));
                }
            }
            InstructionData::MultiAry {
                opcode: Opcode::Return,
                ref args,
            } => {
                let returns = &self.func.signature.returns;
                if args.len() != returns.len() {
                    return errors.fatal((
                        inst,
                        self.context(inst),
                        format!(
                            "returns {} values, the signature has {}",
                            args.len(),
                            returns.len()
                        ),
                    ));
                }
                for (&arg, &ty) in args.iter().zip(returns.iter()) {
                    let arg_ty = dfg.value_type(arg);
                    if arg_ty != ty {
                        errors.report((
                            inst,
                            self.context(inst),
                            format!("return value {arg} has type {arg_ty}, expected {ty}"),
                        ));
                    }
                }
            }
            InstructionData::UnaryImm { .. } | InstructionData::MultiAry { .. } => {}
        }
        Ok(())
    }
}
