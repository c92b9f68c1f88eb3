//! Cubefold IR interpreter.
//!
//! This module partially contains the logic for interpreting Cubefold IR.

use crate::environment::FunctionStore;
use crate::frame::Frame;
use crate::step::{ControlFlow, step};
use cubefold_codegen::ir::{Block, Function, StackSlot, Value};
use cubefold_codegen::timing;
use thiserror::Error;

/// The Cubefold interpreter; this contains the fuel limit used when calling functions.
#[derive(Debug, Default, Clone, Copy)]
pub struct Interpreter {
    /// Maximum number of instructions a single call may execute; `None` means unlimited.
    fuel: Option<u64>,
}

impl Interpreter {
    /// Create an interpreter without a fuel limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// The `fuel` mechanism sets a number of instructions that the interpreter can execute
    /// before stopping. If this value is `None` (the default), no limit is imposed.
    pub fn with_fuel(self, fuel: Option<u64>) -> Self {
        Self { fuel }
    }

    /// Call a function by name; this is a helpful proxy for [Interpreter::call].
    pub fn call_by_name(
        &self,
        functions: &FunctionStore,
        func_name: &str,
        arguments: &[i64],
    ) -> Result<Vec<i64>, InterpreterError> {
        let function = functions
            .get_by_name(func_name)
            .ok_or_else(|| InterpreterError::UnknownFunctionName(func_name.to_string()))?;
        self.call(function, arguments)
    }

    /// Interpret a call to `function` with `arguments` and return the values it returns.
    ///
    /// Each argument is truncated to the width of the matching parameter type first.
    pub fn call(&self, function: &Function, arguments: &[i64]) -> Result<Vec<i64>, InterpreterError> {
        let _tt = timing::interpret();
        log::trace!("Call: %{}({:?})", function.name, arguments);

        let expected = function.signature.params.len();
        if arguments.len() != expected {
            return Err(InterpreterError::ArgumentCount {
                expected,
                actual: arguments.len(),
            });
        }
        let entry = function
            .layout
            .entry_block()
            .ok_or(InterpreterError::NoEntryBlock)?;

        let mut frame = Frame::new(function);
        for (&param, &arg) in function.dfg.block_params(entry).iter().zip(arguments) {
            let ty = function.dfg.value_type(param);
            frame.set(param, ty.wrap(arg));
        }

        let mut executed = 0u64;
        let mut block = entry;
        loop {
            let mut next = None;
            for inst in function.layout.block_insts(block) {
                if self.fuel.is_some_and(|fuel| executed >= fuel) {
                    return Err(InterpreterError::FuelExhausted(executed));
                }
                executed += 1;
                match step(&mut frame, inst)? {
                    ControlFlow::Continue => {}
                    ControlFlow::Jump(destination) => {
                        next = Some(destination);
                        break;
                    }
                    ControlFlow::Return(values) => {
                        log::trace!("Return: {:?} after {} instructions", values, executed);
                        return Ok(values.into_vec());
                    }
                }
            }
            block = next.ok_or(InterpreterError::FellOffBlock(block))?;
        }
    }
}

/// The ways interpretation can fail.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InterpreterError {
    /// The call passed the wrong number of arguments.
    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount {
        /// The number of parameters in the signature.
        expected: usize,
        /// The number of arguments passed.
        actual: usize,
    },
    /// No function with this name is known to the interpreter.
    #[error("unknown function: {0}")]
    UnknownFunctionName(String),
    /// The function has no blocks.
    #[error("function has no entry block")]
    NoEntryBlock,
    /// Execution reached the end of a block that has no terminator.
    #[error("fell off the end of {0}")]
    FellOffBlock(Block),
    /// A stack slot was read before anything was stored to it.
    #[error("load from {0} before any store")]
    UnwrittenSlot(StackSlot),
    /// A value was used before the instruction defining it executed.
    #[error("value {0} used before it was defined")]
    Undefined(Value),
    /// The fuel limit was reached.
    #[error("fuel exhausted after {0} instructions")]
    FuelExhausted(u64),
}
