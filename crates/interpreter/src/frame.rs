//! Implements a call frame (activation record) for the interpreter.

use crate::interpreter::InterpreterError;
use cranelift_entity::SecondaryMap;
use cubefold_codegen::ir::{Function, StackSlot, Value};

/// The state of a single function call: the values computed so far and the contents of the
/// stack slots. Each call starts with every value undefined and every slot unwritten.
#[derive(Debug)]
pub struct Frame<'a> {
    /// The currently executing function.
    function: &'a Function,
    /// The current mapping of SSA value-references to their actual values.
    registers: SecondaryMap<Value, Option<i64>>,
    /// The last value stored to each stack slot.
    slots: SecondaryMap<StackSlot, Option<i64>>,
}

impl<'a> Frame<'a> {
    /// Construct a new [Frame] for a function.
    pub fn new(function: &'a Function) -> Self {
        let num_values = function.dfg.num_values();
        Self {
            function,
            registers: SecondaryMap::with_capacity(num_values),
            slots: SecondaryMap::new(),
        }
    }

    /// The function this frame is executing.
    pub fn function(&self) -> &'a Function {
        self.function
    }

    /// Retrieve the actual value associated with an SSA reference.
    #[inline]
    pub fn get(&self, name: Value) -> Result<i64, InterpreterError> {
        self.registers[name].ok_or(InterpreterError::Undefined(name))
    }

    /// Retrieve multiple SSA references.
    pub fn get_all(&self, names: &[Value]) -> Result<Vec<i64>, InterpreterError> {
        names.iter().map(|&n| self.get(n)).collect()
    }

    /// Assign `value` to the SSA reference `name`.
    #[inline]
    pub fn set(&mut self, name: Value, value: i64) {
        self.registers[name] = Some(value);
    }

    /// Read the contents of a stack slot.
    pub fn load(&self, slot: StackSlot) -> Result<i64, InterpreterError> {
        self.slots[slot].ok_or(InterpreterError::UnwrittenSlot(slot))
    }

    /// Overwrite the contents of a stack slot.
    pub fn store(&mut self, slot: StackSlot, value: i64) {
        self.slots[slot] = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubefold_codegen::ir::{InstBuilder, StackSlotData, types};
    use cubefold_codegen::cursor::{Cursor, FuncCursor};
    use cubefold_codegen::ir::Signature;

    #[test]
    fn accessors() {
        let mut func = Function::with_name_signature("f", Signature::default());
        let ss0 = func.create_stack_slot(StackSlotData::new(8));
        let block0 = func.create_block();
        let mut pos = FuncCursor::new(&mut func).at_bottom(block0);
        let a = pos.ins().iconst(types::I64, 1);
        let b = pos.ins().iconst(types::I64, 2);

        let mut frame = Frame::new(&func);
        assert_eq!(frame.get(a), Err(InterpreterError::Undefined(a)));
        frame.set(a, 42);
        frame.set(b, 43);
        assert_eq!(frame.get(a), Ok(42));
        assert_eq!(frame.get_all(&[b, a]), Ok(vec![43, 42]));

        assert_eq!(frame.load(ss0), Err(InterpreterError::UnwrittenSlot(ss0)));
        frame.store(ss0, -7);
        assert_eq!(frame.load(ss0), Ok(-7));
    }
}
