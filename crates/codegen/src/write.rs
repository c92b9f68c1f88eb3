//! Converting IR to text.
//!
//! The `write` module provides the `write_function` function which converts an IR `Function` to an
//! equivalent textual form. This textual form can be read back by the `cubefold-reader` crate.

use crate::ir::{Block, DataFlowGraph, Function, Inst, Value};
use core::fmt::{self, Write};

/// Write `func` to `w` as equivalent text.
pub fn write_function(w: &mut dyn Write, func: &Function) -> fmt::Result {
    writeln!(w, "function %{}{} {{", func.name, func.signature)?;
    let mut any = write_preamble(w, func)?;
    for block in func.layout.blocks() {
        if any {
            writeln!(w)?;
        }
        write_block_header(w, func, block, 4)?;
        for inst in func.layout.block_insts(block) {
            write_instruction(w, func, inst, 4)?;
        }
        any = true;
    }
    writeln!(w, "}}")
}

fn write_preamble(w: &mut dyn Write, func: &Function) -> Result<bool, fmt::Error> {
    let mut any = false;
    for (ss, slot) in func.stack_slots.iter() {
        any = true;
        writeln!(w, "    {ss} = {slot}")?;
    }
    Ok(any)
}

fn write_arg(w: &mut dyn Write, func: &Function, arg: Value) -> fmt::Result {
    write!(w, "{}: {}", arg, func.dfg.value_type(arg))
}

/// Write out the basic block header, outdented:
///
///    block1:
///    block0(v0: i32, v1: i32):
///
pub fn write_block_header(
    w: &mut dyn Write,
    func: &Function,
    block: Block,
    indent: usize,
) -> fmt::Result {
    // The `indent` is the instruction indentation. Block headers are 4 spaces out from that.
    write!(w, "{1:0$}{2}", indent - 4, "", block)?;

    let mut args = func.dfg.block_params(block).iter().copied();
    match args.next() {
        None => return writeln!(w, ":"),
        Some(arg) => {
            write!(w, "(")?;
            write_arg(w, func, arg)?;
        }
    }
    for arg in args {
        write!(w, ", ")?;
        write_arg(w, func, arg)?;
    }
    writeln!(w, "):")
}

fn write_instruction(w: &mut dyn Write, func: &Function, inst: Inst, indent: usize) -> fmt::Result {
    writeln!(w, "{1:0$}{2}", indent, "", func.dfg.display_inst(inst))
}

/// Write the operands of `inst` to `w` with a prepended space.
pub(crate) fn write_operands(w: &mut dyn Write, dfg: &DataFlowGraph, inst: Inst) -> fmt::Result {
    use crate::ir::InstructionData::*;
    match &dfg[inst] {
        UnaryImm { imm, .. } => write!(w, " {imm}"),
        Binary { args, .. } => write!(w, " {}, {}", args[0], args[1]),
        StackLoad { stack_slot, .. } => write!(w, " {stack_slot}"),
        StackStore {
            arg, stack_slot, ..
        } => write!(w, " {arg}, {stack_slot}"),
        Jump { destination, .. } => write!(w, " {destination}"),
        MultiAry { args, .. } => {
            if !args.is_empty() {
                write!(w, " {}", DisplayValues(args))?;
            }
            Ok(())
        }
    }
}

/// Displayable slice of values.
struct DisplayValues<'a>(&'a [Value]);

impl<'a> fmt::Display for DisplayValues<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, val) in self.0.iter().enumerate() {
            if i == 0 {
                write!(f, "{val}")?;
            } else {
                write!(f, ", {val}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::cursor::{Cursor, FuncCursor};
    use crate::ir::types;
    use crate::ir::{Function, InstBuilder, Signature, StackSlotData};

    #[test]
    fn basic() {
        let mut f = Function::new();
        assert_eq!(f.to_string(), "function %() {\n}\n");

        f.name = "foo".to_string();
        assert_eq!(f.to_string(), "function %foo() {\n}\n");

        f.create_stack_slot(StackSlotData::new(4));
        assert_eq!(
            f.to_string(),
            "function %foo() {\n    ss0 = explicit_slot 4\n}\n"
        );

        let block = f.create_block();
        assert_eq!(
            f.to_string(),
            "function %foo() {\n    ss0 = explicit_slot 4\n\nblock0:\n}\n"
        );

        f.dfg.append_block_param(block, types::I8);
        assert_eq!(
            f.to_string(),
            "function %foo() {\n    ss0 = explicit_slot 4\n\nblock0(v0: i8):\n}\n"
        );

        f.dfg.append_block_param(block, types::I32);
        assert_eq!(
            f.to_string(),
            "function %foo() {\n    ss0 = explicit_slot 4\n\nblock0(v0: i8, v1: i32):\n}\n"
        );
    }

    #[test]
    fn instructions() {
        let mut func = Function::with_name_signature(
            "cubic",
            Signature::new(vec![types::I32, types::I32], vec![types::I32]),
        );
        let ss0 = func.create_stack_slot(StackSlotData::new(4));
        let block0 = func.create_block();
        let a = func.dfg.append_block_param(block0, types::I32);
        let b = func.dfg.append_block_param(block0, types::I32);
        let mut pos = FuncCursor::new(&mut func).at_bottom(block0);
        pos.ins().stack_store(a, ss0);
        let x = pos.ins().stack_load(types::I32, ss0);
        let three = pos.ins().iconst(types::I32, 3);
        let y = pos.ins().imul(x, three);
        let z = pos.ins().iadd(y, b);
        pos.ins().return_(&[z]);

        assert_eq!(
            func.to_string(),
            "function %cubic(i32, i32) -> i32 {
    ss0 = explicit_slot 4

block0(v0: i32, v1: i32):
    stack_store v0, ss0
    v2 = stack_load.i32 ss0
    v3 = iconst.i32 3
    v4 = imul v2, v3
    v5 = iadd v4, v1
    return v5
}
"
        );
    }
}
