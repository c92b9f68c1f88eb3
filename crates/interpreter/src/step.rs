//! The [step] function interprets a single instruction.

use crate::frame::Frame;
use crate::interpreter::InterpreterError;
use cubefold_codegen::ir::{Block, Inst, InstructionData, Opcode};
use smallvec::SmallVec;

/// The result of interpreting one instruction.
#[derive(Debug, PartialEq, Eq)]
pub enum ControlFlow {
    /// Continue with the next instruction in the block.
    Continue,
    /// Transfer control to the start of a block.
    Jump(Block),
    /// Return from the function with these values.
    Return(SmallVec<[i64; 1]>),
}

/// Interpret a single instruction of the frame's function, updating the frame's values and
/// stack slots.
///
/// Every computed value is kept in the canonical form of its type: truncated to the type's width
/// and sign-extended back to 64 bits.
pub fn step(frame: &mut Frame, inst: Inst) -> Result<ControlFlow, InterpreterError> {
    let dfg = &frame.function().dfg;
    log::trace!("Step: {}", dfg.display_inst(inst));

    let result = dfg.inst_result(inst);
    let result_ty = result.map(|v| dfg.value_type(v));

    let computed = match dfg[inst] {
        InstructionData::UnaryImm { imm, .. } => imm.bits(),
        InstructionData::Binary { opcode, args } => {
            let x = frame.get(args[0])?;
            let y = frame.get(args[1])?;
            match opcode {
                Opcode::Iadd => x.wrapping_add(y),
                Opcode::Isub => x.wrapping_sub(y),
                Opcode::Imul => x.wrapping_mul(y),
                _ => unreachable!("{opcode} is not a binary opcode"),
            }
        }
        InstructionData::StackLoad { stack_slot, .. } => frame.load(stack_slot)?,
        InstructionData::StackStore {
            arg, stack_slot, ..
        } => {
            let x = frame.get(arg)?;
            frame.store(stack_slot, x);
            return Ok(ControlFlow::Continue);
        }
        InstructionData::Jump { destination, .. } => return Ok(ControlFlow::Jump(destination)),
        InstructionData::MultiAry { ref args, .. } => {
            let values = args
                .iter()
                .map(|&v| frame.get(v))
                .collect::<Result<_, _>>()?;
            return Ok(ControlFlow::Return(values));
        }
    };

    if let (Some(result), Some(ty)) = (result, result_ty) {
        frame.set(result, ty.wrap(computed));
    }
    Ok(ControlFlow::Continue)
}
