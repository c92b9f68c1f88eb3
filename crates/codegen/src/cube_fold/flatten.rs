//! Flattening chains of associative operators.
//!
//! Both decomposers walk the operand tree with an explicit worklist and emit the leaves from left
//! to right. The data flow graph must be acyclic, which the verifier guarantees by requiring every
//! value to be defined before it is used.

use crate::ir::{DataFlowGraph, InstructionData, Opcode, Value, ValueDef};
use smallvec::{smallvec, Array, SmallVec};

/// Get the operands of `v` if it is the result of a binary `opcode` instruction.
fn binary_operands(dfg: &DataFlowGraph, v: Value, opcode: Opcode) -> Option<[Value; 2]> {
    let ValueDef::Result(inst) = dfg.value_def(v) else {
        return None;
    };
    match dfg[inst] {
        InstructionData::Binary { opcode: op, args } if op == opcode => Some(args),
        _ => None,
    }
}

fn flatten<A: Array<Item = Value>>(dfg: &DataFlowGraph, root: Value, opcode: Opcode) -> SmallVec<A> {
    let mut leaves = SmallVec::new();
    let mut stack: SmallVec<[Value; 8]> = smallvec![root];
    while let Some(v) = stack.pop() {
        match binary_operands(dfg, v, opcode) {
            Some([x, y]) => {
                stack.push(y);
                stack.push(x);
            }
            None => leaves.push(v),
        }
    }
    leaves
}

/// Flatten a tree of `iadd` instructions rooted at `v` into its additive terms.
///
/// A value that isn't an `iadd` result is a single term.
pub fn flatten_add(dfg: &DataFlowGraph, v: Value) -> SmallVec<[Value; 4]> {
    flatten(dfg, v, Opcode::Iadd)
}

/// Flatten a tree of `imul` instructions rooted at `v` into its factors.
pub fn flatten_mul(dfg: &DataFlowGraph, v: Value) -> SmallVec<[Value; 8]> {
    flatten(dfg, v, Opcode::Imul)
}
