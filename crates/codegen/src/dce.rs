//! A Dead-Code Elimination (DCE) pass.
//!
//! Dead code here means instructions that have no side effects and have no
//! result values used by other instructions.

use crate::cursor::{Cursor, FuncCursor};
use crate::entity::SecondaryMap;
use crate::ir::{DataFlowGraph, Function, Inst, Value};
use crate::timing;

/// Test whether the given instruction is unsafe to even consider for DCE.
fn trivially_unsafe_for_dce(dfg: &DataFlowGraph, inst: Inst) -> bool {
    !dfg[inst].opcode().is_pure()
}

/// Preserve instructions with used result values.
fn any_inst_results_used(inst: Inst, live: &SecondaryMap<Value, bool>, dfg: &DataFlowGraph) -> bool {
    dfg.inst_result(inst).is_some_and(|v| live[v])
}

/// Perform DCE on `func`, returning whether any instruction was removed.
///
/// Blocks and instructions are visited backwards in layout order. Every use follows its
/// definition in layout order, so a single walk sees all uses of a value before its definition.
pub fn do_dce(func: &mut Function) -> bool {
    let _tt = timing::dce();
    let mut live = SecondaryMap::with_capacity(func.dfg.num_values());
    let mut removed = 0;

    let mut pos = FuncCursor::new(func);
    while let Some(_block) = pos.prev_block() {
        while let Some(inst) = pos.prev_inst() {
            if trivially_unsafe_for_dce(&pos.func.dfg, inst)
                || any_inst_results_used(inst, &live, &pos.func.dfg)
            {
                for &arg in pos.func.dfg.inst_args(inst) {
                    live[arg] = true;
                }
                continue;
            }
            crate::trace!("dce: removing {}", pos.func.dfg.display_inst(inst));
            pos.remove_inst();
            removed += 1;
        }
    }

    log::debug!("dce: removed {removed} instructions from %{}", func.name);
    removed > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::I32;
    use crate::ir::{InstBuilder, Signature, StackSlotData};

    #[test]
    fn removes_unused_chains() {
        let mut func =
            Function::with_name_signature("f", Signature::new(vec![I32, I32], vec![I32]));
        let ss0 = func.create_stack_slot(StackSlotData::new(4));
        let block0 = func.create_block();
        let block1 = func.create_block();
        let a = func.dfg.append_block_param(block0, I32);
        let b = func.dfg.append_block_param(block0, I32);

        let mut pos = FuncCursor::new(&mut func).at_bottom(block0);
        pos.ins().stack_store(a, ss0);
        let loaded = pos.ins().stack_load(I32, ss0);
        let three = pos.ins().iconst(I32, 3);
        let dead = pos.ins().imul(loaded, three);
        pos.ins().iadd(dead, b);
        let live = pos.ins().iadd(a, b);
        pos.ins().jump(block1);
        pos.goto_bottom(block1);
        pos.ins().return_(&[live]);

        assert!(do_dce(&mut func));
        assert_eq!(
            func.layout
                .block_insts(block0)
                .map(|inst| func.dfg.display_inst(inst).to_string())
                .collect::<Vec<_>>(),
            ["stack_store v0, ss0", "v6 = iadd v0, v1", "jump block1"]
        );

        // Nothing left to remove.
        assert!(!do_dce(&mut func));
    }
}
