//! Looking through stack slots.
//!
//! A parameter that has been spilled to a stack slot and loaded back is the same value as far as
//! the cube matcher is concerned, provided the slot is written exactly once.

use crate::entity::SecondaryMap;
use crate::ir::{DataFlowGraph, Function, InstructionData, StackSlot, Value, ValueDef};

/// How often a stack slot is written in a function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreSummary {
    /// The slot is never written.
    #[default]
    Never,
    /// The slot is written by exactly one `stack_store` of this value.
    Once(Value),
    /// The slot is written more than once.
    Many,
}

/// Store summaries for every stack slot of a function.
pub struct MemoryCells {
    stores: SecondaryMap<StackSlot, StoreSummary>,
}

impl MemoryCells {
    /// Summarize the stores of every stack slot in the layout of `func`.
    pub fn compute(func: &Function) -> Self {
        let mut stores = SecondaryMap::with_capacity(func.stack_slots.len());
        for inst in func.layout.insts() {
            if let InstructionData::StackStore {
                arg, stack_slot, ..
            } = func.dfg[inst]
            {
                stores[stack_slot] = match stores[stack_slot] {
                    StoreSummary::Never => StoreSummary::Once(arg),
                    StoreSummary::Once(_) | StoreSummary::Many => StoreSummary::Many,
                };
            }
        }
        Self { stores }
    }

    /// Get the store summary of `slot`.
    pub fn summary(&self, slot: StackSlot) -> StoreSummary {
        self.stores[slot]
    }

    /// Get the value `v` effectively stands for.
    ///
    /// A `stack_load` from a slot whose only store writes a function argument of the same type
    /// resolves to that argument. Every other value resolves to itself.
    pub fn resolve(&self, dfg: &DataFlowGraph, v: Value) -> Value {
        let ValueDef::Result(inst) = dfg.value_def(v) else {
            return v;
        };
        let InstructionData::StackLoad { stack_slot, .. } = dfg[inst] else {
            return v;
        };
        match self.summary(stack_slot) {
            StoreSummary::Once(stored)
                if dfg.is_external_input(stored) && dfg.value_type(stored) == dfg.value_type(v) =>
            {
                stored
            }
            _ => v,
        }
    }
}
