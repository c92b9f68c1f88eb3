//! Representation of IR functions.

mod builder;
pub mod dfg;
pub mod entities;
mod function;
pub mod instructions;
pub mod layout;
mod stackslot;
pub mod types;

pub use crate::ir::builder::{InsertBuilder, InstBuilder, InstBuilderBase, InstInserterBase};
pub use crate::ir::dfg::{DataFlowGraph, ValueDef};
pub use crate::ir::entities::{AnyEntity, Block, Inst, StackSlot, Value};
pub use crate::ir::function::{DisplayFunction, Function, Signature};
pub use crate::ir::instructions::{Imm64, InstructionData, Opcode};
pub use crate::ir::layout::Layout;
pub use crate::ir::stackslot::StackSlotData;
pub use crate::ir::types::Type;
