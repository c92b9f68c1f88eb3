//! Function layout.
//!
//! The order of basic blocks in a function and the order of instructions in a block is
//! determined by the `Layout` data structure defined in this module.

use crate::entity::packed_option::PackedOption;
use crate::entity::SecondaryMap;
use crate::ir::{Block, Inst};

/// The `Layout` struct determines the layout of blocks and instructions in a function. It does not
/// contain definitions of instructions or blocks, but depends on `Inst` and `Block` entity
/// references being defined elsewhere.
///
/// This data structure determines:
///
/// - The order of blocks in the function.
/// - Which block contains a given instruction.
/// - The order of instructions with a block.
///
/// While data dependencies are not recorded, instruction ordering does affect control
/// dependencies, so part of the semantics of the program are determined by the layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    /// Blocks in layout order.
    blocks: Vec<Block>,

    /// Instructions of each block, in layout order.
    block_insts: SecondaryMap<Block, Vec<Inst>>,

    /// The block containing each inserted instruction.
    inst_block: SecondaryMap<Inst, PackedOption<Block>>,
}

impl Layout {
    /// Create a new empty `Layout`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the layout.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.block_insts.clear();
        self.inst_block.clear();
    }
}

/// Methods for laying out blocks.
impl Layout {
    /// Is `block` currently part of the layout?
    pub fn is_block_inserted(&self, block: Block) -> bool {
        self.blocks.contains(&block)
    }

    /// Insert `block` as the last block in the layout.
    pub fn append_block(&mut self, block: Block) {
        debug_assert!(
            !self.is_block_inserted(block),
            "Cannot append block that is already in the layout"
        );
        self.blocks.push(block);
    }

    /// Return an iterator over all blocks in layout order.
    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = Block> + '_ {
        self.blocks.iter().copied()
    }

    /// Get the function's entry block.
    /// This is simply the first block in the layout order.
    pub fn entry_block(&self) -> Option<Block> {
        self.blocks.first().copied()
    }

    /// Get the last block in the layout.
    pub fn last_block(&self) -> Option<Block> {
        self.blocks.last().copied()
    }

    /// Get the block following `block` in the layout order.
    pub fn next_block(&self, block: Block) -> Option<Block> {
        let pos = self.blocks.iter().position(|&b| b == block)?;
        self.blocks.get(pos + 1).copied()
    }

    /// Get the block preceding `block` in the layout order.
    pub fn prev_block(&self, block: Block) -> Option<Block> {
        let pos = self.blocks.iter().position(|&b| b == block)?;
        pos.checked_sub(1).map(|p| self.blocks[p])
    }
}

/// Methods for arranging instructions.
impl Layout {
    /// Get the block containing `inst`, or `None` if `inst` is not inserted in the layout.
    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.inst_block[inst].expand()
    }

    /// Append `inst` to the end of `block`.
    pub fn append_inst(&mut self, inst: Inst, block: Block) {
        debug_assert_eq!(self.inst_block(inst), None);
        debug_assert!(
            self.is_block_inserted(block),
            "Cannot append instructions to block not in layout"
        );
        self.block_insts[block].push(inst);
        self.inst_block[inst] = block.into();
    }

    /// Insert `inst` before the instruction `before` in the same block.
    pub fn insert_inst(&mut self, inst: Inst, before: Inst) {
        debug_assert_eq!(self.inst_block(inst), None);
        let block = self
            .inst_block(before)
            .expect("Instruction before insertion point not in the layout");
        let insts = &mut self.block_insts[block];
        let pos = insts
            .iter()
            .position(|&i| i == before)
            .expect("Instruction missing from its block");
        insts.insert(pos, inst);
        self.inst_block[inst] = block.into();
    }

    /// Remove `inst` from the layout.
    pub fn remove_inst(&mut self, inst: Inst) {
        let block = self.inst_block(inst).expect("Instruction already removed.");
        self.block_insts[block].retain(|&i| i != inst);
        self.inst_block[inst] = PackedOption::default();
    }

    /// Iterate over the instructions in `block` in layout order.
    pub fn block_insts(&self, block: Block) -> impl DoubleEndedIterator<Item = Inst> + '_ {
        self.block_insts[block].iter().copied()
    }

    /// Get the first instruction in `block`.
    pub fn first_inst(&self, block: Block) -> Option<Inst> {
        self.block_insts[block].first().copied()
    }

    /// Get the last instruction in `block`.
    pub fn last_inst(&self, block: Block) -> Option<Inst> {
        self.block_insts[block].last().copied()
    }

    /// Get the instruction following `inst` in its block.
    pub fn next_inst(&self, inst: Inst) -> Option<Inst> {
        let insts = &self.block_insts[self.inst_block(inst)?];
        let pos = insts.iter().position(|&i| i == inst)?;
        insts.get(pos + 1).copied()
    }

    /// Get the instruction preceding `inst` in its block.
    pub fn prev_inst(&self, inst: Inst) -> Option<Inst> {
        let insts = &self.block_insts[self.inst_block(inst)?];
        let pos = insts.iter().position(|&i| i == inst)?;
        pos.checked_sub(1).map(|p| insts[p])
    }

    /// Iterate over every inserted instruction, block by block, in layout order.
    pub fn insts(&self) -> impl Iterator<Item = Inst> + '_ {
        self.blocks
            .iter()
            .flat_map(move |&block| self.block_insts[block].iter().copied())
    }
}
