//! Intermediate representation of a function.
//!
//! The `Function` struct defined in this module owns all of its basic blocks and
//! instructions.

use crate::entity::PrimaryMap;
use crate::ir::{Block, DataFlowGraph, Layout, StackSlot, StackSlotData, Type};
use crate::write::write_function;
use core::fmt;

/// Function signature: parameter and return types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    /// The arguments passed to the function.
    pub params: Vec<Type>,
    /// Values returned from the function.
    pub returns: Vec<Type>,
}

impl Signature {
    /// Create a new signature.
    pub fn new(params: Vec<Type>, returns: Vec<Type>) -> Self {
        Self { params, returns }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, ty) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }
        write!(f, ")")?;
        if !self.returns.is_empty() {
            write!(f, " -> ")?;
            for (i, ty) in self.returns.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{ty}")?;
            }
        }
        Ok(())
    }
}

/// A function.
///
/// Functions can be cloned, but it is not a very fast operation.
/// The clone will have all the same entity numbers as the original.
#[derive(Clone, PartialEq, Eq)]
pub struct Function {
    /// Name of this function, as written after `%` in the text format.
    pub name: String,

    /// Signature of this function.
    pub signature: Signature,

    /// Stack slots allocated in this function.
    pub stack_slots: PrimaryMap<StackSlot, StackSlotData>,

    /// Data flow graph containing the primary definition of all instructions, blocks and values.
    pub dfg: DataFlowGraph,

    /// Layout of blocks and instructions in the function body.
    pub layout: Layout,
}

impl Function {
    /// Create a function with the given name and signature.
    pub fn with_name_signature(name: impl Into<String>, sig: Signature) -> Self {
        Self {
            name: name.into(),
            signature: sig,
            stack_slots: PrimaryMap::new(),
            dfg: DataFlowGraph::new(),
            layout: Layout::new(),
        }
    }

    /// Create a new empty, anonymous function.
    pub fn new() -> Self {
        Self::with_name_signature("", Signature::default())
    }

    /// Clear all data structures in this function.
    pub fn clear(&mut self) {
        self.name.clear();
        self.signature = Signature::default();
        self.stack_slots.clear();
        self.dfg.clear();
        self.layout.clear();
    }

    /// Creates a stack slot in the function, to be used by `stack_load` and `stack_store`
    /// instructions.
    pub fn create_stack_slot(&mut self, data: StackSlotData) -> StackSlot {
        self.stack_slots.push(data)
    }

    /// Create a new block and append it to the layout.
    pub fn create_block(&mut self) -> Block {
        let block = self.dfg.make_block();
        self.layout.append_block(block);
        block
    }

    /// Get the entry block of this function, if it has one.
    pub fn entry_block(&self) -> Option<Block> {
        self.layout.entry_block()
    }

    /// Return an object that can display this function.
    pub fn display(&self) -> DisplayFunction<'_> {
        DisplayFunction(self)
    }
}

impl Default for Function {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrapper type capable of displaying a `Function`.
pub struct DisplayFunction<'a>(&'a Function);

impl<'a> fmt::Display for DisplayFunction<'a> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write_function(fmt, self.0)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write_function(fmt, self)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write_function(fmt, self)
    }
}
