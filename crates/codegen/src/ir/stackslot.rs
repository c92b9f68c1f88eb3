//! Stack slots.
//!
//! A stack slot is a local memory cell owned by the function. The IR only reads and writes whole
//! slots with `stack_load` and `stack_store`.

use core::fmt;

/// Contents of a stack slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StackSlotData {
    /// Size of stack slot in bytes.
    pub size: u32,
}

impl StackSlotData {
    /// Create a stack slot of `size` bytes.
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl fmt::Display for StackSlotData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "explicit_slot {}", self.size)
    }
}
