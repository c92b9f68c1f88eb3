//! Data flow graph tracking instructions, values, and blocks.

use crate::entity::packed_option::PackedOption;
use crate::entity::{PrimaryMap, SecondaryMap};
use crate::ir::{Block, Inst, InstructionData, Opcode, Type, Value};
use crate::write::write_operands;
use core::fmt;
use core::ops::{Index, IndexMut};

/// A data flow graph defines all instructions and basic blocks in a function as well as
/// the data flow dependencies between them. The DFG also tracks values which can be either
/// instruction results or block parameters.
///
/// The layout of blocks in the function and of instructions in each block is recorded by the
/// `Layout` data structure which forms the other half of the function representation.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct DataFlowGraph {
    /// Data about all of the instructions in the function, including opcodes and operands.
    /// The instructions in this map are not in program order. That is tracked by `Layout`, along
    /// with the block containing each instruction.
    insts: PrimaryMap<Inst, InstructionData>,

    /// The result value of each instruction, if it has one.
    results: SecondaryMap<Inst, PackedOption<Value>>,

    /// Parameters of each block.
    block_params: SecondaryMap<Block, Vec<Value>>,

    /// Blocks created so far.
    blocks: PrimaryMap<Block, ()>,

    /// Primary value table with entries for all values.
    values: PrimaryMap<Value, ValueData>,
}

/// Internal table storage for extended values.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ValueData {
    /// Value is defined by an instruction.
    Inst { ty: Type, inst: Inst },

    /// Value is a block parameter.
    Param { ty: Type, block: Block, num: u16 },
}

/// Where did a value come from?
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueDef {
    /// Value is the result of an instruction.
    Result(Inst),
    /// Value is the n'th parameter to a block.
    Param(Block, usize),
}

impl ValueDef {
    /// Unwrap the instruction where the value was defined, or panic.
    pub fn unwrap_inst(self) -> Inst {
        self.inst().expect("Value is not an instruction result")
    }

    /// Get the instruction where the value was defined, if any.
    pub fn inst(self) -> Option<Inst> {
        match self {
            Self::Result(inst) => Some(inst),
            Self::Param(..) => None,
        }
    }
}

impl DataFlowGraph {
    /// Create a new empty `DataFlowGraph`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear everything.
    pub fn clear(&mut self) {
        self.insts.clear();
        self.results.clear();
        self.block_params.clear();
        self.blocks.clear();
        self.values.clear();
    }

    /// Get the total number of instructions created in this function, whether they are
    /// currently inserted in the layout or not.
    pub fn num_insts(&self) -> usize {
        self.insts.len()
    }

    /// Returns `true` if the given instruction reference is valid.
    pub fn inst_is_valid(&self, inst: Inst) -> bool {
        self.insts.is_valid(inst)
    }

    /// Get the total number of values.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Check if a value reference is valid.
    pub fn value_is_valid(&self, v: Value) -> bool {
        self.values.is_valid(v)
    }

    /// Get the total number of blocks created in this function.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the given block reference is valid.
    pub fn block_is_valid(&self, block: Block) -> bool {
        self.blocks.is_valid(block)
    }

    /// Get the type of a value.
    pub fn value_type(&self, v: Value) -> Type {
        match self.values[v] {
            ValueData::Inst { ty, .. } | ValueData::Param { ty, .. } => ty,
        }
    }

    /// Get the definition of a value.
    pub fn value_def(&self, v: Value) -> ValueDef {
        match self.values[v] {
            ValueData::Inst { inst, .. } => ValueDef::Result(inst),
            ValueData::Param { block, num, .. } => ValueDef::Param(block, num as usize),
        }
    }

    /// Is `v` an input to the function, i.e. a parameter of a block?
    ///
    /// The verifier only admits parameters on the entry block, so every block parameter is a
    /// function argument.
    pub fn is_external_input(&self, v: Value) -> bool {
        matches!(self.values[v], ValueData::Param { .. })
    }

    /// If `v` is the result of an `iconst`, get the constant.
    pub fn iconst_value(&self, v: Value) -> Option<i64> {
        let inst = self.value_def(v).inst()?;
        match self.insts[inst] {
            InstructionData::UnaryImm {
                opcode: Opcode::Iconst,
                imm,
            } => Some(imm.bits()),
            _ => None,
        }
    }

    /// Redirect every use of `old` to `new`.
    ///
    /// This rewrites the operand fields of every instruction in the arena, whether or not it is
    /// currently inserted in the layout. Returns the number of operands rewritten.
    pub fn replace_uses(&mut self, old: Value, new: Value) -> usize {
        debug_assert_eq!(self.value_type(old), self.value_type(new));
        let mut replaced = 0;
        for data in self.insts.values_mut() {
            for arg in data.arguments_mut() {
                if *arg == old {
                    *arg = new;
                    replaced += 1;
                }
            }
        }
        replaced
    }

    /// Count the uses of every value by the instructions in `insts`.
    pub fn use_counts<I>(&self, insts: I) -> SecondaryMap<Value, u32>
    where
        I: IntoIterator<Item = Inst>,
    {
        let mut counts = SecondaryMap::with_capacity(self.values.len());
        for inst in insts {
            for &arg in self.inst_args(inst) {
                counts[arg] += 1;
            }
        }
        counts
    }
}

/// Instructions.
impl DataFlowGraph {
    /// Create a new instruction.
    ///
    /// The instruction has no result value until `make_inst_results` is called.
    pub fn make_inst(&mut self, data: InstructionData) -> Inst {
        self.insts.push(data)
    }

    /// Create the result value for `inst`, if its opcode produces one.
    ///
    /// Returns the number of results produced.
    pub fn make_inst_results(&mut self, inst: Inst, ctrl_typevar: Type) -> usize {
        debug_assert!(self.results[inst].is_none(), "{inst} already has results");
        if !self.insts[inst].opcode().has_result() {
            return 0;
        }
        let value = self.values.push(ValueData::Inst {
            ty: ctrl_typevar,
            inst,
        });
        self.results[inst] = value.into();
        1
    }

    /// Get the result of `inst`, if it has one.
    pub fn inst_result(&self, inst: Inst) -> Option<Value> {
        self.results[inst].expand()
    }

    /// Get the result of `inst`, panicking if it has none.
    pub fn first_result(&self, inst: Inst) -> Value {
        self.inst_result(inst).expect("Instruction has no results")
    }

    /// Get the value arguments of `inst`.
    pub fn inst_args(&self, inst: Inst) -> &[Value] {
        self.insts[inst].arguments()
    }

    /// Get mutable access to the value arguments of `inst`.
    pub fn inst_args_mut(&mut self, inst: Inst) -> &mut [Value] {
        self.insts[inst].arguments_mut()
    }

    /// Returns an object that displays `inst`.
    pub fn display_inst(&self, inst: Inst) -> DisplayInst<'_> {
        DisplayInst(self, inst)
    }
}

/// Allow immutable access to instructions via indexing.
impl Index<Inst> for DataFlowGraph {
    type Output = InstructionData;

    fn index(&self, inst: Inst) -> &InstructionData {
        &self.insts[inst]
    }
}

/// Allow mutable access to instructions via indexing.
impl IndexMut<Inst> for DataFlowGraph {
    fn index_mut(&mut self, inst: Inst) -> &mut InstructionData {
        &mut self.insts[inst]
    }
}

/// Basic blocks.
impl DataFlowGraph {
    /// Create a new basic block.
    pub fn make_block(&mut self) -> Block {
        self.blocks.push(())
    }

    /// Get the parameters of `block`.
    pub fn block_params(&self, block: Block) -> &[Value] {
        &self.block_params[block]
    }

    /// Append a parameter with type `ty` to `block`.
    pub fn append_block_param(&mut self, block: Block, ty: Type) -> Value {
        let num = self.block_params[block].len();
        debug_assert!(num <= u16::MAX as usize, "Too many parameters on block");
        let param = self.values.push(ValueData::Param {
            ty,
            block,
            num: num as u16,
        });
        self.block_params[block].push(param);
        param
    }
}

/// Object that can display an instruction.
pub struct DisplayInst<'a>(&'a DataFlowGraph, Inst);

impl<'a> fmt::Display for DisplayInst<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dfg = self.0;
        let inst = self.1;

        if let Some(result) = dfg.inst_result(inst) {
            write!(f, "{result} = ")?;
        }

        let opcode = dfg[inst].opcode();
        if opcode.requires_typevar_operand() {
            write!(f, "{}.{}", opcode, dfg.value_type(dfg.first_result(inst)))?;
        } else {
            write!(f, "{opcode}")?;
        }
        write_operands(f, dfg, inst)
    }
}
