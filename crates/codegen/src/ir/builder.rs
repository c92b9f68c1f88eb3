//! IR builder.
//!
//! A `Builder` provides a convenient interface for inserting instructions into an IR function.
//! There is a single method per opcode, so the operand layout of each instruction format does
//! not leak into the code that emits instructions.

use crate::ir::{
    Block, DataFlowGraph, Imm64, Inst, InstructionData, Opcode, StackSlot, Type, Value,
};
use core::marker::PhantomData;
use smallvec::SmallVec;

/// Base trait for instruction builders.
///
/// The `InstBuilderBase` trait provides the basic functionality required by the methods of the
/// `InstBuilder` trait. These methods should not normally be used directly. Use the methods in
/// the `InstBuilder` trait instead.
///
/// Any data type that implements `InstBuilderBase` also gets all the methods of the
/// `InstBuilder` trait.
pub trait InstBuilderBase<'f>: Sized {
    /// Get an immutable reference to the data flow graph that will hold the constructed
    /// instructions.
    fn data_flow_graph(&self) -> &DataFlowGraph;

    /// Get a mutable reference to the data flow graph that will hold the constructed
    /// instructions.
    fn data_flow_graph_mut(&mut self) -> &mut DataFlowGraph;

    /// Insert an instruction and return a reference to it, consuming the builder.
    ///
    /// The result of the instruction, if its opcode has one, gets the type `ctrl_typevar`.
    fn build(self, data: InstructionData, ctrl_typevar: Type) -> (Inst, &'f mut DataFlowGraph);
}

/// Convenience methods for building instructions.
///
/// The `InstBuilder` trait has one method per instruction opcode for conveniently constructing
/// the instruction with minimum arguments. Polymorphic instructions infer their result types
/// from the input arguments when possible. In some cases, an explicit `ty` argument is
/// required.
pub trait InstBuilder<'f>: InstBuilderBase<'f> {
    /// Integer constant.
    fn iconst(self, ty: Type, n: impl Into<Imm64>) -> Value {
        let imm = Imm64::new(ty.wrap(n.into().bits()));
        let data = InstructionData::UnaryImm {
            opcode: Opcode::Iconst,
            imm,
        };
        let (inst, dfg) = self.build(data, ty);
        dfg.first_result(inst)
    }

    /// Wrapping integer addition: `a := x + y`.
    fn iadd(self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Iadd, x, y)
    }

    /// Wrapping integer subtraction: `a := x - y`.
    fn isub(self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Isub, x, y)
    }

    /// Wrapping integer multiplication: `a := x * y`.
    fn imul(self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Imul, x, y)
    }

    /// Load a value of type `ty` from a stack slot.
    fn stack_load(self, ty: Type, stack_slot: StackSlot) -> Value {
        let data = InstructionData::StackLoad {
            opcode: Opcode::StackLoad,
            stack_slot,
        };
        let (inst, dfg) = self.build(data, ty);
        dfg.first_result(inst)
    }

    /// Store `x` to a stack slot.
    fn stack_store(self, x: Value, stack_slot: StackSlot) -> Inst {
        let ctrl_typevar = self.data_flow_graph().value_type(x);
        let data = InstructionData::StackStore {
            opcode: Opcode::StackStore,
            arg: x,
            stack_slot,
        };
        self.build(data, ctrl_typevar).0
    }

    /// Jump unconditionally to `destination`.
    fn jump(self, destination: Block) -> Inst {
        let data = InstructionData::Jump {
            opcode: Opcode::Jump,
            destination,
        };
        self.build(data, Type::I64).0
    }

    /// Return from the function with `args`.
    fn return_(self, args: &[Value]) -> Inst {
        let data = InstructionData::MultiAry {
            opcode: Opcode::Return,
            args: SmallVec::from_slice(args),
        };
        self.build(data, Type::I64).0
    }

    /// Helper for the binary arithmetic opcodes. The controlling type is the type of `x`.
    #[doc(hidden)]
    fn binary(self, opcode: Opcode, x: Value, y: Value) -> Value {
        let ctrl_typevar = self.data_flow_graph().value_type(x);
        let data = InstructionData::Binary {
            opcode,
            args: [x, y],
        };
        let (inst, dfg) = self.build(data, ctrl_typevar);
        dfg.first_result(inst)
    }
}

/// Any type implementing `InstBuilderBase` gets all the `InstBuilder` methods for free.
impl<'f, T: InstBuilderBase<'f>> InstBuilder<'f> for T {}

/// An instruction inserter which can be used to build and insert instructions.
///
/// This is implemented by cursors. The builder creates the instruction and its result in the
/// data flow graph, and the inserter places it in the layout.
pub trait InstInserterBase<'f>: Sized {
    /// Get an immutable reference to the data flow graph.
    fn data_flow_graph(&self) -> &DataFlowGraph;

    /// Get a mutable reference to the data flow graph.
    fn data_flow_graph_mut(&mut self) -> &mut DataFlowGraph;

    /// Insert a new instruction which belongs to the DFG.
    fn insert_built_inst(self, inst: Inst) -> &'f mut DataFlowGraph;
}

/// Builder that inserts an instruction at the current position.
///
/// An `InsertBuilder` is a wrapper for an `InstInserterBase` that turns it into an instruction
/// builder with some additional facilities for creating instructions that reuse existing values
/// as their results.
pub struct InsertBuilder<'f, IIB: InstInserterBase<'f>> {
    inserter: IIB,
    unused: PhantomData<&'f u32>,
}

impl<'f, IIB: InstInserterBase<'f>> InsertBuilder<'f, IIB> {
    /// Create a new builder which inserts instructions at `pos`.
    /// The `dfg` and `pos.layout` references should be from the same `Function`.
    pub fn new(inserter: IIB) -> Self {
        Self {
            inserter,
            unused: PhantomData,
        }
    }
}

impl<'f, IIB: InstInserterBase<'f>> InstBuilderBase<'f> for InsertBuilder<'f, IIB> {
    fn data_flow_graph(&self) -> &DataFlowGraph {
        self.inserter.data_flow_graph()
    }

    fn data_flow_graph_mut(&mut self) -> &mut DataFlowGraph {
        self.inserter.data_flow_graph_mut()
    }

    fn build(mut self, data: InstructionData, ctrl_typevar: Type) -> (Inst, &'f mut DataFlowGraph) {
        let inst;
        {
            let dfg = self.inserter.data_flow_graph_mut();
            inst = dfg.make_inst(data);
            dfg.make_inst_results(inst, ctrl_typevar);
        }
        (inst, self.inserter.insert_built_inst(inst))
    }
}
