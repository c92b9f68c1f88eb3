//! Classifying additive terms as monomials in two free variables.

use super::flatten::flatten_mul;
use super::resolve::MemoryCells;
use crate::ir::{DataFlowGraph, Value};
use core::fmt;
use thiserror::Error;

/// The shape of one additive term relative to the free variables `A` and `B`:
/// `coefficient * A^exponent_a * B^exponent_b`.
///
/// The derived ordering compares the coefficient first, then the exponents. It only exists so
/// that sorting puts a set of terms in a canonical order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementInfo {
    /// Product of the constant factors, with wrapping 64-bit multiplication.
    pub coefficient: i64,
    /// Number of factors equal to `A`.
    pub exponent_a: u32,
    /// Number of factors equal to `B`.
    pub exponent_b: u32,
}

impl ElementInfo {
    /// Create a new `ElementInfo`.
    pub const fn new(coefficient: i64, exponent_a: u32, exponent_b: u32) -> Self {
        Self {
            coefficient,
            exponent_a,
            exponent_b,
        }
    }

    /// Fold `factor` into this term. Returns false if it is neither a constant, `a`, nor `b`.
    fn absorb(&mut self, dfg: &DataFlowGraph, factor: Value, a: Value, b: Value) -> bool {
        if let Some(imm) = dfg.iconst_value(factor) {
            self.coefficient = self.coefficient.wrapping_mul(imm);
        } else if factor == a {
            self.exponent_a += 1;
        } else if factor == b {
            self.exponent_b += 1;
        } else {
            return false;
        }
        true
    }
}

impl fmt::Display for ElementInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.coefficient, self.exponent_a, self.exponent_b
        )
    }
}

/// A factor of a term is neither a constant nor one of the free variables.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("factor {factor} of term {term} is not a constant or a free variable")]
pub struct ShapeMismatch {
    /// The additive term being classified.
    pub term: Value,
    /// The offending factor, as it appears in the term.
    pub factor: Value,
}

/// Classify `term` as a monomial in `a` and `b`.
///
/// Each factor is checked after resolving it through `cells`; when that fails, the factor is
/// checked again as written.
pub fn classify(
    dfg: &DataFlowGraph,
    cells: &MemoryCells,
    term: Value,
    a: Value,
    b: Value,
) -> Result<ElementInfo, ShapeMismatch> {
    let mut info = ElementInfo::new(1, 0, 0);
    for factor in flatten_mul(dfg, term) {
        let resolved = cells.resolve(dfg, factor);
        if !info.absorb(dfg, resolved, a, b) && !info.absorb(dfg, factor, a, b) {
            return Err(ShapeMismatch { term, factor });
        }
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{Cursor, FuncCursor};
    use crate::ir::types::{I32, I64};
    use crate::ir::{Function, InstBuilder, Signature, StackSlotData};

    #[test]
    fn operand_order() {
        let mut func =
            Function::with_name_signature("f", Signature::new(vec![I32; 3], vec![I32]));
        let block0 = func.create_block();
        let a = func.dfg.append_block_param(block0, I32);
        let b = func.dfg.append_block_param(block0, I32);
        let c = func.dfg.append_block_param(block0, I32);
        let mut pos = FuncCursor::new(&mut func).at_bottom(block0);

        let three = pos.ins().iconst(I32, 3);
        // 3*a*a*b
        let t = pos.ins().imul(three, a);
        let t = pos.ins().imul(t, a);
        let t0 = pos.ins().imul(t, b);
        // a*3*a*b
        let t = pos.ins().imul(a, three);
        let t = pos.ins().imul(t, a);
        let t1 = pos.ins().imul(t, b);
        // a*a*b*3
        let t = pos.ins().imul(a, a);
        let t = pos.ins().imul(t, b);
        let t2 = pos.ins().imul(t, three);
        // a*a*3*b, associated to the right
        let t = pos.ins().imul(three, b);
        let t = pos.ins().imul(a, t);
        let t3 = pos.ins().imul(a, t);
        // 3*a*c
        let t = pos.ins().imul(three, a);
        let bad = pos.ins().imul(t, c);

        let cells = MemoryCells::compute(pos.func);
        let dfg = &pos.func.dfg;
        for term in [t0, t1, t2, t3] {
            assert_eq!(classify(dfg, &cells, term, a, b), Ok(ElementInfo::new(3, 2, 1)));
        }
        // Swapping the free variables swaps the exponents.
        assert_eq!(classify(dfg, &cells, t0, b, a), Ok(ElementInfo::new(3, 1, 2)));
        assert_eq!(
            classify(dfg, &cells, bad, a, b),
            Err(ShapeMismatch {
                term: bad,
                factor: c
            })
        );
        // A bare free variable is a term too.
        assert_eq!(classify(dfg, &cells, b, a, b), Ok(ElementInfo::new(1, 0, 1)));
    }

    #[test]
    fn through_stack_slots() {
        let mut func =
            Function::with_name_signature("f", Signature::new(vec![I32; 2], vec![I32]));
        let ss0 = func.create_stack_slot(StackSlotData::new(4));
        let ss1 = func.create_stack_slot(StackSlotData::new(4));
        let block0 = func.create_block();
        let a = func.dfg.append_block_param(block0, I32);
        let b = func.dfg.append_block_param(block0, I32);
        let mut pos = FuncCursor::new(&mut func).at_bottom(block0);

        pos.ins().stack_store(a, ss0);
        let two = pos.ins().iconst(I32, 2);
        pos.ins().stack_store(two, ss1);
        let x = pos.ins().stack_load(I32, ss0);
        let y = pos.ins().stack_load(I32, ss0);
        let t = pos.ins().imul(x, y);
        let direct = pos.ins().imul(t, b);
        let c = pos.ins().stack_load(I32, ss1);
        let spilled_constant = pos.ins().imul(c, b);

        let cells = MemoryCells::compute(pos.func);
        let dfg = &pos.func.dfg;
        assert_eq!(classify(dfg, &cells, direct, a, b), Ok(ElementInfo::new(1, 2, 1)));
        // The unresolved load is accepted when it is itself one of the free variables.
        assert_eq!(classify(dfg, &cells, spilled_constant, c, b), Ok(ElementInfo::new(1, 1, 1)));
        assert!(classify(dfg, &cells, spilled_constant, a, b).is_err());
    }

    #[test]
    fn wrapping_coefficient() {
        let mut func = Function::with_name_signature("f", Signature::new(vec![I64], vec![I64]));
        let block0 = func.create_block();
        let a = func.dfg.append_block_param(block0, I64);
        let mut pos = FuncCursor::new(&mut func).at_bottom(block0);

        let big = pos.ins().iconst(I64, i64::MAX);
        let two = pos.ins().iconst(I64, 2);
        let t = pos.ins().imul(big, two);
        let term = pos.ins().imul(t, a);

        let cells = MemoryCells::compute(pos.func);
        assert_eq!(
            classify(&pos.func.dfg, &cells, term, a, a),
            Ok(ElementInfo::new(-2, 1, 0))
        );
    }
}
