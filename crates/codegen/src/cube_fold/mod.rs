//! Folding expanded binomial cubes.
//!
//! This pass looks for additions computing
//!
//! ```text
//! a*a*a + 3*a*a*b + 3*a*b*b + b*b*b
//! ```
//!
//! in any term order, with any factor order inside each term, and with `a` and `b` possibly
//! reloaded from stack slots they were spilled to. A match is rewritten as
//!
//! ```text
//! sum = iadd a, b
//! square = imul sum, sum
//! cube = imul square, sum
//! ```
//!
//! and every use of the original sum is redirected to `cube`. The expanded computation is left in
//! place for dead code elimination to remove.
//!
//! At most one sum is rewritten per invocation.

mod classify;
mod flatten;
mod resolve;

pub use self::classify::{classify, ElementInfo, ShapeMismatch};
pub use self::flatten::{flatten_add, flatten_mul};
pub use self::resolve::{MemoryCells, StoreSummary};

use crate::cursor::{Cursor, FuncCursor};
use crate::ir::{DataFlowGraph, Function, InstBuilder, Opcode, Value};
use crate::timing;
use core::fmt;
use smallvec::SmallVec;

/// The terms of `(A + B)^3`, sorted.
pub const BINOMIAL_CUBE: [ElementInfo; 4] = [
    ElementInfo::new(1, 0, 3),
    ElementInfo::new(1, 3, 0),
    ElementInfo::new(3, 1, 2),
    ElementInfo::new(3, 2, 1),
];

/// The free variables of a matched binomial cube.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CubeMatch {
    /// The first free variable discovered.
    pub a: Value,
    /// The second free variable discovered.
    pub b: Value,
}

/// Why a candidate sum is not a binomial cube.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    /// The sum doesn't have exactly four terms.
    TermCount(usize),
    /// The terms don't mention exactly two distinct non-constant factors.
    FreeVariableCount(usize),
    /// A term is not a monomial in the free variables.
    Shape(ShapeMismatch),
    /// The terms are monomials with the wrong coefficients or exponents.
    Pattern([ElementInfo; 4]),
}

impl From<ShapeMismatch> for Mismatch {
    fn from(e: ShapeMismatch) -> Self {
        Self::Shape(e)
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::TermCount(n) => write!(f, "{n} terms"),
            Self::FreeVariableCount(n) => write!(f, "{n} free variables"),
            Self::Shape(e) => write!(f, "{e}"),
            Self::Pattern(terms) => {
                write!(f, "terms")?;
                for t in terms {
                    write!(f, " {t}")?;
                }
                Ok(())
            }
        }
    }
}

/// Collect the distinct non-constant factors of `terms`, resolved through `cells`, in the order
/// they are first seen.
fn free_variables(dfg: &DataFlowGraph, cells: &MemoryCells, terms: &[Value]) -> SmallVec<[Value; 2]> {
    let mut vars = SmallVec::new();
    for &term in terms {
        for factor in flatten_mul(dfg, term) {
            if dfg.iconst_value(factor).is_some() {
                continue;
            }
            let v = cells.resolve(dfg, factor);
            if !vars.contains(&v) {
                vars.push(v);
            }
        }
    }
    vars
}

/// Decide whether `root` computes `(A + B)^3` in expanded form.
pub fn match_cube(
    dfg: &DataFlowGraph,
    cells: &MemoryCells,
    root: Value,
) -> Result<CubeMatch, Mismatch> {
    let terms = flatten_add(dfg, root);
    if terms.len() != 4 {
        return Err(Mismatch::TermCount(terms.len()));
    }

    let vars = free_variables(dfg, cells, &terms);
    let &[a, b] = vars.as_slice() else {
        return Err(Mismatch::FreeVariableCount(vars.len()));
    };

    let mut infos = [ElementInfo::default(); 4];
    for (info, &term) in infos.iter_mut().zip(terms.iter()) {
        *info = classify(dfg, cells, term, a, b)?;
    }
    infos.sort_unstable();
    if infos != BINOMIAL_CUBE {
        return Err(Mismatch::Pattern(infos));
    }

    Ok(CubeMatch { a, b })
}

/// Replace the uses of `root`, computed by the instruction under the cursor, with `(a + b)^3`.
fn fold(pos: &mut FuncCursor, root: Value, m: CubeMatch) -> Value {
    let sum = pos.ins().iadd(m.a, m.b);
    let square = pos.ins().imul(sum, sum);
    let cube = pos.ins().imul(square, sum);
    pos.func.dfg.replace_uses(root, cube);
    cube
}

/// Rewrite the first binomial cube found in `func`, in layout order.
///
/// Sums without uses are skipped, so a sum already rewritten by an earlier invocation is not
/// matched again before DCE removes it.
///
/// Returns whether the function was modified.
pub fn do_cube_fold(func: &mut Function) -> bool {
    let _tt = timing::cube_fold();
    let cells = MemoryCells::compute(func);
    let uses = func.dfg.use_counts(func.layout.insts());

    let mut pos = FuncCursor::new(func);
    while let Some(_block) = pos.next_block() {
        while let Some(inst) = pos.next_inst() {
            if pos.func.dfg[inst].opcode() != Opcode::Iadd {
                continue;
            }
            let root = pos.func.dfg.first_result(inst);
            if uses[root] == 0 {
                crate::trace!("cube-fold: {root}: unused");
                continue;
            }
            match match_cube(&pos.func.dfg, &cells, root) {
                Ok(m) => {
                    let cube = fold(&mut pos, root, m);
                    log::debug!(
                        "cube-fold: %{}: {root} = ({} + {})^3, now {cube}",
                        pos.func.name,
                        m.a,
                        m.b
                    );
                    return true;
                }
                Err(mismatch) => crate::trace!("cube-fold: {root}: {mismatch}"),
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dce::do_dce;
    use crate::entity::EntityRef;
    use crate::ir::types::I32;
    use crate::ir::{InstructionData, Signature, StackSlot, StackSlotData, ValueDef};
    use crate::verifier::verify_function;

    /// A factor of a term in a test function.
    #[derive(Clone, Copy)]
    enum F {
        /// The first argument.
        A,
        /// The second argument.
        B,
        /// The first argument, reloaded from its stack slot.
        LoadA,
        /// The second argument, reloaded from its stack slot.
        LoadB,
        /// The constant 2, reloaded from a stack slot.
        LoadTwo,
        /// A constant.
        K(i64),
    }
    use F::*;

    const A3: &[F] = &[A, A, A];
    const A2B: &[F] = &[K(3), A, A, B];
    const AB2: &[F] = &[K(3), A, B, B];
    const B3: &[F] = &[B, B, B];

    // Stack slots holding `a`, `b` and the constant 2.
    fn slot(n: usize) -> StackSlot {
        StackSlot::new(n)
    }

    /// Build `%f(a, b)` returning the first sum minus the others. Every sum adds its terms from
    /// left to right; every term multiplies its factors from left to right.
    fn function(sums: &[&[&[F]]]) -> Function {
        let mut func =
            Function::with_name_signature("f", Signature::new(vec![I32, I32], vec![I32]));
        for _ in 0..3 {
            func.create_stack_slot(StackSlotData::new(4));
        }
        let block0 = func.create_block();
        let a = func.dfg.append_block_param(block0, I32);
        let b = func.dfg.append_block_param(block0, I32);

        let mut pos = FuncCursor::new(&mut func).at_bottom(block0);
        pos.ins().stack_store(a, slot(0));
        pos.ins().stack_store(b, slot(1));
        let two = pos.ins().iconst(I32, 2);
        pos.ins().stack_store(two, slot(2));

        let mut result = None;
        for terms in sums {
            let mut sum = None;
            for factors in *terms {
                let mut term = None;
                for &factor in *factors {
                    let v = match factor {
                        A => a,
                        B => b,
                        LoadA => pos.ins().stack_load(I32, slot(0)),
                        LoadB => pos.ins().stack_load(I32, slot(1)),
                        LoadTwo => pos.ins().stack_load(I32, slot(2)),
                        K(n) => pos.ins().iconst(I32, n),
                    };
                    term = Some(match term {
                        None => v,
                        Some(t) => pos.ins().imul(t, v),
                    });
                }
                let term = term.unwrap();
                sum = Some(match sum {
                    None => term,
                    Some(s) => pos.ins().iadd(s, term),
                });
            }
            let sum = sum.unwrap();
            result = Some(match result {
                None => sum,
                Some(r) => pos.ins().isub(r, sum),
            });
        }
        pos.ins().return_(&[result.unwrap()]);
        verify_function(&func).unwrap();
        func
    }

    fn returned(func: &Function) -> Value {
        let block = func.layout.last_block().unwrap();
        let ret = func.layout.last_inst(block).unwrap();
        func.dfg.inst_args(ret)[0]
    }

    fn binary(dfg: &DataFlowGraph, v: Value) -> (Opcode, [Value; 2]) {
        let ValueDef::Result(inst) = dfg.value_def(v) else {
            panic!("{v} is a parameter");
        };
        match dfg[inst] {
            InstructionData::Binary { opcode, args } => (opcode, args),
            ref data => panic!("{v} is defined by {data:?}"),
        }
    }

    /// Check that `v` is `(a + b)^3` as built by the pass, where `a` and `b` are the arguments
    /// in either order.
    fn assert_cube(func: &Function, v: Value) {
        let &[p0, p1] = func.dfg.block_params(func.layout.entry_block().unwrap()) else {
            panic!("expected two parameters");
        };
        let (op, [square, sum]) = binary(&func.dfg, v);
        assert_eq!(op, Opcode::Imul);
        assert_eq!(binary(&func.dfg, square), (Opcode::Imul, [sum, sum]));
        let (op, args) = binary(&func.dfg, sum);
        assert_eq!(op, Opcode::Iadd);
        assert!(args == [p0, p1] || args == [p1, p0], "{sum} adds {args:?}");
    }

    fn rejection(sums: &[&[&[F]]]) -> Mismatch {
        let mut func = function(sums);
        let root = returned(&func);
        let cells = MemoryCells::compute(&func);
        let mismatch = match_cube(&func.dfg, &cells, root).unwrap_err();
        assert!(!do_cube_fold(&mut func));
        mismatch
    }

    #[test]
    fn folds_expanded_cube() {
        let mut func = function(&[&[A3, A2B, AB2, B3]]);
        let before = returned(&func);
        assert!(do_cube_fold(&mut func));
        verify_function(&func).unwrap();

        let after = returned(&func);
        assert_ne!(before, after);
        assert_cube(&func, after);

        // The expanded sum is still there until DCE runs.
        let old = func.dfg.value_def(before).unwrap_inst();
        assert_eq!(func.layout.inst_block(old), func.layout.entry_block());
        assert!(do_dce(&mut func));
        assert_eq!(func.layout.inst_block(old), None);
    }

    #[test]
    fn term_order() {
        let terms = [A3, A2B, AB2, B3];
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    if i == j || i == k || j == k {
                        continue;
                    }
                    let l = 6 - i - j - k;
                    let mut func = function(&[&[terms[i], terms[j], terms[k], terms[l]]]);
                    assert!(do_cube_fold(&mut func), "order {i}{j}{k}{l}");
                    assert_cube(&func, returned(&func));
                }
            }
        }
    }

    #[test]
    fn factor_order() {
        let mut func = function(&[&[
            &[A, A, A],
            &[A, A, B, K(3)],
            &[B, K(3), B, A],
            &[B, B, B],
        ]]);
        assert!(do_cube_fold(&mut func));
        assert_cube(&func, returned(&func));
    }

    #[test]
    fn split_coefficients() {
        let mut func = function(&[&[
            &[K(1), A, A, A],
            &[K(-1), A, K(-3), A, B],
            &[A, B, B, K(3), K(1)],
            &[B, B, B],
        ]]);
        assert!(do_cube_fold(&mut func));
    }

    #[test]
    fn through_stack_slots() {
        let mut func = function(&[&[
            &[LoadA, LoadA, LoadA],
            &[K(3), LoadA, A, LoadB],
            &[A, K(3), B, LoadB],
            &[LoadB, B, B],
        ]]);
        assert!(do_cube_fold(&mut func));
        assert_cube(&func, returned(&func));
    }

    #[test]
    fn slot_stored_twice() {
        let mut func = function(&[&[
            &[LoadA, LoadA, LoadA],
            &[K(3), LoadA, LoadA, B],
            &[K(3), LoadA, B, B],
            &[B, B, B],
        ]]);
        let block0 = func.layout.entry_block().unwrap();
        let a = func.dfg.block_params(block0)[0];
        let first = func.layout.first_inst(block0).unwrap();
        FuncCursor::new(&mut func).at_inst(first).ins().stack_store(a, slot(0));

        assert!(!do_cube_fold(&mut func));
    }

    #[test]
    fn constant_through_stack_slot() {
        // The stored value is a constant, not an argument, so every load is its own variable.
        let mismatch = rejection(&[&[
            &[A, A, A],
            &[K(3), A, A, LoadTwo],
            &[K(3), A, LoadTwo, LoadTwo],
            &[LoadTwo, LoadTwo, LoadTwo],
        ]]);
        assert_eq!(mismatch, Mismatch::FreeVariableCount(7));
    }

    #[test]
    fn term_count() {
        assert_eq!(rejection(&[&[A3, A2B, AB2]]), Mismatch::TermCount(3));
        // The extra term comes first so that no inner sum has four terms of the right shape.
        assert_eq!(
            rejection(&[&[&[A], A3, A2B, AB2, B3]]),
            Mismatch::TermCount(5)
        );
    }

    #[test]
    fn wrong_coefficient() {
        let mismatch = rejection(&[&[&[K(2), A, A, A], A2B, AB2, B3]]);
        let Mismatch::Pattern(terms) = mismatch else {
            panic!("unexpected {mismatch}");
        };
        assert_eq!(terms[1], ElementInfo::new(2, 3, 0));
    }

    #[test]
    fn wrong_exponent() {
        let mismatch = rejection(&[&[A3, &[K(3), A, A, B], &[K(3), A, A, B], B3]]);
        assert!(matches!(mismatch, Mismatch::Pattern(_)));
    }

    #[test]
    fn single_free_variable() {
        assert_eq!(
            rejection(&[&[A3, &[K(3), A, A, A], &[K(3), A, A, A], A3]]),
            Mismatch::FreeVariableCount(1)
        );
    }

    #[test]
    fn one_rewrite_per_invocation() {
        let mut func = function(&[&[A3, A2B, AB2, B3], &[B3, AB2, A2B, A3]]);
        let (op, [first, second]) = binary(&func.dfg, returned(&func));
        assert_eq!(op, Opcode::Isub);

        assert!(do_cube_fold(&mut func));
        let (_, [folded, untouched]) = binary(&func.dfg, returned(&func));
        assert_ne!(folded, first);
        assert_eq!(untouched, second);
        assert_cube(&func, folded);

        assert!(do_dce(&mut func));
        assert!(do_cube_fold(&mut func));
        let (_, [_, folded]) = binary(&func.dfg, returned(&func));
        assert_cube(&func, folded);

        assert!(do_dce(&mut func));
        assert!(!do_cube_fold(&mut func));
        verify_function(&func).unwrap();
    }

    #[test]
    fn rewritten_sums_are_not_matched_again() {
        let mut func = function(&[&[A3, A2B, AB2, B3], &[B3, AB2, A2B, A3]]);
        let (_, [_, second]) = binary(&func.dfg, returned(&func));

        assert!(do_cube_fold(&mut func));
        let (_, [first_cube, untouched]) = binary(&func.dfg, returned(&func));
        assert_eq!(untouched, second);

        // No DCE in between: the dead expansion of the first sum is still in the layout.
        assert!(do_cube_fold(&mut func));
        let (_, [still_first, second_cube]) = binary(&func.dfg, returned(&func));
        assert_eq!(still_first, first_cube);
        assert_ne!(second_cube, second);
        assert_cube(&func, second_cube);

        let printed = func.to_string();
        assert!(!do_cube_fold(&mut func));
        assert_eq!(func.to_string(), printed);
        verify_function(&func).unwrap();
    }

    #[test]
    fn unused_cube_is_left_alone() {
        let mut func = function(&[&[A3, A2B, AB2, B3]]);
        let block0 = func.layout.entry_block().unwrap();
        let ret = func.layout.last_inst(block0).unwrap();
        let a = func.dfg.block_params(block0)[0];
        func.dfg.inst_args_mut(ret)[0] = a;
        assert!(!do_cube_fold(&mut func));
    }

    #[test]
    fn idempotent_after_dce() {
        let mut func = function(&[&[A3, A2B, AB2, B3]]);
        assert!(do_cube_fold(&mut func));
        assert!(do_dce(&mut func));
        let printed = func.to_string();
        assert!(!do_cube_fold(&mut func));
        assert!(!do_dce(&mut func));
        assert_eq!(func.to_string(), printed);
    }
}
