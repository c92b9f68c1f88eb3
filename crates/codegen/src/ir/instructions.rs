//! Instruction formats and opcodes.
//!
//! Every instruction is stored as an `InstructionData` value. The variant is the instruction
//! *format*, which decides the operand layout; the `opcode` field inside it says which
//! operation is performed.

use crate::ir::{Block, StackSlot, Value};
use core::fmt;
use core::str::FromStr;
use smallvec::SmallVec;

/// An instruction opcode.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Opcode {
    /// `a = iconst.T N`: materialize an integer constant.
    Iconst,
    /// `a = iadd x, y`: wrapping addition.
    Iadd,
    /// `a = isub x, y`: wrapping subtraction.
    Isub,
    /// `a = imul x, y`: wrapping multiplication.
    Imul,
    /// `a = stack_load.T ss`: read a stack slot.
    StackLoad,
    /// `stack_store x, ss`: write a stack slot.
    StackStore,
    /// `jump block`: unconditional branch.
    Jump,
    /// `return args`: return from the function.
    Return,
}

const OPCODE_NAMES: [(&str, Opcode); 8] = [
    ("iconst", Opcode::Iconst),
    ("iadd", Opcode::Iadd),
    ("isub", Opcode::Isub),
    ("imul", Opcode::Imul),
    ("stack_load", Opcode::StackLoad),
    ("stack_store", Opcode::StackStore),
    ("jump", Opcode::Jump),
    ("return", Opcode::Return),
];

impl Opcode {
    /// The textual name of this opcode.
    pub fn name(self) -> &'static str {
        match self {
            Self::Iconst => "iconst",
            Self::Iadd => "iadd",
            Self::Isub => "isub",
            Self::Imul => "imul",
            Self::StackLoad => "stack_load",
            Self::StackStore => "stack_store",
            Self::Jump => "jump",
            Self::Return => "return",
        }
    }

    /// Does this opcode end a basic block?
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Jump | Self::Return)
    }

    /// Does this opcode produce a single result value?
    pub fn has_result(self) -> bool {
        matches!(
            self,
            Self::Iconst | Self::Iadd | Self::Isub | Self::Imul | Self::StackLoad
        )
    }

    /// Can this instruction be deleted when its result is unused?
    pub fn is_pure(self) -> bool {
        self.has_result()
    }

    /// Is the controlling type spelled out as a suffix in the text format (`iconst.i32`)?
    ///
    /// For the arithmetic opcodes it is inferred from the first operand instead.
    pub fn requires_typevar_operand(self) -> bool {
        matches!(self, Self::Iconst | Self::StackLoad)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Opcode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, &'static str> {
        OPCODE_NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|&(_, opcode)| opcode)
            .ok_or("Unknown opcode")
    }
}

/// 64-bit immediate signed integer operand.
///
/// The value is stored sign-extended to 64 bits regardless of the controlling type.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Imm64(i64);

impl Imm64 {
    /// Create a new `Imm64` representing the signed number `x`.
    pub fn new(x: i64) -> Self {
        Self(x)
    }

    /// Get the bits of this immediate as a signed integer.
    pub fn bits(self) -> i64 {
        self.0
    }
}

impl From<i64> for Imm64 {
    fn from(x: i64) -> Self {
        Self(x)
    }
}

impl From<Imm64> for i64 {
    fn from(val: Imm64) -> i64 {
        val.0
    }
}

impl fmt::Display for Imm64 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Parse a 64-bit unsigned number, decimal or `0x` hexadecimal. Digits may be separated by `_`.
fn parse_u64(s: &str) -> Result<u64, &'static str> {
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    let mut value: u64 = 0;
    let mut seen = false;
    for ch in digits.chars() {
        if ch == '_' {
            continue;
        }
        let digit = ch.to_digit(radix).ok_or("Invalid character in integer")?;
        seen = true;
        value = if radix == 16 {
            if value >> 60 != 0 {
                return Err("Too many hexadecimal digits");
            }
            (value << 4) | u64::from(digit)
        } else {
            value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(digit)))
                .ok_or("Too large decimal number")?
        };
    }
    if seen { Ok(value) } else { Err("No digits in number") }
}

/// Parse a signed 64-bit integer.
///
/// Hexadecimal numbers are bit patterns, so `0xffffffffffffffff` is `-1`. A leading `-` negates.
impl FromStr for Imm64 {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, &'static str> {
        let (negative, magnitude) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let bits = parse_u64(magnitude)?;
        let hex = magnitude.starts_with("0x") || magnitude.starts_with("0X");
        if !negative {
            if !hex && bits > i64::MAX as u64 {
                return Err("Too large decimal number");
            }
            Ok(Self(bits as i64))
        } else if bits > i64::MIN.unsigned_abs() {
            Err("Negative number too small")
        } else {
            Ok(Self((bits as i64).wrapping_neg()))
        }
    }
}

/// The operands of an instruction, grouped by instruction format.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum InstructionData {
    /// An opcode with one immediate operand: `iconst`.
    UnaryImm {
        /// The opcode.
        opcode: Opcode,
        /// The immediate.
        imm: Imm64,
    },
    /// An opcode with two value operands: `iadd`, `isub`, `imul`.
    Binary {
        /// The opcode.
        opcode: Opcode,
        /// Left and right operands.
        args: [Value; 2],
    },
    /// A read from a stack slot.
    StackLoad {
        /// The opcode.
        opcode: Opcode,
        /// The slot being read.
        stack_slot: StackSlot,
    },
    /// A write to a stack slot.
    StackStore {
        /// The opcode.
        opcode: Opcode,
        /// The value being stored.
        arg: Value,
        /// The slot being written.
        stack_slot: StackSlot,
    },
    /// An unconditional branch.
    Jump {
        /// The opcode.
        opcode: Opcode,
        /// Target block.
        destination: Block,
    },
    /// An opcode with a variable number of value operands: `return`.
    MultiAry {
        /// The opcode.
        opcode: Opcode,
        /// The operands.
        args: SmallVec<[Value; 2]>,
    },
}

impl InstructionData {
    /// Get the opcode of this instruction.
    pub fn opcode(&self) -> Opcode {
        match *self {
            Self::UnaryImm { opcode, .. }
            | Self::Binary { opcode, .. }
            | Self::StackLoad { opcode, .. }
            | Self::StackStore { opcode, .. }
            | Self::Jump { opcode, .. }
            | Self::MultiAry { opcode, .. } => opcode,
        }
    }

    /// Get the value arguments to this instruction.
    pub fn arguments(&self) -> &[Value] {
        match self {
            Self::UnaryImm { .. } | Self::StackLoad { .. } | Self::Jump { .. } => &[],
            Self::Binary { args, .. } => &args[..],
            Self::StackStore { arg, .. } => core::slice::from_ref(arg),
            Self::MultiAry { args, .. } => &args[..],
        }
    }

    /// Get mutable references to the value arguments to this instruction.
    pub fn arguments_mut(&mut self) -> &mut [Value] {
        match self {
            Self::UnaryImm { .. } | Self::StackLoad { .. } | Self::Jump { .. } => &mut [],
            Self::Binary { args, .. } => &mut args[..],
            Self::StackStore { arg, .. } => core::slice::from_mut(arg),
            Self::MultiAry { args, .. } => &mut args[..],
        }
    }

    /// The stack slot accessed by this instruction, if any.
    pub fn stack_slot(&self) -> Option<StackSlot> {
        match *self {
            Self::StackLoad { stack_slot, .. } | Self::StackStore { stack_slot, .. } => {
                Some(stack_slot)
            }
            _ => None,
        }
    }

    /// The branch destination of this instruction, if any.
    pub fn branch_destination(&self) -> Option<Block> {
        match *self {
            Self::Jump { destination, .. } => Some(destination),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;
    use smallvec::smallvec;

    #[test]
    fn opcodes() {
        for (name, opcode) in OPCODE_NAMES {
            assert_eq!(opcode.name(), name);
            assert_eq!(name.parse::<Opcode>(), Ok(opcode));
        }
        assert_eq!("fadd".parse::<Opcode>(), Err("Unknown opcode"));

        assert!(Opcode::Return.is_terminator());
        assert!(!Opcode::Iadd.is_terminator());
        assert!(Opcode::StackLoad.has_result());
        assert!(!Opcode::StackStore.has_result());
    }

    #[test]
    fn parse_imm64() {
        let parse = |s: &str| s.parse::<Imm64>().map(Imm64::bits);
        assert_eq!(parse("0"), Ok(0));
        assert_eq!(parse("-3"), Ok(-3));
        assert_eq!(parse("1_000"), Ok(1000));
        assert_eq!(parse("0x7f"), Ok(127));
        assert_eq!(parse("0xffff_ffff_ffff_ffff"), Ok(-1));
        assert_eq!(parse("-0x10"), Ok(-16));
        assert_eq!(parse("9223372036854775807"), Ok(i64::MAX));
        assert_eq!(parse("-9223372036854775808"), Ok(i64::MIN));
        assert_eq!(parse("9223372036854775808"), Err("Too large decimal number"));
        assert_eq!(parse("0x1_0000_0000_0000_0000"), Err("Too many hexadecimal digits"));
        assert_eq!(parse("0x"), Err("No digits in number"));
        assert_eq!(parse("12a"), Err("Invalid character in integer"));
    }

    #[test]
    fn arguments() {
        let v0 = Value::new(0);
        let v1 = Value::new(1);
        let mut data = InstructionData::Binary {
            opcode: Opcode::Imul,
            args: [v0, v1],
        };
        assert_eq!(data.arguments(), &[v0, v1]);
        data.arguments_mut()[1] = v0;
        assert_eq!(data.arguments(), &[v0, v0]);

        let ret = InstructionData::MultiAry {
            opcode: Opcode::Return,
            args: smallvec![v1],
        };
        assert_eq!(ret.arguments(), &[v1]);

        let load = InstructionData::StackLoad {
            opcode: Opcode::StackLoad,
            stack_slot: StackSlot::new(2),
        };
        assert!(load.arguments().is_empty());
        assert_eq!(load.stack_slot(), Some(StackSlot::new(2)));
    }
}
