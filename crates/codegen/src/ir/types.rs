//! Integer value types.

use core::fmt;

/// The type of an SSA value.
///
/// Only scalar integers are modelled. Arithmetic on every type wraps at its width.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Type {
    /// An 8-bit integer.
    I8,
    /// A 16-bit integer.
    I16,
    /// A 32-bit integer.
    I32,
    /// A 64-bit integer.
    I64,
}

/// 8-bit integer type.
pub const I8: Type = Type::I8;
/// 16-bit integer type.
pub const I16: Type = Type::I16;
/// 32-bit integer type.
pub const I32: Type = Type::I32;
/// 64-bit integer type.
pub const I64: Type = Type::I64;

impl Type {
    /// Get the width of this type in bits.
    pub fn bits(self) -> u32 {
        match self {
            Self::I8 => 8,
            Self::I16 => 16,
            Self::I32 => 32,
            Self::I64 => 64,
        }
    }

    /// Get the width of this type in bytes.
    pub fn bytes(self) -> u32 {
        self.bits() / 8
    }

    /// Look up a type by its textual name, e.g. `i32`.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "i8" => Some(Self::I8),
            "i16" => Some(Self::I16),
            "i32" => Some(Self::I32),
            "i64" => Some(Self::I64),
            _ => None,
        }
    }

    /// Truncate `x` to this type's width and sign-extend it back to 64 bits.
    ///
    /// This is the canonical in-register form of an integer of this type.
    pub fn wrap(self, x: i64) -> i64 {
        let shift = 64 - self.bits();
        (x << shift) >> shift
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "i{}", self.bits())
    }
}
