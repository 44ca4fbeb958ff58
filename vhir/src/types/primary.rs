#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents an integer type with a specific bit width.
///
/// Signeness is not represented here; all integer types are treated as unsigned.
/// Operations that need a signed view (e.g. `slt`) reinterpret the bits.
///
/// Widths are limited to 64 bits so that every value fits in a `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct IType {
    num_bits: u32,
}

impl IType {
    /// Common integer types.
    pub const I1: Self = Self { num_bits: 1 };
    pub const I8: Self = Self { num_bits: 8 };
    pub const I16: Self = Self { num_bits: 16 };
    pub const I32: Self = Self { num_bits: 32 };
    pub const I64: Self = Self { num_bits: 64 };
    pub const MIN_BITS: u32 = 1;
    pub const MAX_BITS: u32 = 64;

    #[inline]
    const fn check_validity(num_bits: u32) -> bool {
        num_bits >= Self::MIN_BITS && num_bits <= Self::MAX_BITS
    }

    /// Creates a new `IType` with the specified number of bits.
    #[inline]
    pub const fn new(num_bits: u32) -> Option<Self> {
        if Self::check_validity(num_bits) {
            Some(Self { num_bits })
        } else {
            None
        }
    }

    /// Returns the number of bits of the integer type.
    #[inline]
    pub const fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Returns the number of bytes required to store the integer type.
    #[inline]
    pub const fn byte_size(&self) -> u32 {
        self.num_bits.div_ceil(8)
    }

    /// Returns `true` for the single-bit type used to represent booleans.
    #[inline]
    pub const fn is_bool(&self) -> bool {
        self.num_bits == 1
    }

    /// Bit mask selecting the meaningful bits of a value of this type.
    #[inline]
    pub const fn mask(&self) -> u64 {
        if self.num_bits == 64 {
            u64::MAX
        } else {
            (1u64 << self.num_bits) - 1
        }
    }

    /// Returns the maximum (unsigned) value that can be represented by this integer type.
    #[inline]
    pub const fn max_value(&self) -> u64 {
        self.mask()
    }
}

impl std::fmt::Display for IType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}", self.num_bits)
    }
}
