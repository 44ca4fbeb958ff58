//! Concrete values.
//!
//! Values are what terms evaluate to and what the reference engine stores in
//! memory. Integers are kept masked to their width at all times.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{IType, TypeDescriptor};

/// An integer of a given width, stored masked in a `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntValue {
    ty: IType,
    bits: u64,
}

impl IntValue {
    pub const TRUE: Self = Self {
        ty: IType::I1,
        bits: 1,
    };
    pub const FALSE: Self = Self {
        ty: IType::I1,
        bits: 0,
    };

    /// Creates a value, truncating `bits` to the width of `ty`.
    #[inline]
    pub const fn new(ty: IType, bits: u64) -> Self {
        Self {
            ty,
            bits: bits & ty.mask(),
        }
    }

    #[inline]
    pub const fn from_bool(value: bool) -> Self {
        if value { Self::TRUE } else { Self::FALSE }
    }

    #[inline]
    pub const fn ty(&self) -> IType {
        self.ty
    }

    #[inline]
    pub const fn bits(&self) -> u64 {
        self.bits
    }

    /// Two's complement interpretation of the bits.
    #[inline]
    pub const fn as_signed(&self) -> i64 {
        let shift = 64 - self.ty.num_bits();
        ((self.bits << shift) as i64) >> shift
    }

    /// Non-zero test, the truthiness used for conditions.
    #[inline]
    pub const fn is_true(&self) -> bool {
        self.bits != 0
    }
}

impl std::fmt::Display for IntValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.ty.is_bool() {
            write!(f, "{}", self.is_true())
        } else if f.alternate() {
            let digits = self.ty.num_bits().div_ceil(4) as usize;
            write!(f, "0x{:0digits$x}", self.bits, digits = digits)
        } else {
            write!(f, "{}", self.bits)
        }
    }
}

/// A fully concrete value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Int(IntValue),
    Aggregate {
        ty: TypeDescriptor,
        elements: Vec<Value>,
    },
}

impl Value {
    pub fn int(ty: IType, bits: u64) -> Self {
        Self::Int(IntValue::new(ty, bits))
    }

    pub fn bool(value: bool) -> Self {
        Self::Int(IntValue::from_bool(value))
    }

    pub fn type_of(&self) -> TypeDescriptor {
        match self {
            Self::Int(int) => TypeDescriptor::Int(int.ty()),
            Self::Aggregate { ty, .. } => ty.clone(),
        }
    }

    pub fn as_int(&self) -> Option<IntValue> {
        match self {
            Self::Int(int) => Some(*int),
            Self::Aggregate { .. } => None,
        }
    }

    /// Truthiness of an `i1` (or any integer) value; aggregates are never true.
    pub fn is_true(&self) -> bool {
        self.as_int().is_some_and(|int| int.is_true())
    }

    /// Element `index` of an aggregate value.
    pub fn element(&self, index: u32) -> Option<&Value> {
        match self {
            Self::Aggregate { elements, .. } => elements.get(index as usize),
            Self::Int(_) => None,
        }
    }

    /// Builds a value of type `ty` by pulling the bits of every integer leaf
    /// from `next`, in layout order.
    ///
    /// Returns `None` when the layout contains a pointer, which has no
    /// value-level representation.
    pub fn from_bit_source(
        ty: &TypeDescriptor,
        next: &mut impl FnMut(IType) -> u64,
    ) -> Option<Self> {
        match ty {
            TypeDescriptor::Int(ity) => Some(Self::int(*ity, next(*ity))),
            TypeDescriptor::Ptr => None,
            TypeDescriptor::Array { elem, len } => {
                let elements = (0..*len)
                    .map(|_| Self::from_bit_source(elem, next))
                    .collect::<Option<Vec<_>>>()?;
                Some(Self::Aggregate {
                    ty: ty.clone(),
                    elements,
                })
            }
            TypeDescriptor::Struct(fields) => {
                let elements = fields
                    .iter()
                    .map(|field| Self::from_bit_source(field, next))
                    .collect::<Option<Vec<_>>>()?;
                Some(Self::Aggregate {
                    ty: ty.clone(),
                    elements,
                })
            }
        }
    }
}

impl From<IntValue> for Value {
    fn from(value: IntValue) -> Self {
        Self::Int(value)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(int) => std::fmt::Display::fmt(int, f),
            Self::Aggregate { ty, elements } => {
                let (open, close) = if ty.is_array() { ("[", "]") } else { ("{ ", " }") };
                write!(f, "{}", open)?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    std::fmt::Display::fmt(element, f)?;
                }
                write!(f, "{}", close)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_masked() {
        let v = IntValue::new(IType::I8, 0x1ff);
        assert_eq!(v.bits(), 0xff);
        assert_eq!(v.as_signed(), -1);
        assert_eq!(IntValue::new(IType::I64, u64::MAX).as_signed(), -1);
    }

    #[test]
    fn bit_source_fills_leaves_in_order() {
        let ty = TypeDescriptor::array(TypeDescriptor::I8, 3);
        let mut counter = 0u64;
        let value = Value::from_bit_source(&ty, &mut |_| {
            counter += 1;
            counter
        })
        .unwrap();
        assert_eq!(value.to_string(), "[1, 2, 3]");
        assert!(Value::from_bit_source(&TypeDescriptor::Ptr, &mut |_| 0).is_none());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::bool(true).to_string(), "true");
        assert_eq!(format!("{:#}", Value::int(IType::I16, 0xab)), "0x00ab");
    }
}
