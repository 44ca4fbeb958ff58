//! Types module
//!
//! Type descriptors are the only notion of "type" the harness needs: fixed
//! width integers, opaque pointers, and fixed-size aggregates built from them.
//! They are plain values (no registry, no interning) so they can be cloned into
//! every symbolic value and memory handle that mentions them.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

pub mod primary;

pub use primary::IType;

/// Layout of a value stored in memory or manipulated by a term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TypeDescriptor {
    /// Fixed-width integer (booleans are `i1`).
    Int(IType),

    /// Opaque pointer to another memory region.
    Ptr,

    /// Fixed-size homogeneous array.
    Array { elem: Box<TypeDescriptor>, len: u32 },

    /// Packed sequence of heterogeneous fields.
    Struct(Vec<TypeDescriptor>),
}

impl TypeDescriptor {
    pub const BOOL: Self = Self::Int(IType::I1);
    pub const I8: Self = Self::Int(IType::I8);
    pub const I16: Self = Self::Int(IType::I16);
    pub const I32: Self = Self::Int(IType::I32);
    pub const I64: Self = Self::Int(IType::I64);

    /// Integer type of the given width, `None` if the width is unsupported.
    pub fn int(num_bits: u32) -> Option<Self> {
        IType::new(num_bits).map(Self::Int)
    }

    pub fn array(elem: TypeDescriptor, len: u32) -> Self {
        Self::Array {
            elem: Box::new(elem),
            len,
        }
    }

    pub fn structure(fields: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        Self::Struct(fields.into_iter().collect())
    }

    /// Returns the integer type if this descriptor is a scalar integer.
    pub fn as_itype(&self) -> Option<IType> {
        match self {
            Self::Int(ity) => Some(*ity),
            _ => None,
        }
    }

    /// Returns `true` if the descriptor is `i1`.
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Int(ity) if ity.is_bool())
    }

    /// Returns `true` if a pointer occurs anywhere inside this layout.
    pub fn contains_pointer(&self) -> bool {
        match self {
            Self::Int(_) => false,
            Self::Ptr => true,
            Self::Array { elem, len } => *len > 0 && elem.contains_pointer(),
            Self::Struct(fields) => fields.iter().any(Self::contains_pointer),
        }
    }

    /// Type of the element at `index` for aggregates.
    pub fn element(&self, index: u32) -> Option<&TypeDescriptor> {
        match self {
            Self::Array { elem, len } if index < *len => Some(elem),
            Self::Struct(fields) => fields.get(index as usize),
            _ => None,
        }
    }

    /// Number of elements of an aggregate, `None` for scalars.
    pub fn arity(&self) -> Option<u32> {
        match self {
            Self::Array { len, .. } => Some(*len),
            Self::Struct(fields) => Some(fields.len() as u32),
            _ => None,
        }
    }

    /// Total number of integer bits in the layout, `None` if it holds a pointer.
    /// Saturates at `u64::MAX`.
    ///
    /// This is the size of the input space a value of this type spans.
    pub fn scalar_bits(&self) -> Option<u64> {
        match self {
            Self::Int(ity) => Some(ity.num_bits() as u64),
            Self::Ptr => None,
            Self::Array { elem, len } => elem
                .scalar_bits()
                .map(|bits| bits.saturating_mul(*len as u64)),
            Self::Struct(fields) => fields
                .iter()
                .map(Self::scalar_bits)
                .try_fold(0u64, |acc, bits| bits.map(|bits| acc.saturating_add(bits))),
        }
    }
}

impl From<IType> for TypeDescriptor {
    fn from(ity: IType) -> Self {
        Self::Int(ity)
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(ity) => write!(f, "{}", ity),
            Self::Ptr => write!(f, "ptr"),
            Self::Array { elem, len } => write!(f, "[{} x {}]", len, elem),
            Self::Struct(fields) => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, " }}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_ir_syntax() {
        let ty = TypeDescriptor::structure([
            TypeDescriptor::I32,
            TypeDescriptor::array(TypeDescriptor::I8, 4),
            TypeDescriptor::Ptr,
        ]);
        assert_eq!(ty.to_string(), "{ i32, [4 x i8], ptr }");
    }

    #[test]
    fn scalar_bits_skip_pointers() {
        let pair = TypeDescriptor::array(TypeDescriptor::I8, 2);
        assert_eq!(pair.scalar_bits(), Some(16));
        assert_eq!(TypeDescriptor::Ptr.scalar_bits(), None);
        assert!(TypeDescriptor::structure([TypeDescriptor::Ptr]).contains_pointer());
    }

    #[test]
    fn scalar_bits_saturate() {
        let row = TypeDescriptor::array(TypeDescriptor::I64, u32::MAX);
        let grid = TypeDescriptor::array(row.clone(), u32::MAX);
        assert_eq!(grid.scalar_bits(), Some(u64::MAX));
        assert_eq!(
            TypeDescriptor::structure([grid, row]).scalar_bits(),
            Some(u64::MAX)
        );
    }

    #[test]
    fn element_lookup() {
        let ty = TypeDescriptor::array(TypeDescriptor::I16, 3);
        assert_eq!(ty.element(2), Some(&TypeDescriptor::I16));
        assert_eq!(ty.element(3), None);
        assert_eq!(TypeDescriptor::I8.arity(), None);
    }
}
