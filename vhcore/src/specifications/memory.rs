use bitflags::bitflags;
use strum::Display;
use uuid::Uuid;
use vhir::{
    term::{SymbolicValue, Term, TypeError},
    types::TypeDescriptor,
};

bitflags! {
    /// Access properties of an allocated region.
    #[derive(Default, Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct RegionFlags: u8 {
        /// The region may be read by the target function.
        const READ = 1 << 0;

        /// The region may be written by the target function, and its content
        /// may be rebound by the specification after the initial binding.
        const WRITE = 1 << 1;

        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl RegionFlags {
    pub fn from_readonly(readonly: bool) -> Self {
        if readonly {
            RegionFlags::READ
        } else {
            RegionFlags::READ_WRITE
        }
    }

    pub fn is_readonly(&self) -> bool {
        !self.contains(RegionFlags::WRITE)
    }
}

/// Identifier of an allocation, unique within one specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AllocId(pub u32);

impl std::fmt::Display for AllocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// The two halves of a specification: before and after the target executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Pre,
    Post,
}

/// Reference to an allocated region of a given type.
///
/// Handles are scoped to the specification that allocated them; using one in
/// another specification is rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemoryHandle {
    scope: Uuid,
    id: AllocId,
    ty: TypeDescriptor,
    flags: RegionFlags,
    phase: Phase,
}

impl PartialOrd for RegionFlags {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegionFlags {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.bits().cmp(&other.bits())
    }
}

impl MemoryHandle {
    pub(crate) fn new(
        scope: Uuid,
        id: AllocId,
        ty: TypeDescriptor,
        flags: RegionFlags,
        phase: Phase,
    ) -> Self {
        Self {
            scope,
            id,
            ty,
            flags,
            phase,
        }
    }

    pub fn id(&self) -> AllocId {
        self.id
    }

    /// Uuid of the specification owning the region.
    pub fn scope(&self) -> Uuid {
        self.scope
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn flags(&self) -> RegionFlags {
        self.flags
    }

    pub fn is_readonly(&self) -> bool {
        self.flags.is_readonly()
    }

    /// State in which the region was allocated.
    pub fn phase(&self) -> Phase {
        self.phase
    }
}

impl std::fmt::Display for MemoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let access = if self.is_readonly() { "ro" } else { "rw" };
        write!(f, "{}: {} {}", self.id, access, self.ty)
    }
}

/// A value that can be stored in memory, passed as an argument or returned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SetupValue {
    Term(Term),
    Pointer(MemoryHandle),
    Null,
}

impl SetupValue {
    pub fn type_of(&self) -> Result<TypeDescriptor, TypeError> {
        match self {
            SetupValue::Term(term) => term.type_of(),
            SetupValue::Pointer(_) | SetupValue::Null => Ok(TypeDescriptor::Ptr),
        }
    }

    pub fn as_term(&self) -> Option<&Term> {
        match self {
            SetupValue::Term(term) => Some(term),
            _ => None,
        }
    }
}

impl From<Term> for SetupValue {
    fn from(term: Term) -> Self {
        SetupValue::Term(term)
    }
}

impl From<&SymbolicValue> for SetupValue {
    fn from(symbol: &SymbolicValue) -> Self {
        SetupValue::Term(symbol.term())
    }
}

impl From<SymbolicValue> for SetupValue {
    fn from(symbol: SymbolicValue) -> Self {
        SetupValue::Term(Term::Var(symbol))
    }
}

impl From<&MemoryHandle> for SetupValue {
    fn from(handle: &MemoryHandle) -> Self {
        SetupValue::Pointer(handle.clone())
    }
}

impl From<MemoryHandle> for SetupValue {
    fn from(handle: MemoryHandle) -> Self {
        SetupValue::Pointer(handle)
    }
}

impl std::fmt::Display for SetupValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupValue::Term(term) => write!(f, "{}", term),
            SetupValue::Pointer(handle) => write!(f, "{}", handle.id()),
            SetupValue::Null => write!(f, "null"),
        }
    }
}

/// Assertion that the region behind `handle` holds `value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointsTo {
    pub handle: MemoryHandle,
    pub value: SetupValue,
}

impl std::fmt::Display for PointsTo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} |-> {}", self.handle.id(), self.value)
    }
}
