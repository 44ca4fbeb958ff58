//! Concrete machine the reference models run on.
//!
//! Memory is a list of typed regions, each holding one whole value of its
//! type. Pointers designate regions, there is no address arithmetic.
use thiserror::Error;
use vhir::{
    types::{IType, TypeDescriptor},
    value::{IntValue, Value},
};

use crate::{
    dispatch::SpecHandle,
    magic::MAX_CALL_DEPTH,
    reference::{ReferenceModule, matching::apply_override},
    specifications::memory::RegionFlags,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(pub u32);

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A value manipulated by a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuntimeValue {
    Data(Value),
    Ptr(RegionId),
    Null,
}

impl RuntimeValue {
    pub fn int(ty: IType, bits: u64) -> Self {
        Self::Data(Value::int(ty, bits))
    }

    pub fn bool(value: bool) -> Self {
        Self::Data(Value::bool(value))
    }

    pub fn type_of(&self) -> TypeDescriptor {
        match self {
            Self::Data(value) => value.type_of(),
            Self::Ptr(_) | Self::Null => TypeDescriptor::Ptr,
        }
    }

    pub fn as_int(&self) -> Option<IntValue> {
        match self {
            Self::Data(value) => value.as_int(),
            _ => None,
        }
    }

    /// The integer carried by an argument, or a fault naming what was found.
    pub fn expect_int(&self) -> Result<IntValue, Fault> {
        self.as_int()
            .ok_or_else(|| Fault::Model(format!("expected an integer, found {}", self)))
    }
}

impl From<Value> for RuntimeValue {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

impl From<IntValue> for RuntimeValue {
    fn from(value: IntValue) -> Self {
        Self::Data(value.into())
    }
}

impl std::fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data(value) => write!(f, "{}", value),
            Self::Ptr(region) => write!(f, "&{}", region),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Abnormal termination of a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("null pointer dereference")]
    NullDereference,

    #[error("dereference of a non-pointer value {0}")]
    NotAPointer(String),

    #[error("region {0} does not exist")]
    DanglingPointer(RegionId),

    #[error("read of uninitialized region {0}")]
    UninitializedRead(RegionId),

    #[error("write to read-only region {0}")]
    ReadonlyWrite(RegionId),

    #[error("store of a {found} value into region {region} of type {expected}")]
    StoreType {
        region: RegionId,
        expected: TypeDescriptor,
        found: TypeDescriptor,
    },

    #[error("call to unknown function `{0}`")]
    UnknownCallee(String),

    #[error("call depth limit reached while calling `{0}`")]
    RecursionLimit(String),

    #[error("call to `{callee}` does not satisfy its override: {reason}")]
    OverrideViolation { callee: String, reason: String },

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    Model(String),
}

#[derive(Debug, Clone)]
struct Region {
    ty: TypeDescriptor,
    flags: RegionFlags,
    content: Option<RuntimeValue>,
}

#[derive(Debug, Clone, Default)]
pub struct Memory {
    regions: Vec<Region>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, ty: TypeDescriptor, flags: RegionFlags) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(Region {
            ty,
            flags,
            content: None,
        });
        id
    }

    fn region(&self, id: RegionId) -> Result<&Region, Fault> {
        self.regions
            .get(id.0 as usize)
            .ok_or(Fault::DanglingPointer(id))
    }

    fn region_mut(&mut self, id: RegionId) -> Result<&mut Region, Fault> {
        self.regions
            .get_mut(id.0 as usize)
            .ok_or(Fault::DanglingPointer(id))
    }

    pub fn ty(&self, id: RegionId) -> Option<&TypeDescriptor> {
        self.regions.get(id.0 as usize).map(|region| &region.ty)
    }

    pub fn content(&self, id: RegionId) -> Option<&RuntimeValue> {
        self.regions
            .get(id.0 as usize)
            .and_then(|region| region.content.as_ref())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn target(ptr: &RuntimeValue) -> Result<RegionId, Fault> {
        match ptr {
            RuntimeValue::Ptr(id) => Ok(*id),
            RuntimeValue::Null => Err(Fault::NullDereference),
            RuntimeValue::Data(value) => Err(Fault::NotAPointer(value.to_string())),
        }
    }

    pub fn load(&self, ptr: &RuntimeValue) -> Result<RuntimeValue, Fault> {
        let id = Self::target(ptr)?;
        self.region(id)?
            .content
            .clone()
            .ok_or(Fault::UninitializedRead(id))
    }

    /// Store performed by a model: read-only regions are rejected.
    pub fn store(&mut self, ptr: &RuntimeValue, value: RuntimeValue) -> Result<(), Fault> {
        let id = Self::target(ptr)?;
        if self.region(id)?.flags.is_readonly() {
            return Err(Fault::ReadonlyWrite(id));
        }
        self.initialize(id, value)
    }

    /// Store performed on behalf of a specification, regardless of access
    /// flags.
    pub(crate) fn initialize(&mut self, id: RegionId, value: RuntimeValue) -> Result<(), Fault> {
        let region = self.region_mut(id)?;
        let found = value.type_of();
        if found != region.ty {
            return Err(Fault::StoreType {
                region: id,
                expected: region.ty.clone(),
                found,
            });
        }
        region.content = Some(value);
        Ok(())
    }
}

/// What a model sees of the machine while it runs.
pub struct CallContext<'a> {
    module: &'a ReferenceModule,
    overrides: &'a [SpecHandle],
    memory: &'a mut Memory,
    depth: usize,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        module: &'a ReferenceModule,
        overrides: &'a [SpecHandle],
        memory: &'a mut Memory,
    ) -> Self {
        Self {
            module,
            overrides,
            memory,
            depth: 0,
        }
    }

    pub fn memory(&self) -> &Memory {
        &*self.memory
    }

    pub fn load(&self, ptr: &RuntimeValue) -> Result<RuntimeValue, Fault> {
        self.memory.load(ptr)
    }

    pub fn load_int(&self, ptr: &RuntimeValue) -> Result<IntValue, Fault> {
        self.load(ptr)?.expect_int()
    }

    pub fn store(
        &mut self,
        ptr: &RuntimeValue,
        value: impl Into<RuntimeValue>,
    ) -> Result<(), Fault> {
        self.memory.store(ptr, value.into())
    }

    /// Allocates a fresh writable region on behalf of the model.
    pub fn allocate(&mut self, ty: TypeDescriptor) -> RuntimeValue {
        RuntimeValue::Ptr(self.memory.allocate(ty, RegionFlags::READ_WRITE))
    }

    /// Calls another function. Functions with an override are replaced by
    /// their specification.
    pub fn call(
        &mut self,
        name: &str,
        args: &[RuntimeValue],
    ) -> Result<Option<RuntimeValue>, Fault> {
        let overrides = self.overrides;
        if let Some(over) = overrides.iter().rev().find(|over| over.target() == name) {
            return apply_override(self.memory, name, over.specification(), args);
        }
        self.run_model(name, args)
    }

    /// Runs the model of `name`, ignoring overrides.
    pub(crate) fn run_model(
        &mut self,
        name: &str,
        args: &[RuntimeValue],
    ) -> Result<Option<RuntimeValue>, Fault> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Fault::RecursionLimit(name.to_string()));
        }
        let module = self.module;
        let model = module
            .get(name)
            .ok_or_else(|| Fault::UnknownCallee(name.to_string()))?;
        let mut inner = CallContext {
            module,
            overrides: self.overrides,
            memory: &mut *self.memory,
            depth: self.depth + 1,
        };
        model(&mut inner, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readonly_regions_reject_model_stores() {
        let mut memory = Memory::new();
        let id = memory.allocate(TypeDescriptor::I8, RegionFlags::READ);
        memory
            .initialize(id, RuntimeValue::int(IType::I8, 4))
            .unwrap();

        let ptr = RuntimeValue::Ptr(id);
        assert_eq!(memory.load(&ptr), Ok(RuntimeValue::int(IType::I8, 4)));
        assert_eq!(
            memory.store(&ptr, RuntimeValue::int(IType::I8, 5)),
            Err(Fault::ReadonlyWrite(id))
        );
    }

    #[test]
    fn loads_fault_on_bad_pointers() {
        let mut memory = Memory::new();
        let id = memory.allocate(TypeDescriptor::I32, RegionFlags::READ_WRITE);
        assert_eq!(
            memory.load(&RuntimeValue::Ptr(id)),
            Err(Fault::UninitializedRead(id))
        );
        assert_eq!(memory.load(&RuntimeValue::Null), Err(Fault::NullDereference));
        assert_eq!(
            memory.load(&RuntimeValue::Ptr(RegionId(9))),
            Err(Fault::DanglingPointer(RegionId(9)))
        );
    }

    #[test]
    fn stores_are_typed() {
        let mut memory = Memory::new();
        let id = memory.allocate(TypeDescriptor::I32, RegionFlags::READ_WRITE);
        let err = memory
            .store(&RuntimeValue::Ptr(id), RuntimeValue::int(IType::I8, 1))
            .unwrap_err();
        assert!(matches!(err, Fault::StoreType { .. }));
    }

    #[test]
    fn calls_are_depth_limited() {
        let module =
            ReferenceModule::new().with_function("loop", |ctx, args| ctx.call("loop", args));
        let mut memory = Memory::new();
        let mut ctx = CallContext::new(&module, &[], &mut memory);
        assert_eq!(
            ctx.run_model("loop", &[]),
            Err(Fault::RecursionLimit("loop".into()))
        );
        assert_eq!(
            ctx.call("missing", &[]),
            Err(Fault::UnknownCallee("missing".into()))
        );
    }
}
