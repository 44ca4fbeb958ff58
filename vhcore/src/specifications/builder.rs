//! Symbolic memory builder.
//!
//! [`SetupScope`] is the set of primitives a verification engine exposes to
//! describe memory (allocate a region, bind its content, introduce a fresh
//! value). [`MemoryBuilder`] layers the composite operations every
//! specification is written with on top of any scope, and [`SpecBuilder`] is
//! the scope producing a [`FunctionSpecification`].
//!
//! ```
//! use vhcore::prelude::*;
//! use vhir::prelude::*;
//!
//! let mut spec = SpecBuilder::new();
//! let (x, p) = spec.fresh_pointer("x", TypeDescriptor::I32, true).unwrap();
//! spec.execute([SetupValue::from(p)]).unwrap();
//! spec.returns(x.term()).unwrap();
//! let spec = spec.finish().unwrap();
//! assert_eq!(spec.pre().fresh().len(), 1);
//! ```
use log::trace;
use uuid::Uuid;
use vhir::{
    term::{SymbolId, SymbolicValue, Term},
    types::TypeDescriptor,
};

use crate::{
    specifications::{
        base::{FunctionSpecification, SetupState},
        memory::{AllocId, MemoryHandle, Phase, PointsTo, RegionFlags, SetupValue},
    },
    utils::error::SpecificationError,
};

pub type SetupResult<T> = Result<T, SpecificationError>;

/// Memory-setup primitives of a specification under construction.
pub trait SetupScope {
    /// Allocates a region of `ty` in the current state.
    fn allocate(&mut self, ty: TypeDescriptor, readonly: bool) -> SetupResult<MemoryHandle>;

    /// Asserts that the region behind `handle` holds `value` in the current
    /// state.
    fn bind_points_to(&mut self, handle: &MemoryHandle, value: SetupValue) -> SetupResult<()>;

    /// Introduces an unconstrained value of `ty`. `name` is a debug label.
    fn fresh_symbolic(&mut self, name: &str, ty: TypeDescriptor) -> SetupResult<SymbolicValue>;

    /// Type of `value` in the current state. Fails if it mentions a symbol or
    /// handle the state cannot see.
    fn value_type(&self, value: &SetupValue) -> SetupResult<TypeDescriptor>;
}

/// Composite memory operations, available on every [`SetupScope`].
pub trait MemoryBuilder: SetupScope {
    /// Allocates a region and binds its initial content.
    fn allocate_and_bind(
        &mut self,
        ty: TypeDescriptor,
        value: impl Into<SetupValue>,
        readonly: bool,
    ) -> SetupResult<MemoryHandle> {
        // Nothing is allocated unless the value fits.
        let value = value.into();
        let found = self.value_type(&value)?;
        if found != ty {
            return Err(SpecificationError::TypeMismatch {
                context: "initial binding".to_string(),
                expected: ty,
                found,
            });
        }
        let handle = self.allocate(ty, readonly)?;
        self.bind_points_to(&handle, value)?;
        Ok(handle)
    }

    /// Introduces a fresh value and a region holding it.
    fn fresh_pointer(
        &mut self,
        name: &str,
        ty: TypeDescriptor,
        readonly: bool,
    ) -> SetupResult<(SymbolicValue, MemoryHandle)> {
        let value = self.fresh_symbolic(name, ty.clone())?;
        let handle = self.allocate_and_bind(ty, &value, readonly)?;
        Ok((value, handle))
    }

    /// Introduces a fresh value and installs it as the new content of an
    /// already allocated region.
    fn bind_fresh(
        &mut self,
        handle: &MemoryHandle,
        name: &str,
        ty: TypeDescriptor,
    ) -> SetupResult<SymbolicValue> {
        let value = self.fresh_symbolic(name, ty)?;
        self.bind_points_to(handle, SetupValue::from(&value))?;
        Ok(value)
    }
}

impl<S: SetupScope + ?Sized> MemoryBuilder for S {}

/// Builds a [`FunctionSpecification`] state by state.
///
/// The builder starts in the pre state. [`SpecBuilder::execute`] records the
/// call and switches to the post state.
#[derive(Debug)]
pub struct SpecBuilder {
    uuid: Uuid,
    phase: Phase,
    next_symbol: u32,
    next_alloc: u32,
    pre: SetupState,
    args: Option<Vec<SetupValue>>,
    post: SetupState,
    returns: Option<SetupValue>,
}

impl Default for SpecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecBuilder {
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            phase: Phase::Pre,
            next_symbol: 0,
            next_alloc: 0,
            pre: SetupState::new(Phase::Pre),
            args: None,
            post: SetupState::new(Phase::Post),
            returns: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn current_mut(&mut self) -> &mut SetupState {
        match self.phase {
            Phase::Pre => &mut self.pre,
            Phase::Post => &mut self.post,
        }
    }

    fn lookup_handle(&self, handle: &MemoryHandle) -> SetupResult<&MemoryHandle> {
        let foreign = || SpecificationError::ForeignHandle {
            handle: handle.id(),
        };
        if handle.scope() != self.uuid {
            return Err(foreign());
        }
        self.pre
            .allocations
            .iter()
            .chain(self.post.allocations.iter())
            .find(|known| *known == handle)
            .ok_or_else(foreign)
    }

    /// Checks that every symbol of `term` is visible in the current state and
    /// returns the term's type.
    fn check_term(&self, term: &Term) -> SetupResult<TypeDescriptor> {
        let mut unbound = None;
        term.for_each_symbol(&mut |symbol| {
            if unbound.is_some() {
                return;
            }
            let visible = self.pre.fresh.contains(symbol)
                || (self.phase == Phase::Post && self.post.fresh.contains(symbol));
            if !visible {
                unbound = Some(SpecificationError::UnboundSymbol {
                    name: symbol.name().to_string(),
                    id: symbol.id(),
                    phase: self.phase,
                });
            }
        });
        if let Some(err) = unbound {
            return Err(err);
        }
        Ok(term.type_of()?)
    }

    fn check_value(&self, value: &SetupValue) -> SetupResult<TypeDescriptor> {
        match value {
            SetupValue::Term(term) => self.check_term(term),
            SetupValue::Pointer(handle) => {
                self.lookup_handle(handle)?;
                Ok(TypeDescriptor::Ptr)
            }
            SetupValue::Null => Ok(TypeDescriptor::Ptr),
        }
    }

    fn check_condition(&self, context: &str, term: &Term) -> SetupResult<()> {
        let ty = self.check_term(term)?;
        if !ty.is_bool() {
            return Err(SpecificationError::TypeMismatch {
                context: context.to_string(),
                expected: TypeDescriptor::BOOL,
                found: ty,
            });
        }
        Ok(())
    }

    /// Constrains the pre state.
    pub fn precondition(&mut self, condition: impl Into<Term>) -> SetupResult<()> {
        if self.phase != Phase::Pre {
            return Err(SpecificationError::WrongPhase {
                operation: "precondition",
                phase: self.phase,
            });
        }
        let condition = condition.into();
        self.check_condition("precondition", &condition)?;
        self.pre.conditions.push(condition);
        Ok(())
    }

    /// Records the call of the target with `args` and switches to the post
    /// state.
    pub fn execute(&mut self, args: impl IntoIterator<Item = SetupValue>) -> SetupResult<()> {
        if self.phase != Phase::Pre {
            return Err(SpecificationError::WrongPhase {
                operation: "execute",
                phase: self.phase,
            });
        }
        let args: Vec<SetupValue> = args.into_iter().collect();
        for arg in &args {
            self.check_value(arg)?;
        }
        trace!("Specification {} executes with {} argument(s)", self.uuid, args.len());
        self.args = Some(args);
        self.phase = Phase::Post;
        Ok(())
    }

    /// Sets the value the target must return.
    pub fn returns(&mut self, value: impl Into<SetupValue>) -> SetupResult<()> {
        if self.phase != Phase::Post {
            return Err(SpecificationError::WrongPhase {
                operation: "returns",
                phase: self.phase,
            });
        }
        if self.returns.is_some() {
            return Err(SpecificationError::DuplicateReturn);
        }
        let value = value.into();
        self.check_value(&value)?;
        self.returns = Some(value);
        Ok(())
    }

    /// Constrains the post state.
    pub fn postcondition(&mut self, condition: impl Into<Term>) -> SetupResult<()> {
        if self.phase != Phase::Post {
            return Err(SpecificationError::WrongPhase {
                operation: "postcondition",
                phase: self.phase,
            });
        }
        let condition = condition.into();
        self.check_condition("postcondition", &condition)?;
        self.post.conditions.push(condition);
        Ok(())
    }

    pub fn finish(self) -> SetupResult<FunctionSpecification> {
        let Some(args) = self.args else {
            return Err(SpecificationError::MissingExecute);
        };
        Ok(FunctionSpecification {
            uuid: self.uuid,
            pre: self.pre,
            args,
            post: self.post,
            returns: self.returns,
        })
    }
}

impl SetupScope for SpecBuilder {
    fn allocate(&mut self, ty: TypeDescriptor, readonly: bool) -> SetupResult<MemoryHandle> {
        let id = AllocId(self.next_alloc);
        self.next_alloc += 1;
        let handle = MemoryHandle::new(
            self.uuid,
            id,
            ty,
            RegionFlags::from_readonly(readonly),
            self.phase,
        );
        self.current_mut().allocations.push(handle.clone());
        Ok(handle)
    }

    fn bind_points_to(&mut self, handle: &MemoryHandle, value: SetupValue) -> SetupResult<()> {
        let handle = self.lookup_handle(handle)?.clone();
        let found = self.check_value(&value)?;
        if &found != handle.ty() {
            return Err(SpecificationError::TypeMismatch {
                context: format!("points-to binding of {}", handle.id()),
                expected: handle.ty().clone(),
                found,
            });
        }

        let phase = self.phase;
        let state = self.current_mut();
        let existing = state
            .points_to
            .iter()
            .position(|binding| binding.handle.id() == handle.id());

        // A read-only region holds exactly one value, set in the state that
        // allocated it.
        if handle.is_readonly() && (existing.is_some() || handle.phase() != phase) {
            return Err(SpecificationError::ReadonlyMutation {
                handle: handle.id(),
            });
        }

        match existing {
            Some(index) => state.points_to[index].value = value,
            None => state.points_to.push(PointsTo { handle, value }),
        }
        Ok(())
    }

    fn fresh_symbolic(&mut self, name: &str, ty: TypeDescriptor) -> SetupResult<SymbolicValue> {
        if ty.contains_pointer() {
            return Err(SpecificationError::PointerSymbol {
                name: name.to_string(),
                ty,
            });
        }
        let symbol = SymbolicValue::new(SymbolId(self.next_symbol), name, ty);
        self.next_symbol += 1;
        self.current_mut().fresh.push(symbol.clone());
        Ok(symbol)
    }

    fn value_type(&self, value: &SetupValue) -> SetupResult<TypeDescriptor> {
        self.check_value(value)
    }
}

#[cfg(test)]
mod tests {
    use vhir::types::IType;

    use super::*;

    fn i32_const(bits: u64) -> Term {
        Term::int(IType::I32, bits)
    }

    #[test]
    fn readonly_region_rejects_rebinding() {
        let mut spec = SpecBuilder::new();
        let handle = spec
            .allocate_and_bind(TypeDescriptor::I32, i32_const(0), true)
            .unwrap();
        let err = spec.bind_points_to(&handle, i32_const(1).into()).unwrap_err();
        assert_eq!(
            err,
            SpecificationError::ReadonlyMutation {
                handle: handle.id()
            }
        );
    }

    #[test]
    fn writable_region_keeps_last_binding() {
        let mut spec = SpecBuilder::new();
        let handle = spec
            .allocate_and_bind(TypeDescriptor::I32, i32_const(0), false)
            .unwrap();
        spec.bind_points_to(&handle, i32_const(1).into()).unwrap();
        spec.execute([SetupValue::from(&handle)]).unwrap();
        let spec = spec.finish().unwrap();

        assert_eq!(spec.pre().points_to().len(), 1);
        assert_eq!(
            spec.pre().binding(handle.id()),
            Some(&SetupValue::Term(i32_const(1)))
        );
    }

    #[test]
    fn readonly_region_cannot_be_bound_after_call() {
        let mut spec = SpecBuilder::new();
        let (_, p) = spec.fresh_pointer("x", TypeDescriptor::I8, true).unwrap();
        spec.execute([SetupValue::from(&p)]).unwrap();
        let err = spec.bind_fresh(&p, "y", TypeDescriptor::I8).unwrap_err();
        assert!(matches!(err, SpecificationError::ReadonlyMutation { .. }));
    }

    #[test]
    fn output_parameter_is_bound_in_post_state() {
        let mut spec = SpecBuilder::new();
        let out = spec.allocate(TypeDescriptor::I16, false).unwrap();
        spec.execute([SetupValue::from(&out)]).unwrap();
        let result = spec.bind_fresh(&out, "result", TypeDescriptor::I16).unwrap();
        spec.postcondition(result.term().ult(Term::int(IType::I16, 10)))
            .unwrap();
        let spec = spec.finish().unwrap();

        assert!(spec.pre().binding(out.id()).is_none());
        assert_eq!(spec.post().fresh(), &[result.clone()]);
        assert_eq!(spec.post().binding(out.id()), Some(&SetupValue::from(&result)));
    }

    #[test]
    fn binding_type_must_match_region() {
        let mut spec = SpecBuilder::new();
        let err = spec
            .allocate_and_bind(TypeDescriptor::I32, Term::int(IType::I8, 1), false)
            .unwrap_err();
        assert!(matches!(
            err,
            SpecificationError::TypeMismatch { expected, found, .. }
                if expected == TypeDescriptor::I32 && found == TypeDescriptor::I8
        ));

        // The rejected binding left no region behind.
        let handle = spec
            .allocate_and_bind(TypeDescriptor::I8, Term::int(IType::I8, 1), false)
            .unwrap();
        assert_eq!(handle.id(), AllocId(0));
        spec.execute([SetupValue::from(&handle)]).unwrap();
        let spec = spec.finish().unwrap();
        assert_eq!(spec.pre().allocations().len(), 1);
        assert_eq!(spec.pre().points_to().len(), 1);
    }

    #[test]
    fn handles_are_scoped_to_their_builder() {
        let mut first = SpecBuilder::new();
        let mut second = SpecBuilder::new();
        let handle = first.allocate(TypeDescriptor::I8, false).unwrap();
        let _ = second.allocate(TypeDescriptor::I8, false).unwrap();
        let err = second
            .bind_points_to(&handle, Term::int(IType::I8, 3).into())
            .unwrap_err();
        assert_eq!(err, SpecificationError::ForeignHandle { handle: AllocId(0) });
    }

    #[test]
    fn symbols_must_be_declared() {
        let mut first = SpecBuilder::new();
        let x = first.fresh_symbolic("x", TypeDescriptor::I8).unwrap();

        let mut second = SpecBuilder::new();
        second.fresh_symbolic("y", TypeDescriptor::I8).unwrap();
        let err = second
            .precondition(x.term().equals(Term::int(IType::I8, 0)))
            .unwrap_err();
        assert!(matches!(
            err,
            SpecificationError::UnboundSymbol { ref name, phase: Phase::Pre, .. } if name == "x"
        ));
    }

    #[test]
    fn conditions_must_be_boolean() {
        let mut spec = SpecBuilder::new();
        let x = spec.fresh_symbolic("x", TypeDescriptor::I8).unwrap();
        let err = spec.precondition(x.term()).unwrap_err();
        assert!(matches!(err, SpecificationError::TypeMismatch { .. }));
    }

    #[test]
    fn phases_are_enforced() {
        let mut spec = SpecBuilder::new();
        assert_eq!(
            spec.returns(Term::bool(true)).unwrap_err(),
            SpecificationError::WrongPhase {
                operation: "returns",
                phase: Phase::Pre
            }
        );
        spec.execute([]).unwrap();
        assert!(matches!(
            spec.execute([]),
            Err(SpecificationError::WrongPhase { operation: "execute", .. })
        ));
        assert!(matches!(
            spec.precondition(Term::bool(true)),
            Err(SpecificationError::WrongPhase { operation: "precondition", .. })
        ));
        spec.returns(Term::bool(true)).unwrap();
        assert_eq!(
            spec.returns(Term::bool(false)).unwrap_err(),
            SpecificationError::DuplicateReturn
        );

        let unfinished = SpecBuilder::new();
        assert_eq!(
            unfinished.finish().unwrap_err(),
            SpecificationError::MissingExecute
        );
    }

    #[test]
    fn pointers_come_from_allocations_only() {
        let mut spec = SpecBuilder::new();
        let err = spec.fresh_symbolic("p", TypeDescriptor::Ptr).unwrap_err();
        assert!(matches!(err, SpecificationError::PointerSymbol { .. }));

        let target = spec.allocate(TypeDescriptor::I8, false).unwrap();
        let slot = spec
            .allocate_and_bind(TypeDescriptor::Ptr, &target, false)
            .unwrap();
        spec.bind_points_to(&slot, SetupValue::Null).unwrap();
    }
}
