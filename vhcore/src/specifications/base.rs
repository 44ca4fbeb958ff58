//! Pre/post-state model of a function specification.
//!
//! A [`FunctionSpecification`] describes one target function as two memory
//! states separated by the call: the state the caller sets up before the call
//! (fresh inputs, allocations, points-to bindings, preconditions, arguments)
//! and the state asserted after it (fresh outputs, new allocations, points-to
//! bindings, postconditions, return value).
//!
//! Specifications are only built through [`crate::specifications::builder::SpecBuilder`],
//! which guarantees that every symbol and handle they mention is declared in
//! the right state and that every binding is well-typed.
use std::collections::BTreeMap;

use uuid::Uuid;
use vhir::term::{SymbolId, SymbolicValue, Term};

use crate::specifications::memory::{AllocId, MemoryHandle, Phase, PointsTo, SetupValue};

/// One half of a specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupState {
    pub(crate) phase: Phase,
    pub(crate) fresh: Vec<SymbolicValue>,
    pub(crate) allocations: Vec<MemoryHandle>,
    /// Final binding of every region, in order of first binding.
    pub(crate) points_to: Vec<PointsTo>,
    pub(crate) conditions: Vec<Term>,
}

impl SetupState {
    pub(crate) fn new(phase: Phase) -> Self {
        Self {
            phase,
            fresh: Vec::new(),
            allocations: Vec::new(),
            points_to: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Symbolic values introduced in this state.
    pub fn fresh(&self) -> &[SymbolicValue] {
        &self.fresh
    }

    /// Regions allocated in this state.
    pub fn allocations(&self) -> &[MemoryHandle] {
        &self.allocations
    }

    pub fn points_to(&self) -> &[PointsTo] {
        &self.points_to
    }

    /// Preconditions (pre state) or postconditions (post state).
    pub fn conditions(&self) -> &[Term] {
        &self.conditions
    }

    /// The value bound to `handle` in this state, if any.
    pub fn binding(&self, handle: AllocId) -> Option<&SetupValue> {
        self.points_to
            .iter()
            .find(|binding| binding.handle.id() == handle)
            .map(|binding| &binding.value)
    }

    pub fn declares_symbol(&self, id: SymbolId) -> bool {
        self.fresh.iter().any(|symbol| symbol.id() == id)
    }

    pub fn declares_handle(&self, id: AllocId) -> bool {
        self.allocations.iter().any(|handle| handle.id() == id)
    }
}

/// The complete contract of one target function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpecification {
    pub(crate) uuid: Uuid,
    pub(crate) pre: SetupState,
    pub(crate) args: Vec<SetupValue>,
    pub(crate) post: SetupState,
    pub(crate) returns: Option<SetupValue>,
}

impl FunctionSpecification {
    /// Identity of this specification. Two clones share it, two independently
    /// built specifications never do.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn pre(&self) -> &SetupState {
        &self.pre
    }

    pub fn post(&self) -> &SetupState {
        &self.post
    }

    pub fn state(&self, phase: Phase) -> &SetupState {
        match phase {
            Phase::Pre => &self.pre,
            Phase::Post => &self.post,
        }
    }

    /// Arguments passed to the target, in order.
    pub fn args(&self) -> &[SetupValue] {
        &self.args
    }

    /// Expected return value, `None` for functions returning nothing.
    pub fn returns(&self) -> Option<&SetupValue> {
        self.returns.as_ref()
    }

    /// All fresh values of both states, keyed by id.
    pub fn symbols(&self) -> BTreeMap<SymbolId, &SymbolicValue> {
        self.pre
            .fresh
            .iter()
            .chain(self.post.fresh.iter())
            .map(|symbol| (symbol.id(), symbol))
            .collect()
    }
}

impl std::fmt::Display for FunctionSpecification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for state in [&self.pre, &self.post] {
            writeln!(f, "{}:", state.phase)?;
            for symbol in &state.fresh {
                writeln!(f, "  fresh {}: {}", symbol.name(), symbol.ty())?;
            }
            for handle in &state.allocations {
                writeln!(f, "  alloc {}", handle)?;
            }
            for binding in &state.points_to {
                writeln!(f, "  {}", binding)?;
            }
            for condition in &state.conditions {
                writeln!(f, "  assert {}", condition)?;
            }
            if state.phase == Phase::Pre {
                let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
                writeln!(f, "execute({})", args.join(", "))?;
            }
        }
        if let Some(returns) = &self.returns {
            writeln!(f, "returns {}", returns)?;
        }
        Ok(())
    }
}
