//! Matching specification states against concrete machine states.
//!
//! The same matcher checks the post state of a verified target and the pre
//! state of an override at a call site: symbols that are not yet known are
//! bound by the first value they are matched against, regions are bound by
//! the first pointer matched against their handle, and everything else must
//! evaluate to the observed value.
use std::collections::BTreeMap;

use rand::Rng;
use vhir::{
    term::{Assignment, SymbolicValue, Term},
    value::Value,
};

use crate::{
    magic::EXHAUSTIVE_BIT_LIMIT,
    reference::machine::{Fault, Memory, RegionId, RuntimeValue},
    specifications::{
        base::{FunctionSpecification, SetupState},
        memory::{AllocId, PointsTo, SetupValue},
    },
};

/// Why a state does not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MatchError {
    /// The observed state contradicts the specification.
    Mismatch(String),
    /// The specification does not determine a value the check needs.
    Unresolved(String),
}

pub(crate) type MatchResult<T> = Result<T, MatchError>;

fn mismatch<T>(reason: impl Into<String>) -> MatchResult<T> {
    Err(MatchError::Mismatch(reason.into()))
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Matcher {
    pub env: Assignment,
    pub regions: BTreeMap<AllocId, RegionId>,
}

/// One equality to establish between the specification and the machine.
pub(crate) enum Expectation<'s> {
    Value {
        what: String,
        expected: &'s SetupValue,
        actual: RuntimeValue,
    },
    PointsTo(&'s PointsTo),
}

impl Matcher {
    pub fn new(env: Assignment) -> Self {
        Self {
            env,
            regions: BTreeMap::new(),
        }
    }

    /// Returns `false` when the match depends on symbols not bound yet.
    fn match_term(&mut self, what: &str, term: &Term, actual: &Value) -> MatchResult<bool> {
        if let Term::Var(symbol) = term {
            if !self.env.contains_key(&symbol.id()) {
                if &actual.type_of() != symbol.ty() {
                    return mismatch(format!(
                        "{}: `{}` has type {} but {} was observed",
                        what,
                        symbol.name(),
                        symbol.ty(),
                        actual
                    ));
                }
                self.env.insert(symbol.id(), actual.clone());
                return Ok(true);
            }
        }

        if let (
            Term::Aggregate { elements, .. },
            Value::Aggregate {
                elements: values, ..
            },
        ) = (term, actual)
        {
            if elements.len() == values.len() {
                let mut resolved = true;
                for (element, value) in elements.iter().zip(values) {
                    resolved &= self.match_term(what, element, value)?;
                }
                return Ok(resolved);
            }
        }

        let bound = term
            .free_symbols()
            .iter()
            .all(|id| self.env.contains_key(id));
        if !bound {
            return Ok(false);
        }
        let expected = term
            .eval(&self.env)
            .map_err(|err| MatchError::Unresolved(format!("{}: {}", what, err)))?;
        if &expected != actual {
            return mismatch(format!(
                "{}: expected {} = {}, found {}",
                what, term, expected, actual
            ));
        }
        Ok(true)
    }

    fn match_value(
        &mut self,
        memory: &Memory,
        what: &str,
        expected: &SetupValue,
        actual: &RuntimeValue,
    ) -> MatchResult<bool> {
        match (expected, actual) {
            (SetupValue::Null, RuntimeValue::Null) => Ok(true),
            (SetupValue::Term(term), RuntimeValue::Data(value)) => {
                self.match_term(what, term, value)
            }
            (SetupValue::Pointer(handle), RuntimeValue::Ptr(region)) => {
                if let Some(known) = self.regions.get(&handle.id()) {
                    if known != region {
                        return mismatch(format!(
                            "{}: expected a pointer to {}, found {}",
                            what,
                            handle.id(),
                            actual
                        ));
                    }
                    return Ok(true);
                }
                if self.regions.values().any(|known| known == region) {
                    return mismatch(format!(
                        "{}: {} aliases a region already matched by another handle",
                        what, actual
                    ));
                }
                if memory.ty(*region) != Some(handle.ty()) {
                    return mismatch(format!(
                        "{}: {} does not point to a region of type {}",
                        what,
                        actual,
                        handle.ty()
                    ));
                }
                self.regions.insert(handle.id(), *region);
                Ok(true)
            }
            _ => mismatch(format!("{}: expected {}, found {}", what, expected, actual)),
        }
    }

    /// Establishes every expectation, in whatever order their dependencies
    /// allow.
    pub fn settle(
        &mut self,
        memory: &Memory,
        expectations: Vec<Expectation<'_>>,
    ) -> MatchResult<()> {
        let mut pending = expectations;
        while !pending.is_empty() {
            let before = pending.len();
            let known = self.env.len() + self.regions.len();
            let mut next = Vec::new();
            for expectation in pending {
                let resolved = match &expectation {
                    Expectation::Value {
                        what,
                        expected,
                        actual,
                    } => self.match_value(memory, what, expected, actual)?,
                    Expectation::PointsTo(binding) => {
                        match self.regions.get(&binding.handle.id()).copied() {
                            None => false,
                            Some(region) => {
                                let what = format!("content of {}", binding.handle.id());
                                let content = memory.content(region).cloned().ok_or_else(|| {
                                    MatchError::Mismatch(format!("{} is uninitialized", what))
                                })?;
                                self.match_value(memory, &what, &binding.value, &content)?
                            }
                        }
                    }
                };
                if !resolved {
                    next.push(expectation);
                }
            }
            if next.len() == before && self.env.len() + self.regions.len() == known {
                let what: Vec<String> = next.iter().map(Expectation::describe).collect();
                return Err(MatchError::Unresolved(format!(
                    "cannot determine {}",
                    what.join(", ")
                )));
            }
            pending = next;
        }
        Ok(())
    }

    /// Concrete value of a specification value once its symbols and regions
    /// are known.
    pub fn value_of(&self, value: &SetupValue) -> MatchResult<RuntimeValue> {
        match value {
            SetupValue::Term(term) => term
                .eval(&self.env)
                .map(RuntimeValue::Data)
                .map_err(|err| MatchError::Unresolved(err.to_string())),
            SetupValue::Pointer(handle) => self
                .regions
                .get(&handle.id())
                .map(|region| RuntimeValue::Ptr(*region))
                .ok_or_else(|| {
                    MatchError::Unresolved(format!("{} is not reachable", handle.id()))
                }),
            SetupValue::Null => Ok(RuntimeValue::Null),
        }
    }

    /// Index of the first condition that does not hold, if any.
    pub fn violated(&self, conditions: &[Term]) -> MatchResult<Option<usize>> {
        for (index, condition) in conditions.iter().enumerate() {
            let value = condition
                .eval(&self.env)
                .map_err(|err| MatchError::Unresolved(err.to_string()))?;
            if !value.is_true() {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Allocates the regions of `state` and writes its points-to bindings.
    pub fn materialize(&mut self, memory: &mut Memory, state: &SetupState) -> Result<(), Fault> {
        for handle in state.allocations() {
            let region = memory.allocate(handle.ty().clone(), handle.flags());
            self.regions.insert(handle.id(), region);
        }
        for binding in state.points_to() {
            let region = *self.regions.get(&binding.handle.id()).ok_or_else(|| {
                Fault::Unsupported(format!("{} is not reachable", binding.handle.id()))
            })?;
            let value = self
                .value_of(&binding.value)
                .map_err(MatchError::into_fault)?;
            memory.initialize(region, value)?;
        }
        Ok(())
    }
}

impl Expectation<'_> {
    fn describe(&self) -> String {
        match self {
            Expectation::Value { what, expected, .. } => format!("{} ({})", what, expected),
            Expectation::PointsTo(binding) => binding.to_string(),
        }
    }
}

impl MatchError {
    pub(crate) fn into_fault(self) -> Fault {
        match self {
            MatchError::Mismatch(reason) => Fault::Model(reason),
            MatchError::Unresolved(reason) => Fault::Unsupported(reason),
        }
    }
}

/// Total width of the symbolic inputs, saturating at `u64::MAX`.
pub(crate) fn input_bits(symbols: &[SymbolicValue]) -> u64 {
    symbols
        .iter()
        .filter_map(|symbol| symbol.ty().scalar_bits())
        .fold(0, u64::saturating_add)
}

/// The `index`-th assignment of `symbols`, extending `base`. Bits are taken
/// from `index` least significant first, in declaration order.
pub(crate) fn assignment_from_index(
    symbols: &[SymbolicValue],
    index: u64,
    base: &Assignment,
) -> Assignment {
    let mut cursor = index;
    let mut env = base.clone();
    for symbol in symbols {
        let value = Value::from_bit_source(symbol.ty(), &mut |ty| {
            let bits = cursor & ty.mask();
            cursor = cursor.checked_shr(ty.num_bits()).unwrap_or(0);
            bits
        });
        if let Some(value) = value {
            env.insert(symbol.id(), value);
        }
    }
    env
}

pub(crate) fn random_assignment(
    symbols: &[SymbolicValue],
    rng: &mut impl Rng,
    base: &Assignment,
) -> Assignment {
    let mut env = base.clone();
    for symbol in symbols {
        if let Some(value) = Value::from_bit_source(symbol.ty(), &mut |_| rng.random::<u64>()) {
            env.insert(symbol.id(), value);
        }
    }
    env
}

/// Renders the values of `symbols` in `env`, e.g. `x = 3, y = 250`.
pub(crate) fn describe_inputs(symbols: &[SymbolicValue], env: &Assignment) -> String {
    let parts: Vec<String> = symbols
        .iter()
        .filter_map(|symbol| {
            env.get(&symbol.id())
                .map(|value| format!("{} = {}", symbol.name(), value))
        })
        .collect();
    if parts.is_empty() {
        "no symbolic input".to_string()
    } else {
        parts.join(", ")
    }
}

/// Replaces a call to `callee` by its specification: the arguments and the
/// caller's memory must match the pre state, the post state is then written
/// back and the specified return value produced.
pub(crate) fn apply_override(
    memory: &mut Memory,
    callee: &str,
    spec: &FunctionSpecification,
    args: &[RuntimeValue],
) -> Result<Option<RuntimeValue>, Fault> {
    let violation = |reason: String| Fault::OverrideViolation {
        callee: callee.to_string(),
        reason,
    };
    let lift = |err: MatchError| match err {
        MatchError::Mismatch(reason) => violation(reason),
        MatchError::Unresolved(reason) => {
            Fault::Unsupported(format!("override of `{}`: {}", callee, reason))
        }
    };

    if spec.args().len() != args.len() {
        return Err(violation(format!(
            "expected {} argument(s), found {}",
            spec.args().len(),
            args.len()
        )));
    }

    let mut matcher = Matcher::default();
    let mut expectations: Vec<Expectation<'_>> = spec
        .args()
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (expected, actual))| Expectation::Value {
            what: format!("argument {}", index),
            expected,
            actual: actual.clone(),
        })
        .collect();
    expectations.extend(spec.pre().points_to().iter().map(Expectation::PointsTo));
    matcher.settle(memory, expectations).map_err(lift)?;

    if let Some(index) = matcher.violated(spec.pre().conditions()).map_err(lift)? {
        return Err(violation(format!(
            "precondition {} does not hold",
            spec.pre().conditions()[index]
        )));
    }

    choose_outputs(&mut matcher, spec).map_err(lift)?;
    matcher.materialize(memory, spec.post())?;

    spec.returns()
        .map(|value| matcher.value_of(value))
        .transpose()
        .map_err(lift)
}

/// Picks values for the post-state fresh symbols of an override: the first
/// assignment, in enumeration order, satisfying every postcondition.
fn choose_outputs(matcher: &mut Matcher, spec: &FunctionSpecification) -> MatchResult<()> {
    let outputs = spec.post().fresh();
    if outputs.is_empty() {
        return Ok(());
    }
    let bits = input_bits(outputs);
    if bits > EXHAUSTIVE_BIT_LIMIT {
        return Err(MatchError::Unresolved(format!(
            "{} bits of unconstrained output exceed the search limit of {}",
            bits, EXHAUSTIVE_BIT_LIMIT
        )));
    }
    let conditions = spec.post().conditions();
    for index in 0..(1u64 << bits) {
        let candidate = Matcher {
            env: assignment_from_index(outputs, index, &matcher.env),
            regions: matcher.regions.clone(),
        };
        if candidate.violated(conditions)?.is_none() {
            matcher.env = candidate.env;
            return Ok(());
        }
    }
    Err(MatchError::Mismatch(
        "no output satisfies the postconditions".to_string(),
    ))
}
