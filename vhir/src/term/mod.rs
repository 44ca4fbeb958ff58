//! Symbolic terms.
//!
//! A [`Term`] is a typed expression over [`SymbolicValue`]s and constants. Terms
//! are what specifications use for preconditions, postconditions and memory
//! contents. Every operation follows SMT-LIB bit-vector semantics so that a
//! term means the same thing to the reference engine and to a real solver
//! (division by zero yields all ones, remainder by zero yields the dividend,
//! over-wide shifts yield zero).
use std::{collections::BTreeMap, collections::BTreeSet, sync::Arc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIs, IntoStaticStr};
use thiserror::Error;

use crate::{
    types::{IType, TypeDescriptor},
    value::{IntValue, Value},
};

pub mod pretty;
pub mod simplify;

/// Identifier of a symbolic value, unique within one specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SymbolId(pub u32);

impl std::fmt::Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, freshly introduced unknown.
///
/// The name is a debug label only: two symbols may share a name, identity is
/// carried by [`SymbolicValue::id`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SymbolicValue {
    id: SymbolId,
    name: Arc<str>,
    ty: TypeDescriptor,
}

impl SymbolicValue {
    pub fn new(id: SymbolId, name: impl Into<Arc<str>>, ty: TypeDescriptor) -> Self {
        Self {
            id,
            name: name.into(),
            ty,
        }
    }

    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    /// The term referring to this value.
    pub fn term(&self) -> Term {
        Term::Var(self.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum UnaryOp {
    /// Bitwise complement (logical negation on `i1`).
    Not,
    /// Two's complement negation.
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
    URem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    Eq,
    Ne,
    Ult,
    Ule,
    Slt,
    Sle,
    Implies,
}

impl BinaryOp {
    /// Operators producing an `i1` from two operands of the same type.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Ult | Self::Ule | Self::Slt | Self::Sle
        )
    }

    /// Infix symbol used by the pretty-printer.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::UDiv => "/u",
            Self::URem => "%u",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::LShr => ">>",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ult => "<u",
            Self::Ule => "<=u",
            Self::Slt => "<s",
            Self::Sle => "<=s",
            Self::Implies => "==>",
        }
    }
}

/// Typed symbolic expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Term {
    Const(Value),
    Var(SymbolicValue),
    Unary {
        op: UnaryOp,
        arg: Box<Term>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Term>,
        rhs: Box<Term>,
    },
    Ite {
        cond: Box<Term>,
        then: Box<Term>,
        otherwise: Box<Term>,
    },
    Aggregate {
        ty: TypeDescriptor,
        elements: Vec<Term>,
    },
    Extract {
        aggregate: Box<Term>,
        index: u32,
    },
}

/// Typing error raised by [`Term::type_of`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("operands of `{op}` have different types: {lhs} and {rhs}")]
    Mismatch {
        op: &'static str,
        lhs: TypeDescriptor,
        rhs: TypeDescriptor,
    },

    #[error("`{op}` expects integer operands, found {found}")]
    NotInteger {
        op: &'static str,
        found: TypeDescriptor,
    },

    #[error("expected a boolean (i1), found {found}")]
    NotBoolean { found: TypeDescriptor },

    #[error("cannot extract element {index} from {ty}")]
    BadExtract { index: u32, ty: TypeDescriptor },

    #[error("aggregate of type {ty} given {found} elements")]
    Arity { ty: TypeDescriptor, found: usize },

    #[error("element {index} of aggregate {ty} has type {found}")]
    ElementType {
        ty: TypeDescriptor,
        index: usize,
        found: TypeDescriptor,
    },
}

/// Error raised by [`Term::eval`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("symbol `{name}` ({id}) has no value")]
    Unbound { id: SymbolId, name: String },

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Values assigned to symbols, keyed by id.
pub type Assignment = BTreeMap<SymbolId, Value>;

impl Term {
    /// Integer constant of type `ty`.
    pub fn int(ty: IType, bits: u64) -> Self {
        Self::Const(Value::int(ty, bits))
    }

    /// Boolean constant (`i1`).
    pub fn bool(value: bool) -> Self {
        Self::Const(Value::bool(value))
    }

    /// Array literal with element type `elem`.
    pub fn array(elem: TypeDescriptor, elements: Vec<Term>) -> Self {
        Self::Aggregate {
            ty: TypeDescriptor::array(elem, elements.len() as u32),
            elements,
        }
    }

    /// Structure literal, field types are taken from the elements.
    pub fn structure(elements: Vec<Term>) -> Result<Self, TypeError> {
        let fields = elements
            .iter()
            .map(Term::type_of)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Aggregate {
            ty: TypeDescriptor::Struct(fields),
            elements,
        })
    }

    pub fn unary(op: UnaryOp, arg: Term) -> Self {
        Self::Unary {
            op,
            arg: Box::new(arg),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Term, rhs: Term) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn ite(cond: Term, then: Term, otherwise: Term) -> Self {
        Self::Ite {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn extract(self, index: u32) -> Self {
        Self::Extract {
            aggregate: Box::new(self),
            index,
        }
    }

    pub fn equals(self, rhs: impl Into<Term>) -> Self {
        Self::binary(BinaryOp::Eq, self, rhs.into())
    }

    pub fn not_equals(self, rhs: impl Into<Term>) -> Self {
        Self::binary(BinaryOp::Ne, self, rhs.into())
    }

    pub fn ult(self, rhs: impl Into<Term>) -> Self {
        Self::binary(BinaryOp::Ult, self, rhs.into())
    }

    pub fn ule(self, rhs: impl Into<Term>) -> Self {
        Self::binary(BinaryOp::Ule, self, rhs.into())
    }

    pub fn slt(self, rhs: impl Into<Term>) -> Self {
        Self::binary(BinaryOp::Slt, self, rhs.into())
    }

    pub fn sle(self, rhs: impl Into<Term>) -> Self {
        Self::binary(BinaryOp::Sle, self, rhs.into())
    }

    pub fn implies(self, rhs: impl Into<Term>) -> Self {
        Self::binary(BinaryOp::Implies, self, rhs.into())
    }

    pub fn udiv(self, rhs: impl Into<Term>) -> Self {
        Self::binary(BinaryOp::UDiv, self, rhs.into())
    }

    pub fn urem(self, rhs: impl Into<Term>) -> Self {
        Self::binary(BinaryOp::URem, self, rhs.into())
    }

    pub fn lshr(self, rhs: impl Into<Term>) -> Self {
        Self::binary(BinaryOp::LShr, self, rhs.into())
    }

    /// Computes the type of the term, checking every sub-term.
    pub fn type_of(&self) -> Result<TypeDescriptor, TypeError> {
        match self {
            Term::Const(value) => Ok(value.type_of()),
            Term::Var(symbol) => Ok(symbol.ty().clone()),
            Term::Unary { op, arg } => {
                let ty = arg.type_of()?;
                if ty.as_itype().is_none() {
                    return Err(TypeError::NotInteger {
                        op: op.into(),
                        found: ty,
                    });
                }
                Ok(ty)
            }
            Term::Binary { op, lhs, rhs } => {
                let lty = lhs.type_of()?;
                let rty = rhs.type_of()?;
                if lty != rty {
                    return Err(TypeError::Mismatch {
                        op: op.into(),
                        lhs: lty,
                        rhs: rty,
                    });
                }

                match op {
                    BinaryOp::Eq | BinaryOp::Ne => Ok(TypeDescriptor::BOOL),
                    BinaryOp::Implies if !lty.is_bool() => {
                        Err(TypeError::NotBoolean { found: lty })
                    }
                    _ if lty.as_itype().is_none() => Err(TypeError::NotInteger {
                        op: op.into(),
                        found: lty,
                    }),
                    _ if op.is_comparison() => Ok(TypeDescriptor::BOOL),
                    _ => Ok(lty),
                }
            }
            Term::Ite {
                cond,
                then,
                otherwise,
            } => {
                let cty = cond.type_of()?;
                if !cty.is_bool() {
                    return Err(TypeError::NotBoolean { found: cty });
                }
                let tty = then.type_of()?;
                let oty = otherwise.type_of()?;
                if tty != oty {
                    return Err(TypeError::Mismatch {
                        op: "ite",
                        lhs: tty,
                        rhs: oty,
                    });
                }
                Ok(tty)
            }
            Term::Aggregate { ty, elements } => {
                if ty.arity() != Some(elements.len() as u32) {
                    return Err(TypeError::Arity {
                        ty: ty.clone(),
                        found: elements.len(),
                    });
                }
                for (index, element) in elements.iter().enumerate() {
                    let found = element.type_of()?;
                    if ty.element(index as u32) != Some(&found) {
                        return Err(TypeError::ElementType {
                            ty: ty.clone(),
                            index,
                            found,
                        });
                    }
                }
                Ok(ty.clone())
            }
            Term::Extract { aggregate, index } => {
                let ty = aggregate.type_of()?;
                ty.element(*index)
                    .cloned()
                    .ok_or(TypeError::BadExtract { index: *index, ty })
            }
        }
    }

    /// Visit every symbol occurrence in the term (with repetitions).
    pub fn for_each_symbol<'a>(&'a self, f: &mut impl FnMut(&'a SymbolicValue)) {
        match self {
            Term::Const(_) => {}
            Term::Var(symbol) => f(symbol),
            Term::Unary { arg, .. } => arg.for_each_symbol(f),
            Term::Binary { lhs, rhs, .. } => {
                lhs.for_each_symbol(f);
                rhs.for_each_symbol(f);
            }
            Term::Ite {
                cond,
                then,
                otherwise,
            } => {
                cond.for_each_symbol(f);
                then.for_each_symbol(f);
                otherwise.for_each_symbol(f);
            }
            Term::Aggregate { elements, .. } => {
                elements.iter().for_each(|element| element.for_each_symbol(f))
            }
            Term::Extract { aggregate, .. } => aggregate.for_each_symbol(f),
        }
    }

    /// Set of symbols the term depends on.
    pub fn free_symbols(&self) -> BTreeSet<SymbolId> {
        let mut symbols = BTreeSet::new();
        self.for_each_symbol(&mut |symbol| {
            symbols.insert(symbol.id());
        });
        symbols
    }

    /// Evaluates the term under `assignment`.
    pub fn eval(&self, assignment: &Assignment) -> Result<Value, EvalError> {
        match self {
            Term::Const(value) => Ok(value.clone()),
            Term::Var(symbol) => {
                assignment
                    .get(&symbol.id())
                    .cloned()
                    .ok_or_else(|| EvalError::Unbound {
                        id: symbol.id(),
                        name: symbol.name().to_string(),
                    })
            }
            Term::Unary { op, arg } => {
                let value = arg.eval(assignment)?;
                let int = expect_int(op.into(), &value)?;
                let bits = match op {
                    UnaryOp::Not => !int.bits(),
                    UnaryOp::Neg => int.bits().wrapping_neg(),
                };
                Ok(Value::int(int.ty(), bits))
            }
            Term::Binary { op, lhs, rhs } => {
                let lhs = lhs.eval(assignment)?;
                let rhs = rhs.eval(assignment)?;
                eval_binary(*op, &lhs, &rhs)
            }
            Term::Ite {
                cond,
                then,
                otherwise,
            } => {
                if cond.eval(assignment)?.is_true() {
                    then.eval(assignment)
                } else {
                    otherwise.eval(assignment)
                }
            }
            Term::Aggregate { ty, elements } => {
                let elements = elements
                    .iter()
                    .map(|element| element.eval(assignment))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Aggregate {
                    ty: ty.clone(),
                    elements,
                })
            }
            Term::Extract { aggregate, index } => {
                let value = aggregate.eval(assignment)?;
                value.element(*index).cloned().ok_or_else(|| {
                    TypeError::BadExtract {
                        index: *index,
                        ty: value.type_of(),
                    }
                    .into()
                })
            }
        }
    }

    /// The constant this term is, if it is one.
    pub fn as_const(&self) -> Option<&Value> {
        match self {
            Term::Const(value) => Some(value),
            _ => None,
        }
    }
}

fn expect_int(op: &'static str, value: &Value) -> Result<IntValue, TypeError> {
    value.as_int().ok_or_else(|| TypeError::NotInteger {
        op,
        found: value.type_of(),
    })
}

/// Applies a binary operator to two concrete values.
pub fn eval_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Eq => return Ok(Value::bool(lhs == rhs)),
        BinaryOp::Ne => return Ok(Value::bool(lhs != rhs)),
        _ => {}
    }

    let a = expect_int(op.into(), lhs)?;
    let b = expect_int(op.into(), rhs)?;
    if a.ty() != b.ty() {
        return Err(TypeError::Mismatch {
            op: op.into(),
            lhs: lhs.type_of(),
            rhs: rhs.type_of(),
        }
        .into());
    }

    let ty = a.ty();
    let (x, y) = (a.bits(), b.bits());
    let value = match op {
        BinaryOp::Add => Value::int(ty, x.wrapping_add(y)),
        BinaryOp::Sub => Value::int(ty, x.wrapping_sub(y)),
        BinaryOp::Mul => Value::int(ty, x.wrapping_mul(y)),
        BinaryOp::UDiv => Value::int(ty, x.checked_div(y).unwrap_or(u64::MAX)),
        BinaryOp::URem => Value::int(ty, x.checked_rem(y).unwrap_or(x)),
        BinaryOp::And => Value::int(ty, x & y),
        BinaryOp::Or => Value::int(ty, x | y),
        BinaryOp::Xor => Value::int(ty, x ^ y),
        BinaryOp::Shl => Value::int(
            ty,
            if y >= ty.num_bits() as u64 { 0 } else { x << y },
        ),
        BinaryOp::LShr => Value::int(
            ty,
            if y >= ty.num_bits() as u64 { 0 } else { x >> y },
        ),
        BinaryOp::Ult => Value::bool(x < y),
        BinaryOp::Ule => Value::bool(x <= y),
        BinaryOp::Slt => Value::bool(a.as_signed() < b.as_signed()),
        BinaryOp::Sle => Value::bool(a.as_signed() <= b.as_signed()),
        BinaryOp::Implies => Value::bool(!a.is_true() || b.is_true()),
        BinaryOp::Eq | BinaryOp::Ne => unreachable!("handled above"),
    };
    Ok(value)
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::Const(value)
    }
}

impl From<IntValue> for Term {
    fn from(value: IntValue) -> Self {
        Term::Const(Value::Int(value))
    }
}

impl From<SymbolicValue> for Term {
    fn from(symbol: SymbolicValue) -> Self {
        Term::Var(symbol)
    }
}

impl From<&SymbolicValue> for Term {
    fn from(symbol: &SymbolicValue) -> Self {
        Term::Var(symbol.clone())
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        Term::bool(value)
    }
}

macro_rules! impl_term_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Term>> std::ops::$trait<R> for Term {
            type Output = Term;

            fn $method(self, rhs: R) -> Term {
                Term::binary($op, self, rhs.into())
            }
        }
    };
}

impl_term_binary_op!(Add, add, BinaryOp::Add);
impl_term_binary_op!(Sub, sub, BinaryOp::Sub);
impl_term_binary_op!(Mul, mul, BinaryOp::Mul);
impl_term_binary_op!(BitAnd, bitand, BinaryOp::And);
impl_term_binary_op!(BitOr, bitor, BinaryOp::Or);
impl_term_binary_op!(BitXor, bitxor, BinaryOp::Xor);
impl_term_binary_op!(Shl, shl, BinaryOp::Shl);

impl std::ops::Not for Term {
    type Output = Term;

    fn not(self) -> Term {
        Term::unary(UnaryOp::Not, self)
    }
}

impl std::ops::Neg for Term {
    type Output = Term;

    fn neg(self) -> Term {
        Term::unary(UnaryOp::Neg, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(id: u32, name: &str, ty: TypeDescriptor) -> SymbolicValue {
        SymbolicValue::new(SymbolId(id), name, ty)
    }

    #[test]
    fn comparison_yields_bool() {
        let x = sym(0, "x", TypeDescriptor::I32);
        let t = x.term().ult(Term::int(IType::I32, 10));
        assert_eq!(t.type_of().unwrap(), TypeDescriptor::BOOL);
    }

    #[test]
    fn mismatched_widths_are_rejected() {
        let x = sym(0, "x", TypeDescriptor::I32);
        let t = x.term() + Term::int(IType::I8, 1);
        assert!(matches!(t.type_of(), Err(TypeError::Mismatch { op: "add", .. })));
    }

    #[test]
    fn smt_division_semantics() {
        let zero = Value::int(IType::I8, 0);
        let seven = Value::int(IType::I8, 7);
        assert_eq!(
            eval_binary(BinaryOp::UDiv, &seven, &zero).unwrap(),
            Value::int(IType::I8, 0xff)
        );
        assert_eq!(eval_binary(BinaryOp::URem, &seven, &zero).unwrap(), seven);
    }

    #[test]
    fn unbound_symbols_are_reported() {
        let x = sym(3, "x", TypeDescriptor::I8);
        let err = x.term().eval(&Assignment::new()).unwrap_err();
        assert_eq!(
            err,
            EvalError::Unbound {
                id: SymbolId(3),
                name: "x".to_string()
            }
        );
    }
}
