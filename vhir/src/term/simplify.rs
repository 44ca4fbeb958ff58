//! Semantics-preserving rewrites over [`Term`]s.
//!
//! Two rule families are provided, both applied bottom-up in a single pass:
//! - [`Term::fold_constants`] evaluates every sub-term whose operands are
//!   constants and resolves `ite`/`extract` on known operands;
//! - [`Term::apply_identities`] removes algebraic identities (`x + 0`,
//!   `x * 1`, `x == x`, double negation, ...) and then folds constants.
//!
//! Neither family changes the value of a term under any assignment.
use crate::{
    term::{Assignment, BinaryOp, Term, UnaryOp},
    value::Value,
};

impl Term {
    /// Evaluate constant sub-terms.
    pub fn fold_constants(&self) -> Term {
        self.rewrite(&fold_node)
    }

    /// Remove algebraic identities, then evaluate constant sub-terms.
    pub fn apply_identities(&self) -> Term {
        self.rewrite(&|term: Term| fold_node(identity_node(term)))
    }

    fn rewrite(&self, rule: &impl Fn(Term) -> Term) -> Term {
        let rebuilt = match self {
            Term::Const(_) | Term::Var(_) => self.clone(),
            Term::Unary { op, arg } => Term::unary(*op, arg.rewrite(rule)),
            Term::Binary { op, lhs, rhs } => {
                Term::binary(*op, lhs.rewrite(rule), rhs.rewrite(rule))
            }
            Term::Ite {
                cond,
                then,
                otherwise,
            } => Term::ite(cond.rewrite(rule), then.rewrite(rule), otherwise.rewrite(rule)),
            Term::Aggregate { ty, elements } => Term::Aggregate {
                ty: ty.clone(),
                elements: elements.iter().map(|element| element.rewrite(rule)).collect(),
            },
            Term::Extract { aggregate, index } => aggregate.rewrite(rule).extract(*index),
        };
        rule(rebuilt)
    }
}

fn fold_node(term: Term) -> Term {
    let foldable = match &term {
        Term::Unary { arg, .. } => arg.is_const(),
        Term::Binary { lhs, rhs, .. } => lhs.is_const() && rhs.is_const(),
        Term::Aggregate { elements, .. } => elements.iter().all(Term::is_const),
        Term::Ite {
            cond,
            then,
            otherwise,
        } => {
            if let Some(value) = cond.as_const() {
                return if value.is_true() {
                    (**then).clone()
                } else {
                    (**otherwise).clone()
                };
            }
            if then == otherwise {
                return (**then).clone();
            }
            false
        }
        Term::Extract { aggregate, index } => {
            if let Term::Aggregate { elements, .. } = &**aggregate {
                if let Some(element) = elements.get(*index as usize) {
                    return element.clone();
                }
            }
            aggregate.is_const()
        }
        Term::Const(_) | Term::Var(_) => false,
    };

    if foldable {
        // Ill-typed constant sub-terms are left untouched for the checker to report.
        if let Ok(value) = term.eval(&Assignment::new()) {
            return Term::Const(value);
        }
    }
    term
}

fn is_zero(term: &Term) -> bool {
    term.as_const()
        .and_then(Value::as_int)
        .is_some_and(|int| int.bits() == 0)
}

fn is_one(term: &Term) -> bool {
    term.as_const()
        .and_then(Value::as_int)
        .is_some_and(|int| int.bits() == 1)
}

fn is_true(term: &Term) -> bool {
    term.as_const().is_some_and(|value| value.is_true())
}

fn zero_like(term: &Term) -> Option<Term> {
    let ty = term.type_of().ok()?.as_itype()?;
    Some(Term::int(ty, 0))
}

fn identity_node(term: Term) -> Term {
    match term {
        Term::Unary {
            op: UnaryOp::Not,
            arg,
        } => match *arg {
            Term::Unary {
                op: UnaryOp::Not,
                arg: inner,
            } => *inner,
            other => Term::unary(UnaryOp::Not, other),
        },
        Term::Binary { op, lhs, rhs } => identity_binary(op, *lhs, *rhs),
        other => other,
    }
}

fn identity_binary(op: BinaryOp, lhs: Term, rhs: Term) -> Term {
    use BinaryOp::*;

    match op {
        Add | Or | Xor if is_zero(&rhs) => return lhs,
        Add | Or | Xor if is_zero(&lhs) => return rhs,
        Sub | Shl | LShr if is_zero(&rhs) => return lhs,
        Mul if is_one(&rhs) => return lhs,
        Mul if is_one(&lhs) => return rhs,
        Mul | And if is_zero(&rhs) => return rhs,
        Mul | And if is_zero(&lhs) => return lhs,
        Implies if is_true(&lhs) => return rhs,
        Implies if lhs.is_const() || is_true(&rhs) => return Term::bool(true),
        _ => {}
    }

    if lhs == rhs {
        match op {
            Eq | Ule | Sle | Implies => return Term::bool(true),
            Ne | Ult | Slt => return Term::bool(false),
            And | Or => return lhs,
            Sub | Xor => {
                if let Some(zero) = zero_like(&lhs) {
                    return zero;
                }
            }
            _ => {}
        }
    }

    Term::binary(op, lhs, rhs)
}
