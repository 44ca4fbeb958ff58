//! Proof goal shown by `print_goal`.
//!
//! The goal of a specification is its pre state as assumptions, the call, and
//! its post state as obligations. Simplification rewrites every term of the
//! goal and drops assumptions and obligations that became trivially true.
use log::debug;
use pretty::RcDoc;
use vhir::term::{
    Term,
    pretty::{PrettyTerm, Style, kw, punct, render_plain, styled},
};

use crate::{
    specifications::{
        base::FunctionSpecification,
        memory::{PointsTo, SetupValue},
    },
    tactic::RuleSet,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    target: String,
    assumptions: Vec<Term>,
    pre_memory: Vec<PointsTo>,
    args: Vec<SetupValue>,
    post_memory: Vec<PointsTo>,
    returns: Option<SetupValue>,
    obligations: Vec<Term>,
}

fn simplify_value(value: &mut SetupValue, rewrite: &impl Fn(&Term) -> Term) {
    if let SetupValue::Term(term) = value {
        *term = rewrite(term);
    }
}

fn value_doc(value: &SetupValue) -> RcDoc<'static, Style> {
    match value {
        SetupValue::Term(term) => term.pretty_doc(),
        SetupValue::Pointer(handle) => styled(Style::Ident, handle.id().to_string()),
        SetupValue::Null => kw("null"),
    }
}

fn points_to_doc(binding: &PointsTo) -> RcDoc<'static, Style> {
    styled(Style::Ident, binding.handle.id().to_string())
        .append(RcDoc::space())
        .append(styled(Style::Operator, "|->"))
        .append(RcDoc::space())
        .append(value_doc(&binding.value))
}

impl Goal {
    pub fn new(target: &str, spec: &FunctionSpecification) -> Self {
        Self {
            target: target.to_string(),
            assumptions: spec.pre().conditions().to_vec(),
            pre_memory: spec.pre().points_to().to_vec(),
            args: spec.args().to_vec(),
            post_memory: spec.post().points_to().to_vec(),
            returns: spec.returns().cloned(),
            obligations: spec.post().conditions().to_vec(),
        }
    }

    pub fn assumptions(&self) -> &[Term] {
        &self.assumptions
    }

    pub fn obligations(&self) -> &[Term] {
        &self.obligations
    }

    pub fn simplify(&mut self, rules: &RuleSet) {
        match rules {
            RuleSet::Basic => self.rewrite(&Term::fold_constants),
            RuleSet::Domain => self.rewrite(&Term::apply_identities),
            RuleSet::Named(name) => {
                debug!(
                    "Rule set `{}` is not known to the reference engine, goal left unchanged",
                    name
                );
            }
        }
    }

    fn rewrite(&mut self, rewrite: &impl Fn(&Term) -> Term) {
        let trivial = Term::bool(true);
        for terms in [&mut self.assumptions, &mut self.obligations] {
            *terms = terms
                .iter()
                .map(rewrite)
                .filter(|term| *term != trivial)
                .collect();
        }
        for binding in self.pre_memory.iter_mut().chain(self.post_memory.iter_mut()) {
            simplify_value(&mut binding.value, rewrite);
        }
        for arg in &mut self.args {
            simplify_value(arg, rewrite);
        }
        if let Some(returns) = &mut self.returns {
            simplify_value(returns, rewrite);
        }
    }

    pub fn pretty_doc(&self) -> RcDoc<'static, Style> {
        let mut lines = Vec::new();
        for binding in &self.pre_memory {
            lines.push(kw("assume").append(RcDoc::space()).append(points_to_doc(binding)));
        }
        for term in &self.assumptions {
            lines.push(kw("assume").append(RcDoc::space()).append(term.pretty_doc()));
        }

        let args = RcDoc::intersperse(
            self.args.iter().map(value_doc),
            punct(",").append(RcDoc::space()),
        );
        lines.push(
            kw("call")
                .append(RcDoc::space())
                .append(styled(Style::Ident, self.target.clone()))
                .append(punct("("))
                .append(args)
                .append(punct(")")),
        );

        for binding in &self.post_memory {
            lines.push(kw("ensure").append(RcDoc::space()).append(points_to_doc(binding)));
        }
        if let Some(returns) = &self.returns {
            lines.push(kw("returns").append(RcDoc::space()).append(value_doc(returns)));
        }
        for term in &self.obligations {
            lines.push(kw("prove").append(RcDoc::space()).append(term.pretty_doc()));
        }
        RcDoc::intersperse(lines, RcDoc::hardline())
    }

    pub fn render(&self) -> String {
        render_plain(&self.pretty_doc(), 80)
    }
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use vhir::{term::Term, types::IType, types::TypeDescriptor};

    use super::*;
    use crate::specifications::builder::{MemoryBuilder, SetupScope, SpecBuilder};

    #[test]
    fn simplification_shrinks_the_goal() {
        let mut spec = SpecBuilder::new();
        let (x, p) = spec.fresh_pointer("x", TypeDescriptor::I8, false).unwrap();
        spec.precondition(x.term().ult(Term::int(IType::I8, 2) + Term::int(IType::I8, 3)))
            .unwrap();
        spec.precondition(x.term().equals(x.term())).unwrap();
        spec.execute([SetupValue::from(&p)]).unwrap();
        let y = spec.bind_fresh(&p, "y", TypeDescriptor::I8).unwrap();
        let one = || Term::int(IType::I8, 1);
        spec.postcondition((y.term() * one()).equals(x.term() + one())).unwrap();
        let spec = spec.finish().unwrap();

        let mut goal = Goal::new("incr", &spec);
        assert_eq!(goal.assumptions().len(), 2);

        goal.simplify(&RuleSet::Basic);
        assert_eq!(goal.assumptions()[0].to_string(), "x <u 5");
        assert_eq!(goal.assumptions().len(), 2);

        goal.simplify(&RuleSet::Domain);
        assert_eq!(goal.assumptions().len(), 1);
        assert_eq!(
            goal.render(),
            "assume p0 |-> x\nassume x <u 5\ncall incr(p0)\nensure p0 |-> y\nprove y == x + 1"
        );
    }
}
