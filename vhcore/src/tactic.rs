//! Tactics: ordered strategies used to close a proof goal.
//!
//! A tactic is a list of solver steps. Every tactic the harness produces comes
//! from the builders of this module, so the shape of a debug tactic, a release
//! tactic or a trusting tactic is decided in one place.
use std::collections::BTreeSet;

use smallvec::SmallVec;
use strum::EnumIs;

use crate::magic::DEFAULT_SAMPLING_TRIALS;

/// Function names kept opaque (not unfolded) during discharge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UninterpretedSet(BTreeSet<String>);

impl UninterpretedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for UninterpretedSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Display for UninterpretedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Rewrite rule sets understood by `simplify`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleSet {
    /// Constant folding.
    Basic,
    /// Algebraic identities of the bit-vector domain.
    Domain,
    /// An engine-specific rule set, identified by name.
    Named(String),
}

impl std::fmt::Display for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSet::Basic => write!(f, "basic"),
            RuleSet::Domain => write!(f, "domain"),
            RuleSet::Named(name) => write!(f, "{}", name),
        }
    }
}

/// One solver step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs)]
pub enum TacticStep {
    Simplify(RuleSet),
    /// Render the current goal for inspection.
    PrintGoal,
    /// Close the goal without proof.
    AssumeUnsat,
    /// Close the goal with the solver, keeping the given functions opaque.
    Discharge(UninterpretedSet),
    /// Close the goal by randomized sampling.
    Sample { trials: u32 },
}

impl TacticStep {
    /// Whether the step ends the proof attempt.
    pub fn is_closing(&self) -> bool {
        matches!(
            self,
            TacticStep::AssumeUnsat | TacticStep::Discharge(_) | TacticStep::Sample { .. }
        )
    }
}

impl std::fmt::Display for TacticStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TacticStep::Simplify(rules) => write!(f, "simplify({})", rules),
            TacticStep::PrintGoal => write!(f, "print_goal"),
            TacticStep::AssumeUnsat => write!(f, "assume_unsat"),
            TacticStep::Discharge(unint) => write!(f, "discharge({})", unint),
            TacticStep::Sample { trials } => write!(f, "sample({})", trials),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tactic {
    steps: SmallVec<TacticStep, 4>,
}

impl Tactic {
    pub fn new(steps: impl IntoIterator<Item = TacticStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    pub fn steps(&self) -> &[TacticStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Appends one step.
    pub fn then(mut self, step: TacticStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends every step of `other`.
    pub fn extend(mut self, other: Tactic) -> Self {
        self.steps.extend(other.steps);
        self
    }

    /// Whether the goal is printed before the tactic closes.
    pub fn has_goal_inspection(&self) -> bool {
        self.steps
            .iter()
            .take_while(|step| !step.is_closing())
            .any(TacticStep::is_print_goal)
    }

    /// The first step that ends the proof attempt; later steps never run.
    pub fn closing_step(&self) -> Option<&TacticStep> {
        self.steps.iter().find(|step| step.is_closing())
    }

    /// Whether the tactic closes the goal without proving it.
    pub fn is_trusting(&self) -> bool {
        matches!(self.closing_step(), Some(TacticStep::AssumeUnsat))
    }
}

impl FromIterator<TacticStep> for Tactic {
    fn from_iter<T: IntoIterator<Item = TacticStep>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl std::fmt::Display for Tactic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let steps: Vec<String> = self.steps.iter().map(ToString::to_string).collect();
        write!(f, "{}", steps.join("; "))
    }
}

/// Simplify with both rule sets, print the goal, then discharge.
pub fn debug_tactic(uninterpreted: &UninterpretedSet) -> Tactic {
    Tactic::new([
        TacticStep::Simplify(RuleSet::Basic),
        TacticStep::Simplify(RuleSet::Domain),
        TacticStep::PrintGoal,
        TacticStep::Discharge(uninterpreted.clone()),
    ])
}

/// Discharge directly.
pub fn release_tactic(uninterpreted: &UninterpretedSet) -> Tactic {
    Tactic::new([TacticStep::Discharge(uninterpreted.clone())])
}

pub fn select_tactic(debug: bool, uninterpreted: &UninterpretedSet) -> Tactic {
    if debug {
        debug_tactic(uninterpreted)
    } else {
        release_tactic(uninterpreted)
    }
}

pub fn sampling_tactic(trials: u32) -> Tactic {
    Tactic::new([TacticStep::Sample { trials }])
}

/// [`sampling_tactic`] with the default trial count.
pub fn default_sampling_tactic() -> Tactic {
    sampling_tactic(DEFAULT_SAMPLING_TRIALS)
}

/// Close the goal without proof.
pub fn trust_tactic() -> Tactic {
    Tactic::new([TacticStep::AssumeUnsat])
}

/// Caller-supplied steps followed by a discharge.
pub fn custom(steps: Tactic, uninterpreted: &UninterpretedSet) -> Tactic {
    steps.then(TacticStep::Discharge(uninterpreted.clone()))
}

/// Full simplification and goal printing, then close without proof. Shows
/// what an admitted obligation leaves unproven.
pub fn show_admit_tactic() -> Tactic {
    Tactic::new([
        TacticStep::Simplify(RuleSet::Basic),
        TacticStep::Simplify(RuleSet::Domain),
        TacticStep::PrintGoal,
        TacticStep::AssumeUnsat,
    ])
}

/// Caller-supplied steps, goal printing, then discharge.
pub fn show_goal_tactic(steps: Tactic, uninterpreted: &UninterpretedSet) -> Tactic {
    steps
        .then(TacticStep::PrintGoal)
        .then(TacticStep::Discharge(uninterpreted.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unint() -> UninterpretedSet {
        ["helper", "mix"].into_iter().collect()
    }

    #[test]
    fn debug_tactic_inspects_release_does_not() {
        let u = unint();
        let debug = select_tactic(true, &u);
        let release = select_tactic(false, &u);

        assert!(debug.has_goal_inspection());
        assert!(!release.has_goal_inspection());
        assert_eq!(debug.closing_step(), release.closing_step());
        assert_eq!(
            debug.to_string(),
            "simplify(basic); simplify(domain); print_goal; discharge({helper, mix})"
        );
    }

    #[test]
    fn custom_appends_discharge() {
        let steps = Tactic::new([TacticStep::Simplify(RuleSet::Named("bswap".into()))]);
        let tactic = custom(steps, &UninterpretedSet::new());
        assert_eq!(tactic.to_string(), "simplify(bswap); discharge({})");
        assert!(!tactic.is_trusting());
    }

    #[test]
    fn trusting_tactics_are_detectable() {
        assert!(trust_tactic().is_trusting());
        assert!(show_admit_tactic().is_trusting());
        assert!(show_admit_tactic().has_goal_inspection());
        assert!(!release_tactic(&unint()).is_trusting());
        assert!(!default_sampling_tactic().is_trusting());
    }

    #[test]
    fn steps_after_closing_step_do_not_count() {
        let tactic = trust_tactic()
            .then(TacticStep::PrintGoal)
            .extend(release_tactic(&unint()));
        assert!(tactic.is_trusting());
        assert!(!tactic.has_goal_inspection());
        assert_eq!(tactic.steps().len(), 3);
    }

    #[test]
    fn show_goal_prints_before_discharge() {
        let steps = Tactic::new([TacticStep::Simplify(RuleSet::Basic)]);
        let tactic = show_goal_tactic(steps, &unint());
        assert!(tactic.has_goal_inspection());
        assert!(matches!(tactic.closing_step(), Some(TacticStep::Discharge(u)) if u.len() == 2));
    }

    #[test]
    fn default_sampling_uses_hundred_trials() {
        assert_eq!(
            default_sampling_tactic().steps(),
            &[TacticStep::Sample { trials: 100 }]
        );
    }
}
