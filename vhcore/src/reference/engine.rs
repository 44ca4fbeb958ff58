use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use vhir::term::{Assignment, pretty::print_colored};

use crate::{
    base::module::Module,
    dispatch::SpecHandle,
    engine::{VerificationEngine, VerificationResult},
    magic::{DEFAULT_SAMPLING_SEED, EXHAUSTIVE_BIT_LIMIT, SAMPLING_REDRAW_LIMIT},
    reference::{
        ReferenceModule,
        goal::Goal,
        machine::{CallContext, Fault, Memory},
        matching::{
            Expectation, MatchError, Matcher, assignment_from_index, describe_inputs, input_bits,
            random_assignment,
        },
    },
    specifications::base::FunctionSpecification,
    tactic::{RuleSet, Tactic, TacticStep, UninterpretedSet},
    utils::error::{HarnessError, VhResult},
};

/// What the engine did with a goal, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    Simplified { rules: RuleSet, goal: String },
    Goal(String),
    Shrink,
    Discharged {
        uninterpreted: UninterpretedSet,
        cases: u64,
    },
    Sampled { trials: u32 },
    Assumed,
    Trusted,
    /// Step that came after the goal was already closed.
    Unreachable(TacticStep),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub target: String,
    pub event: TranscriptEvent,
}

/// Outcome of running the target on one assignment of the inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CaseOutcome {
    Pass,
    /// The preconditions do not hold for this assignment.
    Vacuous,
    Fail(String),
}

fn unresolved(target: &str, reason: String) -> HarnessError {
    HarnessError::Unsupported(format!("`{}`: {}", target, reason))
}

fn match_error(target: &str, err: MatchError) -> HarnessError {
    match err {
        MatchError::Mismatch(reason) | MatchError::Unresolved(reason) => unresolved(target, reason),
    }
}

/// Verification engine over [`ReferenceModule`]s.
///
/// Proofs enumerate every assignment of the symbolic inputs, so they are
/// complete but limited to [`EXHAUSTIVE_BIT_LIMIT`] bits of input. Sampling is
/// driven by a seeded generator and is reproducible.
#[derive(Debug, Clone)]
pub struct ReferenceEngine {
    seed: u64,
    echo_goals: bool,
    transcript: Vec<TranscriptEntry>,
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SAMPLING_SEED,
            echo_goals: false,
            transcript: Vec::new(),
        }
    }
}

impl ReferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Also print goals to stdout, with colors, when a tactic asks for them.
    pub fn with_goal_echo(mut self, echo: bool) -> Self {
        self.echo_goals = echo;
        self
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn events_for<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a TranscriptEvent> {
        self.transcript
            .iter()
            .filter(move |entry| entry.target == target)
            .map(|entry| &entry.event)
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    fn note(&mut self, target: &str, event: TranscriptEvent) {
        self.transcript.push(TranscriptEntry {
            target: target.to_string(),
            event,
        });
    }

    fn functions<'m>(module: &'m Module, target: &str) -> VhResult<&'m ReferenceModule> {
        let functions = module.downcast_ref::<ReferenceModule>().ok_or_else(|| {
            HarnessError::Engine(format!(
                "module '{}' was not loaded for the reference engine",
                module.path().display()
            ))
        })?;
        if !functions.contains(target) {
            return Err(HarnessError::UnknownTarget(target.to_string()));
        }
        Ok(functions)
    }

    fn run_case(
        &self,
        functions: &ReferenceModule,
        target: &str,
        overrides: &[SpecHandle],
        spec: &FunctionSpecification,
        env: Assignment,
    ) -> VhResult<CaseOutcome> {
        let mut memory = Memory::new();
        let mut matcher = Matcher::new(env);
        matcher
            .materialize(&mut memory, spec.pre())
            .map_err(|fault| unresolved(target, format!("cannot build the pre state: {}", fault)))?;

        if matcher
            .violated(spec.pre().conditions())
            .map_err(|err| match_error(target, err))?
            .is_some()
        {
            return Ok(CaseOutcome::Vacuous);
        }

        let args = spec
            .args()
            .iter()
            .map(|arg| matcher.value_of(arg))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| match_error(target, err))?;

        let returned = CallContext::new(functions, overrides, &mut memory).run_model(target, &args);
        let returned = match returned {
            Ok(returned) => returned,
            Err(Fault::Unsupported(reason)) => return Err(unresolved(target, reason)),
            Err(fault) => return Ok(CaseOutcome::Fail(fault.to_string())),
        };

        let mut expectations = Vec::new();
        match (spec.returns(), returned) {
            (Some(expected), Some(actual)) => expectations.push(Expectation::Value {
                what: "return value".to_string(),
                expected,
                actual,
            }),
            (Some(expected), None) => {
                return Ok(CaseOutcome::Fail(format!(
                    "expected the return value {}, the function returned nothing",
                    expected
                )));
            }
            (None, _) => {}
        }
        expectations.extend(spec.post().points_to().iter().map(Expectation::PointsTo));

        match matcher.settle(&memory, expectations) {
            Ok(()) => {}
            Err(MatchError::Mismatch(reason)) => return Ok(CaseOutcome::Fail(reason)),
            Err(MatchError::Unresolved(reason)) => return Err(unresolved(target, reason)),
        }

        let conditions = spec.post().conditions();
        let outcome = match matcher
            .violated(conditions)
            .map_err(|err| match_error(target, err))?
        {
            Some(index) => CaseOutcome::Fail(format!(
                "postcondition `{}` does not hold",
                conditions[index]
            )),
            None => CaseOutcome::Pass,
        };
        Ok(outcome)
    }

    /// Runs the target on every assignment of the inputs. Returns the verdict
    /// and the number of cases run.
    fn discharge(
        &self,
        functions: &ReferenceModule,
        target: &str,
        overrides: &[SpecHandle],
        spec: &FunctionSpecification,
    ) -> VhResult<(VerificationResult, u64)> {
        let inputs = spec.pre().fresh();
        let bits = input_bits(inputs);
        if bits > EXHAUSTIVE_BIT_LIMIT {
            return Err(HarnessError::Unsupported(format!(
                "`{}` has {} bits of symbolic input, the reference engine enumerates at most {}",
                target, bits, EXHAUSTIVE_BIT_LIMIT
            )));
        }

        let cases = 1u64 << bits;
        let base = Assignment::new();
        for index in 0..cases {
            let env = assignment_from_index(inputs, index, &base);
            let outcome = self.run_case(functions, target, overrides, spec, env.clone())?;
            if let CaseOutcome::Fail(reason) = outcome {
                let reason =
                    format!("counterexample {}: {}", describe_inputs(inputs, &env), reason);
                return Ok((VerificationResult::failed(reason), index + 1));
            }
        }
        debug!("`{}` holds on all {} cases", target, cases);
        Ok((VerificationResult::Proved, cases))
    }

    fn sample(
        &self,
        functions: &ReferenceModule,
        target: &str,
        overrides: &[SpecHandle],
        spec: &FunctionSpecification,
        trials: u32,
    ) -> VhResult<VerificationResult> {
        let inputs = spec.pre().fresh();
        let base = Assignment::new();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        for trial in 0..trials {
            let mut draws = 0;
            loop {
                if draws == SAMPLING_REDRAW_LIMIT {
                    return Err(HarnessError::Unsupported(format!(
                        "no input satisfying the preconditions of `{}` found in {} draws",
                        target, SAMPLING_REDRAW_LIMIT
                    )));
                }
                draws += 1;

                let env = random_assignment(inputs, &mut rng, &base);
                match self.run_case(functions, target, overrides, spec, env.clone())? {
                    CaseOutcome::Pass => break,
                    CaseOutcome::Vacuous => continue,
                    CaseOutcome::Fail(reason) => {
                        return Ok(VerificationResult::failed(format!(
                            "trial {} with {}: {}",
                            trial + 1,
                            describe_inputs(inputs, &env),
                            reason
                        )));
                    }
                }
            }
        }
        Ok(VerificationResult::SampledPass { trials })
    }

    fn check_uninterpreted(
        functions: &ReferenceModule,
        overrides: &[SpecHandle],
        uninterpreted: &UninterpretedSet,
    ) -> VhResult<()> {
        for name in uninterpreted.iter() {
            let overridden = overrides.iter().any(|over| over.target() == name);
            if !functions.contains(name) && !overridden {
                return Err(HarnessError::UnknownTarget(name.to_string()));
            }
        }
        Ok(())
    }
}

impl VerificationEngine for ReferenceEngine {
    fn run_verification(
        &mut self,
        module: &Module,
        target: &str,
        overrides: &[SpecHandle],
        shrink: bool,
        spec: &FunctionSpecification,
        tactic: &Tactic,
    ) -> VhResult<VerificationResult> {
        let functions = Self::functions(module, target)?;
        if shrink {
            // Regions are whole values here, there is nothing to shrink.
            self.note(target, TranscriptEvent::Shrink);
        }

        let mut goal = Goal::new(target, spec);
        let mut verdict = None;
        for step in tactic.steps() {
            if verdict.is_some() {
                self.note(target, TranscriptEvent::Unreachable(step.clone()));
                continue;
            }
            match step {
                TacticStep::Simplify(rules) => {
                    goal.simplify(rules);
                    let rendered = goal.render();
                    self.note(
                        target,
                        TranscriptEvent::Simplified {
                            rules: rules.clone(),
                            goal: rendered,
                        },
                    );
                }
                TacticStep::PrintGoal => {
                    let rendered = goal.render();
                    info!("Goal of `{}`:\n{}", target, rendered);
                    if self.echo_goals {
                        print_colored(&goal.pretty_doc())?;
                    }
                    self.note(target, TranscriptEvent::Goal(rendered));
                }
                TacticStep::AssumeUnsat => {
                    self.note(target, TranscriptEvent::Assumed);
                    verdict = Some(VerificationResult::AssumedWithoutProof);
                }
                TacticStep::Discharge(uninterpreted) => {
                    Self::check_uninterpreted(functions, overrides, uninterpreted)?;
                    let (result, cases) = self.discharge(functions, target, overrides, spec)?;
                    self.note(
                        target,
                        TranscriptEvent::Discharged {
                            uninterpreted: uninterpreted.clone(),
                            cases,
                        },
                    );
                    verdict = Some(result);
                }
                TacticStep::Sample { trials } => {
                    let result = self.sample(functions, target, overrides, spec, *trials)?;
                    self.note(target, TranscriptEvent::Sampled { trials: *trials });
                    verdict = Some(result);
                }
            }
        }

        Ok(verdict.unwrap_or_else(|| {
            VerificationResult::failed(format!("tactic `{}` leaves the goal open", tactic))
        }))
    }

    fn run_sampling(
        &mut self,
        module: &Module,
        target: &str,
        overrides: &[SpecHandle],
        spec: &FunctionSpecification,
        trials: u32,
    ) -> VhResult<VerificationResult> {
        let functions = Self::functions(module, target)?;
        let result = self.sample(functions, target, overrides, spec, trials)?;
        self.note(target, TranscriptEvent::Sampled { trials });
        Ok(result)
    }

    fn register_trusted(
        &mut self,
        module: &Module,
        target: &str,
        _spec: &FunctionSpecification,
    ) -> VhResult<VerificationResult> {
        Self::functions(module, target)?;
        self.note(target, TranscriptEvent::Trusted);
        Ok(VerificationResult::AssumedWithoutProof)
    }
}
