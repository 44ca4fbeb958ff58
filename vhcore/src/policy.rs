//! Proof-mode policy.
//!
//! [`plan`] is the single decision point turning a dispatcher request into
//! what the engine is asked to do. It is a pure function of the process
//! configuration, the requested [`Mode`] and its [`Flavor`]; nothing is
//! remembered between calls.
use strum::{Display, EnumIs};

use crate::{
    tactic::{
        Tactic, UninterpretedSet, custom, debug_tactic, select_tactic, show_admit_tactic,
        show_goal_tactic,
    },
    utils::conf::ProcessConfig,
};

/// How an obligation should be checked.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
pub enum Mode {
    /// SMT discharge without hints.
    Proof,
    /// SMT discharge keeping the given functions opaque.
    ProofWithHints(UninterpretedSet),
    /// Caller-supplied rewrite steps, then SMT discharge with hints.
    ProofWithSimps {
        uninterpreted: UninterpretedSet,
        steps: Tactic,
    },
    /// Randomized testing with the given number of trials.
    Sampling(u32),
    /// A fully caller-supplied tactic.
    Custom(Tactic),
    /// Like [`Mode::ProofWithHints`], with memory minimization first.
    Shrinking(UninterpretedSet),
    /// Explicit, permanent trust.
    Trusted,
    /// Simplify and print the goal, then close it without proof.
    ShowAdmit,
    /// Caller-supplied steps, goal printing, then SMT discharge with hints.
    ShowGoal {
        steps: Tactic,
        uninterpreted: UninterpretedSet,
    },
}

/// Production entry points honor `do_prove`; debug ones always check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIs)]
#[strum(serialize_all = "lowercase")]
pub enum Flavor {
    #[default]
    Production,
    Debug,
}

/// What the engine is asked to do for one obligation.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
pub enum Plan {
    /// Register the specification as trusted, no symbolic execution.
    Trust,
    Verify { tactic: Tactic, shrink: bool },
    Sample { trials: u32 },
}

impl Mode {
    /// Name of the dispatcher entry point implementing this mode.
    pub fn entry_point(&self, flavor: Flavor) -> &'static str {
        let debug = flavor.is_debug();
        match self {
            Mode::Proof if debug => "really_verify",
            Mode::Proof => "verify",
            Mode::ProofWithHints(_) if debug => "really_verify_unint",
            Mode::ProofWithHints(_) => "verify_unint",
            Mode::ProofWithSimps { .. } if debug => "really_verify_simps",
            Mode::ProofWithSimps { .. } => "verify_simps",
            Mode::Sampling(_) if debug => "really_test",
            Mode::Sampling(_) => "test",
            Mode::Custom(_) if debug => "really_custom_verify",
            Mode::Custom(_) => "custom_verify",
            Mode::Shrinking(_) if debug => "really_verify_shake_unint",
            Mode::Shrinking(_) => "verify_shake_unint",
            Mode::Trusted => "admit",
            Mode::ShowAdmit => "show_admit",
            Mode::ShowGoal { .. } => "show_goal",
        }
    }
}

/// Decides how an obligation is checked.
pub fn plan(config: &ProcessConfig, mode: &Mode, flavor: Flavor) -> Plan {
    let verify = |tactic: Tactic| Plan::Verify {
        tactic,
        shrink: false,
    };

    match mode {
        Mode::Trusted => return Plan::Trust,
        Mode::ShowAdmit => return verify(show_admit_tactic()),
        Mode::ShowGoal {
            steps,
            uninterpreted,
        } => return verify(show_goal_tactic(steps.clone(), uninterpreted)),
        _ => {}
    }

    if flavor.is_production() && !config.do_prove() {
        return Plan::Trust;
    }

    let no_hints = UninterpretedSet::new();
    match (mode, flavor) {
        (Mode::Proof, Flavor::Production) => verify(select_tactic(config.debug(), &no_hints)),
        (Mode::Proof, Flavor::Debug) => verify(debug_tactic(&no_hints)),
        (Mode::ProofWithHints(unint), Flavor::Production) => {
            verify(select_tactic(config.debug(), unint))
        }
        (Mode::ProofWithHints(unint), Flavor::Debug) => verify(debug_tactic(unint)),
        // The debug switch is not consulted here.
        (
            Mode::ProofWithSimps {
                uninterpreted,
                steps,
            },
            _,
        ) => verify(custom(steps.clone(), uninterpreted)),
        (Mode::Sampling(trials), _) => Plan::Sample { trials: *trials },
        (Mode::Custom(tactic), _) => verify(tactic.clone()),
        (Mode::Shrinking(unint), _) => Plan::Verify {
            tactic: select_tactic(config.debug(), unint),
            shrink: true,
        },
        (Mode::Trusted | Mode::ShowAdmit | Mode::ShowGoal { .. }, _) => Plan::Trust,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tactic::{RuleSet, TacticStep, release_tactic, trust_tactic};

    const ASSUME: ProcessConfig = ProcessConfig::new(false, false);
    const RELEASE: ProcessConfig = ProcessConfig::new(true, false);
    const DEBUG: ProcessConfig = ProcessConfig::new(true, true);

    fn hints() -> UninterpretedSet {
        ["round"].into_iter().collect()
    }

    fn simps() -> Tactic {
        Tactic::new([TacticStep::Simplify(RuleSet::Named("bv_rules".into()))])
    }

    fn all_modes() -> Vec<Mode> {
        vec![
            Mode::Proof,
            Mode::ProofWithHints(hints()),
            Mode::ProofWithSimps {
                uninterpreted: hints(),
                steps: simps(),
            },
            Mode::Sampling(100),
            Mode::Custom(trust_tactic()),
            Mode::Shrinking(hints()),
            Mode::Trusted,
        ]
    }

    #[test]
    fn assume_mode_trusts_every_production_entry_point() {
        for mode in all_modes() {
            assert_eq!(plan(&ASSUME, &mode, Flavor::Production), Plan::Trust, "{:?}", mode);
        }
    }

    #[test]
    fn debug_flavor_ignores_do_prove() {
        for mode in all_modes() {
            let assumed = plan(&ASSUME, &mode, Flavor::Debug);
            let proved = plan(&RELEASE, &mode, Flavor::Debug);
            assert_eq!(assumed, proved, "{:?}", mode);
            assert_eq!(assumed.is_trust(), mode.is_trusted(), "{:?}", mode);
        }
    }

    #[test]
    fn proof_follows_debug_switch() {
        assert_eq!(
            plan(&RELEASE, &Mode::Proof, Flavor::Production),
            Plan::Verify {
                tactic: release_tactic(&UninterpretedSet::new()),
                shrink: false
            }
        );
        assert_eq!(
            plan(&DEBUG, &Mode::ProofWithHints(hints()), Flavor::Production),
            Plan::Verify {
                tactic: debug_tactic(&hints()),
                shrink: false
            }
        );
        assert_eq!(
            plan(&RELEASE, &Mode::ProofWithHints(hints()), Flavor::Debug),
            Plan::Verify {
                tactic: debug_tactic(&hints()),
                shrink: false
            }
        );
    }

    #[test]
    fn simps_never_use_debug_tactic() {
        let mode = Mode::ProofWithSimps {
            uninterpreted: hints(),
            steps: simps(),
        };
        let expected = Plan::Verify {
            tactic: custom(simps(), &hints()),
            shrink: false,
        };
        assert_eq!(plan(&DEBUG, &mode, Flavor::Production), expected);
        assert_eq!(plan(&RELEASE, &mode, Flavor::Debug), expected);
    }

    #[test]
    fn shrinking_requests_minimization() {
        let shrinking = plan(&DEBUG, &Mode::Shrinking(hints()), Flavor::Production);
        assert_eq!(
            shrinking,
            Plan::Verify {
                tactic: debug_tactic(&hints()),
                shrink: true
            }
        );
    }

    #[test]
    fn sampling_and_custom() {
        assert_eq!(
            plan(&RELEASE, &Mode::Sampling(25), Flavor::Production),
            Plan::Sample { trials: 25 }
        );
        let tactic = Tactic::new([TacticStep::PrintGoal, TacticStep::AssumeUnsat]);
        assert_eq!(
            plan(&RELEASE, &Mode::Custom(tactic.clone()), Flavor::Production),
            Plan::Verify {
                tactic,
                shrink: false
            }
        );
    }

    #[test]
    fn show_variants_always_run() {
        for config in [ASSUME, RELEASE, DEBUG] {
            assert_eq!(
                plan(&config, &Mode::ShowAdmit, Flavor::Production),
                Plan::Verify {
                    tactic: show_admit_tactic(),
                    shrink: false
                }
            );
            let show_goal = plan(
                &config,
                &Mode::ShowGoal {
                    steps: simps(),
                    uninterpreted: hints(),
                },
                Flavor::Production,
            );
            assert_eq!(
                show_goal,
                Plan::Verify {
                    tactic: show_goal_tactic(simps(), &hints()),
                    shrink: false
                }
            );
        }
    }

    #[test]
    fn entry_point_names() {
        assert_eq!(Mode::Proof.entry_point(Flavor::Production), "verify");
        assert_eq!(Mode::Proof.entry_point(Flavor::Debug), "really_verify");
        assert_eq!(
            Mode::Shrinking(hints()).entry_point(Flavor::Debug),
            "really_verify_shake_unint"
        );
        assert_eq!(Mode::Trusted.entry_point(Flavor::Debug), "admit");
    }
}
