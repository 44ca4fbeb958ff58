//! Boundary with the verification engine.
//!
//! The harness never executes or solves anything itself: it hands a target,
//! its overrides, its specification and a tactic to a [`VerificationEngine`]
//! and records the verdict.
use enum_map::Enum;
use strum::{Display, EnumIs};

use crate::{
    base::module::Module,
    dispatch::SpecHandle,
    specifications::base::FunctionSpecification,
    tactic::Tactic,
    utils::error::VhResult,
};

/// Verdict of one obligation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs)]
pub enum VerificationResult {
    Proved,
    /// The specification is trusted, nothing was checked.
    AssumedWithoutProof,
    /// No violation found in `trials` random inputs.
    SampledPass { trials: u32 },
    /// The specification does not hold; `reason` describes a counterexample.
    Failed { reason: String },
}

/// Discriminant of [`VerificationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Display)]
pub enum ResultKind {
    #[strum(to_string = "proved")]
    Proved,
    #[strum(to_string = "assumed without proof")]
    AssumedWithoutProof,
    #[strum(to_string = "sampled")]
    SampledPass,
    #[strum(to_string = "failed")]
    Failed,
}

impl VerificationResult {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ResultKind {
        match self {
            Self::Proved => ResultKind::Proved,
            Self::AssumedWithoutProof => ResultKind::AssumedWithoutProof,
            Self::SampledPass { .. } => ResultKind::SampledPass,
            Self::Failed { .. } => ResultKind::Failed,
        }
    }

    /// Whether the obligation was actually checked and found to hold.
    pub fn is_checked_pass(&self) -> bool {
        matches!(self, Self::Proved | Self::SampledPass { .. })
    }
}

impl std::fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proved => write!(f, "proved"),
            Self::AssumedWithoutProof => write!(f, "assumed without proof"),
            Self::SampledPass { trials } => write!(f, "passed {} sampled trials", trials),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Operations the harness consumes from a symbolic-execution engine.
///
/// Malformed inputs and environment failures are `Err`; a specification that
/// does not hold is `Ok(VerificationResult::Failed { .. })`.
pub trait VerificationEngine {
    /// Symbolically executes `target` against `spec` and closes the resulting
    /// goal with `tactic`. Calls to functions with an override use the
    /// override instead of their body. `shrink` requests the memory
    /// minimization pass before discharge.
    fn run_verification(
        &mut self,
        module: &Module,
        target: &str,
        overrides: &[SpecHandle],
        shrink: bool,
        spec: &FunctionSpecification,
        tactic: &Tactic,
    ) -> VhResult<VerificationResult>;

    /// Checks `spec` on `trials` random inputs.
    fn run_sampling(
        &mut self,
        module: &Module,
        target: &str,
        overrides: &[SpecHandle],
        spec: &FunctionSpecification,
        trials: u32,
    ) -> VhResult<VerificationResult>;

    /// Registers `spec` as a trusted substitute for the body of `target`.
    fn register_trusted(
        &mut self,
        module: &Module,
        target: &str,
        spec: &FunctionSpecification,
    ) -> VhResult<VerificationResult>;
}
