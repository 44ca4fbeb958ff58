//! Obligation dispatcher.
//!
//! The dispatcher binds a target, its overrides and its specification to a
//! plan chosen by [`crate::policy::plan`], runs the plan on the engine and
//! records the verdict. Every entry point of the harness is a thin wrapper
//! around [`Dispatcher::dispatch`].
use std::{path::Path, sync::Arc};

use chrono::{DateTime, Local};
use log::debug;
use uuid::Uuid;

use crate::{
    base::module::{Module, ModuleLoader},
    engine::{VerificationEngine, VerificationResult},
    ext::journal::Journal,
    magic::{DEFAULT_SAMPLING_TRIALS, TAG_ASSUMED, TAG_FAILED, TAG_PROVED, TAG_SAMPLED},
    policy::{Flavor, Mode, Plan, plan},
    specifications::{
        base::FunctionSpecification,
        library::{SpecLibrary, Summary},
    },
    tactic::{Tactic, UninterpretedSet},
    utils::{
        conf::ProcessConfig,
        error::{HarnessError, VhResult},
    },
    vherror, vhinfo, vhwarn,
};

#[derive(Debug)]
struct Obligation {
    target: String,
    entry_point: &'static str,
    spec: FunctionSpecification,
    result: VerificationResult,
    timestamp: DateTime<Local>,
}

/// Record of one dispatched obligation.
///
/// Handles are cheap to clone and are what later obligations receive as
/// overrides.
#[derive(Debug, Clone)]
pub struct SpecHandle(Arc<Obligation>);

impl SpecHandle {
    pub(crate) fn new(
        target: impl Into<String>,
        entry_point: &'static str,
        spec: FunctionSpecification,
        result: VerificationResult,
    ) -> Self {
        Self(Arc::new(Obligation {
            target: target.into(),
            entry_point,
            spec,
            result,
            timestamp: Local::now(),
        }))
    }

    /// Uuid of the specification.
    pub fn uuid(&self) -> Uuid {
        self.0.spec.uuid()
    }

    pub fn target(&self) -> &str {
        &self.0.target
    }

    /// Name of the dispatcher entry point that produced the verdict.
    pub fn entry_point(&self) -> &'static str {
        self.0.entry_point
    }

    pub fn specification(&self) -> &FunctionSpecification {
        &self.0.spec
    }

    pub fn result(&self) -> &VerificationResult {
        &self.0.result
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.0.timestamp
    }
}

/// Runs proof obligations against one module with one engine.
pub struct Dispatcher<E: VerificationEngine> {
    config: ProcessConfig,
    module: Module,
    engine: E,
    journal: Journal,
    library: SpecLibrary,
}

impl<E: VerificationEngine> std::fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("module", &self.module)
            .field("obligations", &self.library.len())
            .finish_non_exhaustive()
    }
}

impl<E: VerificationEngine> Dispatcher<E> {
    pub fn new(config: ProcessConfig, module: Module, engine: E) -> Self {
        Self {
            config,
            module,
            engine,
            journal: Journal::default(),
            library: SpecLibrary::new(),
        }
    }

    /// Loads the module at `path` and builds a dispatcher over it.
    pub fn load(
        config: ProcessConfig,
        loader: &mut impl ModuleLoader,
        path: impl AsRef<Path>,
        engine: E,
    ) -> VhResult<Self> {
        let module = loader.load_module(path.as_ref())?;
        debug!("Loaded module {} from {}", module.uuid(), module.path().display());
        Ok(Self::new(config, module, engine))
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn library(&self) -> &SpecLibrary {
        &self.library
    }

    pub fn summary(&self) -> Summary {
        self.library.summary()
    }

    /// Checks `spec` for `target` as requested by `mode` and `flavor`.
    ///
    /// Malformed inputs and engine failures are returned as errors, unmodified.
    /// A specification that does not hold yields a handle whose result is
    /// [`VerificationResult::Failed`].
    pub fn dispatch(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
        mode: Mode,
        flavor: Flavor,
    ) -> VhResult<SpecHandle> {
        let entry_point = mode.entry_point(flavor);
        if let Some(previous) = self.library.get_by_uuid(spec.uuid()) {
            if previous.entry_point() != entry_point {
                return Err(HarnessError::ConflictingDispatch {
                    uuid: spec.uuid(),
                    target: target.to_string(),
                    previous: previous.entry_point(),
                    requested: entry_point,
                });
            }
        }

        for over in overrides {
            if over.result().is_failed() {
                vhwarn!(
                    self.journal,
                    "`{}` uses the override of `{}` ({}) whose own verification failed",
                    target,
                    over.target(),
                    over.uuid()
                );
            }
        }

        let selected = plan(&self.config, &mode, flavor);
        debug!("`{}` via `{}`: {:?}", target, entry_point, selected);

        let result = match &selected {
            Plan::Trust => self.engine.register_trusted(&self.module, target, &spec)?,
            Plan::Verify { tactic, shrink } => self.engine.run_verification(
                &self.module,
                target,
                overrides,
                *shrink,
                &spec,
                tactic,
            )?,
            Plan::Sample { trials } => {
                self.engine
                    .run_sampling(&self.module, target, overrides, &spec, *trials)?
            }
        };
        let result = self.audit(target, &selected, result);

        let handle = SpecHandle::new(target, entry_point, spec, result);
        self.record(&handle);
        self.library.insert(handle.clone());
        Ok(handle)
    }

    /// A plan that never proves anything cannot produce a proof.
    fn audit(&self, target: &str, plan: &Plan, result: VerificationResult) -> VerificationResult {
        let trusting = match plan {
            Plan::Trust => true,
            Plan::Verify { tactic, .. } => tactic.is_trusting(),
            Plan::Sample { .. } => false,
        };
        if trusting && result.is_checked_pass() {
            vhwarn!(
                self.journal,
                "engine reported `{}` for `{}` under a trusting plan, recording it as assumed",
                result,
                target
            );
            return VerificationResult::AssumedWithoutProof;
        }
        result
    }

    fn record(&self, handle: &SpecHandle) {
        let target = handle.target();
        let entry_point = handle.entry_point();
        match handle.result() {
            VerificationResult::Proved => {
                vhinfo!(self.journal, "[{}] `{}` via {}", TAG_PROVED, target, entry_point);
            }
            VerificationResult::AssumedWithoutProof => {
                vhwarn!(
                    self.journal,
                    "[{}] `{}` via {} (not proved)",
                    TAG_ASSUMED,
                    target,
                    entry_point
                );
            }
            VerificationResult::SampledPass { trials } => {
                vhinfo!(
                    self.journal,
                    "[{}] `{}` via {} ({} trials)",
                    TAG_SAMPLED,
                    target,
                    entry_point,
                    trials
                );
            }
            VerificationResult::Failed { reason } => {
                vherror!(
                    self.journal,
                    "[{}] `{}` via {}: {}",
                    TAG_FAILED,
                    target,
                    entry_point,
                    reason
                );
            }
        }
    }

    pub fn verify(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
    ) -> VhResult<SpecHandle> {
        self.dispatch(target, overrides, spec, Mode::Proof, Flavor::Production)
    }

    pub fn verify_unint(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
        uninterpreted: UninterpretedSet,
    ) -> VhResult<SpecHandle> {
        let mode = Mode::ProofWithHints(uninterpreted);
        self.dispatch(target, overrides, spec, mode, Flavor::Production)
    }

    pub fn verify_simps(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
        uninterpreted: UninterpretedSet,
        steps: Tactic,
    ) -> VhResult<SpecHandle> {
        let mode = Mode::ProofWithSimps {
            uninterpreted,
            steps,
        };
        self.dispatch(target, overrides, spec, mode, Flavor::Production)
    }

    pub fn test(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
    ) -> VhResult<SpecHandle> {
        let mode = Mode::Sampling(DEFAULT_SAMPLING_TRIALS);
        self.dispatch(target, overrides, spec, mode, Flavor::Production)
    }

    pub fn custom_verify(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
        tactic: Tactic,
    ) -> VhResult<SpecHandle> {
        self.dispatch(target, overrides, spec, Mode::Custom(tactic), Flavor::Production)
    }

    pub fn verify_shake_unint(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
        uninterpreted: UninterpretedSet,
    ) -> VhResult<SpecHandle> {
        let mode = Mode::Shrinking(uninterpreted);
        self.dispatch(target, overrides, spec, mode, Flavor::Production)
    }

    /// Trusts `spec` without checking it, whatever the configuration.
    pub fn admit(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
    ) -> VhResult<SpecHandle> {
        self.dispatch(target, overrides, spec, Mode::Trusted, Flavor::Production)
    }

    pub fn really_verify(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
    ) -> VhResult<SpecHandle> {
        self.dispatch(target, overrides, spec, Mode::Proof, Flavor::Debug)
    }

    pub fn really_verify_unint(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
        uninterpreted: UninterpretedSet,
    ) -> VhResult<SpecHandle> {
        let mode = Mode::ProofWithHints(uninterpreted);
        self.dispatch(target, overrides, spec, mode, Flavor::Debug)
    }

    pub fn really_verify_simps(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
        uninterpreted: UninterpretedSet,
        steps: Tactic,
    ) -> VhResult<SpecHandle> {
        let mode = Mode::ProofWithSimps {
            uninterpreted,
            steps,
        };
        self.dispatch(target, overrides, spec, mode, Flavor::Debug)
    }

    pub fn really_test(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
    ) -> VhResult<SpecHandle> {
        let mode = Mode::Sampling(DEFAULT_SAMPLING_TRIALS);
        self.dispatch(target, overrides, spec, mode, Flavor::Debug)
    }

    pub fn really_custom_verify(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
        tactic: Tactic,
    ) -> VhResult<SpecHandle> {
        self.dispatch(target, overrides, spec, Mode::Custom(tactic), Flavor::Debug)
    }

    pub fn really_verify_shake_unint(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
        uninterpreted: UninterpretedSet,
    ) -> VhResult<SpecHandle> {
        let mode = Mode::Shrinking(uninterpreted);
        self.dispatch(target, overrides, spec, mode, Flavor::Debug)
    }

    /// Prints what admitting `spec` leaves unproven, then trusts it.
    pub fn show_admit(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
    ) -> VhResult<SpecHandle> {
        self.dispatch(target, overrides, spec, Mode::ShowAdmit, Flavor::Debug)
    }

    /// Runs `steps`, prints the resulting goal, then discharges it.
    pub fn show_goal(
        &mut self,
        target: &str,
        overrides: &[SpecHandle],
        spec: FunctionSpecification,
        steps: Tactic,
        uninterpreted: UninterpretedSet,
    ) -> VhResult<SpecHandle> {
        let mode = Mode::ShowGoal {
            steps,
            uninterpreted,
        };
        self.dispatch(target, overrides, spec, mode, Flavor::Debug)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::{
        ext::journal::{LogLevel, LogMessage},
        specifications::builder::SpecBuilder,
        tactic::trust_tactic,
        utils::opaque::OpaqueObject,
    };

    struct Artifact;
    impl OpaqueObject for Artifact {}

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Verify { target: String, shrink: bool, tactic: Tactic },
        Sample { target: String, trials: u32 },
        Trust { target: String },
    }

    /// Engine answering every request with a fixed verdict.
    struct Scripted {
        answer: VerificationResult,
        calls: Vec<Call>,
    }

    impl Scripted {
        fn new(answer: VerificationResult) -> Self {
            Self {
                answer,
                calls: Vec::new(),
            }
        }
    }

    impl VerificationEngine for Scripted {
        fn run_verification(
            &mut self,
            _module: &Module,
            target: &str,
            _overrides: &[SpecHandle],
            shrink: bool,
            _spec: &FunctionSpecification,
            tactic: &Tactic,
        ) -> VhResult<VerificationResult> {
            self.calls.push(Call::Verify {
                target: target.to_string(),
                shrink,
                tactic: tactic.clone(),
            });
            Ok(self.answer.clone())
        }

        fn run_sampling(
            &mut self,
            _module: &Module,
            target: &str,
            _overrides: &[SpecHandle],
            _spec: &FunctionSpecification,
            trials: u32,
        ) -> VhResult<VerificationResult> {
            self.calls.push(Call::Sample {
                target: target.to_string(),
                trials,
            });
            Ok(self.answer.clone())
        }

        fn register_trusted(
            &mut self,
            _module: &Module,
            target: &str,
            _spec: &FunctionSpecification,
        ) -> VhResult<VerificationResult> {
            self.calls.push(Call::Trust {
                target: target.to_string(),
            });
            Ok(self.answer.clone())
        }
    }

    fn dispatcher(
        config: ProcessConfig,
        answer: VerificationResult,
    ) -> (Dispatcher<Scripted>, Arc<Mutex<Vec<LogMessage>>>) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let inner = sink.clone();
        let journal = Journal::with_callback(
            LogLevel::Trace,
            Box::new(move |msg: &LogMessage| inner.lock().push(msg.clone())),
        );
        let module = Module::new("artifact.bc", Arc::new(Artifact));
        let dispatcher =
            Dispatcher::new(config, module, Scripted::new(answer)).with_journal(journal);
        (dispatcher, sink)
    }

    fn spec() -> FunctionSpecification {
        let mut builder = SpecBuilder::new();
        builder.execute([]).unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn assume_mode_only_registers() {
        let (mut d, _) = dispatcher(
            ProcessConfig::assume_only(),
            VerificationResult::AssumedWithoutProof,
        );
        let handle = d.verify("f", &[], spec()).unwrap();
        assert!(handle.result().is_assumed_without_proof());
        assert_eq!(
            d.engine().calls,
            vec![Call::Trust {
                target: "f".into()
            }]
        );
    }

    #[test]
    fn test_uses_default_trials() {
        let (mut d, _) = dispatcher(
            ProcessConfig::proving(),
            VerificationResult::SampledPass { trials: 100 },
        );
        d.test("f", &[], spec()).unwrap();
        assert_eq!(
            d.engine().calls,
            vec![Call::Sample {
                target: "f".into(),
                trials: 100
            }]
        );
    }

    #[test]
    fn shake_requests_shrinking() {
        let (mut d, _) = dispatcher(ProcessConfig::proving(), VerificationResult::Proved);
        d.verify_shake_unint("f", &[], spec(), ["g"].into_iter().collect())
            .unwrap();
        assert!(matches!(
            &d.engine().calls[..],
            [Call::Verify { shrink: true, .. }]
        ));
    }

    #[test]
    fn trusting_plans_cannot_prove() {
        let (mut d, sink) = dispatcher(ProcessConfig::proving(), VerificationResult::Proved);
        let admitted = d.admit("f", &[], spec()).unwrap();
        let custom = d.custom_verify("g", &[], spec(), trust_tactic()).unwrap();

        assert!(admitted.result().is_assumed_without_proof());
        assert!(custom.result().is_assumed_without_proof());
        let warnings = sink
            .lock()
            .iter()
            .filter(|msg| msg.level == LogLevel::Warn && msg.message.contains(TAG_ASSUMED))
            .count();
        assert_eq!(warnings, 2);
    }

    #[test]
    fn same_spec_through_two_entry_points_is_rejected() {
        let (mut d, _) = dispatcher(ProcessConfig::proving(), VerificationResult::Proved);
        let spec = spec();
        d.verify("f", &[], spec.clone()).unwrap();
        d.verify("f", &[], spec.clone()).unwrap();
        let err = d.really_verify("f", &[], spec).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::ConflictingDispatch {
                previous: "verify",
                requested: "really_verify",
                ..
            }
        ));
        assert_eq!(d.library().len(), 2);
    }

    #[test]
    fn failed_override_is_reported() {
        let (mut d, sink) =
            dispatcher(ProcessConfig::proving(), VerificationResult::failed("r = 0"));
        let callee = d.verify("callee", &[], spec()).unwrap();
        assert!(callee.result().is_failed());
        d.verify("caller", &[callee], spec()).unwrap();

        let messages = sink.lock();
        assert!(messages.iter().any(|msg| msg.level == LogLevel::Error
            && msg.message.contains(TAG_FAILED)
            && msg.message.contains("r = 0")));
        assert!(messages
            .iter()
            .any(|msg| msg.level == LogLevel::Warn && msg.message.contains("`callee`")));
    }

    #[test]
    fn summary_counts_every_obligation() {
        let (mut d, _) = dispatcher(ProcessConfig::proving(), VerificationResult::Proved);
        d.verify("f", &[], spec()).unwrap();
        d.admit("g", &[], spec()).unwrap();
        assert_eq!(
            d.summary().to_string(),
            "1 proved, 1 assumed without proof, 0 sampled, 0 failed"
        );
    }
}
