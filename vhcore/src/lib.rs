//! Proof-obligation dispatcher and symbolic memory setup for function-level
//! verification.
//!
//! A client describes the pre and post state of a function with a
//! [`specifications::builder::SpecBuilder`], then hands it to a
//! [`dispatch::Dispatcher`] through one of its entry points (`verify`,
//! `verify_unint`, `test`, `admit`, ...). The [`policy`] table decides, from
//! the process configuration and the entry point, whether the specification is
//! proved, sampled or trusted, and the chosen [`tactic`] is run by a
//! [`engine::VerificationEngine`]. Every outcome is recorded in the dispatcher
//! library and reported through its [`ext::journal::Journal`].
//!
//! [`reference`] provides an engine over Rust models of the target functions.
//!
//! ```
//! use std::sync::Arc;
//!
//! use vhcore::prelude::*;
//! use vhir::prelude::*;
//!
//! let functions = ReferenceModule::new().with_function("double", |_, args| {
//!     let x = args[0].expect_int()?;
//!     Ok(Some(IntValue::new(x.ty(), x.bits() * 2).into()))
//! });
//! let module = Module::new("double.bc", Arc::new(functions));
//! let mut dispatcher = Dispatcher::new(ProcessConfig::default(), module, ReferenceEngine::new());
//!
//! let mut spec = SpecBuilder::new();
//! let x = spec.fresh_symbolic("x", TypeDescriptor::I8)?;
//! spec.execute([SetupValue::from(&x)])?;
//! spec.returns(x.term() + x.term())?;
//!
//! let handle = dispatcher.verify("double", &[], spec.finish()?)?;
//! assert_eq!(handle.result(), &VerificationResult::Proved);
//! # Ok::<(), HarnessError>(())
//! ```

pub mod base;
pub mod dispatch;
pub mod engine;
pub mod ext;
pub mod magic;
pub mod policy;
pub mod reference;
pub mod specifications;
pub mod tactic;
pub mod utils;

pub extern crate chrono;

pub mod prelude {
    //! Convenient re-exports for end users.
    pub use crate::base::module::{Module, ModuleLoader};
    pub use crate::dispatch::{Dispatcher, SpecHandle};
    pub use crate::engine::{ResultKind, VerificationEngine, VerificationResult};
    pub use crate::ext::journal::{Journal, LogLevel, LogMessage};
    pub use crate::policy::{Flavor, Mode, Plan, plan};
    pub use crate::reference::{
        ReferenceEngine, ReferenceLoader, ReferenceModule, RuntimeValue, TranscriptEvent,
    };
    pub use crate::specifications::{
        base::FunctionSpecification,
        builder::{MemoryBuilder, SetupScope, SpecBuilder},
        library::{SpecLibrary, Summary},
        memory::{MemoryHandle, Phase, PointsTo, SetupValue},
    };
    pub use crate::tactic::{
        RuleSet, Tactic, TacticStep, UninterpretedSet, custom, debug_tactic,
        default_sampling_tactic, release_tactic, sampling_tactic, select_tactic,
        show_admit_tactic, show_goal_tactic, trust_tactic,
    };
    pub use crate::utils::{
        conf::ProcessConfig,
        error::{HarnessError, SpecificationError, VhResult},
    };
}
