//! Reference engine.
//!
//! A concrete stand-in for a symbolic-execution engine: target functions are
//! Rust models run on a small typed memory, and a specification is checked by
//! running its target on every assignment of its symbolic inputs (or on
//! random ones when sampling). It gives the harness an end-to-end engine for
//! tests and small examples; it is not a solver.
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    base::module::{Module, ModuleLoader},
    utils::{
        error::{HarnessError, VhResult},
        opaque::OpaqueObject,
    },
};

pub mod engine;
pub mod goal;
pub mod machine;
pub(crate) mod matching;

pub use engine::{ReferenceEngine, TranscriptEntry, TranscriptEvent};
pub use machine::{CallContext, Fault, Memory, RegionId, RuntimeValue};

/// Executable model of a target function.
pub type ModelFn = Arc<
    dyn Fn(&mut CallContext<'_>, &[RuntimeValue]) -> Result<Option<RuntimeValue>, Fault>
        + Send
        + Sync,
>;

/// The functions of a loaded artifact, as models.
#[derive(Clone, Default)]
pub struct ReferenceModule {
    functions: HashMap<String, ModelFn>,
}

impl OpaqueObject for ReferenceModule {}

impl ReferenceModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define<F>(&mut self, name: impl Into<String>, model: F)
    where
        F: Fn(&mut CallContext<'_>, &[RuntimeValue]) -> Result<Option<RuntimeValue>, Fault>
            + Send
            + Sync
            + 'static,
    {
        self.functions.insert(name.into(), Arc::new(model));
    }

    pub fn with_function<F>(mut self, name: impl Into<String>, model: F) -> Self
    where
        F: Fn(&mut CallContext<'_>, &[RuntimeValue]) -> Result<Option<RuntimeValue>, Fault>
            + Send
            + Sync
            + 'static,
    {
        self.define(name, model);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ModelFn> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ReferenceModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("ReferenceModule")
            .field("functions", &names)
            .finish()
    }
}

/// Loads [`ReferenceModule`]s registered under a path.
#[derive(Debug, Default)]
pub struct ReferenceLoader {
    modules: HashMap<PathBuf, Arc<ReferenceModule>>,
}

impl ReferenceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<PathBuf>, module: ReferenceModule) -> &mut Self {
        self.modules.insert(path.into(), Arc::new(module));
        self
    }
}

impl ModuleLoader for ReferenceLoader {
    fn load_module(&mut self, path: &Path) -> VhResult<Module> {
        let module = self
            .modules
            .get(path)
            .cloned()
            .ok_or_else(|| HarnessError::ModuleLoad {
                path: path.to_path_buf(),
                reason: "no reference module is registered under this path".to_string(),
            })?;
        Ok(Module::new(path, module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_resolves_registered_paths() {
        let mut loader = ReferenceLoader::new();
        loader.register(
            "add.bc",
            ReferenceModule::new().with_function("add", |_, args| Ok(args.first().cloned())),
        );

        let module = loader.load_module(Path::new("add.bc")).unwrap();
        let functions = module.downcast_ref::<ReferenceModule>().unwrap();
        assert!(functions.contains("add"));

        let err = loader.load_module(Path::new("missing.bc")).unwrap_err();
        assert!(matches!(err, HarnessError::ModuleLoad { .. }));
    }
}
