use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use uuid::Uuid;

use crate::utils::{error::VhResult, opaque::OpaqueObject};

/// Immutable handle to a loaded artifact.
///
/// The payload is owned by the engine that loaded the artifact; the harness
/// only passes the handle around. Clones share the payload.
#[derive(Clone)]
pub struct Module {
    uuid: Uuid,
    path: PathBuf,
    inner: Arc<dyn OpaqueObject>,
}

impl Module {
    pub fn new(path: impl Into<PathBuf>, inner: Arc<dyn OpaqueObject>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            path: path.into(),
            inner,
        }
    }

    /// Identity of this load. Two loads of the same path are distinct modules.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The engine-side representation, if it is a `T`.
    pub fn downcast_ref<T: OpaqueObject>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("uuid", &self.uuid)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Turns a compiled artifact into a [`Module`]. Called once at startup.
pub trait ModuleLoader {
    fn load_module(&mut self, path: &Path) -> VhResult<Module>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Payload(u32);
    impl OpaqueObject for Payload {}

    struct Other;
    impl OpaqueObject for Other {}

    #[test]
    fn payload_is_shared_and_downcastable() {
        let module = Module::new("lib/target.bc", Arc::new(Payload(7)));
        let clone = module.clone();

        assert_eq!(clone.uuid(), module.uuid());
        assert_eq!(clone.path(), Path::new("lib/target.bc"));
        assert_eq!(clone.downcast_ref::<Payload>().map(|p| p.0), Some(7));
        assert!(clone.downcast_ref::<Other>().is_none());
    }
}
