use downcast_rs::{DowncastSync, impl_downcast};

/// Type-erased payload owned by the harness but only understood by the engine
/// that produced it (e.g. the engine-side representation of a loaded module).
pub trait OpaqueObject: DowncastSync {}
impl_downcast!(sync OpaqueObject);
