use std::path::PathBuf;

use thiserror::Error;
use vhir::{
    term::{SymbolId, TypeError},
    types::TypeDescriptor,
};

use crate::specifications::memory::{AllocId, Phase};

/// Errors raised while a specification is being constructed.
///
/// These are always fatal for the specification under construction: the
/// builder reports them immediately and never tries to repair the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecificationError {
    #[error("{context}: expected a value of type {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: TypeDescriptor,
        found: TypeDescriptor,
    },

    #[error("ill-typed term: {0}")]
    IllTyped(#[from] TypeError),

    #[error("region {handle} is read-only and already bound, it cannot be rebound")]
    ReadonlyMutation { handle: AllocId },

    #[error("symbol `{name}` ({id}) is not declared in the {phase} state of this specification")]
    UnboundSymbol {
        name: String,
        id: SymbolId,
        phase: Phase,
    },

    #[error("region {handle} was not allocated by this specification")]
    ForeignHandle { handle: AllocId },

    #[error("`{operation}` is not allowed in the {phase} state")]
    WrongPhase {
        operation: &'static str,
        phase: Phase,
    },

    #[error("the return value of the specification was already set")]
    DuplicateReturn,

    #[error("the specification never executes the target function")]
    MissingExecute,

    #[error("fresh value `{name}` cannot have pointer type {ty}, allocate a region instead")]
    PointerSymbol { name: String, ty: TypeDescriptor },
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file '{file}': {source}")]
    ConfigParse {
        source: toml::de::Error,
        file: String,
    },

    #[error("Invalid value '{value}' for configuration key '{key}'")]
    ConfigValue { key: String, value: String },

    #[error("Malformed specification: {0}")]
    Specification(#[from] SpecificationError),

    #[error("Failed to load module '{}': {reason}", path.display())]
    ModuleLoad { path: PathBuf, reason: String },

    #[error("Function '{0}' does not exist in the loaded module")]
    UnknownTarget(String),

    #[error(
        "Specification {uuid} for '{target}' was already dispatched through `{previous}`, refusing `{requested}`"
    )]
    ConflictingDispatch {
        uuid: uuid::Uuid,
        target: String,
        previous: &'static str,
        requested: &'static str,
    },

    #[error("Verification engine error: {0}")]
    Engine(String),

    #[error("Unsupported by the verification engine: {0}")]
    Unsupported(String),
}

pub type VhResult<T> = Result<T, HarnessError>;
