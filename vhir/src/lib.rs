//! Value-level vocabulary of the verification harness.
//!
//! - [`types`]: fixed-width integer, pointer and aggregate type descriptors.
//! - [`value`]: concrete values, always masked to their width.
//! - [`term`]: symbolic values and typed terms (typing, evaluation,
//!   simplification and pretty printing).
//!
//! ```
//! use vhir::prelude::*;
//!
//! let x = SymbolicValue::new(SymbolId(0), "x", TypeDescriptor::I8);
//! let goal = (x.term() + Term::int(IType::I8, 0)).equals(x.term());
//! assert_eq!(goal.to_string(), "x + 0 == x");
//! assert_eq!(goal.apply_identities(), Term::bool(true));
//! ```

pub mod term;
pub mod types;
pub mod value;

pub mod prelude {
    //! Convenient re-exports for end users.
    pub use crate::term::{
        Assignment, BinaryOp, EvalError, SymbolId, SymbolicValue, Term, TypeError, UnaryOp,
        pretty::PrettyTerm,
    };
    pub use crate::types::{IType, TypeDescriptor};
    pub use crate::value::{IntValue, Value};
}
