//! Handles to the artifacts under verification.
pub mod module;
