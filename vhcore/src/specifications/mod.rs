//! Function specifications and the builder that produces them.
pub mod base;
pub mod builder;
pub mod library;
pub mod memory;
