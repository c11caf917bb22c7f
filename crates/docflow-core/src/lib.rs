//! # docflow-core
//!
//! Core types, traits, and abstractions for the docflow service.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other docflow crates depend on.

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
