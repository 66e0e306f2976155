//! Shared fixtures and the reference GLR engine used by the integration
//! tests.

pub mod engine;
pub mod grammars;
