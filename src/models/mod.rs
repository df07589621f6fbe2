//! Core data model shared by the execution engine

mod types;

pub use types::*;
