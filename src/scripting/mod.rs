//! Sandboxed user scripting
//!
//! Pre-request and test scripts run inside a QuickJS context with no I/O;
//! the only external surface is the `pm` object, built fresh for each
//! execution over the caller's [`crate::models::ScriptScope`].

mod bridge;
mod engine;

pub use engine::ScriptEngine;
