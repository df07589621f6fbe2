//! Variable resolution
//!
//! Two independent substitution passes over request text: dynamic
//! generators (`{{$randomUUID}}`) first, then named variables (`{{host}}`)
//! looked up across the merged global/environment/script scopes.

mod magic;
mod resolver;

pub use magic::{expand_dynamic_values, has_dynamic_values};
pub use resolver::{build_variable_map, resolve, resolve_request};
