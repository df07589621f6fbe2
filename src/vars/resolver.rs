//! Named variable substitution
//!
//! Builds one merged map per resolution in ascending precedence order:
//! globals, then the active environment, then script variables. Disabled
//! variables never enter the map. A `{{name}}` with no match anywhere is
//! left as the literal tag.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

use super::magic::expand_dynamic_values;
use crate::models::{Environment, RequestTemplate, Variable};

static NAMED_VAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

/// Merge variable scopes into a single lookup map.
///
/// Later scopes overwrite earlier ones: globals < active environment <
/// script variables.
pub fn build_variable_map(
    active_env_id: Option<&str>,
    environments: &[Environment],
    globals: &[Variable],
    script_vars: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for var in globals.iter().filter(|v| v.enabled) {
        map.insert(var.key.clone(), var.value.clone());
    }

    if let Some(env_id) = active_env_id {
        if let Some(env) = environments.iter().find(|e| e.id == env_id) {
            for var in env.variables.iter().filter(|v| v.enabled) {
                map.insert(var.key.clone(), var.value.clone());
            }
        }
    }

    for (key, value) in script_vars {
        map.insert(key.clone(), value.clone());
    }

    map
}

/// Resolve one piece of text: dynamic generators first, then named
/// variables against the merged map.
pub fn resolve(text: &str, variables: &HashMap<String, String>) -> String {
    let expanded = expand_dynamic_values(text);

    NAMED_VAR_RE
        .replace_all(&expanded, |caps: &Captures<'_>| {
            variables
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Resolve an entire request template, returning a structurally identical
/// copy with only textual fields substituted: URL, header and query-param
/// keys and values, body text, and form-field keys and values.
pub fn resolve_request(
    request: &RequestTemplate,
    variables: &HashMap<String, String>,
) -> RequestTemplate {
    let resolve_vars = |vars: &[Variable]| -> Vec<Variable> {
        vars.iter()
            .map(|v| Variable {
                key: resolve(&v.key, variables),
                value: resolve(&v.value, variables),
                enabled: v.enabled,
            })
            .collect()
    };

    let mut resolved = request.clone();
    resolved.url = resolve(&request.url, variables);
    resolved.params = resolve_vars(&request.params);
    resolved.headers = resolve_vars(&request.headers);
    resolved.form = resolve_vars(&request.form);
    resolved.body = resolve(&request.body, variables);
    resolved
}
