//! Script engine powered by QuickJS
//!
//! Each execution gets a fresh context: the caller's scope maps are
//! injected, a prelude builds the `pm` object over them, the user script
//! runs, and the mutated maps plus recorded test outcomes are harvested
//! back out as JSON. Scripts can define arbitrary local helpers but reach
//! external state only through `pm`.

use rquickjs::{Context, Runtime, Value};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use super::bridge;
use crate::errors::{ReqforgeError, Result};
use crate::models::{ResponseData, ScriptScope, TestOutcome};

/// Memory limit per script context, prevents runaway scripts
const SCRIPT_MEMORY_LIMIT: usize = 64 * 1024 * 1024;

/// Max stack size per script context
const SCRIPT_STACK_LIMIT: usize = 1024 * 1024;

/// Name of the synthetic outcome recorded when a test script throws
/// outside of `pm.test`
const SCRIPT_ERROR_OUTCOME: &str = "Script error";

/// The `pm` object definition, evaluated ahead of every user script.
///
/// `__pm_env`, `__pm_globals`, `__pm_test_mode` and (in test mode)
/// `__pm_response` are set on the global object before this runs. The
/// prelude leaves everything the host needs to read back in
/// `globalThis.__pm_state`.
///
/// `to.eql` compares `JSON.stringify` output and is therefore sensitive
/// to object key insertion order; existing test suites depend on that
/// behavior, so it stays.
const PM_PRELUDE: &str = r#"
const pm = (() => {
    const state = globalThis.__pm_state = {
        environment: globalThis.__pm_env,
        globals: globalThis.__pm_globals,
        outcomes: [],
        script_error: null,
    };
    const scope = (map) => ({
        get: (key) => Object.prototype.hasOwnProperty.call(map, key) ? map[key] : undefined,
        set: (key, value) => { map[String(key)] = String(value); },
        unset: (key) => { delete map[String(key)]; },
    });
    const api = {
        environment: scope(state.environment),
        globals: scope(state.globals),
    };
    if (!globalThis.__pm_test_mode) {
        return api;
    }
    const show = (v) => {
        try {
            const s = JSON.stringify(v);
            return s === undefined ? String(v) : s;
        } catch (_) {
            return String(v);
        }
    };
    const fail = (msg) => { throw new Error(msg); };
    const expectation = (value) => {
        const self = {};
        const to = self.to = {};
        to.equal = (other) => {
            if (value !== other) fail("expected " + show(value) + " to equal " + show(other));
            return self;
        };
        to.eql = (other) => {
            if (JSON.stringify(value) !== JSON.stringify(other))
                fail("expected " + show(value) + " to deeply equal " + show(other));
            return self;
        };
        to.include = (needle) => {
            if (typeof value === "string") {
                if (value.indexOf(needle) === -1)
                    fail("expected " + show(value) + " to include " + show(needle));
            } else if (Array.isArray(value)) {
                if (value.indexOf(needle) === -1)
                    fail("expected " + show(value) + " to include " + show(needle));
            } else {
                fail("expected a string or array, got " + show(value));
            }
            return self;
        };
        to.above = (n) => {
            if (!(value > n)) fail("expected " + show(value) + " to be above " + show(n));
            return self;
        };
        to.below = (n) => {
            if (!(value < n)) fail("expected " + show(value) + " to be below " + show(n));
            return self;
        };
        to.a = (type) => {
            const actual = Array.isArray(value) ? "array" : typeof value;
            if (actual !== type)
                fail("expected " + show(value) + " to be a " + type + ", got " + actual);
            return self;
        };
        const be = to.be = {};
        const term = (name, ok) => Object.defineProperty(be, name, {
            get: () => {
                if (!ok()) fail("expected " + show(value) + " to be " + name);
                return self;
            },
        });
        term("ok", () => !!value);
        term("true", () => value === true);
        term("false", () => value === false);
        term("null", () => value === null);
        term("undefined", () => value === undefined);
        to.have = {
            property: (key) => {
                if (value === null || value === undefined
                    || !Object.prototype.hasOwnProperty.call(Object(value), key)) {
                    fail("expected " + show(value) + " to have property " + show(key));
                }
                return expectation(value[key]);
            },
        };
        return self;
    };
    api.expect = expectation;
    api.test = (name, fn) => {
        try {
            fn();
            state.outcomes.push({ name: String(name), passed: true });
        } catch (e) {
            state.outcomes.push({
                name: String(name),
                passed: false,
                error: (e && e.message) ? String(e.message) : String(e),
            });
        }
    };
    const raw = globalThis.__pm_response;
    api.response = {
        code: raw.status,
        status: raw.status_text,
        headers: raw.headers,
        time: raw.time,
        json: () => {
            if (!raw.is_json) throw new Error("response body is not JSON");
            return raw.data;
        },
        text: () => raw.text,
    };
    return api;
})();
"#;

/// Everything read back from a finished script
struct Harvest {
    environment: HashMap<String, String>,
    globals: HashMap<String, String>,
    outcomes: Vec<TestOutcome>,
    script_error: Option<String>,
}

/// Script engine holding one QuickJS runtime, reused across executions
pub struct ScriptEngine {
    runtime: Runtime,
}

impl ScriptEngine {
    pub fn new() -> Result<Self> {
        let runtime = Runtime::new()
            .map_err(|e| ReqforgeError::Script(format!("failed to create JS runtime: {}", e)))?;
        runtime.set_memory_limit(SCRIPT_MEMORY_LIMIT);
        runtime.set_max_stack_size(SCRIPT_STACK_LIMIT);
        Ok(Self { runtime })
    }

    /// Run a pre-request script. Scope mutations are applied on success;
    /// a throwing script aborts the whole request with its message.
    pub fn run_pre_request(&self, source: &str, scope: &mut ScriptScope) -> Result<()> {
        let harvest = self.run(source, scope, None)?;
        if let Some(message) = harvest.script_error {
            return Err(ReqforgeError::Script(message));
        }
        scope.environment = harvest.environment;
        scope.globals = harvest.globals;
        Ok(())
    }

    /// Run a test script against an already-received response.
    ///
    /// Never fails: a top-level throw (or an engine failure) becomes a
    /// single synthetic failing outcome, appended after whatever
    /// `pm.test` outcomes were recorded before the throw.
    pub fn run_test(
        &self,
        source: &str,
        scope: &mut ScriptScope,
        response: &ResponseData,
    ) -> Vec<TestOutcome> {
        match self.run(source, scope, Some(response)) {
            Ok(harvest) => {
                scope.environment = harvest.environment;
                scope.globals = harvest.globals;
                let mut outcomes = harvest.outcomes;
                if let Some(message) = harvest.script_error {
                    outcomes.push(TestOutcome::failed(SCRIPT_ERROR_OUTCOME, message));
                }
                outcomes
            }
            Err(e) => vec![TestOutcome::failed(SCRIPT_ERROR_OUTCOME, e.to_string())],
        }
    }

    fn run(
        &self,
        source: &str,
        scope: &ScriptScope,
        response: Option<&ResponseData>,
    ) -> Result<Harvest> {
        let context = Context::full(&self.runtime)
            .map_err(|e| ReqforgeError::Script(format!("failed to create JS context: {}", e)))?;

        // The user script runs inside a try/catch so anything it throws
        // lands in __pm_state.script_error instead of tearing down eval;
        // only syntax errors surface as an eval failure.
        let wrapped = format!(
            "{}\ntry {{\n{}\n}} catch (__e) {{ globalThis.__pm_state.script_error = (__e && __e.message) ? String(__e.message) : String(__e); }}",
            PM_PRELUDE, source
        );

        context.with(|ctx| -> Result<Harvest> {
            let globals = ctx.globals();
            globals.set("__pm_env", bridge::string_map_to_js(&ctx, &scope.environment)?)?;
            globals.set("__pm_globals", bridge::string_map_to_js(&ctx, &scope.globals)?)?;
            globals.set("__pm_test_mode", response.is_some())?;
            if let Some(resp) = response {
                globals.set("__pm_response", bridge::response_to_js(&ctx, resp)?)?;
            }

            let _: Value<'_> = ctx
                .eval(wrapped.as_bytes())
                .map_err(|e| ReqforgeError::Script(format!("script evaluation failed: {}", e)))?;

            let state_json: String = ctx
                .eval("JSON.stringify(globalThis.__pm_state)".as_bytes())
                .map_err(|e| ReqforgeError::Script(format!("failed to read script state: {}", e)))?;

            parse_harvest(&state_json)
        })
    }
}

fn parse_harvest(state_json: &str) -> Result<Harvest> {
    let state: JsonValue = serde_json::from_str(state_json)
        .map_err(|e| ReqforgeError::Script(format!("invalid script state: {}", e)))?;

    let outcomes = state
        .get("outcomes")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .map(|item| TestOutcome {
                    name: item
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    passed: item.get("passed").and_then(|v| v.as_bool()).unwrap_or(false),
                    error: item
                        .get("error")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string()),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Harvest {
        environment: coerce_string_map(state.get("environment")),
        globals: coerce_string_map(state.get("globals")),
        outcomes,
        script_error: state
            .get("script_error")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
    })
}

/// Scripts should only write strings into the scope maps, but nothing
/// stops one from poking other values in; coerce rather than fail.
fn coerce_string_map(value: Option<&JsonValue>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Some(JsonValue::Object(fields)) = value {
        for (key, val) in fields {
            let text = match val {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            map.insert(key.clone(), text);
        }
    }
    map
}
