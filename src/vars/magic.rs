//! Dynamic value generators
//!
//! Replaces `{{$name}}` / `{{$name:param}}` tags with generated data:
//! - `{{$randomUUID}}` - random UUID v4
//! - `{{$timestamp}}` - Unix timestamp (milliseconds)
//! - `{{$randomInt}}` or `{{$randomInt:MAX}}` / `{{$randomInt:MIN:MAX}}`
//! - `{{$randomEmail}}` - random email-shaped string
//! - `{{$randomBoolean}}` - "true" or "false"
//! - `{{$randomAlphaNumeric}}` or `{{$randomAlphaNumeric:LEN}}`
//!
//! Unknown generator names are left untouched. Every occurrence is
//! re-evaluated, so two `{{$randomUUID}}` tags in one string produce two
//! different values.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::{Captures, Regex};
use uuid::Uuid;

// Cached patterns to avoid recompilation in hot paths
static DYNAMIC_VALUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\$([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}\}").unwrap()
});

/// Longest random string a single tag may produce
const MAX_RANDOM_LEN: usize = 256;

/// Default range for `{{$randomInt}}` without a param
const DEFAULT_INT_MAX: i64 = 1000;

/// Expand all dynamic value tags in a string
pub fn expand_dynamic_values(input: &str) -> String {
    DYNAMIC_VALUE_RE
        .replace_all(input, |caps: &Captures<'_>| {
            let name = &caps[1];
            let param = caps.get(2).map(|m| m.as_str());
            generate(name, param).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Check whether a string contains any dynamic value tag
pub fn has_dynamic_values(s: &str) -> bool {
    DYNAMIC_VALUE_RE.is_match(s)
}

/// Generate a value for a tag, or None for unknown generator names
fn generate(name: &str, param: Option<&str>) -> Option<String> {
    match name {
        "randomUUID" => Some(Uuid::new_v4().to_string()),

        "timestamp" => Some(chrono::Utc::now().timestamp_millis().to_string()),

        "randomInt" => {
            let mut rng = rand::rng();
            match param {
                None => Some(rng.random_range(0..=DEFAULT_INT_MAX).to_string()),
                Some(range_str) => {
                    let parts: Vec<&str> = range_str.split(':').collect();
                    match parts.len() {
                        1 => parts[0]
                            .parse::<i64>()
                            .ok()
                            .filter(|max| *max >= 0)
                            .map(|max| rng.random_range(0..=max).to_string()),
                        2 => match (parts[0].parse::<i64>(), parts[1].parse::<i64>()) {
                            (Ok(min), Ok(max)) if min <= max => {
                                Some(rng.random_range(min..=max).to_string())
                            }
                            _ => None,
                        },
                        _ => None,
                    }
                }
            }
        }

        "randomEmail" => {
            let user = random_alphanumeric(8).to_lowercase();
            Some(format!("{}@example.com", user))
        }

        "randomBoolean" => {
            let mut rng = rand::rng();
            Some(rng.random_bool(0.5).to_string())
        }

        "randomAlphaNumeric" => {
            let len = param
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(16)
                .min(MAX_RANDOM_LEN);
            Some(random_alphanumeric(len))
        }

        _ => None,
    }
}

/// Random alphanumeric string of the given length
fn random_alphanumeric(len: usize) -> String {
    use rand::distr::Alphanumeric;
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
