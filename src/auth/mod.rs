//! Authentication mapping
//!
//! Auth is applied via exhaustive matching over the [`AuthConfig`] sum
//! type rather than runtime polymorphism, so adding a scheme is a
//! compile-time-checked exercise. [`apply_auth`] is a pure function: no
//! network or state access, just extra headers and query params.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::models::{ApiKeyLocation, AuthConfig, AuthInheritance};

/// Fallback header name for API-key auth with a blank key name
const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Headers and query params produced by an auth config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedAuth {
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
}

/// Resolve which auth config governs a request.
///
/// An inheriting request takes the enclosing folder's auth when present,
/// else the collection's; folder auth always outranks collection auth.
/// Everything else falls back to the request's own config.
pub fn effective_auth<'a>(
    request_auth: Option<&'a AuthConfig>,
    inheritance: AuthInheritance,
    folder_auth: Option<&'a AuthConfig>,
    collection_auth: Option<&'a AuthConfig>,
) -> Option<&'a AuthConfig> {
    match inheritance {
        AuthInheritance::Inherit => folder_auth.or(collection_auth).or(request_auth),
        AuthInheritance::Own => request_auth,
    }
}

/// Map an auth config to the headers/params it contributes.
///
/// `Digest` and `AwsSigV4` intentionally produce nothing: digest needs a
/// server challenge round-trip and SigV4 a request-signing pass, neither
/// of which happens here. Their credentials stay in the config untouched.
pub fn apply_auth(config: &AuthConfig) -> AppliedAuth {
    let mut applied = AppliedAuth::default();

    match config {
        AuthConfig::NoAuth => {}

        AuthConfig::ApiKey {
            key_name,
            value,
            add_to,
        } => {
            if !value.trim().is_empty() {
                let name = if key_name.trim().is_empty() {
                    DEFAULT_API_KEY_HEADER.to_string()
                } else {
                    key_name.clone()
                };
                match add_to {
                    ApiKeyLocation::Header => applied.headers.push((name, value.clone())),
                    ApiKeyLocation::Query => applied.params.push((name, value.clone())),
                }
            }
        }

        AuthConfig::Bearer { token } | AuthConfig::JwtBearer { token } => {
            if !token.trim().is_empty() {
                applied
                    .headers
                    .push(("Authorization".to_string(), format!("Bearer {}", token)));
            }
        }

        AuthConfig::Oauth2 { access_token } => {
            if !access_token.trim().is_empty() {
                applied.headers.push((
                    "Authorization".to_string(),
                    format!("Bearer {}", access_token),
                ));
            }
        }

        AuthConfig::Basic { username, password } => {
            // both-empty is a no-op, not an error
            if !username.is_empty() || !password.is_empty() {
                let encoded = BASE64.encode(format!("{}:{}", username, password));
                applied
                    .headers
                    .push(("Authorization".to_string(), format!("Basic {}", encoded)));
            }
        }

        AuthConfig::Digest { .. } | AuthConfig::AwsSigV4 { .. } => {}
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_encoding() {
        let applied = apply_auth(&AuthConfig::Basic {
            username: "user".into(),
            password: "pass".into(),
        });
        assert_eq!(
            applied.headers,
            vec![("Authorization".to_string(), "Basic dXNlcjpwYXNz".to_string())]
        );
    }

    #[test]
    fn test_basic_auth_both_empty_is_noop() {
        let applied = apply_auth(&AuthConfig::Basic {
            username: String::new(),
            password: String::new(),
        });
        assert!(applied.headers.is_empty());
        assert!(applied.params.is_empty());
    }

    #[test]
    fn test_basic_auth_single_field() {
        let applied = apply_auth(&AuthConfig::Basic {
            username: "user".into(),
            password: String::new(),
        });
        assert_eq!(applied.headers.len(), 1);
        assert!(applied.headers[0].1.starts_with("Basic "));
    }

    #[test]
    fn test_bearer_variants() {
        for config in [
            AuthConfig::Bearer { token: "tok".into() },
            AuthConfig::JwtBearer { token: "tok".into() },
            AuthConfig::Oauth2 { access_token: "tok".into() },
        ] {
            let applied = apply_auth(&config);
            assert_eq!(
                applied.headers,
                vec![("Authorization".to_string(), "Bearer tok".to_string())]
            );
        }
    }

    #[test]
    fn test_bearer_blank_token_is_noop() {
        let applied = apply_auth(&AuthConfig::Bearer { token: "  ".into() });
        assert!(applied.headers.is_empty());
    }

    #[test]
    fn test_api_key_header_and_query() {
        let applied = apply_auth(&AuthConfig::ApiKey {
            key_name: "X-Token".into(),
            value: "abc".into(),
            add_to: ApiKeyLocation::Header,
        });
        assert_eq!(applied.headers, vec![("X-Token".to_string(), "abc".to_string())]);

        let applied = apply_auth(&AuthConfig::ApiKey {
            key_name: "api_key".into(),
            value: "abc".into(),
            add_to: ApiKeyLocation::Query,
        });
        assert!(applied.headers.is_empty());
        assert_eq!(applied.params, vec![("api_key".to_string(), "abc".to_string())]);
    }

    #[test]
    fn test_api_key_defaults_and_blank_value() {
        let applied = apply_auth(&AuthConfig::ApiKey {
            key_name: String::new(),
            value: "abc".into(),
            add_to: ApiKeyLocation::Header,
        });
        assert_eq!(applied.headers[0].0, DEFAULT_API_KEY_HEADER);

        let applied = apply_auth(&AuthConfig::ApiKey {
            key_name: "X-Token".into(),
            value: "   ".into(),
            add_to: ApiKeyLocation::Header,
        });
        assert!(applied.headers.is_empty());
    }

    #[test]
    fn test_digest_and_sigv4_produce_nothing() {
        let applied = apply_auth(&AuthConfig::Digest {
            username: "u".into(),
            password: "p".into(),
        });
        assert_eq!(applied, AppliedAuth::default());

        let applied = apply_auth(&AuthConfig::AwsSigV4 {
            access_key: "ak".into(),
            secret_key: "sk".into(),
            region: "us-east-1".into(),
            service: "execute-api".into(),
        });
        assert_eq!(applied, AppliedAuth::default());
    }

    #[test]
    fn test_effective_auth_inheritance() {
        let own = AuthConfig::Bearer { token: "own".into() };
        let folder = AuthConfig::Bearer { token: "folder".into() };
        let collection = AuthConfig::Bearer { token: "collection".into() };

        // inherit: folder outranks collection
        assert_eq!(
            effective_auth(Some(&own), AuthInheritance::Inherit, Some(&folder), Some(&collection)),
            Some(&folder)
        );
        assert_eq!(
            effective_auth(Some(&own), AuthInheritance::Inherit, None, Some(&collection)),
            Some(&collection)
        );
        // nothing to inherit: the request's own config applies
        assert_eq!(
            effective_auth(Some(&own), AuthInheritance::Inherit, None, None),
            Some(&own)
        );
        // own: surrounding configs are ignored
        assert_eq!(
            effective_auth(Some(&own), AuthInheritance::Own, Some(&folder), Some(&collection)),
            Some(&own)
        );
        assert_eq!(effective_auth(None, AuthInheritance::Own, Some(&folder), None), None);
    }
}
