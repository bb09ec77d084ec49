//! Static JWKS handler: an in-memory issuer/kid to JWK map, for deployments that
//! distribute keys out-of-band instead of via OIDC discovery.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;

use crate::error::ValidationError;
use crate::handler::JwksHandler;
use crate::jwk::SharedJwk;

/// Default issuer allow-list when none is supplied: accept any issuer, since trust is
/// instead expressed by which keys were explicitly registered.
const DEFAULT_ISSUER_REGEX: &str = ".*";

fn storage_key(issuer: &str, kid: &str) -> String {
    format!("{issuer}\u{0}{kid}")
}

/// A [`JwksHandler`] backed by keys registered directly by the embedding application.
pub struct StaticJwksHandler {
    issuer_regexes: Vec<Regex>,
    keys: RwLock<HashMap<String, SharedJwk>>,
}

impl StaticJwksHandler {
    /// Builds a handler trusting any issuer matching one of `issuer_regexes`. An empty
    /// collection falls back to [`DEFAULT_ISSUER_REGEX`], matching any issuer.
    pub fn new<I, S>(issuer_regexes: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for pattern in issuer_regexes {
            match Regex::new(&format!("^(?:{})$", pattern.as_ref())) {
                Ok(re) => compiled.push(re),
                Err(e) => tracing::warn!(pattern = pattern.as_ref(), error = %e, "dropping uncompilable issuer regex"),
            }
        }
        if compiled.is_empty() {
            compiled.push(
                Regex::new(&format!("^(?:{DEFAULT_ISSUER_REGEX})$"))
                    .expect("default regex always compiles"),
            );
        }
        Ok(StaticJwksHandler {
            issuer_regexes: compiled,
            keys: RwLock::new(HashMap::new()),
        })
    }

    /// Registers or replaces a key for `issuer`/`kid`.
    pub async fn add_key(&self, issuer: &str, jwk: SharedJwk) {
        self.keys
            .write()
            .await
            .insert(storage_key(issuer, jwk.kid()), jwk);
    }

    /// Removes a key, if present. No-op otherwise.
    pub async fn remove_key(&self, issuer: &str, kid: &str) {
        self.keys.write().await.remove(&storage_key(issuer, kid));
    }
}

#[async_trait]
impl JwksHandler for StaticJwksHandler {
    async fn validate_issuer(&self, issuer: &str) -> Result<(), ValidationError> {
        if self.issuer_regexes.iter().any(|re| re.is_match(issuer)) {
            Ok(())
        } else {
            Err(ValidationError::UntrustedIssuer(issuer.to_string()))
        }
    }

    async fn find_jwk(&self, issuer: &str, kid: &str) -> Result<SharedJwk, ValidationError> {
        self.keys
            .read()
            .await
            .get(&storage_key(issuer, kid))
            .cloned()
            .ok_or_else(|| ValidationError::KeyNotFound(kid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwk::Jwk;
    use serde_json::json;
    use std::sync::Arc;

    fn test_jwk(kid: &str) -> SharedJwk {
        Arc::new(
            Jwk::from_json(
                &json!({"kid": kid, "kty": "RSA", "n": "AQAB", "e": "AQAB"}),
                u128::MAX,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn empty_regex_list_defaults_to_match_all() {
        let h = StaticJwksHandler::new(Vec::<String>::new()).unwrap();
        assert!(h.validate_issuer("https://anything.example").await.is_ok());
    }

    #[tokio::test]
    async fn add_then_find_round_trips() {
        let h = StaticJwksHandler::new(["https://idp.example"]).unwrap();
        h.add_key("https://idp.example", test_jwk("k1")).await;
        let found = h.find_jwk("https://idp.example", "k1").await.unwrap();
        assert_eq!(found.kid(), "k1");
    }

    #[tokio::test]
    async fn remove_then_find_fails() {
        let h = StaticJwksHandler::new(["https://idp.example"]).unwrap();
        h.add_key("https://idp.example", test_jwk("k1")).await;
        h.remove_key("https://idp.example", "k1").await;
        assert!(matches!(
            h.find_jwk("https://idp.example", "k1").await,
            Err(ValidationError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn unanchored_pattern_does_not_match_as_substring() {
        // An unescaped, unanchored regex must still require a *full* match (Java
        // `Pattern.matches()` semantics), not "appears anywhere in the string" — else
        // this pattern would wrongly accept an attacker-controlled issuer that merely
        // contains it as a substring.
        let h = StaticJwksHandler::new(["idp\\.example"]).unwrap();
        assert!(h.validate_issuer("https://idp.example").await.is_err());
        assert!(matches!(
            h.validate_issuer("https://evil.com/idp.example.attacker.net")
                .await,
            Err(ValidationError::UntrustedIssuer(_))
        ));
    }

    #[tokio::test]
    async fn untrusted_issuer_rejected() {
        let h = StaticJwksHandler::new(["https://idp\\.example"]).unwrap();
        assert!(matches!(
            h.validate_issuer("https://other.example").await,
            Err(ValidationError::UntrustedIssuer(_))
        ));
    }
}
