//! OIDC JWKS handler: OpenID Connect discovery plus JWKS fetch, with issuer
//! allow-listing and per-URI key caching.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::cache::SingleFlightCache;
use crate::discovery::DiscoveryData;
use crate::error::ValidationError;
use crate::handler::JwksHandler;
use crate::http::{expiry_from_cache_control, HttpFetch};
use crate::jwk::{Jwk, SharedJwk};
use crate::time::now_epoch_ms;
use crate::validator::TokenValidatorConfig;

/// A [`JwksHandler`] that discovers an issuer's keys via OpenID Connect Discovery.
pub struct OidcJwksHandler {
    fetch: Arc<dyn HttpFetch>,
    issuer_regexes: Vec<Regex>,
    default_jwks_cache_seconds: u64,
    discovery_cache: SingleFlightCache<String, DiscoveryData, ValidationError>,
    jwk_caches: Mutex<HashMap<String, Arc<SingleFlightCache<String, SharedJwk, ValidationError>>>>,
}

impl OidcJwksHandler {
    /// Builds a handler. Empty or uncompilable regex strings are dropped with a
    /// warning; construction fails with [`ValidationError::Configuration`] if no valid
    /// regex remains (unlike the static handler, this variant does not fall back to a
    /// match-all default — an OIDC handler with no trust boundary at all is almost
    /// certainly a misconfiguration, not an intentional choice).
    pub fn new<I, S>(
        fetch: Arc<dyn HttpFetch>,
        issuer_regexes: I,
        default_jwks_cache_seconds: u64,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for pattern in issuer_regexes {
            let pattern = pattern.as_ref();
            if pattern.is_empty() {
                tracing::warn!("dropping empty issuer regex");
                continue;
            }
            match Regex::new(&format!("^(?:{pattern})$")) {
                Ok(re) => compiled.push(re),
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "dropping uncompilable issuer regex")
                }
            }
        }
        if compiled.is_empty() {
            return Err(ValidationError::Configuration(
                "no valid issuer regex supplied".to_string(),
            ));
        }

        Ok(OidcJwksHandler {
            fetch,
            issuer_regexes: compiled,
            default_jwks_cache_seconds,
            discovery_cache: SingleFlightCache::new(DiscoveryData::expires_at_ms),
            jwk_caches: Mutex::new(HashMap::new()),
        })
    }

    /// Builds a handler from a [`TokenValidatorConfig`], e.g. one built by
    /// [`TokenValidatorConfig::from_env`].
    pub fn from_config(
        fetch: Arc<dyn HttpFetch>,
        config: &TokenValidatorConfig,
    ) -> Result<Self, ValidationError> {
        Self::new(
            fetch,
            config.issuer_regexes.clone(),
            config.default_jwks_cache_seconds,
        )
    }

    /// Performs (or returns cached) OpenID Connect discovery for `issuer`.
    pub async fn perform_open_id_discovery(
        &self,
        issuer: &str,
    ) -> Result<DiscoveryData, ValidationError> {
        self.validate_issuer(issuer).await?;

        let url = discovery_url(issuer);
        let fetch = self.fetch.clone();
        let default_seconds = self.default_jwks_cache_seconds;

        self.discovery_cache
            .get(issuer.to_string(), move || async move {
                let request_time_ms = now_epoch_ms();
                let response = fetch.get(&url).await?;
                if !(200..300).contains(&response.status) {
                    tracing::error!(issuer = %url, status = response.status, "discovery endpoint returned non-2xx status");
                    return Err(ValidationError::Upstream(format!(
                        "discovery endpoint returned status {}",
                        response.status
                    )));
                }
                let document: Value = serde_json::from_slice(&response.body).map_err(|e| {
                    ValidationError::Malformed(format!("discovery document is not valid JSON: {e}"))
                })?;
                if !document.is_object() {
                    return Err(ValidationError::Malformed(
                        "discovery document is not a JSON object".to_string(),
                    ));
                }
                let expires_at_ms = expiry_from_cache_control(
                    request_time_ms,
                    &response.cache_control,
                    default_seconds,
                );
                tracing::info!(issuer = %url, "refreshed OpenID discovery document");
                Ok(DiscoveryData::new(document, expires_at_ms))
            })
            .await
            .map_err(ValidationError::from)
    }

    /// Resolves `kid` against the JWKS named by `discovery.jwks_uri()`.
    pub async fn find_jwk_from_discovery(
        &self,
        discovery: &DiscoveryData,
        kid: &str,
    ) -> Result<SharedJwk, ValidationError> {
        let jwks_uri = discovery
            .jwks_uri()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ValidationError::Malformed("discovery document has no jwks_uri".to_string())
            })?
            .to_string();

        let cache = self.jwk_cache_for(&jwks_uri).await;
        let fetch = self.fetch.clone();
        let default_seconds = self.default_jwks_cache_seconds;
        let kid_owned = kid.to_string();
        let jwks_uri_for_loader = jwks_uri.clone();
        let cache_for_loader = cache.clone();

        cache
            .get(kid.to_string(), move || async move {
                let request_time_ms = now_epoch_ms();
                let response = fetch.get(&jwks_uri_for_loader).await?;
                if !(200..300).contains(&response.status) {
                    tracing::error!(jwks_uri = %jwks_uri_for_loader, status = response.status, "JWKS endpoint returned non-2xx status");
                    return Err(ValidationError::Upstream(format!(
                        "JWKS endpoint returned status {}",
                        response.status
                    )));
                }
                let document: Value = serde_json::from_slice(&response.body).map_err(|e| {
                    ValidationError::Malformed(format!("JWKS body is not valid JSON: {e}"))
                })?;
                let keys = document
                    .get("keys")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        ValidationError::Malformed("JWKS document has no `keys` array".to_string())
                    })?;

                let expires_at_ms =
                    expiry_from_cache_control(request_time_ms, &response.cache_control, default_seconds);

                let mut found = None;
                for key_value in keys {
                    match Jwk::from_json(key_value, expires_at_ms) {
                        Ok(jwk) => {
                            let jwk = Arc::new(jwk);
                            if jwk.kid() == kid_owned {
                                found = Some(jwk.clone());
                            } else {
                                // Share the fetch across every key in the response.
                                cache_for_loader.put(jwk.kid().to_string(), jwk).await;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "skipping unparsable JWKS entry");
                        }
                    }
                }

                found.ok_or_else(|| ValidationError::KeyNotFound(kid_owned.clone()))
            })
            .await
            .map_err(ValidationError::from)
    }

    async fn jwk_cache_for(
        &self,
        jwks_uri: &str,
    ) -> Arc<SingleFlightCache<String, SharedJwk, ValidationError>> {
        let mut caches = self.jwk_caches.lock().await;
        caches
            .entry(jwks_uri.to_string())
            .or_insert_with(|| {
                Arc::new(SingleFlightCache::new(|jwk: &SharedJwk| jwk.expires_at_ms()))
            })
            .clone()
    }
}

fn discovery_url(issuer: &str) -> String {
    if issuer.ends_with('/') {
        format!("{issuer}.well-known/openid-configuration")
    } else {
        format!("{issuer}/.well-known/openid-configuration")
    }
}

#[async_trait]
impl JwksHandler for OidcJwksHandler {
    async fn validate_issuer(&self, issuer: &str) -> Result<(), ValidationError> {
        // Cache short-circuit: a once-accepted issuer stays accepted until its
        // discovery cache entry expires, even if the regex that first admitted it is
        // later removed from configuration.
        if self.discovery_cache.contains(&issuer.to_string()).await {
            return Ok(());
        }
        if self.issuer_regexes.iter().any(|re| re.is_match(issuer)) {
            Ok(())
        } else {
            Err(ValidationError::UntrustedIssuer(issuer.to_string()))
        }
    }

    async fn find_jwk(&self, issuer: &str, kid: &str) -> Result<SharedJwk, ValidationError> {
        let discovery = self.perform_open_id_discovery(issuer).await?;
        self.find_jwk_from_discovery(&discovery, kid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_url_avoids_double_slash() {
        assert_eq!(
            discovery_url("https://idp.example"),
            "https://idp.example/.well-known/openid-configuration"
        );
        assert_eq!(
            discovery_url("https://idp.example/"),
            "https://idp.example/.well-known/openid-configuration"
        );
    }

    #[test]
    fn construction_fails_with_no_valid_regex() {
        let fetch: Arc<dyn HttpFetch> = Arc::new(crate::http::ReqwestFetch::default());
        let result = OidcJwksHandler::new(fetch, Vec::<String>::new(), 300);
        assert!(matches!(result, Err(ValidationError::Configuration(_))));
    }

    #[test]
    fn from_config_carries_over_issuer_regexes_and_cache_seconds() {
        let fetch: Arc<dyn HttpFetch> = Arc::new(crate::http::ReqwestFetch::default());
        let config = TokenValidatorConfig {
            issuer_regexes: vec!["https://idp\\.example".to_string()],
            default_jwks_cache_seconds: 42,
        };
        let handler = OidcJwksHandler::from_config(fetch, &config).unwrap();
        assert_eq!(handler.default_jwks_cache_seconds, 42);
        assert!(handler.issuer_regexes[0].is_match("https://idp.example"));
    }

    #[tokio::test]
    async fn unanchored_pattern_does_not_match_as_substring() {
        // A configured regex must fully match the issuer, not merely appear somewhere
        // in it — otherwise `idp\.example` would wrongly accept an attacker-controlled
        // issuer that embeds it as a substring.
        let fetch: Arc<dyn HttpFetch> = Arc::new(crate::http::ReqwestFetch::default());
        let handler = OidcJwksHandler::new(fetch, ["idp\\.example"], 300).unwrap();
        assert!(matches!(
            handler
                .validate_issuer("https://evil.com/idp.example.attacker.net")
                .await,
            Err(ValidationError::UntrustedIssuer(_))
        ));
        assert!(matches!(
            handler.validate_issuer("https://idp.example").await,
            Err(ValidationError::UntrustedIssuer(_))
        ));
    }
}
