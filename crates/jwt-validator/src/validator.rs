//! Top-level orchestration and policy enforcement for token validation.

use std::collections::HashSet;
use std::env;

use crate::error::ValidationError;
use crate::handler::JwksHandler;
use crate::time::now_epoch_s;
use crate::token::{CompactJwt, VerifiedJwt};

/// Construction-time and mutable runtime configuration for a [`TokenValidator`].
#[derive(Debug, Clone)]
pub struct TokenValidatorConfig {
    pub issuer_regexes: Vec<String>,
    pub default_jwks_cache_seconds: u64,
}

impl TokenValidatorConfig {
    /// Reads `JWT_VALIDATOR_ISSUER_REGEXES` (comma-separated) and
    /// `JWT_VALIDATOR_JWKS_CACHE_SECONDS` (falls back to 300 if absent/unparsable,
    /// with a warning).
    pub fn from_env() -> Self {
        let issuer_regexes = env::var("JWT_VALIDATOR_ISSUER_REGEXES")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let default_jwks_cache_seconds = env::var("JWT_VALIDATOR_JWKS_CACHE_SECONDS")
            .ok()
            .and_then(|raw| match raw.trim().parse::<u64>() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(raw, "JWT_VALIDATOR_JWKS_CACHE_SECONDS is not a valid integer, using default");
                    None
                }
            })
            .unwrap_or(300);

        TokenValidatorConfig {
            issuer_regexes,
            default_jwks_cache_seconds,
        }
    }
}

/// Top-level orchestration: parses a compact JWT, classifies its algorithm, resolves
/// its signing key via a [`JwksHandler`], verifies the signature, and enforces time,
/// audience, and subject policy.
pub struct TokenValidator<H: JwksHandler> {
    handler: H,
    permitted_algorithms: HashSet<String>,
    require_exp: bool,
    require_nbf: bool,
    time_leeway_seconds: i64,
}

impl<H: JwksHandler> TokenValidator<H> {
    /// Builds a validator with the default permitted-algorithm set `{RS256, RS384,
    /// RS512}`, `require_exp = true`, `require_nbf = true`, zero leeway.
    pub fn new(handler: H) -> Self {
        TokenValidator {
            handler,
            permitted_algorithms: ["RS256", "RS384", "RS512"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            require_exp: true,
            require_nbf: true,
            time_leeway_seconds: 0,
        }
    }

    pub fn set_permitted_algorithms<I, S>(&mut self, algorithms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permitted_algorithms = algorithms.into_iter().map(Into::into).collect();
    }

    pub fn add_permitted_algorithm(&mut self, algorithm: impl Into<String>) {
        self.permitted_algorithms.insert(algorithm.into());
    }

    pub fn set_require_exp(&mut self, require: bool) {
        self.require_exp = require;
    }

    pub fn set_require_nbf(&mut self, require: bool) {
        self.require_nbf = require;
    }

    pub fn set_time_leeway_seconds(&mut self, leeway: i64) {
        self.time_leeway_seconds = leeway;
    }

    /// Validates `token` against `required_audiences`.
    ///
    /// `required_audiences` being `None` is a configuration error unless
    /// `ignore_required_aud` is `true`; an empty, non-ignored list is also a
    /// configuration error.
    pub async fn validate_token(
        &self,
        token: &str,
        required_audiences: Option<&[String]>,
        ignore_required_aud: bool,
    ) -> Result<VerifiedJwt, ValidationError> {
        // Phase A: parse.
        let parsed = CompactJwt::parse(token)?;

        // Phase B: algorithm.
        let alg = parsed
            .alg()
            .ok_or_else(|| ValidationError::Malformed("header has no `alg`".to_string()))?;
        let descriptor = crate::algorithm::lookup(alg).map_err(|_| {
            tracing::warn!(alg, "rejecting unknown algorithm");
            ValidationError::Malformed(format!("unrecognised algorithm `{alg}`"))
        })?;
        if descriptor.family == crate::algorithm::Family::None {
            return Err(ValidationError::AlgorithmNone);
        }
        if !self.permitted_algorithms.contains(alg) {
            tracing::warn!(alg, "rejecting algorithm outside the permitted set");
            return Err(ValidationError::Malformed(format!(
                "algorithm `{alg}` is not permitted"
            )));
        }

        // Phase C: minimal claim presence.
        if !parsed.has_any_claim() {
            return Err(ValidationError::Malformed(
                "payload has no claims".to_string(),
            ));
        }

        // Phase D: issuer.
        let iss = parsed
            .iss()
            .ok_or_else(|| ValidationError::UntrustedIssuer(String::new()))?;
        self.handler.validate_issuer(iss).await?;

        // Phase E: key resolution.
        let kid = parsed.kid().unwrap_or_default();
        let jwk = self.handler.find_jwk(iss, kid).await?;

        // Phase F: cryptographic verification.
        if parsed.signature_segment().is_empty() {
            return Err(ValidationError::Malformed(
                "signature segment is empty".to_string(),
            ));
        }
        let signature = parsed.decode_signature()?;
        let ok = jwk.verify_with_default(&descriptor, parsed.signature_base(), &signature)?;
        if !ok {
            return Err(ValidationError::SignatureInvalid);
        }

        // Phase G: temporal checks.
        let now = now_epoch_s();
        match parsed.nbf() {
            Some(nbf) if nbf > now + self.time_leeway_seconds => {
                return Err(ValidationError::NotYetValid)
            }
            Some(_) => {}
            None if self.require_nbf => return Err(ValidationError::MissingClaim("nbf")),
            None => {}
        }
        match parsed.exp() {
            Some(exp) if exp < now - self.time_leeway_seconds => return Err(ValidationError::Expired),
            Some(_) => {}
            None if self.require_exp => return Err(ValidationError::MissingClaim("exp")),
            None => {}
        }

        // Phase H: audience.
        match required_audiences {
            None => return Err(ValidationError::Configuration(
                "required_audiences must be Some; pass an empty slice with ignore_required_aud=true to skip".to_string(),
            )),
            Some(required) if required.is_empty() => {
                if !ignore_required_aud {
                    return Err(ValidationError::Configuration(
                        "required_audiences is empty but ignore_required_aud is false".to_string(),
                    ));
                }
            }
            Some(required) => {
                let token_aud = parsed.aud().ok_or(ValidationError::AudienceMismatch)?;
                if !token_aud.iter().any(|a| required.contains(a)) {
                    return Err(ValidationError::AudienceMismatch);
                }
            }
        }

        // Phase I: subject.
        match parsed.sub() {
            Some(sub) if !sub.trim().is_empty() => {}
            _ => return Err(ValidationError::MissingClaim("sub")),
        }

        Ok(VerifiedJwt {
            token: parsed,
            key: jwk,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Serialises the two tests below: both read/write the same process-global env
    // vars, which `cargo test`'s default multi-threaded runner would otherwise race.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn from_env_parses_issuer_regexes_and_cache_seconds() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var(
            "JWT_VALIDATOR_ISSUER_REGEXES",
            "https://idp-a.example, https://idp-b.example",
        );
        env::set_var("JWT_VALIDATOR_JWKS_CACHE_SECONDS", "120");

        let config = TokenValidatorConfig::from_env();
        assert_eq!(
            config.issuer_regexes,
            vec!["https://idp-a.example", "https://idp-b.example"]
        );
        assert_eq!(config.default_jwks_cache_seconds, 120);

        env::remove_var("JWT_VALIDATOR_ISSUER_REGEXES");
        env::remove_var("JWT_VALIDATOR_JWKS_CACHE_SECONDS");
    }

    #[test]
    fn from_env_falls_back_to_300_on_unparsable_cache_seconds() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("JWT_VALIDATOR_ISSUER_REGEXES");
        env::set_var("JWT_VALIDATOR_JWKS_CACHE_SECONDS", "not-a-number");

        let config = TokenValidatorConfig::from_env();
        assert!(config.issuer_regexes.is_empty());
        assert_eq!(config.default_jwks_cache_seconds, 300);

        env::remove_var("JWT_VALIDATOR_JWKS_CACHE_SECONDS");
    }
}
