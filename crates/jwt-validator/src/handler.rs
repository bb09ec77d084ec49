//! The `JwksHandler` capability unifying the OIDC and static handler variants.

use async_trait::async_trait;

use crate::error::ValidationError;
use crate::jwk::SharedJwk;

/// Resolves an issuer's trust and its signing keys.
///
/// Implemented by [`crate::jwks_oidc::OidcJwksHandler`] (discovery + JWKS fetch) and
/// [`crate::jwks_static::StaticJwksHandler`] (in-memory map). [`crate::TokenValidator`]
/// is generic over this trait so either can be plugged in without touching the
/// validation pipeline.
#[async_trait]
pub trait JwksHandler: Send + Sync {
    /// Succeeds iff `issuer` is trusted; fails with [`ValidationError::UntrustedIssuer`].
    async fn validate_issuer(&self, issuer: &str) -> Result<(), ValidationError>;

    /// Resolves the JWK for `issuer`/`kid`, performing discovery/fetch as needed.
    async fn find_jwk(&self, issuer: &str, kid: &str) -> Result<SharedJwk, ValidationError>;
}
