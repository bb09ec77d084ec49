//! Asynchronous validation of JWTs signed by trusted issuers, with signing keys
//! discovered via OpenID Connect Discovery and JWKS, or supplied statically.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use jwt_validator::{HttpFetch, OidcJwksHandler, ReqwestFetch, TokenValidator};
//!
//! # async fn example() -> Result<(), jwt_validator::ValidationError> {
//! let fetch: Arc<dyn HttpFetch> = Arc::new(ReqwestFetch::default());
//! let handler = OidcJwksHandler::new(fetch, ["https://idp\\.example/.*"], 300)?;
//! let validator = TokenValidator::new(handler);
//!
//! let verified = validator
//!     .validate_token("<compact JWT>", Some(&["my-api".to_string()]), false)
//!     .await?;
//! println!("validated token for subject {:?}", verified.token.sub());
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

pub mod algorithm;
pub mod cache;
pub mod crypto;
pub mod discovery;
pub mod error;
pub mod handler;
pub mod http;
pub mod jwk;
pub mod jwks_oidc;
pub mod jwks_static;
#[cfg(any(test, feature = "test-support"))]
pub mod testsupport;
pub mod time;
pub mod token;
pub mod validator;

pub use algorithm::{AlgorithmDescriptor, Family, Hash};
pub use cache::SingleFlightCache;
pub use crypto::{DefaultVerifier, Verify};
pub use discovery::DiscoveryData;
pub use error::{CacheError, CryptoError, ValidationError};
pub use handler::JwksHandler;
pub use http::{FetchedResponse, HttpFetch, ReqwestFetch};
pub use jwk::{Jwk, KeyMaterial, SharedJwk};
pub use jwks_oidc::OidcJwksHandler;
pub use jwks_static::StaticJwksHandler;
pub use token::{CompactJwt, VerifiedJwt};
pub use validator::{TokenValidator, TokenValidatorConfig};
