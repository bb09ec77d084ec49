//! Error taxonomy for token validation, JWK handling, and the HTTP/cache pipeline.

use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Errors surfaced by [`crate::TokenValidator::validate_token`] and the JWKS pipeline.
///
/// `Display` text is intentionally coarse for variants that could otherwise leak
/// configuration details (permitted algorithms, issuer allow-list) to a remote caller
/// who only logs `{err}`; the precise variant is still available to callers that match
/// on it directly.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// Structure, encoding, or JSON shape is wrong. Also used to mask
    /// [`ValidationError::UnknownAlgorithm`] and algorithm-not-permitted rejections.
    #[error("parsing of signed JWT failed")]
    Malformed(String),

    /// `alg` is `none`; always rejected regardless of configuration.
    #[error("JWT uses the `none` algorithm, which is never accepted")]
    AlgorithmNone,

    /// `alg` is not a name the registry recognises.
    #[error("JWT declares an unrecognised algorithm")]
    UnknownAlgorithm(String),

    /// Issuer failed the regex allow-list.
    #[error("issuer is not trusted")]
    UntrustedIssuer(String),

    /// HTTP error, connection failure, or non-2xx status from discovery/JWKS fetch.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// The requested `kid` was not present in the fetched JWKS.
    #[error("no key found for the requested key id")]
    KeyNotFound(String),

    /// Cryptographic verification returned false or errored.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// A required claim was absent.
    #[error("missing required claim `{0}`")]
    MissingClaim(&'static str),

    /// `nbf` is in the future (beyond leeway).
    #[error("token is not yet valid")]
    NotYetValid,

    /// `exp` is in the past (beyond leeway).
    #[error("token has expired")]
    Expired,

    /// Token `aud` shares no element with the caller's required audiences.
    #[error("audience mismatch")]
    AudienceMismatch,

    /// Misconfiguration at construction or invocation time.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Errors from the pluggable cryptographic verification capability.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The JWK's key material could not be parsed into a usable public key.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The signature bytes are not the expected shape for this algorithm.
    #[error("malformed signature")]
    MalformedSignature,

    /// The algorithm/curve combination has no verifier implementation.
    #[error("unsupported curve or algorithm: {0}")]
    UnsupportedCurve(String),
}

/// Errors from the async single-flight cache.
#[derive(Debug, Error)]
pub enum CacheError<E> {
    /// The loader returned an error; it is not cached.
    #[error(transparent)]
    Loader(#[from] E),

    /// An awaiter's channel was dropped before the loader resolved (the loader task panicked).
    #[error("loader task was dropped before completion")]
    LoaderDropped,
}

impl From<CacheError<ValidationError>> for ValidationError {
    fn from(err: CacheError<ValidationError>) -> Self {
        match err {
            CacheError::Loader(inner) => inner,
            CacheError::LoaderDropped => {
                ValidationError::Upstream("loader task was dropped before completion".to_string())
            }
        }
    }
}
