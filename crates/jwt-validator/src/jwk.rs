//! Parsed public key material for one key, with expiry.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::Value;

use crate::algorithm::{AlgorithmDescriptor, Family};
use crate::crypto::{DefaultVerifier, Verify};
use crate::error::ValidationError;

/// Parsed, verifier-ready public key material for one JWK entry.
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    Rsa(rsa::RsaPublicKey),
    Ec {
        curve: &'static str,
        x: Vec<u8>,
        y: Vec<u8>,
    },
    Okp {
        crv: String,
        x: Vec<u8>,
    },
    /// A shared HMAC secret. Never produced by [`Jwk::from_json`] — `kty` recognised
    /// from a JWKS response is limited to `RSA`/`EC`/`OKP` — but constructible via
    /// [`Jwk::from_shared_secret`] for callers that provision `HS*` keys out-of-band
    /// (e.g. through a [`crate::jwks_static::StaticJwksHandler`]).
    Hmac(Vec<u8>),
}

/// A single JSON Web Key, immutable once parsed.
#[derive(Debug, Clone)]
pub struct Jwk {
    kid: String,
    use_: Option<String>,
    kty: String,
    material: KeyMaterial,
    /// Absolute expiry in epoch-milliseconds, supplied by the caller (computed from
    /// the JWKS HTTP response's Cache-Control header).
    expires_at_ms: u128,
}

impl Jwk {
    /// Key id.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Key type (`RSA`, `EC`, or `OKP`).
    pub fn kty(&self) -> &str {
        &self.kty
    }

    /// Public key `use`, if the JWK carried one.
    pub fn key_use(&self) -> Option<&str> {
        self.use_.as_deref()
    }

    /// Absolute expiry in epoch-milliseconds.
    pub fn expires_at_ms(&self) -> u128 {
        self.expires_at_ms
    }

    /// Parses a JWK from its JSON representation plus an externally-computed expiry.
    ///
    /// Fails if mandatory fields are missing/empty, `kty` is unrecognised, the
    /// declared `alg` (if any) doesn't match the key family, or the key-type-specific
    /// material (`n`/`e`, `crv`/`x`/`y`, `crv`/`x`) is absent or malformed.
    pub fn from_json(value: &Value, expires_at_ms: u128) -> Result<Self, ValidationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ValidationError::Malformed("JWK is not a JSON object".to_string()))?;

        let kid = obj
            .get("kid")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValidationError::Malformed("JWK missing non-empty kid".to_string()))?
            .to_string();

        let kty = obj
            .get("kty")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValidationError::Malformed("JWK missing non-empty kty".to_string()))?
            .to_string();

        let use_ = obj.get("use").and_then(Value::as_str).map(str::to_string);

        if let Some(alg) = obj.get("alg").and_then(Value::as_str) {
            check_alg_matches_kty(alg, &kty)?;
        }

        let material = match kty.as_str() {
            "RSA" => parse_rsa(obj)?,
            "EC" => parse_ec(obj)?,
            "OKP" => parse_okp(obj)?,
            other => {
                return Err(ValidationError::Malformed(format!(
                    "unrecognised JWK kty `{other}`"
                )))
            }
        };

        Ok(Jwk {
            kid,
            use_,
            kty,
            material,
            expires_at_ms,
        })
    }

    /// Builds an HMAC key directly from a shared secret, bypassing JSON/`kty`
    /// parsing. Used for `HS*` algorithms, which JWKS responses never carry.
    pub fn from_shared_secret(kid: impl Into<String>, secret: Vec<u8>, expires_at_ms: u128) -> Self {
        Jwk {
            kid: kid.into(),
            use_: Some("sig".to_string()),
            kty: "oct".to_string(),
            material: KeyMaterial::Hmac(secret),
            expires_at_ms,
        }
    }

    /// Verifies `signature` over `data` using `descriptor`, dispatching to `verifier`.
    ///
    /// Returns `Ok(true)` iff the signature is valid; a thrown/returned error from the
    /// verification capability is mapped by the caller (the Token Validator) to
    /// [`ValidationError::SignatureInvalid`].
    pub fn verify(
        &self,
        descriptor: &AlgorithmDescriptor,
        data: &[u8],
        signature: &[u8],
        verifier: &dyn Verify,
    ) -> Result<bool, ValidationError> {
        verifier
            .verify(descriptor, &self.material, data, signature)
            .map_err(|_| ValidationError::SignatureInvalid)
    }

    /// Verifies using the crate's [`DefaultVerifier`]; a convenience over [`Jwk::verify`].
    pub fn verify_with_default(
        &self,
        descriptor: &AlgorithmDescriptor,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, ValidationError> {
        self.verify(descriptor, data, signature, &DefaultVerifier)
    }
}

fn check_alg_matches_kty(alg: &str, kty: &str) -> Result<(), ValidationError> {
    let descriptor = crate::algorithm::lookup(alg)?;
    let ok = match (descriptor.family, kty) {
        (Family::Rsa | Family::RsaPss, "RSA") => true,
        (Family::Ecdsa, "EC") => true,
        (Family::EdDsa, "OKP") => true,
        (Family::Hmac, _) | (Family::None, _) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::Malformed(format!(
            "JWK alg `{alg}` does not match kty `{kty}`"
        )))
    }
}

fn decode_b64url(field: &str, value: &str) -> Result<Vec<u8>, ValidationError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| ValidationError::Malformed(format!("invalid base64url in `{field}`: {e}")))
}

fn required_str<'a>(obj: &'a serde_json::Map<String, Value>, field: &str) -> Result<&'a str, ValidationError> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::Malformed(format!("JWK missing `{field}`")))
}

fn parse_rsa(obj: &serde_json::Map<String, Value>) -> Result<KeyMaterial, ValidationError> {
    let n = decode_b64url("n", required_str(obj, "n")?)?;
    let e = decode_b64url("e", required_str(obj, "e")?)?;
    let n = rsa::BigUint::from_bytes_be(&n);
    let e = rsa::BigUint::from_bytes_be(&e);
    let pk = rsa::RsaPublicKey::new(n, e)
        .map_err(|err| ValidationError::Malformed(format!("invalid RSA key: {err}")))?;
    Ok(KeyMaterial::Rsa(pk))
}

fn curve_coordinate_bytes(crv: &str) -> Result<(&'static str, usize), ValidationError> {
    match crv {
        "P-256" => Ok(("P-256", 32)),
        "P-384" => Ok(("P-384", 48)),
        "P-521" => Ok(("P-521", 66)),
        other => Err(ValidationError::Malformed(format!(
            "unrecognised EC curve `{other}`"
        ))),
    }
}

fn parse_ec(obj: &serde_json::Map<String, Value>) -> Result<KeyMaterial, ValidationError> {
    let crv = required_str(obj, "crv")?;
    let (curve, coord_len) = curve_coordinate_bytes(crv)?;
    let mut x = decode_b64url("x", required_str(obj, "x")?)?;
    let mut y = decode_b64url("y", required_str(obj, "y")?)?;
    pad_left(&mut x, coord_len);
    pad_left(&mut y, coord_len);
    Ok(KeyMaterial::Ec { curve, x, y })
}

fn pad_left(bytes: &mut Vec<u8>, len: usize) {
    if bytes.len() < len {
        let mut padded = vec![0u8; len - bytes.len()];
        padded.append(bytes);
        *bytes = padded;
    }
}

fn parse_okp(obj: &serde_json::Map<String, Value>) -> Result<KeyMaterial, ValidationError> {
    let crv = required_str(obj, "crv")?;
    if crv != "Ed25519" && crv != "Ed448" {
        return Err(ValidationError::Malformed(format!(
            "unrecognised OKP curve `{crv}`"
        )));
    }
    let x = decode_b64url("x", required_str(obj, "x")?)?;
    Ok(KeyMaterial::Okp {
        crv: crv.to_string(),
        x,
    })
}

/// Shared-ownership alias used by caches and handlers, which hand the same parsed
/// key to many concurrent awaiters.
pub type SharedJwk = Arc<Jwk>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_empty_kid() {
        let v = json!({"kid": "", "kty": "RSA", "n": "AQAB", "e": "AQAB"});
        assert!(Jwk::from_json(&v, 0).is_err());
    }

    #[test]
    fn rejects_unrecognised_kty() {
        let v = json!({"kid": "1", "kty": "oct", "k": "AQAB"});
        assert!(Jwk::from_json(&v, 0).is_err());
    }

    #[test]
    fn rejects_alg_kty_mismatch() {
        let v = json!({"kid": "1", "kty": "EC", "alg": "RS256", "crv": "P-256", "x": "AA", "y": "AA"});
        assert!(Jwk::from_json(&v, 0).is_err());
    }

    #[test]
    fn rejects_ec_missing_y() {
        let v = json!({"kid": "1", "kty": "EC", "crv": "P-256", "x": "AA"});
        assert!(Jwk::from_json(&v, 0).is_err());
    }

    #[test]
    fn shared_secret_key_is_not_reachable_via_json() {
        // HMAC keys are only constructible via `from_shared_secret`; a JWKS response
        // can never produce one (`kty` is restricted to RSA/EC/OKP).
        let jwk = Jwk::from_shared_secret("hmac-1", b"super-secret".to_vec(), u128::MAX);
        assert_eq!(jwk.kid(), "hmac-1");
        assert!(matches!(jwk.material, KeyMaterial::Hmac(_)));
    }

    #[test]
    fn rejects_okp_unknown_curve() {
        let v = json!({"kid": "1", "kty": "OKP", "crv": "X25519", "x": "AA"});
        assert!(Jwk::from_json(&v, 0).is_err());
    }
}
