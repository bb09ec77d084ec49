//! The pluggable cryptographic verification capability.
//!
//! `alg`, key material, the signed bytes and the signature decide whether a token's
//! signature is valid. This module is deliberately thin: it dispatches to vetted
//! RustCrypto / `ed25519-dalek` verifiers rather than implementing any curve or
//! padding arithmetic itself.

use crate::algorithm::{AlgorithmDescriptor, Family, FamilyParams};
use crate::error::CryptoError;
use crate::jwk::KeyMaterial;

use hmac::{Hmac, Mac};
use rsa::pkcs1v15::{Signature as RsaSignature, VerifyingKey as RsaVerifyingKey};
use rsa::pss::{Signature as PssSignature, VerifyingKey as PssVerifyingKey};
use rsa::signature::Verifier;
use sha2::{Sha256, Sha384, Sha512};

/// A pluggable signature verification capability.
///
/// The crate ships [`DefaultVerifier`]; callers needing a different cryptographic
/// backend (an HSM, a FIPS-validated module, …) can substitute their own type.
pub trait Verify: Send + Sync {
    /// Returns `Ok(true)` iff `signature` is a valid signature over `data` under `key`
    /// for the algorithm described by `descriptor`.
    fn verify(
        &self,
        descriptor: &AlgorithmDescriptor,
        key: &KeyMaterial,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError>;
}

/// The default, production [`Verify`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultVerifier;

impl Verify for DefaultVerifier {
    fn verify(
        &self,
        descriptor: &AlgorithmDescriptor,
        key: &KeyMaterial,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        match (descriptor.family, key) {
            (Family::Rsa, KeyMaterial::Rsa(pk)) => verify_rsa_pkcs1(descriptor, pk, data, signature),
            (Family::RsaPss, KeyMaterial::Rsa(pk)) => {
                verify_rsa_pss(descriptor, pk, data, signature)
            }
            (Family::Ecdsa, KeyMaterial::Ec { curve, x, y }) => {
                verify_ecdsa(descriptor, curve, x, y, data, signature)
            }
            (Family::EdDsa, KeyMaterial::Okp { crv, x }) => verify_eddsa(crv, x, data, signature),
            (Family::Hmac, KeyMaterial::Hmac(secret)) => {
                verify_hmac(descriptor, secret, data, signature)
            }
            (Family::None, _) => Ok(false),
            _ => Err(CryptoError::InvalidKey(format!(
                "key type does not match algorithm family for {}",
                descriptor.name
            ))),
        }
    }
}

fn verify_rsa_pkcs1(
    descriptor: &AlgorithmDescriptor,
    pk: &rsa::RsaPublicKey,
    data: &[u8],
    signature: &[u8],
) -> Result<bool, CryptoError> {
    let sig = RsaSignature::try_from(signature).map_err(|_| CryptoError::MalformedSignature)?;
    use crate::algorithm::Hash;
    let ok = match descriptor.hash {
        Hash::Sha256 => RsaVerifyingKey::<Sha256>::new(pk.clone())
            .verify(data, &sig)
            .is_ok(),
        Hash::Sha384 => RsaVerifyingKey::<Sha384>::new(pk.clone())
            .verify(data, &sig)
            .is_ok(),
        Hash::Sha512 => RsaVerifyingKey::<Sha512>::new(pk.clone())
            .verify(data, &sig)
            .is_ok(),
        Hash::None => return Err(CryptoError::UnsupportedCurve(descriptor.name.to_string())),
    };
    Ok(ok)
}

fn verify_rsa_pss(
    descriptor: &AlgorithmDescriptor,
    pk: &rsa::RsaPublicKey,
    data: &[u8],
    signature: &[u8],
) -> Result<bool, CryptoError> {
    let sig = PssSignature::try_from(signature).map_err(|_| CryptoError::MalformedSignature)?;
    let FamilyParams::Pss { salt_len_bytes } = descriptor.params else {
        return Err(CryptoError::UnsupportedCurve(descriptor.name.to_string()));
    };
    use crate::algorithm::Hash;
    let ok = match descriptor.hash {
        Hash::Sha256 => {
            PssVerifyingKey::<Sha256>::new_with_salt_len(pk.clone(), salt_len_bytes)
                .verify(data, &sig)
                .is_ok()
        }
        Hash::Sha384 => {
            PssVerifyingKey::<Sha384>::new_with_salt_len(pk.clone(), salt_len_bytes)
                .verify(data, &sig)
                .is_ok()
        }
        Hash::Sha512 => {
            PssVerifyingKey::<Sha512>::new_with_salt_len(pk.clone(), salt_len_bytes)
                .verify(data, &sig)
                .is_ok()
        }
        Hash::None => return Err(CryptoError::UnsupportedCurve(descriptor.name.to_string())),
    };
    Ok(ok)
}

fn verify_ecdsa(
    descriptor: &AlgorithmDescriptor,
    curve: &str,
    x: &[u8],
    y: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<bool, CryptoError> {
    match curve {
        "P-256" => {
            use p256::ecdsa::{signature::Verifier as _, Signature, VerifyingKey};
            let pt = p256::EncodedPoint::from_affine_coordinates(x.into(), y.into(), false);
            let key = VerifyingKey::from_encoded_point(&pt)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let sig =
                Signature::from_slice(signature).map_err(|_| CryptoError::MalformedSignature)?;
            Ok(key.verify(data, &sig).is_ok())
        }
        "P-384" => {
            use p384::ecdsa::{signature::Verifier as _, Signature, VerifyingKey};
            let pt = p384::EncodedPoint::from_affine_coordinates(x.into(), y.into(), false);
            let key = VerifyingKey::from_encoded_point(&pt)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let sig =
                Signature::from_slice(signature).map_err(|_| CryptoError::MalformedSignature)?;
            Ok(key.verify(data, &sig).is_ok())
        }
        "P-521" => {
            use p521::ecdsa::{signature::Verifier as _, Signature, VerifyingKey};
            let pt = p521::EncodedPoint::from_affine_coordinates(x.into(), y.into(), false);
            let key = VerifyingKey::from_encoded_point(&pt)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let sig =
                Signature::from_slice(signature).map_err(|_| CryptoError::MalformedSignature)?;
            Ok(key.verify(data, &sig).is_ok())
        }
        other => Err(CryptoError::UnsupportedCurve(format!(
            "{other} (wanted by {})",
            descriptor.name
        ))),
    }
}

fn verify_hmac(
    descriptor: &AlgorithmDescriptor,
    secret: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<bool, CryptoError> {
    use crate::algorithm::Hash;
    // `Mac::verify_slice` compares in constant time; that's the whole point of using
    // the `hmac` crate here rather than recomputing and `==`-comparing ourselves.
    let ok = match descriptor.hash {
        Hash::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            mac.update(data);
            mac.verify_slice(signature).is_ok()
        }
        Hash::Sha384 => {
            let mut mac = Hmac::<Sha384>::new_from_slice(secret)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            mac.update(data);
            mac.verify_slice(signature).is_ok()
        }
        Hash::Sha512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(secret)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            mac.update(data);
            mac.verify_slice(signature).is_ok()
        }
        Hash::None => return Err(CryptoError::UnsupportedCurve(descriptor.name.to_string())),
    };
    Ok(ok)
}

fn verify_eddsa(crv: &str, x: &[u8], data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
    if crv != "Ed25519" {
        return Err(CryptoError::UnsupportedCurve(crv.to_string()));
    }
    let x: [u8; 32] = x
        .try_into()
        .map_err(|_| CryptoError::InvalidKey("Ed25519 public key must be 32 bytes".to_string()))?;
    let key = ed25519_dalek::VerifyingKey::from_bytes(&x)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| CryptoError::MalformedSignature)?;
    let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    use ed25519_dalek::Verifier as _;
    Ok(key.verify(data, &sig).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_round_trips_and_rejects_tampering() {
        let descriptor = crate::algorithm::lookup("HS256").unwrap();
        let secret = KeyMaterial::Hmac(b"shared-secret".to_vec());
        let data = b"header.payload";

        let mut mac = Hmac::<Sha256>::new_from_slice(b"shared-secret").unwrap();
        mac.update(data);
        let signature = mac.finalize().into_bytes().to_vec();

        assert!(DefaultVerifier
            .verify(&descriptor, &secret, data, &signature)
            .unwrap());

        let mut tampered = signature.clone();
        tampered[0] ^= 0xff;
        assert!(!DefaultVerifier
            .verify(&descriptor, &secret, data, &tampered)
            .unwrap());
    }

    #[test]
    fn hmac_family_rejects_non_hmac_key_material() {
        let descriptor = crate::algorithm::lookup("HS256").unwrap();
        let rsa_key = rsa::RsaPublicKey::new(
            rsa::BigUint::from_bytes_be(&[1, 0, 1]),
            rsa::BigUint::from_bytes_be(&[1, 0, 1]),
        )
        .unwrap();
        let key = KeyMaterial::Rsa(rsa_key);
        assert!(DefaultVerifier.verify(&descriptor, &key, b"x", b"y").is_err());
    }
}
