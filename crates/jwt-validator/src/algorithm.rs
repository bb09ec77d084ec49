//! The closed enumeration of supported JOSE algorithms.

use crate::error::ValidationError;

/// The cryptographic family a JOSE algorithm belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Rsa,
    RsaPss,
    Ecdsa,
    EdDsa,
    Hmac,
    None,
}

/// Underlying hash function used by an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hash {
    Sha256,
    Sha384,
    Sha512,
    /// EdDSA does its own internal hashing (SHA-512 for Ed25519); not exposed as a knob.
    None,
}

/// Family-specific parameters needed to instantiate a verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyParams {
    /// No extra parameters (RSA PKCS#1 v1.5, ECDSA, EdDSA, HMAC, none).
    None,
    /// RSA-PSS: MGF1 hash and salt length, both equal to the digest's output size per
    /// RFC 8230's recommended default.
    Pss { salt_len_bytes: usize },
}

/// Immutable descriptor for one recognised `alg` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmDescriptor {
    pub name: &'static str,
    pub family: Family,
    pub hash: Hash,
    pub min_key_bits: u32,
    pub curve: Option<&'static str>,
    pub params: FamilyParams,
}

impl AlgorithmDescriptor {
    const fn rsa(name: &'static str, hash: Hash) -> Self {
        AlgorithmDescriptor {
            name,
            family: Family::Rsa,
            hash,
            min_key_bits: 2048,
            curve: None,
            params: FamilyParams::None,
        }
    }

    const fn pss(name: &'static str, hash: Hash, salt_len_bytes: usize) -> Self {
        AlgorithmDescriptor {
            name,
            family: Family::RsaPss,
            hash,
            min_key_bits: 2048,
            curve: None,
            params: FamilyParams::Pss { salt_len_bytes },
        }
    }

    const fn ecdsa(name: &'static str, hash: Hash, curve: &'static str, min_key_bits: u32) -> Self {
        AlgorithmDescriptor {
            name,
            family: Family::Ecdsa,
            hash,
            min_key_bits,
            curve: Some(curve),
            params: FamilyParams::None,
        }
    }

    const fn hmac(name: &'static str, hash: Hash) -> Self {
        AlgorithmDescriptor {
            name,
            family: Family::Hmac,
            hash,
            min_key_bits: 256,
            curve: None,
            params: FamilyParams::None,
        }
    }
}

const NONE: AlgorithmDescriptor = AlgorithmDescriptor {
    name: "none",
    family: Family::None,
    hash: Hash::None,
    min_key_bits: 0,
    curve: None,
    params: FamilyParams::None,
};

const EDDSA: AlgorithmDescriptor = AlgorithmDescriptor {
    name: "EdDSA",
    family: Family::EdDsa,
    hash: Hash::None,
    min_key_bits: 256,
    curve: None,
    params: FamilyParams::None,
};

const REGISTRY: &[AlgorithmDescriptor] = &[
    AlgorithmDescriptor::hmac("HS256", Hash::Sha256),
    AlgorithmDescriptor::hmac("HS384", Hash::Sha384),
    AlgorithmDescriptor::hmac("HS512", Hash::Sha512),
    AlgorithmDescriptor::rsa("RS256", Hash::Sha256),
    AlgorithmDescriptor::rsa("RS384", Hash::Sha384),
    AlgorithmDescriptor::rsa("RS512", Hash::Sha512),
    AlgorithmDescriptor::ecdsa("ES256", Hash::Sha256, "P-256", 256),
    AlgorithmDescriptor::ecdsa("ES384", Hash::Sha384, "P-384", 384),
    AlgorithmDescriptor::ecdsa("ES512", Hash::Sha512, "P-521", 521),
    AlgorithmDescriptor::pss("PS256", Hash::Sha256, 32),
    AlgorithmDescriptor::pss("PS384", Hash::Sha384, 48),
    AlgorithmDescriptor::pss("PS512", Hash::Sha512, 64),
    EDDSA,
    NONE,
];

/// Looks up a JOSE `alg` name in the closed registry.
///
/// Fails with [`ValidationError::UnknownAlgorithm`] for any name outside the
/// recognised set.
pub fn lookup(alg: &str) -> Result<AlgorithmDescriptor, ValidationError> {
    REGISTRY
        .iter()
        .find(|d| d.name == alg)
        .copied()
        .ok_or_else(|| ValidationError::UnknownAlgorithm(alg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_all_spec_names() {
        for name in [
            "HS256", "HS384", "HS512", "RS256", "RS384", "RS512", "ES256", "ES384", "ES512",
            "PS256", "PS384", "PS512", "EdDSA", "none",
        ] {
            assert!(lookup(name).is_ok(), "{name} should be recognised");
        }
    }

    #[test]
    fn rejects_unknown_alg() {
        assert!(matches!(
            lookup("HS1024"),
            Err(ValidationError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn none_is_first_class_but_flagged() {
        let d = lookup("none").unwrap();
        assert_eq!(d.family, Family::None);
    }

    #[test]
    fn ecdsa_curves_match_spec_mapping() {
        assert_eq!(lookup("ES256").unwrap().curve, Some("P-256"));
        assert_eq!(lookup("ES384").unwrap().curve, Some("P-384"));
        assert_eq!(lookup("ES512").unwrap().curve, Some("P-521"));
    }
}
