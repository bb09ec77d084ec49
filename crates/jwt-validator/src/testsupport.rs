//! Test-only token-signing helpers. Issuance is not part of this crate's production
//! surface; these builders exist solely to construct literal end-to-end test scenarios,
//! including the algorithm sweep.

#![cfg(any(test, feature = "test-support"))]

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::{json, Value};

/// A generated signing key plus the JWK JSON that advertises its public half.
pub struct TestKey {
    pub kid: String,
    pub alg: &'static str,
    pub jwk: Value,
    signer: Signer,
}

enum Signer {
    RsaPkcs1(Box<rsa::RsaPrivateKey>, Hash),
    RsaPss(Box<rsa::RsaPrivateKey>, Hash),
    P256(Box<p256::ecdsa::SigningKey>),
    P384(Box<p384::ecdsa::SigningKey>),
    P521(Box<p521::ecdsa::SigningKey>),
    Ed25519(Box<ed25519_dalek::SigningKey>),
    /// HMAC has no public half to advertise, so `TestKey::jwk` is left `Value::Null`
    /// for this variant — a caller exercising `HS*` builds the `Jwk` itself via
    /// `Jwk::from_shared_secret` and the `secret` byte string exposed here.
    Hmac(Vec<u8>, Hash),
}

#[derive(Clone, Copy)]
enum Hash {
    Sha256,
    Sha384,
    Sha512,
}

fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

impl TestKey {
    /// Generates a fresh key pair for `alg` with key id `kid`.
    pub fn generate(alg: &'static str, kid: &str) -> Self {
        let mut rng = rand::thread_rng();
        match alg {
            "RS256" | "RS384" | "RS512" => {
                let hash = hash_for(alg);
                let private = rsa::RsaPrivateKey::new(&mut rng, 2048).expect("rsa keygen");
                let public = private.to_public_key();
                let jwk = json!({
                    "kid": kid,
                    "kty": "RSA",
                    "n": b64(&public.n().to_bytes_be()),
                    "e": b64(&public.e().to_bytes_be()),
                });
                TestKey {
                    kid: kid.to_string(),
                    alg,
                    jwk,
                    signer: Signer::RsaPkcs1(Box::new(private), hash),
                }
            }
            "PS256" | "PS384" | "PS512" => {
                let hash = hash_for(alg);
                let private = rsa::RsaPrivateKey::new(&mut rng, 2048).expect("rsa keygen");
                let public = private.to_public_key();
                let jwk = json!({
                    "kid": kid,
                    "kty": "RSA",
                    "n": b64(&public.n().to_bytes_be()),
                    "e": b64(&public.e().to_bytes_be()),
                });
                TestKey {
                    kid: kid.to_string(),
                    alg,
                    jwk,
                    signer: Signer::RsaPss(Box::new(private), hash),
                }
            }
            "ES256" => {
                let key = p256::ecdsa::SigningKey::random(&mut rng);
                let point = key.verifying_key().to_encoded_point(false);
                let jwk = json!({
                    "kid": kid, "kty": "EC", "crv": "P-256",
                    "x": b64(point.x().unwrap()), "y": b64(point.y().unwrap()),
                });
                TestKey { kid: kid.to_string(), alg, jwk, signer: Signer::P256(Box::new(key)) }
            }
            "ES384" => {
                let key = p384::ecdsa::SigningKey::random(&mut rng);
                let point = key.verifying_key().to_encoded_point(false);
                let jwk = json!({
                    "kid": kid, "kty": "EC", "crv": "P-384",
                    "x": b64(point.x().unwrap()), "y": b64(point.y().unwrap()),
                });
                TestKey { kid: kid.to_string(), alg, jwk, signer: Signer::P384(Box::new(key)) }
            }
            "ES512" => {
                let key = p521::ecdsa::SigningKey::random(&mut rng);
                let point = key.verifying_key().to_encoded_point(false);
                let jwk = json!({
                    "kid": kid, "kty": "EC", "crv": "P-521",
                    "x": b64(point.x().unwrap()), "y": b64(point.y().unwrap()),
                });
                TestKey { kid: kid.to_string(), alg, jwk, signer: Signer::P521(Box::new(key)) }
            }
            "HS256" | "HS384" | "HS512" => {
                let hash = match alg {
                    "HS256" => Hash::Sha256,
                    "HS384" => Hash::Sha384,
                    _ => Hash::Sha512,
                };
                let mut secret = vec![0u8; 32];
                rand::RngCore::fill_bytes(&mut rng, &mut secret);
                TestKey {
                    kid: kid.to_string(),
                    alg,
                    jwk: Value::Null,
                    signer: Signer::Hmac(secret, hash),
                }
            }
            "EdDSA" => {
                let key = ed25519_dalek::SigningKey::generate(&mut rng);
                let jwk = json!({
                    "kid": kid, "kty": "OKP", "crv": "Ed25519",
                    "x": b64(key.verifying_key().as_bytes()),
                });
                TestKey { kid: kid.to_string(), alg, jwk, signer: Signer::Ed25519(Box::new(key)) }
            }
            other => panic!("testsupport does not know how to generate alg `{other}`"),
        }
    }

    /// The shared secret backing an `HS*` key, if this is one.
    pub fn secret(&self) -> Option<&[u8]> {
        match &self.signer {
            Signer::Hmac(secret, _) => Some(secret),
            _ => None,
        }
    }

    /// Builds a compact-serialized token carrying `claims`, signed with this key.
    pub fn sign(&self, claims: &Value) -> String {
        let header = json!({ "alg": self.alg, "kid": self.kid, "typ": "JWT" });
        let signature_base = format!(
            "{}.{}",
            b64(header.to_string().as_bytes()),
            b64(claims.to_string().as_bytes())
        );
        let signature = self.raw_sign(signature_base.as_bytes());
        format!("{signature_base}.{}", b64(&signature))
    }

    fn raw_sign(&self, data: &[u8]) -> Vec<u8> {
        use rsa::signature::{RandomizedSigner, Signer as _};
        match &self.signer {
            Signer::RsaPkcs1(key, hash) => match hash {
                Hash::Sha256 => rsa::pkcs1v15::SigningKey::<sha2::Sha256>::new((**key).clone())
                    .sign(data)
                    .to_vec(),
                Hash::Sha384 => rsa::pkcs1v15::SigningKey::<sha2::Sha384>::new((**key).clone())
                    .sign(data)
                    .to_vec(),
                Hash::Sha512 => rsa::pkcs1v15::SigningKey::<sha2::Sha512>::new((**key).clone())
                    .sign(data)
                    .to_vec(),
            },
            Signer::RsaPss(key, hash) => {
                let mut rng = rand::thread_rng();
                match hash {
                    Hash::Sha256 => rsa::pss::SigningKey::<sha2::Sha256>::new((**key).clone())
                        .sign_with_rng(&mut rng, data)
                        .to_vec(),
                    Hash::Sha384 => rsa::pss::SigningKey::<sha2::Sha384>::new((**key).clone())
                        .sign_with_rng(&mut rng, data)
                        .to_vec(),
                    Hash::Sha512 => rsa::pss::SigningKey::<sha2::Sha512>::new((**key).clone())
                        .sign_with_rng(&mut rng, data)
                        .to_vec(),
                }
            }
            Signer::P256(key) => {
                use p256::ecdsa::signature::Signer as _;
                let sig: p256::ecdsa::Signature = key.sign(data);
                sig.to_vec()
            }
            Signer::P384(key) => {
                use p384::ecdsa::signature::Signer as _;
                let sig: p384::ecdsa::Signature = key.sign(data);
                sig.to_vec()
            }
            Signer::P521(key) => {
                use p521::ecdsa::signature::Signer as _;
                let sig: p521::ecdsa::Signature = key.sign(data);
                sig.to_vec()
            }
            Signer::Ed25519(key) => {
                use ed25519_dalek::Signer as _;
                key.sign(data).to_bytes().to_vec()
            }
            Signer::Hmac(secret, hash) => {
                use hmac::Mac;
                match hash {
                    Hash::Sha256 => {
                        let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(secret)
                            .expect("hmac accepts any key length");
                        mac.update(data);
                        mac.finalize().into_bytes().to_vec()
                    }
                    Hash::Sha384 => {
                        let mut mac = hmac::Hmac::<sha2::Sha384>::new_from_slice(secret)
                            .expect("hmac accepts any key length");
                        mac.update(data);
                        mac.finalize().into_bytes().to_vec()
                    }
                    Hash::Sha512 => {
                        let mut mac = hmac::Hmac::<sha2::Sha512>::new_from_slice(secret)
                            .expect("hmac accepts any key length");
                        mac.update(data);
                        mac.finalize().into_bytes().to_vec()
                    }
                }
            }
        }
    }
}

fn hash_for(alg: &str) -> Hash {
    match alg {
        "RS256" | "PS256" => Hash::Sha256,
        "RS384" | "PS384" => Hash::Sha384,
        "RS512" | "PS512" => Hash::Sha512,
        other => panic!("no hash mapping for `{other}`"),
    }
}
