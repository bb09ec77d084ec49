//! Parser and accessors for the three-part compact JWT.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::Value;

use crate::error::ValidationError;
use crate::jwk::SharedJwk;

/// A parsed, not-yet-verified compact JWS/JWT.
#[derive(Debug, Clone)]
pub struct CompactJwt {
    header: Value,
    payload: Value,
    /// `segments[0] + "." + segments[1]`, the exact bytes the signature covers.
    signature_base: String,
    /// The base64url signature segment, verbatim (may be empty for `alg=none`).
    signature_segment: String,
}

impl CompactJwt {
    /// Parses a compact-serialized token.
    ///
    /// Fails with [`ValidationError::Malformed`] if there are not exactly three
    /// dot-separated segments, the header/payload segments don't base64url-decode,
    /// or either decodes to something other than a JSON object.
    pub fn parse(token: &str) -> Result<Self, ValidationError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header_seg, payload_seg, signature_segment] = segments.as_slice() else {
            return Err(ValidationError::Malformed(format!(
                "expected 3 dot-separated segments, found {}",
                segments.len()
            )));
        };

        let header = decode_json_object(header_seg, "header")?;
        let payload = decode_json_object(payload_seg, "payload")?;
        let signature_base = format!("{header_seg}.{payload_seg}");

        Ok(CompactJwt {
            header,
            payload,
            signature_base,
            signature_segment: (*signature_segment).to_string(),
        })
    }

    /// The exact `header.payload` bytes the signature is computed over.
    pub fn signature_base(&self) -> &[u8] {
        self.signature_base.as_bytes()
    }

    /// The raw base64url signature segment (may be empty).
    pub fn signature_segment(&self) -> &str {
        &self.signature_segment
    }

    /// Decodes the signature segment, if non-empty.
    pub fn decode_signature(&self) -> Result<Vec<u8>, ValidationError> {
        URL_SAFE_NO_PAD
            .decode(&self.signature_segment)
            .map_err(|e| ValidationError::Malformed(format!("invalid base64url signature: {e}")))
    }

    /// `header.alg`, if present and a string.
    pub fn alg(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// `header.kid`, if present and a string.
    pub fn kid(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }

    /// `payload.iss`, if present and a string.
    pub fn iss(&self) -> Option<&str> {
        self.payload.get("iss").and_then(Value::as_str)
    }

    /// `payload.sub`, if present and a string.
    pub fn sub(&self) -> Option<&str> {
        self.payload.get("sub").and_then(Value::as_str)
    }

    /// `payload.exp`, if present and a number.
    pub fn exp(&self) -> Option<i64> {
        self.payload.get("exp").and_then(Value::as_i64)
    }

    /// `payload.nbf`, if present and a number.
    pub fn nbf(&self) -> Option<i64> {
        self.payload.get("nbf").and_then(Value::as_i64)
    }

    /// `payload.aud`, normalised to a sequence of strings regardless of whether the
    /// payload encoded it as a scalar or an array. Returns `None` if the claim is
    /// absent or neither a string nor an array of strings.
    pub fn aud(&self) -> Option<Vec<String>> {
        match self.payload.get("aud") {
            Some(Value::String(s)) => Some(vec![s.clone()]),
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }

    /// True iff the payload has at least one claim.
    pub fn has_any_claim(&self) -> bool {
        self.payload.as_object().is_some_and(|o| !o.is_empty())
    }

    /// Reserialises `header.payload.signature` using the original segments.
    pub fn to_compact_string(&self) -> String {
        format!("{}.{}", self.signature_base, self.signature_segment)
    }
}

/// A token that has passed full validation, carrying the key it was verified with.
#[derive(Debug, Clone)]
pub struct VerifiedJwt {
    pub token: CompactJwt,
    pub key: SharedJwk,
}

impl VerifiedJwt {
    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.token.payload.get(key)
    }
}

fn decode_json_object(segment: &str, name: &str) -> Result<Value, ValidationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| ValidationError::Malformed(format!("invalid base64url {name}: {e}")))?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| ValidationError::Malformed(format!("invalid JSON {name}: {e}")))?;
    if !value.is_object() {
        return Err(ValidationError::Malformed(format!(
            "{name} is not a JSON object"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(s: &str) -> String {
        URL_SAFE_NO_PAD.encode(s)
    }

    #[test]
    fn rejects_wrong_segment_counts() {
        for bad in ["a.b", "a.b.c.d", "a.b.c.d.e", "a.b.c.d.e.f"] {
            assert!(
                matches!(CompactJwt::parse(bad), Err(ValidationError::Malformed(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn round_trips_compact_string() {
        let header = b64(r#"{"alg":"RS256"}"#);
        let payload = b64(r#"{"sub":"abc"}"#);
        let sig = b64("signature-bytes");
        let compact = format!("{header}.{payload}.{sig}");
        let parsed = CompactJwt::parse(&compact).unwrap();
        assert_eq!(parsed.to_compact_string(), compact);
    }

    #[test]
    fn normalises_scalar_and_array_aud() {
        let header = b64(r#"{"alg":"RS256"}"#);
        let scalar = format!("{header}.{}.", b64(r#"{"aud":"x"}"#));
        let array = format!("{header}.{}.", b64(r#"{"aud":["x","y"]}"#));
        assert_eq!(
            CompactJwt::parse(&scalar).unwrap().aud(),
            Some(vec!["x".to_string()])
        );
        assert_eq!(
            CompactJwt::parse(&array).unwrap().aud(),
            Some(vec!["x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn rejects_non_object_payload() {
        let header = b64(r#"{"alg":"RS256"}"#);
        let payload = b64("[1,2,3]");
        let compact = format!("{header}.{payload}.");
        assert!(CompactJwt::parse(&compact).is_err());
    }
}
