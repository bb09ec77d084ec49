//! A thin, expiring view over an OIDC discovery document.

use serde_json::Value;

/// Parsed `.well-known/openid-configuration` document, with an absolute expiry.
#[derive(Debug, Clone)]
pub struct DiscoveryData {
    document: Value,
    expires_at_ms: u128,
}

impl DiscoveryData {
    pub fn new(document: Value, expires_at_ms: u128) -> Self {
        DiscoveryData {
            document,
            expires_at_ms,
        }
    }

    pub fn expires_at_ms(&self) -> u128 {
        self.expires_at_ms
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.document.get(name).and_then(Value::as_str)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.field("issuer")
    }

    /// The only field the core validation pipeline actually consumes.
    pub fn jwks_uri(&self) -> Option<&str> {
        self.field("jwks_uri")
    }

    pub fn token_endpoint(&self) -> Option<&str> {
        self.field("token_endpoint")
    }

    pub fn authorization_endpoint(&self) -> Option<&str> {
        self.field("authorization_endpoint")
    }

    pub fn id_token_signing_alg_values_supported(&self) -> Option<Vec<String>> {
        self.document
            .get("id_token_signing_alg_values_supported")?
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
    }

    pub fn subject_types_supported(&self) -> Option<Vec<String>> {
        self.document
            .get("subject_types_supported")?
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
    }

    pub fn response_types_supported(&self) -> Option<Vec<String>> {
        self.document
            .get("response_types_supported")?
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_are_absent() {
        let d = DiscoveryData::new(json!({"issuer": "https://idp.example"}), 0);
        assert_eq!(d.issuer(), Some("https://idp.example"));
        assert_eq!(d.jwks_uri(), None);
    }

    #[test]
    fn reads_jwks_uri() {
        let d = DiscoveryData::new(
            json!({"jwks_uri": "https://idp.example/jwks.json"}),
            1000,
        );
        assert_eq!(d.jwks_uri(), Some("https://idp.example/jwks.json"));
        assert_eq!(d.expires_at_ms(), 1000);
    }
}
