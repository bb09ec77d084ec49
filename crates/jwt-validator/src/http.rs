//! The pluggable outbound HTTP capability and Cache-Control parsing.

use async_trait::async_trait;

use crate::error::ValidationError;

/// One fetched HTTP response, reduced to the fields the rest of the crate needs.
pub struct FetchedResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Raw `Cache-Control` header values, in the order the server sent them. A header
    /// may be repeated or may itself contain several comma-separated directives.
    pub cache_control: Vec<String>,
}

/// Abstracts a single outbound GET so tests can substitute a mock server.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedResponse, ValidationError>;
}

/// Production [`HttpFetch`] backed by `reqwest`.
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Builds a client with a fixed per-request timeout; the HTTP client, not the
    /// caller, is responsible for bounding request latency.
    pub fn new(timeout: std::time::Duration) -> Result<Self, ValidationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ValidationError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(ReqwestFetch { client })
    }
}

impl Default for ReqwestFetch {
    fn default() -> Self {
        ReqwestFetch::new(std::time::Duration::from_secs(10))
            .expect("default reqwest client configuration is always valid")
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get(&self, url: &str) -> Result<FetchedResponse, ValidationError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ValidationError::Upstream(e.to_string()))?;

        let status = response.status().as_u16();
        let cache_control = response
            .headers()
            .get_all(reqwest::header::CACHE_CONTROL)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| ValidationError::Upstream(e.to_string()))?
            .to_vec();

        Ok(FetchedResponse {
            status,
            body,
            cache_control,
        })
    }
}

/// Computes an absolute expiry in epoch-ms from a request time, the response's
/// `Cache-Control` header values, and the configured default cache duration.
///
/// The smallest valid positive `max-age` across all directives wins; if none parse,
/// falls back to `default_seconds`.
pub fn expiry_from_cache_control(
    request_time_ms: u128,
    cache_control: &[String],
    default_seconds: u64,
) -> u128 {
    let mut smallest: Option<u64> = None;
    for header in cache_control {
        for directive in header.split(',') {
            let directive = directive.trim();
            let Some((name, value)) = directive.split_once('=') else {
                continue;
            };
            if !name.trim().eq_ignore_ascii_case("max-age") {
                continue;
            }
            let value = value.trim().trim_matches('"').trim();
            match value.parse::<i64>() {
                Ok(seconds) if seconds > 0 => {
                    let seconds = seconds as u64;
                    smallest = Some(smallest.map_or(seconds, |s| s.min(seconds)));
                }
                Ok(_) => {
                    tracing::warn!(directive, "ignoring non-positive max-age directive");
                }
                Err(_) => {
                    tracing::warn!(directive, "ignoring unparsable max-age directive");
                }
            }
        }
    }
    let chosen_seconds = smallest.unwrap_or(default_seconds);
    request_time_ms + u128::from(chosen_seconds) * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_when_no_max_age() {
        let expiry = expiry_from_cache_control(1_000, &[], 60);
        assert_eq!(expiry, 1_000 + 60_000);
    }

    #[test]
    fn picks_smallest_positive_max_age() {
        let headers = vec!["max-age=120".to_string(), "max-age=30, public".to_string()];
        let expiry = expiry_from_cache_control(0, &headers, 600);
        assert_eq!(expiry, 30_000);
    }

    #[test]
    fn ignores_zero_negative_and_unparsable_values() {
        let headers = vec![
            "max-age=0".to_string(),
            "max-age=-5".to_string(),
            "max-age=banana".to_string(),
            "max-age=\"45\"".to_string(),
        ];
        let expiry = expiry_from_cache_control(0, &headers, 600);
        assert_eq!(expiry, 45_000);
    }

    #[test]
    fn strips_quotes_and_whitespace() {
        let headers = vec!["  max-age = \" 90 \" ".to_string()];
        // note: the split_once('=') keeps the leading space on the name, so the
        // eq_ignore_ascii_case check needs the name trimmed too.
        let expiry = expiry_from_cache_control(0, &headers, 600);
        assert_eq!(expiry, 90_000);
    }
}
