//! Gemini-backed face comparison.
//!
//! Sends both images inline to the `generateContent` endpoint together with a
//! prompt and a JSON response schema, then parses the `{isMatch, confidence}`
//! verdict out of the first candidate's text part.

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::services::oracle::{Comparison, FaceComparator, OracleError};

const COMPARISON_PROMPT: &str = "Carefully compare the person in these two images. \
Are they the same individual? Respond with raw JSON only, no markdown. \
The JSON must have two fields: \"isMatch\", a boolean that is true if it is the same person, \
and \"confidence\", a number between 0.0 and 1.0 giving your confidence in that decision.";

const INITIAL_INTERVAL: Duration = Duration::from_millis(200);
const MAX_INTERVAL: Duration = Duration::from_secs(4);

/// Connection settings for the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Timeout of a single HTTP attempt
    pub timeout: Duration,
    /// Retries after the first attempt; a call makes at most `max_retries + 1` requests
    pub max_retries: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(rename = "isMatch")]
    is_match: bool,
    confidence: f64,
}

/// Gemini API client implementing [`FaceComparator`]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model,
            urlencoding::encode(&self.config.api_key)
        )
    }

    fn build_body(image_a: &[u8], image_b: &[u8]) -> Value {
        json!({
            "contents": [{
                "parts": [
                    { "inline_data": { "mime_type": sniff_mime(image_a), "data": BASE64.encode(image_a) } },
                    { "inline_data": { "mime_type": sniff_mime(image_b), "data": BASE64.encode(image_b) } },
                    { "text": COMPARISON_PROMPT }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "isMatch": { "type": "BOOLEAN" },
                        "confidence": { "type": "NUMBER" }
                    },
                    "required": ["isMatch", "confidence"]
                }
            }
        })
    }

    fn is_transient_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect() || error.is_request()
    }

    fn is_transient_status(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
                | StatusCode::BAD_GATEWAY
        )
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: INITIAL_INTERVAL,
            max_interval: MAX_INTERVAL,
            // Attempts are counted in `compare`; the caller's timeout bounds the wall clock
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Parse the model's text part into a validated verdict
    fn parse_verdict(body: GenerateContentResponse) -> Result<Comparison, OracleError> {
        let text = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| OracleError::InvalidResponse("No text part in response".into()))?;

        let trimmed = text
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let raw: RawVerdict = serde_json::from_str(trimmed).map_err(|e| {
            OracleError::InvalidResponse(format!("Failed to parse verdict: {}", e))
        })?;

        Comparison::new(raw.is_match, raw.confidence)
    }

    async fn compare_once(&self, body: &Value) -> Result<Comparison, backoff::Error<OracleError>> {
        let response = self
            .client
            .post(self.generate_url())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if Self::is_transient_error(&e) {
                    backoff::Error::transient(OracleError::RequestError(e))
                } else {
                    backoff::Error::permanent(OracleError::RequestError(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = OracleError::ApiError(format!("Gemini returned status: {}", status));
            return if Self::is_transient_status(status) {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            backoff::Error::permanent(OracleError::InvalidResponse(format!(
                "Failed to decode response body: {}",
                e
            )))
        })?;

        Self::parse_verdict(parsed).map_err(backoff::Error::permanent)
    }
}

#[async_trait]
impl FaceComparator for GeminiClient {
    async fn compare(&self, image_a: &[u8], image_b: &[u8]) -> Result<Comparison, OracleError> {
        let start = Instant::now();
        let body = Self::build_body(image_a, image_b);
        let max_attempts = self.config.max_retries.saturating_add(1);
        let attempts = AtomicU32::new(0);

        let result = retry_notify(
            self.build_backoff(),
            || async {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                match self.compare_once(&body).await {
                    Err(backoff::Error::Transient { err, .. }) if attempt >= max_attempts => {
                        Err(backoff::Error::permanent(err))
                    }
                    other => other,
                }
            },
            |err: OracleError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Gemini call failed, retry scheduled"
                );
            },
        )
        .await;

        debug!(
            model = %self.config.model,
            attempts = attempts.load(Ordering::SeqCst),
            latency_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Gemini comparison finished"
        );

        result
    }
}

/// Guess an image MIME type from its leading bytes, defaulting to JPEG
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(endpoint: String) -> GeminiConfig {
        GeminiConfig {
            endpoint,
            api_key: "test-key".to_string(),
            model: "gemini-test".to_string(),
            timeout: Duration::from_secs(2),
            max_retries: 1,
        }
    }

    fn verdict_body(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(&[0x89, b'P', b'N', b'G', 0x0d]), "image/png");
        assert_eq!(sniff_mime(b"GIF89a"), "image/gif");
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(&[0xff, 0xd8, 0xff]), "image/jpeg");
        assert_eq!(sniff_mime(&[]), "image/jpeg");
    }

    #[test]
    fn test_transient_status_codes() {
        assert!(GeminiClient::is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(GeminiClient::is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!GeminiClient::is_transient_status(StatusCode::BAD_REQUEST));
        assert!(!GeminiClient::is_transient_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_parse_verdict_strips_code_fence() {
        let body: GenerateContentResponse = serde_json::from_str(&verdict_body(
            "```json\n{\"isMatch\": true, \"confidence\": 0.87}\n```",
        ))
        .unwrap();

        let verdict = GeminiClient::parse_verdict(body).unwrap();
        assert!(verdict.is_match);
        assert_eq!(verdict.confidence, 0.87);
    }

    #[test]
    fn test_parse_verdict_without_text_fails() {
        let body: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            GeminiClient::parse_verdict(body),
            Err(OracleError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_request_body_carries_both_images() {
        let body = GeminiClient::build_body(b"first", &[0x89, b'P', b'N', b'G']);
        let parts = body["contents"][0]["parts"].as_array().unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["inline_data"]["data"], BASE64.encode(b"first"));
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[tokio::test]
    async fn test_compare_parses_successful_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_query(mockito::Matcher::UrlEncoded("key".into(), "test-key".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(verdict_body(r#"{"isMatch": true, "confidence": 0.93}"#))
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let verdict = client.compare(b"a", b"b").await.unwrap();

        assert!(verdict.is_match);
        assert_eq!(verdict.confidence, 0.93);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_compare_rejects_out_of_range_confidence() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(verdict_body(r#"{"isMatch": true, "confidence": 1.7}"#))
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let result = client.compare(b"a", b"b").await;

        assert!(matches!(result, Err(OracleError::ConfidenceOutOfRange(_))));
    }

    #[tokio::test]
    async fn test_compare_does_not_retry_client_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .expect(1)
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let result = client.compare(b"a", b"b").await;

        assert!(matches!(result, Err(OracleError::ApiError(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_compare_stops_after_max_retries_on_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let result = client.compare(b"a", b"b").await;

        assert!(matches!(result, Err(OracleError::ApiError(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_compare_without_retries_makes_one_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let config = GeminiConfig {
            max_retries: 0,
            ..test_config(server.url())
        };
        let client = GeminiClient::new(config).unwrap();
        let result = client.compare(b"a", b"b").await;

        assert!(matches!(result, Err(OracleError::ApiError(_))));
        mock.assert_async().await;
    }
}
