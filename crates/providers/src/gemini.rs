//! Google Gemini provider implementation.
//!
//! Talks to the Generative Language REST API:
//! - `models/{model}:generateContent` for one-shot replies, with
//!   `responseMimeType`/`responseSchema` when the caller wants JSON
//! - `models/{model}:streamGenerateContent?alt=sse` for streamed replies

use async_trait::async_trait;
use futures::StreamExt;
use apeiron_core::error::ProviderError;
use apeiron_core::provider::*;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::wire::{SseDecoder, check_status};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A Gemini generative-text provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a provider against the public Gemini endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Point at a different endpoint (proxies, regional hosts, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": {
                "temperature": request.temperature,
            },
        });

        if let Some(schema) = &request.response_schema {
            body["generationConfig"]["responseMimeType"] = serde_json::json!("application/json");
            body["generationConfig"]["responseSchema"] = schema.clone();
        }

        body
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }
}

#[async_trait]
impl apeiron_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = self.model_url(&request.model, "generateContent");

        debug!(
            provider = %self.name,
            model = %request.model,
            json = request.wants_json(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(&request))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let response = check_status(response).await?;

        let api_response: GenerateContentResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Ok(ProviderResponse {
            text: api_response.text(),
            model: api_response.model_version.unwrap_or(request.model),
            usage: api_response.usage_metadata.map(Usage::from),
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        let url = format!(
            "{}?alt=sse",
            self.model_url(&request.model, "streamGenerateContent")
        );

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Accept", "text/event-stream")
            .json(&Self::request_body(&request))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let response = check_status(response).await?;

        // One slot: the reader stays at most a fragment ahead of the consumer.
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let provider_name = self.name.clone();

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for data in decoder.push(&bytes) {
                    match serde_json::from_str::<GenerateContentResponse>(&data) {
                        Ok(event) => {
                            let Some(text) = event.text() else {
                                continue;
                            };
                            if tx.send(Ok(StreamChunk::text(text))).await.is_err() {
                                trace!(provider = %provider_name, "Receiver dropped, closing stream");
                                return;
                            }
                        }
                        Err(e) => {
                            trace!(
                                provider = %provider_name,
                                data = %data,
                                error = %e,
                                "Ignoring unparseable SSE chunk"
                            );
                        }
                    }
                }
            }

            let _ = tx.send(Ok(StreamChunk::done())).await;
        });

        Ok(rx)
    }
}

// --- Gemini API types (internal) ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, `None` when empty.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl From<UsageMetadata> for Usage {
    fn from(u: UsageMetadata) -> Self {
        Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apeiron_core::Provider;
    use crate::test_helpers::{response, serve_once, truncated_event_stream};

    #[test]
    fn default_constructor() {
        let provider = GeminiProvider::new("key");
        assert_eq!(provider.name(), "gemini");
        assert!(provider.base_url.contains("generativelanguage.googleapis.com"));
    }

    #[test]
    fn custom_base_url_trims_slash() {
        let provider = GeminiProvider::new("key").with_base_url("http://localhost:9000/v1beta/");
        assert_eq!(
            provider.model_url("gemini-2.5-flash", "generateContent"),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn plain_request_body() {
        let body = GeminiProvider::request_body(&ProviderRequest::new("m", "Who are you?"));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Who are you?");
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn json_request_body_carries_schema() {
        let schema = serde_json::json!({"type": "OBJECT"});
        let request = ProviderRequest::new("m", "p").with_json_schema(schema.clone());
        let body = GeminiProvider::request_body(&request);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"], schema);
    }

    #[test]
    fn parse_generate_content_response() {
        let data = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "I am "}, {"text": "the void."}]}}],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4, "totalTokenCount": 16},
            "modelVersion": "gemini-2.5-flash"
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("I am the void."));
        let usage = Usage::from(parsed.usage_metadata.unwrap());
        assert_eq!(usage.total_tokens, 16);
    }

    #[test]
    fn empty_candidates_have_no_text() {
        let parsed: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(parsed.text().is_none());

        let parsed: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(parsed.text().is_none());
    }

    const HI: &str = r#"data: {"candidates":[{"content":{"parts":[{"text":"I am"}]}}]}"#;
    const VOID: &str = r#"data: {"candidates":[{"content":{"parts":[{"text":" the void."}]}}]}"#;

    async fn provider_for(raw: String) -> GeminiProvider {
        GeminiProvider::new("test-key").with_base_url(serve_once(raw).await)
    }

    #[tokio::test]
    async fn stream_server_error_fails_before_channel() {
        let provider = provider_for(response("500 Internal Server Error", &[], "boom")).await;
        let err = provider.stream(ProviderRequest::new("m", "hi")).await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::ApiError {
                status_code: 500,
                message: "boom".into()
            }
        );
    }

    #[tokio::test]
    async fn stream_rate_limit_and_auth_are_classified() {
        let provider =
            provider_for(response("429 Too Many Requests", &[("Retry-After", "7")], "")).await;
        let err = provider.stream(ProviderRequest::new("m", "hi")).await.unwrap_err();
        assert_eq!(err, ProviderError::RateLimited { retry_after_secs: 7 });

        let provider = provider_for(response("403 Forbidden", &[], "")).await;
        let err = provider.stream(ProviderRequest::new("m", "hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn stream_delivers_fragments_then_done() {
        let body = format!("{HI}\r\n\r\n{VOID}\r\n\r\n");
        let provider = provider_for(response(
            "200 OK",
            &[("Content-Type", "text/event-stream")],
            &body,
        ))
        .await;

        let mut rx = provider.stream(ProviderRequest::new("m", "hi")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().unwrap().text.as_deref(), Some("I am"));
        assert_eq!(rx.recv().await.unwrap().unwrap().text.as_deref(), Some(" the void."));
        assert!(rx.recv().await.unwrap().unwrap().done);
    }

    #[tokio::test]
    async fn broken_body_arrives_as_interruption() {
        let provider = provider_for(truncated_event_stream(&format!("{HI}\n\n"))).await;

        let mut rx = provider.stream(ProviderRequest::new("m", "hi")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().unwrap().text.as_deref(), Some("I am"));
        let err = rx.recv().await.unwrap().unwrap_err();
        assert!(matches!(err, ProviderError::StreamInterrupted(_)));
    }

    #[tokio::test]
    async fn complete_error_status_is_classified() {
        let provider = provider_for(response("401 Unauthorized", &[], "")).await;
        let err = provider.complete(ProviderRequest::new("m", "hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }
}
