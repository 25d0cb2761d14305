//! The Oracle: in-character replies streamed fragment by fragment.
//!
//! Opening the stream is retried a fixed number of times with a fixed
//! delay. If it never opens, the reply is a single fallback line. Once
//! fragments start flowing, a broken stream just ends the reply.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use apeiron_config::OracleConfig;
use apeiron_core::error::ProviderError;
use apeiron_core::provider::{Provider, ProviderRequest};
use futures::{Stream, StreamExt};
use tracing::{debug, error, warn};

use crate::catalog::StaticCatalog;
use crate::prompt;

/// Sole fragment of a reply whose stream could not be opened.
pub const SEVERED_MESSAGE: &str =
    "The connection to the void has been severed... The oracle grows silent.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPolicy {
    pub max_attempts: u32,
    /// Fixed wait between establishment attempts
    pub retry_delay: Duration,
    /// Deadline for establishing the stream, per attempt
    pub timeout: Duration,
}

impl Default for StreamPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_delay: Duration::from_millis(500),
            timeout: Duration::from_millis(30_000),
        }
    }
}

impl From<&OracleConfig> for StreamPolicy {
    fn from(config: &OracleConfig) -> Self {
        Self {
            max_attempts: config.stream_attempts,
            retry_delay: config.stream_retry_delay(),
            timeout: config.stream_timeout(),
        }
    }
}

pub struct StreamingResponder {
    provider: Arc<dyn Provider>,
    catalog: Arc<StaticCatalog>,
    model: String,
    temperature: f32,
    policy: StreamPolicy,
}

impl StreamingResponder {
    pub fn new(
        provider: Arc<dyn Provider>,
        catalog: Arc<StaticCatalog>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            catalog,
            model: model.into(),
            temperature: 0.7,
            policy: StreamPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: StreamPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Start a reply from the concept named `topic_title` to `message`.
    ///
    /// Nothing is sent until the returned stream is first polled.
    pub fn stream(&self, topic_title: &str, message: &str) -> ReplyStream {
        let context = self
            .catalog
            .detail_for_title(topic_title)
            .and_then(|detail| serde_json::to_string_pretty(detail).ok())
            .unwrap_or_else(|| "{}".to_string());

        let request = ProviderRequest::new(
            &self.model,
            prompt::persona(topic_title, &context, message),
        )
        .with_temperature(self.temperature);

        ReplyStream::new(relay(self.provider.clone(), request, self.policy))
    }
}

fn relay(
    provider: Arc<dyn Provider>,
    request: ProviderRequest,
    policy: StreamPolicy,
) -> impl Stream<Item = String> + Send + 'static {
    async_stream::stream! {
        let attempts = policy.max_attempts.max(1);
        let mut receiver = None;

        for attempt in 0..attempts {
            let opened = match tokio::time::timeout(policy.timeout, provider.stream(request.clone())).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout("Stream timeout".into())),
            };

            match opened {
                Ok(rx) => {
                    receiver = Some(rx);
                    break;
                }
                Err(e) => {
                    error!(
                        provider = provider.name(),
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %e,
                        "Oracle stream failed to open"
                    );
                    if attempt + 1 < attempts {
                        tokio::time::sleep(policy.retry_delay).await;
                    }
                }
            }
        }

        if let Some(mut rx) = receiver {
            while let Some(item) = rx.recv().await {
                match item {
                    Ok(chunk) => {
                        if let Some(text) = chunk.text.filter(|t| !t.is_empty()) {
                            yield text;
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Oracle stream interrupted");
                        break;
                    }
                }
            }
            debug!("Oracle reply finished");
        } else {
            yield SEVERED_MESSAGE.to_string();
        }
    }
}

/// A reply in progress.
///
/// Dropping it, or calling [`close`](Self::close), releases the underlying
/// provider stream.
pub struct ReplyStream {
    inner: Option<Pin<Box<dyn Stream<Item = String> + Send>>>,
}

impl ReplyStream {
    fn new(stream: impl Stream<Item = String> + Send + 'static) -> Self {
        Self {
            inner: Some(Box::pin(stream)),
        }
    }

    /// The next fragment, or `None` once the reply has ended or was closed.
    pub async fn next_fragment(&mut self) -> Option<String> {
        let inner = self.inner.as_mut()?;
        let next = inner.next().await;
        if next.is_none() {
            self.inner = None;
        }
        next
    }

    /// Stop early. Safe to call more than once.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!("Oracle reply closed by consumer");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Drain the remaining fragments into one string.
    pub async fn collect_text(mut self) -> String {
        let mut text = String::new();
        while let Some(fragment) = self.next_fragment().await {
            text.push_str(&fragment);
        }
        text
    }
}

impl Stream for ReplyStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };
        let poll = inner.as_mut().poll_next(cx);
        if let Poll::Ready(None) = poll {
            this.inner = None;
        }
        poll
    }
}
