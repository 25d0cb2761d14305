//! Topic detail resolution: static catalog first, provider second.
//!
//! Every failure on the generated path collapses to "no detail" for the
//! caller. The structured [`ResolveError`] is kept for logging and for
//! callers that want to tell the cases apart.

use std::sync::Arc;

use apeiron_core::error::ProviderError;
use apeiron_core::provider::{Provider, ProviderRequest};
use apeiron_core::topic::TopicDetail;
use thiserror::Error;
use tracing::{debug, error};

use crate::catalog::StaticCatalog;
use crate::prompt;
use crate::resilience::{ResilientInvoker, RetryPolicy};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("provider returned no text")]
    EmptyResponse,

    #[error("provider returned malformed detail: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub struct ContentResolver {
    provider: Arc<dyn Provider>,
    catalog: Arc<StaticCatalog>,
    invoker: ResilientInvoker,
    model: String,
    temperature: f32,
}

impl ContentResolver {
    pub fn new(
        provider: Arc<dyn Provider>,
        catalog: Arc<StaticCatalog>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            catalog,
            invoker: ResilientInvoker::default(),
            model: model.into(),
            temperature: 0.7,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.invoker = ResilientInvoker::new(policy);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Detail for `id`, or `None` when it cannot be produced.
    ///
    /// `title_hint` replaces the id in the generation prompt when given.
    pub async fn resolve(&self, id: &str, title_hint: Option<&str>) -> Option<TopicDetail> {
        match self.try_resolve(id, title_hint).await {
            Ok(detail) => Some(detail),
            Err(e) => {
                error!(topic = id, error = %e, "Failed to resolve topic detail");
                None
            }
        }
    }

    pub async fn try_resolve(
        &self,
        id: &str,
        title_hint: Option<&str>,
    ) -> Result<TopicDetail, ResolveError> {
        if let Some(detail) = self.catalog.detail(id) {
            debug!(topic = id, "Serving static detail");
            return Ok(detail.clone());
        }

        let subject = title_hint.unwrap_or(id);
        debug!(topic = id, subject, "Generating detail");

        let request = ProviderRequest::new(&self.model, prompt::deep_dive(subject))
            .with_temperature(self.temperature)
            .with_json_schema(prompt::topic_detail_schema());

        let response = self
            .invoker
            .invoke(|| {
                let provider = self.provider.clone();
                let request = request.clone();
                async move { provider.complete(request).await }
            })
            .await?;

        let text = response
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(ResolveError::EmptyResponse)?;

        Ok(serde_json::from_str(&text)?)
    }
}
