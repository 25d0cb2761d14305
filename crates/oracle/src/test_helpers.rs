//! Shared test helpers: a scripted provider.

use std::collections::VecDeque;
use std::sync::Mutex;

use apeiron_core::error::ProviderError;
use apeiron_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk,
};
use tokio::sync::mpsc;

/// How one `stream()` call should behave.
pub enum StreamScript {
    /// Establishment fails with this error
    Fail(ProviderError),
    /// Establishment never completes
    Hang,
    /// Stream opens and yields these fragments, then completes
    Fragments(Vec<&'static str>),
    /// Stream opens, yields these fragments, then breaks
    Interrupted(Vec<&'static str>),
}

/// A mock provider that replays scripted completions and streams.
///
/// Panics when called more times than it has scripts for.
#[derive(Default)]
pub struct ScriptedProvider {
    completions: Mutex<VecDeque<Result<Option<String>, ProviderError>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    complete_calls: Mutex<usize>,
    stream_calls: Mutex<usize>,
    prompts: Mutex<Vec<String>>,
    senders: Mutex<Vec<mpsc::Sender<Result<StreamChunk, ProviderError>>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completion(self, text: &str) -> Self {
        self.completions
            .lock()
            .unwrap()
            .push_back(Ok(Some(text.to_string())));
        self
    }

    pub fn empty_completion(self) -> Self {
        self.completions.lock().unwrap().push_back(Ok(None));
        self
    }

    pub fn failed_completion(self, error: ProviderError) -> Self {
        self.completions.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn stream(self, script: StreamScript) -> Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    pub fn complete_calls(&self) -> usize {
        *self.complete_calls.lock().unwrap()
    }

    pub fn stream_calls(&self) -> usize {
        *self.stream_calls.lock().unwrap()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    /// Whether the consumer side of the most recent stream is gone.
    pub fn last_stream_released(&self) -> bool {
        self.senders
            .lock()
            .unwrap()
            .last()
            .is_some_and(|tx| tx.is_closed())
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.complete_calls.lock().unwrap() += 1;
        self.prompts.lock().unwrap().push(request.prompt);

        let next = self
            .completions
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider: no more completions");

        next.map(|text| ProviderResponse {
            text,
            model: request.model,
            usage: None,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        *self.stream_calls.lock().unwrap() += 1;
        self.prompts.lock().unwrap().push(request.prompt);

        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider: no more streams");

        let (fragments, interrupted) = match script {
            StreamScript::Fail(e) => return Err(e),
            StreamScript::Hang => std::future::pending().await,
            StreamScript::Fragments(f) => (f, false),
            StreamScript::Interrupted(f) => (f, true),
        };

        let (tx, rx) = mpsc::channel(fragments.len() + 1);
        for fragment in fragments {
            tx.try_send(Ok(StreamChunk::text(fragment))).unwrap();
        }
        let last = if interrupted {
            Err(ProviderError::StreamInterrupted("connection reset".into()))
        } else {
            Ok(StreamChunk::done())
        };
        tx.try_send(last).unwrap();

        self.senders.lock().unwrap().push(tx);
        Ok(rx)
    }
}
