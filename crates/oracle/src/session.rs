//! One conversation with a topic.

use apeiron_core::message::ChatMessage;
use thiserror::Error;

use crate::responder::{ReplyStream, StreamingResponder};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyMessage,
}

/// Message history for a conversation with a single concept.
#[derive(Debug, Clone)]
pub struct OracleSession {
    topic_title: String,
    messages: Vec<ChatMessage>,
}

impl OracleSession {
    pub fn new(topic_title: impl Into<String>) -> Self {
        let topic_title = topic_title.into();
        let greeting = format!(
            "CONNECTION ESTABLISHED. I AM {}. ASK YOUR QUESTION, HUMAN.",
            topic_title.to_uppercase()
        );
        Self {
            topic_title,
            messages: vec![ChatMessage::model(greeting)],
        }
    }

    pub fn topic_title(&self) -> &str {
        &self.topic_title
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send `message` and start the reply.
    ///
    /// The returned turn borrows the session, so a second message cannot be
    /// sent while a reply is still streaming.
    pub fn submit<'a>(
        &'a mut self,
        responder: &StreamingResponder,
        message: &str,
    ) -> Result<ReplyTurn<'a>, SessionError> {
        if message.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let stream = responder.stream(&self.topic_title, message);
        self.messages.push(ChatMessage::user(message));
        self.messages.push(ChatMessage::model(""));
        let reply_index = self.messages.len() - 1;

        Ok(ReplyTurn {
            session: self,
            reply_index,
            stream,
        })
    }
}

/// A reply being streamed into its session.
pub struct ReplyTurn<'a> {
    session: &'a mut OracleSession,
    reply_index: usize,
    stream: ReplyStream,
}

impl ReplyTurn<'_> {
    /// Append the next fragment and return the reply so far.
    pub async fn next(&mut self) -> Option<&str> {
        let fragment = self.stream.next_fragment().await?;
        let reply = &mut self.session.messages[self.reply_index];
        reply.append(&fragment);
        Some(&reply.text)
    }

    /// The reply so far.
    pub fn text(&self) -> &str {
        &self.session.messages[self.reply_index].text
    }

    /// Stream the remaining fragments and return the full reply.
    pub async fn run_to_end(mut self) -> String {
        while self.next().await.is_some() {}
        self.text().to_string()
    }

    /// Abandon the reply, keeping whatever text already arrived.
    pub fn close(mut self) {
        self.stream.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::responder::SEVERED_MESSAGE;
    use crate::test_helpers::{ScriptedProvider, StreamScript};
    use apeiron_core::error::ProviderError;
    use apeiron_core::message::ChatRole;
    use std::sync::Arc;

    fn responder(provider: Arc<ScriptedProvider>) -> StreamingResponder {
        let catalog = Arc::new(StaticCatalog::embedded().unwrap());
        StreamingResponder::new(provider, catalog, "test-model")
    }

    #[test]
    fn starts_with_greeting() {
        let session = OracleSession::new("Quantum Computing");
        assert_eq!(session.topic_title(), "Quantum Computing");
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, ChatRole::Model);
        assert_eq!(
            session.messages()[0].text,
            "CONNECTION ESTABLISHED. I AM QUANTUM COMPUTING. ASK YOUR QUESTION, HUMAN."
        );
    }

    #[tokio::test]
    async fn reply_text_grows_by_prefix() {
        let provider = Arc::new(
            ScriptedProvider::new().stream(StreamScript::Fragments(vec!["Hello", " there"])),
        );
        let responder = responder(provider);
        let mut session = OracleSession::new("Entropy");

        let mut turn = session.submit(&responder, "Who are you?").unwrap();
        assert_eq!(turn.text(), "");
        assert_eq!(turn.next().await, Some("Hello"));
        assert_eq!(turn.next().await, Some("Hello there"));
        assert_eq!(turn.next().await, None);

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].text, "Who are you?");
        assert_eq!(messages[2].role, ChatRole::Model);
        assert_eq!(messages[2].text, "Hello there");
    }

    #[test]
    fn blank_message_rejected() {
        let provider = Arc::new(ScriptedProvider::new());
        let responder = responder(provider.clone());
        let mut session = OracleSession::new("Entropy");

        assert_eq!(
            session.submit(&responder, "  \n").err(),
            Some(SessionError::EmptyMessage)
        );
        assert_eq!(session.messages().len(), 1);
        assert_eq!(provider.stream_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_lands_in_history() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .stream(StreamScript::Fail(ProviderError::Network("down".into())))
                .stream(StreamScript::Fail(ProviderError::Network("down".into()))),
        );
        let responder = responder(provider);
        let mut session = OracleSession::new("Entropy");

        let reply = session
            .submit(&responder, "Are you there?")
            .unwrap()
            .run_to_end()
            .await;

        assert_eq!(reply, SEVERED_MESSAGE);
        assert_eq!(session.messages()[2].text, SEVERED_MESSAGE);
    }

    #[tokio::test]
    async fn closed_turn_keeps_partial_reply() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .stream(StreamScript::Fragments(vec!["I am", " everything", "."]))
                .stream(StreamScript::Fragments(vec!["Again."])),
        );
        let responder = responder(provider.clone());
        let mut session = OracleSession::new("Entropy");

        let mut turn = session.submit(&responder, "Speak").unwrap();
        turn.next().await;
        turn.close();
        assert!(provider.last_stream_released());
        assert_eq!(session.messages()[2].text, "I am");

        let reply = session
            .submit(&responder, "Again")
            .unwrap()
            .run_to_end()
            .await;
        assert_eq!(reply, "Again.");
        assert_eq!(session.messages().len(), 5);
    }
}
