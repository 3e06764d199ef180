//! Agent chat session: folds stream events into an ordered message list.
//!
//! A session allows one in-flight request at a time. [`ChatSession::begin_request`]
//! pushes the user's message and exactly one empty assistant message, so every
//! `text` event has a target to append to. The session stays busy until the
//! stream reports `done` or `error`, fails at the transport level, or ends.

use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::document::Chunk;
use crate::error::{ChatError, StreamError};
use crate::stream::StreamEvent;

/// Message shown when the request never produced a usable stream.
pub const SEND_FAILED: &str = "Failed to send message";

/// Assistant greeting pushed when analysis of a chunk starts.
pub const GREETING: &str = "Hello! I'm Analyst Ken. How can I help you analyze this content?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Whether the consumer should keep reading after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Continue,
    Finished,
}

/// JSON body of `POST /agent/query/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentQuery {
    pub workspace_id: String,
    /// Serialized as `null` until the server has assigned one.
    pub agent_id: Option<String>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_content: Option<String>,
}

/// Conversation state for one chat panel.
#[derive(Debug, Clone)]
pub struct ChatSession {
    workspace_id: String,
    agent_id: Option<String>,
    messages: Vec<ChatMessage>,
    streaming: bool,
}

impl ChatSession {
    pub fn new(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            agent_id: None,
            messages: Vec::new(),
            streaming: false,
        }
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Pushes the assistant greeting. Ignored once a conversation has started.
    pub fn start_analysis(&mut self) {
        if self.messages.is_empty() {
            self.messages.push(ChatMessage::new(Role::Assistant, GREETING));
        }
    }

    /// Records a user prompt and returns the request body to send.
    ///
    /// # Arguments
    ///
    /// * `prompt` - Text typed by the user; surrounding whitespace is dropped.
    /// * `chunk` - Chunk the conversation is about, if any.
    ///
    /// # Errors
    ///
    /// [`ChatError::Busy`] while a previous response is still streaming, and
    /// [`ChatError::EmptyPrompt`] for blank input. Neither changes the session.
    pub fn begin_request(
        &mut self,
        prompt: &str,
        chunk: Option<&Chunk>,
    ) -> Result<AgentQuery, ChatError> {
        if self.streaming {
            return Err(ChatError::Busy);
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }
        self.messages.push(ChatMessage::new(Role::User, prompt));
        self.messages.push(ChatMessage::new(Role::Assistant, ""));
        self.streaming = true;
        Ok(AgentQuery {
            workspace_id: self.workspace_id.clone(),
            agent_id: self.agent_id.clone(),
            prompt: prompt.to_owned(),
            chunk_id: chunk.map(|c| c.id.clone()),
            chunk_content: chunk.map(|c| c.markdown.clone()),
        })
    }

    /// Folds one event into the session.
    ///
    /// Events arriving when no request is streaming are dropped.
    pub fn apply(&mut self, event: StreamEvent) -> StreamStatus {
        if !self.streaming {
            debug!(?event, "event after stream finished");
            return StreamStatus::Finished;
        }
        match event {
            StreamEvent::AgentId { agent_id } => {
                if self.agent_id.is_none() {
                    self.agent_id = Some(agent_id);
                }
                StreamStatus::Continue
            }
            StreamEvent::Text { content } => {
                if let Some(last) = self.messages.last_mut() {
                    last.content.push_str(&content);
                }
                StreamStatus::Continue
            }
            StreamEvent::Done => self.finish(),
            StreamEvent::Error { content } => {
                self.messages.push(ChatMessage::new(Role::Error, content));
                self.finish()
            }
            StreamEvent::Unknown => StreamStatus::Continue,
        }
    }

    /// Ends the current request with an error message.
    ///
    /// Text already streamed into the assistant message is kept.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::Error, reason));
        self.streaming = false;
    }

    /// Marks the stream finished without adding a message (body ended early).
    pub fn end_of_stream(&mut self) {
        self.streaming = false;
    }

    /// Drives a whole event stream into the session.
    pub async fn consume<S>(&mut self, events: S)
    where
        S: Stream<Item = Result<StreamEvent, StreamError>>,
    {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    if self.apply(event) == StreamStatus::Finished {
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "agent stream failed");
                    self.fail(e.to_string());
                    return;
                }
            }
        }
        self.end_of_stream();
    }

    fn finish(&mut self) -> StreamStatus {
        self.streaming = false;
        StreamStatus::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> StreamEvent {
        StreamEvent::Text { content: s.into() }
    }

    #[test]
    fn begin_request_pushes_exactly_one_placeholder() {
        let mut chat = ChatSession::new("ws1");
        let query = chat.begin_request("  What is revenue? ", None).unwrap();
        assert_eq!(query.prompt, "What is revenue?");
        assert_eq!(query.agent_id, None);
        assert_eq!(
            chat.messages(),
            &[
                ChatMessage::new(Role::User, "What is revenue?"),
                ChatMessage::new(Role::Assistant, ""),
            ]
        );
        assert!(chat.is_streaming());
    }

    #[test]
    fn busy_and_empty_prompts_are_rejected() {
        let mut chat = ChatSession::new("ws1");
        assert_eq!(chat.begin_request("   ", None), Err(ChatError::EmptyPrompt));
        chat.begin_request("first", None).unwrap();
        assert_eq!(chat.begin_request("second", None), Err(ChatError::Busy));
        assert_eq!(chat.messages().len(), 2);

        chat.apply(StreamEvent::Done);
        assert!(chat.begin_request("second", None).is_ok());
    }

    #[test]
    fn text_accumulates_in_receipt_order() {
        let mut chat = ChatSession::new("ws1");
        chat.begin_request("q", None).unwrap();
        for piece in ["ab", "cd", "ef"] {
            assert_eq!(chat.apply(text(piece)), StreamStatus::Continue);
        }
        assert_eq!(chat.apply(StreamEvent::Done), StreamStatus::Finished);
        assert_eq!(chat.messages()[1].content, "abcdef");
        assert!(!chat.is_streaming());
    }

    #[test]
    fn first_agent_id_wins_and_is_sent_on_next_request() {
        let mut chat = ChatSession::new("ws1");
        chat.begin_request("q1", None).unwrap();
        chat.apply(StreamEvent::AgentId { agent_id: "X".into() });
        chat.apply(StreamEvent::AgentId { agent_id: "Y".into() });
        chat.apply(StreamEvent::Done);
        assert_eq!(chat.agent_id(), Some("X"));

        let query = chat.begin_request("q2", None).unwrap();
        assert_eq!(query.agent_id.as_deref(), Some("X"));
    }

    #[test]
    fn error_event_appends_error_and_stops() {
        let mut chat = ChatSession::new("ws1");
        chat.begin_request("q", None).unwrap();
        chat.apply(text("partial"));
        assert_eq!(
            chat.apply(StreamEvent::Error { content: "agent crashed".into() }),
            StreamStatus::Finished
        );
        assert_eq!(chat.apply(text("late")), StreamStatus::Finished);
        assert_eq!(
            chat.messages(),
            &[
                ChatMessage::new(Role::User, "q"),
                ChatMessage::new(Role::Assistant, "partial"),
                ChatMessage::new(Role::Error, "agent crashed"),
            ]
        );
    }

    #[test]
    fn query_body_carries_chunk_and_null_agent() {
        let mut chat = ChatSession::new("ws1");
        let chunk = Chunk {
            id: "c7".into(),
            markdown: "Net sales rose 8%".into(),
        };
        let query = chat.begin_request("explain", Some(&chunk)).unwrap();
        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "workspace_id": "ws1",
                "agent_id": null,
                "prompt": "explain",
                "chunk_id": "c7",
                "chunk_content": "Net sales rose 8%",
            })
        );
    }

    #[test]
    fn greeting_only_on_empty_session() {
        let mut chat = ChatSession::new("ws1");
        chat.start_analysis();
        chat.start_analysis();
        assert_eq!(chat.messages(), &[ChatMessage::new(Role::Assistant, GREETING)]);
    }

    #[tokio::test]
    async fn consume_handles_transport_failure_and_early_end() {
        let mut chat = ChatSession::new("ws1");
        chat.begin_request("q", None).unwrap();
        let events = futures::stream::iter(vec![
            Ok(text("half")),
            Err(StreamError::Network("connection reset".into())),
            Ok(text("never")),
        ]);
        chat.consume(events).await;
        assert!(!chat.is_streaming());
        assert_eq!(chat.messages()[1].content, "half");
        assert_eq!(chat.messages()[2].role, Role::Error);
        assert_eq!(chat.messages().len(), 3);

        chat.begin_request("again", None).unwrap();
        chat.consume(futures::stream::iter(vec![Ok(text("x"))])).await;
        assert!(!chat.is_streaming());
        assert_eq!(chat.messages().last().map(|m| m.content.as_str()), Some("x"));
    }
}
