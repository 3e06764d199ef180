//! Decoder for the agent's incremental event stream.
//!
//! The body is a sequence of `data: <json>` lines. Network chunks arrive with
//! arbitrary boundaries, so bytes are buffered until a newline is seen; an
//! unterminated tail is carried into the next chunk instead of being parsed
//! early. Splitting happens on raw bytes, which also keeps multi-byte UTF-8
//! sequences that straddle two chunks intact.

use bytes::BytesMut;
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::StreamError;

/// Prefix of every line that carries an event.
pub const DATA_PREFIX: &str = "data: ";

/// One decoded event record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Server-side agent id for this conversation.
    AgentId { agent_id: String },
    /// Next piece of assistant text.
    Text { content: String },
    /// The response is complete.
    Done,
    /// The agent failed; `content` is shown to the user.
    Error { content: String },
    /// Any tag this client does not know. Ignored.
    #[serde(other)]
    Unknown,
}

/// Incremental line splitter with carry-over between chunks.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: BytesMut,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the events of every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, StreamError>> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            if let Some(event) = decode_line(&line[..pos]) {
                events.push(event);
            }
        }
        events
    }

    /// Decodes whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<Result<StreamEvent, StreamError>> {
        let rest = self.buf.split();
        decode_line(&rest)
    }

    /// Bytes currently held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<StreamEvent, StreamError>> {
    let text = String::from_utf8_lossy(raw);
    let line = text.strip_suffix('\r').unwrap_or(&text);
    let payload = line.strip_prefix(DATA_PREFIX)?;
    Some(
        serde_json::from_str(payload).map_err(|source| StreamError::MalformedEvent {
            line: line.to_owned(),
            source,
        }),
    )
}

/// Adapts a body of byte chunks into a stream of decoded events.
///
/// A transport error is yielded once as [`StreamError::Network`] and ends the
/// stream.
pub fn event_stream<S, B, E>(body: S) -> impl Stream<Item = Result<StreamEvent, StreamError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    async_stream::stream! {
        let mut body = Box::pin(body);
        let mut decoder = LineDecoder::new();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in decoder.push(bytes.as_ref()) {
                        yield event;
                    }
                }
                Err(e) => {
                    yield Err(StreamError::Network(e.to_string()));
                    return;
                }
            }
        }
        if let Some(event) = decoder.finish() {
            yield event;
        }
    }
}
