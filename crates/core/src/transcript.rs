//! The per-turn message sequence the resolution loop works on.

use thiserror::Error;
use toolbridge_model::{ModelMessage, ToolCallRequest};

/// A transcript that cannot be sent to the model.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TranscriptError {
    /// There is nothing to send.
    #[error("transcript is empty")]
    Empty,
    /// A tool result answers no earlier tool call.
    #[error("tool result `{0}` does not answer any earlier tool call")]
    OrphanToolResult(String),
}

/// An ordered, append-only sequence of messages.
///
/// Every tool result must carry the id of a tool call made by an earlier
/// assistant message. This holds for the messages the transcript starts
/// with as well as for everything pushed later.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ModelMessage>,
    base_len: usize,
}

impl Transcript {
    /// Creates an empty transcript.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcript from existing messages.
    ///
    /// Messages passed here are not reported by [`Transcript::appended`].
    pub fn from_messages(
        messages: impl IntoIterator<Item = ModelMessage>,
    ) -> Result<Self, TranscriptError> {
        let mut transcript = Self::new();
        for msg in messages {
            transcript.push(msg)?;
        }
        transcript.base_len = transcript.messages.len();
        Ok(transcript)
    }

    /// Appends a message.
    pub fn push(&mut self, msg: ModelMessage) -> Result<(), TranscriptError> {
        check_append(&self.messages, &msg)?;
        trace!("appending {} message", msg.role());
        self.messages.push(msg);
        Ok(())
    }

    /// Returns all messages.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns whether the transcript has no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the last message.
    #[inline]
    pub fn last(&self) -> Option<&ModelMessage> {
        self.messages.last()
    }

    /// Returns the messages pushed after construction.
    #[inline]
    pub fn appended(&self) -> &[ModelMessage] {
        &self.messages[self.base_len..]
    }

    /// Returns the tool call of the last message, if it is an assistant
    /// message waiting on one.
    #[inline]
    pub fn last_tool_call(&self) -> Option<&ToolCallRequest> {
        self.last().and_then(ModelMessage::tool_call)
    }
}

/// Checks that `msg` may follow `history`.
pub(crate) fn check_append(
    history: &[ModelMessage],
    msg: &ModelMessage,
) -> Result<(), TranscriptError> {
    let ModelMessage::Tool(result) = msg else {
        return Ok(());
    };
    let answered = history
        .iter()
        .filter_map(ModelMessage::tool_call)
        .any(|call| call.id == result.tool_call_id);
    if answered {
        Ok(())
    } else {
        Err(TranscriptError::OrphanToolResult(result.tool_call_id.clone()))
    }
}
