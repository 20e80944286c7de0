//! The history of a conversation, kept across turns.

use serde::{Deserialize, Serialize};
use toolbridge_model::ModelMessage;

use crate::transcript::{TranscriptError, check_append};

/// The messages of one conversation, without the system prompt.
///
/// Every turn starts from this history and writes its new messages back,
/// including the ones appended before a failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConversation")]
pub struct Conversation {
    messages: Vec<ModelMessage>,
}

#[derive(Deserialize)]
struct RawConversation {
    messages: Vec<ModelMessage>,
}

impl TryFrom<RawConversation> for Conversation {
    type Error = TranscriptError;

    #[inline]
    fn try_from(raw: RawConversation) -> Result<Self, Self::Error> {
        Self::from_messages(raw.messages)
    }
}

impl Conversation {
    /// Creates an empty conversation.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation from existing messages, checking that every
    /// tool result answers an earlier tool call.
    pub fn from_messages(
        messages: impl IntoIterator<Item = ModelMessage>,
    ) -> Result<Self, TranscriptError> {
        let mut conversation = Self::new();
        for msg in messages {
            conversation.push(msg)?;
        }
        Ok(conversation)
    }

    /// Appends a message.
    pub fn push(&mut self, msg: ModelMessage) -> Result<(), TranscriptError> {
        check_append(&self.messages, &msg)?;
        self.messages.push(msg);
        Ok(())
    }

    /// Appends a user message.
    #[inline]
    pub fn push_user<S: Into<String>>(&mut self, content: S) {
        self.messages.push(ModelMessage::user(content));
    }

    /// Appends the frontend's result for a deferred tool call.
    #[inline]
    pub fn push_tool_result<S1, S2>(
        &mut self,
        tool_call_id: S1,
        content: S2,
    ) -> Result<(), TranscriptError>
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        self.push(ModelMessage::tool(tool_call_id, content))
    }

    /// Returns all messages.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Appends messages that were already validated by a transcript.
    pub(crate) fn extend_validated(&mut self, messages: &[ModelMessage]) {
        self.messages.extend_from_slice(messages);
    }
}
