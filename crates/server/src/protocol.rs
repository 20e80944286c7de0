//! The request body of an agent run, as sent by AG-UI clients.

use serde::Deserialize;
use thiserror::Error;
use toolbridge_core::bridge::ActionDeclaration;
use toolbridge_core::model::{ModelMessage, ToolCallRequest};
use toolbridge_core::{Conversation, TranscriptError};

use crate::state::AgentState;

/// Input of one agent run.
///
/// The client sends the whole message history on every run, so the
/// server keeps no conversation state between runs.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentInput {
    /// The conversation thread.
    pub thread_id: String,
    /// The run id, generated by the server when missing.
    #[serde(default)]
    pub run_id: Option<String>,
    /// The message history.
    #[serde(default)]
    pub messages: Vec<InputMessage>,
    /// Actions the frontend offers for this run.
    #[serde(default)]
    pub tools: Vec<ActionDeclaration>,
    /// State shared with the frontend.
    #[serde(default)]
    pub state: Option<AgentState>,
}

/// A message of the history.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMessage {
    /// `user`, `assistant`, `tool`, `system` or `developer`.
    pub role: String,
    /// Text content, absent for assistant messages that only call tools.
    #[serde(default)]
    pub content: Option<String>,
    /// Tool calls made by an assistant message.
    #[serde(default)]
    pub tool_calls: Vec<InputToolCall>,
    /// The call a tool message answers.
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

/// A tool call in an assistant message.
#[derive(Clone, Debug, Deserialize)]
pub struct InputToolCall {
    /// Correlation id.
    pub id: String,
    /// The invoked function.
    pub function: InputFunctionCall,
}

/// The function part of a tool call.
#[derive(Clone, Debug, Deserialize)]
pub struct InputFunctionCall {
    /// Name of the tool.
    pub name: String,
    /// Serialized JSON arguments.
    #[serde(default)]
    pub arguments: String,
}

/// A message history the agent cannot work with.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The role is not one the agent knows.
    #[error("unsupported message role `{0}`")]
    UnsupportedRole(String),
    /// A tool message without the id of the call it answers.
    #[error("tool message without `toolCallId`")]
    MissingToolCallId,
    /// The messages break the conversation's ordering rules.
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
}

impl RunAgentInput {
    /// Converts the message history into a conversation.
    ///
    /// System and developer messages are dropped, the agent brings its own
    /// system prompt. Only the first tool call of an assistant message is
    /// kept, matching what the agent itself records.
    pub fn conversation(&self) -> Result<Conversation, ProtocolError> {
        let mut conversation = Conversation::new();
        for msg in &self.messages {
            let content = msg.content.clone().unwrap_or_default();
            let msg = match msg.role.as_str() {
                "user" => ModelMessage::user(content),
                "assistant" => {
                    if msg.tool_calls.len() > 1 {
                        warn!(
                            "assistant message has {} tool calls, keeping the first",
                            msg.tool_calls.len()
                        );
                    }
                    ModelMessage::Assistant {
                        content,
                        tool_call: msg.tool_calls.first().map(|call| {
                            ToolCallRequest::new(
                                call.id.as_str(),
                                call.function.name.as_str(),
                                call.function.arguments.as_str(),
                            )
                        }),
                    }
                }
                "tool" => {
                    let tool_call_id = msg
                        .tool_call_id
                        .clone()
                        .ok_or(ProtocolError::MissingToolCallId)?;
                    ModelMessage::tool(tool_call_id, content)
                }
                "system" | "developer" => {
                    debug!("dropping client {} message", msg.role);
                    continue;
                }
                role => return Err(ProtocolError::UnsupportedRole(role.to_owned())),
            };
            conversation.push(msg)?;
        }
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn input(messages: serde_json::Value) -> RunAgentInput {
        serde_json::from_value(json!({
            "threadId": "thread-1",
            "messages": messages,
            "tools": [{
                "name": "change_background",
                "description": "Change the background color of the chat.",
                "parameters": { "type": "object", "properties": {} }
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_conversation() {
        let input = input(json!([
            { "id": "1", "role": "system", "content": "Be brief." },
            { "id": "2", "role": "user", "content": "Make it blue" },
            {
                "id": "3",
                "role": "assistant",
                "toolCalls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {
                        "name": "change_background",
                        "arguments": "{\"background\":\"blue\"}"
                    }
                }]
            },
            {
                "id": "4",
                "role": "tool",
                "content": "done",
                "toolCallId": "call_1"
            }
        ]));
        assert_eq!(input.run_id, None);
        assert_eq!(input.tools[0].name, "change_background");

        let conversation = input.conversation().unwrap();
        assert_eq!(
            conversation.messages(),
            [
                ModelMessage::user("Make it blue"),
                ModelMessage::Assistant {
                    content: String::new(),
                    tool_call: Some(ToolCallRequest::new(
                        "call_1",
                        "change_background",
                        r#"{"background":"blue"}"#,
                    )),
                },
                ModelMessage::tool("call_1", "done"),
            ]
        );
    }

    #[test]
    fn test_orphan_tool_message() {
        let err = input(json!([
            { "role": "user", "content": "Hi" },
            { "role": "tool", "content": "done", "toolCallId": "call_1" }
        ]))
        .conversation()
        .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Transcript(TranscriptError::OrphanToolResult(_))
        ));
    }

    #[test]
    fn test_bad_messages() {
        let err = input(json!([{ "role": "robot", "content": "beep" }]))
            .conversation()
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedRole(role) if role == "robot"));

        let err = input(json!([{ "role": "tool", "content": "done" }]))
            .conversation()
            .unwrap_err();
        assert!(matches!(err, ProtocolError::MissingToolCallId));
    }
}
