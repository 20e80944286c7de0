//! The bridge to the UI layer: frontend action declarations in, UI events
//! out.
//!
//! Event payloads follow the AG-UI protocol the frontend speaks. Framing
//! them for the wire is left to the server.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use toolbridge_model::ToolCallRequest;
use uuid::Uuid;

use crate::tool::{ParameterSchema, ToolDescriptor};

/// A tool declared by the frontend.
///
/// Both the wrapped form
/// `{"type": "function", "function": {"name", "description", "parameters"}}`
/// and the flat form `{"name", "description", "parameters"}` are accepted.
/// It is serialized in the wrapped form.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RawAction", into = "WrappedAction")]
pub struct ActionDeclaration {
    /// Name of the action.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// The JSON schema of the action's parameters, as declared.
    pub parameters: Value,
}

impl ActionDeclaration {
    /// Converts the declaration into a descriptor, normalizing its
    /// parameter schema.
    pub fn to_descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            self.name.as_str(),
            self.description.as_str(),
            ParameterSchema::from_json(&self.parameters),
        )
    }
}

#[derive(Deserialize, Serialize)]
struct FlatAction {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    parameters: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAction {
    Wrapped { function: FlatAction },
    Flat(FlatAction),
}

#[derive(Serialize)]
struct WrappedAction {
    r#type: &'static str,
    function: FlatAction,
}

impl From<RawAction> for ActionDeclaration {
    fn from(raw: RawAction) -> Self {
        let (RawAction::Wrapped { function: action } | RawAction::Flat(action)) =
            raw;
        Self {
            name: action.name,
            description: action.description,
            parameters: action.parameters,
        }
    }
}

impl From<ActionDeclaration> for WrappedAction {
    fn from(action: ActionDeclaration) -> Self {
        Self {
            r#type: "function",
            function: FlatAction {
                name: action.name,
                description: action.description,
                parameters: action.parameters,
            },
        }
    }
}

/// An event sent to the UI layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum BridgeEvent {
    /// A run has started.
    RunStarted {
        /// The conversation thread.
        thread_id: String,
        /// The run within the thread.
        run_id: String,
    },
    /// A run has finished successfully.
    RunFinished {
        /// The conversation thread.
        thread_id: String,
        /// The run within the thread.
        run_id: String,
    },
    /// A run has been aborted.
    RunError {
        /// What went wrong.
        message: String,
        /// A machine-readable error code.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    /// The assistant started a text message.
    TextMessageStart {
        /// The message.
        message_id: String,
        /// Always `assistant`.
        role: String,
    },
    /// A piece of assistant text.
    TextMessageContent {
        /// The message.
        message_id: String,
        /// The text.
        delta: String,
    },
    /// The assistant finished a text message.
    TextMessageEnd {
        /// The message.
        message_id: String,
    },
    /// The frontend is asked to run a tool.
    ToolCallStart {
        /// Correlation id of the call.
        tool_call_id: String,
        /// Name of the tool.
        tool_call_name: String,
    },
    /// Arguments of a tool call.
    ToolCallArgs {
        /// Correlation id of the call.
        tool_call_id: String,
        /// The serialized argument object.
        delta: String,
    },
    /// The tool call is fully described.
    ToolCallEnd {
        /// Correlation id of the call.
        tool_call_id: String,
    },
    /// The complete shared state of the run.
    StateSnapshot {
        /// The state, replacing whatever the frontend held before.
        snapshot: Value,
    },
}

/// Receives events for the UI layer.
pub trait EventSink: Send + Sync {
    /// Delivers an event. Delivery failures are not reported back.
    fn emit(&self, event: BridgeEvent);
}

impl EventSink for UnboundedSender<BridgeEvent> {
    fn emit(&self, event: BridgeEvent) {
        if self.send(event).is_err() {
            debug!("event receiver is gone, dropping event");
        }
    }
}

/// Hands a tool call over to the frontend.
///
/// Emits `TOOL_CALL_START`, `TOOL_CALL_ARGS` and `TOOL_CALL_END` in that
/// order. The frontend sends the result back on a later turn, as a tool
/// message carrying the same id.
pub fn defer_to_frontend(sink: &dyn EventSink, call: &ToolCallRequest) {
    debug!("deferring tool call {} ({}) to the frontend", call.id, call.name);

    // Re-serialize so the frontend always gets a compact object.
    let delta = serde_json::from_str::<Value>(&call.arguments)
        .map(|arguments| arguments.to_string())
        .unwrap_or_else(|_| call.arguments.clone());

    sink.emit(BridgeEvent::ToolCallStart {
        tool_call_id: call.id.clone(),
        tool_call_name: call.name.clone(),
    });
    sink.emit(BridgeEvent::ToolCallArgs {
        tool_call_id: call.id.clone(),
        delta,
    });
    sink.emit(BridgeEvent::ToolCallEnd {
        tool_call_id: call.id.clone(),
    });
}

/// Generates a tool call id of the form `call_<8 hex digits>`.
pub fn fresh_call_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("call_{}", &uuid[..8])
}

pub(crate) fn fresh_message_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}
