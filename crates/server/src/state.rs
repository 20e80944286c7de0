//! State shared between the agent and the frontend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use toolbridge_core::model::ToolCallRequest;

/// The state the frontend sends with every run.
///
/// Fields the agent does not know about are kept and sent back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Proverbs shown in the UI.
    #[serde(default)]
    pub proverbs: Vec<String>,
    /// Other fields of the frontend's state.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AgentState {
    /// Fills the `{proverbs}` placeholder of a system prompt template.
    pub fn render_prompt(&self, template: &str) -> String {
        let proverbs = Value::from(self.proverbs.clone()).to_string();
        template.replace("{proverbs}", &proverbs)
    }

    /// Applies a frontend tool call that changes the state.
    ///
    /// Returns whether the state changed.
    pub fn apply(&mut self, call: &ToolCallRequest) -> bool {
        if !matches!(
            call.name.to_lowercase().as_str(),
            "addproverb" | "add_proverb"
        ) {
            return false;
        }
        let args = match serde_json::from_str::<Map<String, Value>>(&call.arguments)
        {
            Ok(args) => args,
            Err(err) => {
                warn!("ignoring `{}` with bad arguments: {err}", call.name);
                return false;
            }
        };
        let proverb = ["proverb", "text", "value"]
            .into_iter()
            .filter_map(|key| args.get(key))
            .find_map(|value| match value {
                Value::String(text) if !text.is_empty() => Some(text.clone()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            });
        match proverb {
            Some(proverb) => {
                debug!("adding proverb: {proverb}");
                self.proverbs.push(proverb);
                true
            }
            None => false,
        }
    }
}
