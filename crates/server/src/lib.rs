//! An HTTP server exposing the agent to AG-UI frontends.
//!
//! `POST /agent` runs one turn over the posted message history and
//! streams the resulting events back as server-sent events.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
pub mod protocol;
mod routes;
pub mod state;
pub mod tools;

use toolbridge_core::model::ModelProvider;
use toolbridge_core::tool::{Recovering, ToolSetError};
use toolbridge_core::{Agent, AgentBuilder};

pub use config::{ConfigError, ServerConfig};
pub use routes::router;
use tools::{ReadFileTool, WeatherTool};

/// The system prompt template of the server's agent.
///
/// `{proverbs}` is filled from the run's [`state::AgentState`].
pub const SYSTEM_PROMPT: &str = include_str!("./system_prompt.md");

/// Builds the server's agent with its built-in tools.
pub fn build_agent<P: ModelProvider + 'static>(
    provider: P,
) -> Result<Agent, ToolSetError> {
    AgentBuilder::with_model_provider(provider)
        .with_tool(WeatherTool::new())
        .with_tool(Recovering(ReadFileTool::new()))
        .build()
}
