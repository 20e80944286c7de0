use toolbridge_model::ModelProvider;

use super::Agent;
use crate::model_client::ModelClient;
use crate::tool::{HandlerRegistry, Tool, ToolSetError};

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    registry: HandlerRegistry,
    system_prompt: Option<String>,
    max_rounds: Option<usize>,
    error: Option<ToolSetError>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            registry: HandlerRegistry::new(),
            system_prompt: None,
            max_rounds: None,
            error: None,
        }
    }

    /// Sets the system prompt put in front of every turn.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Registers a backend tool.
    ///
    /// A duplicate name is reported by [`AgentBuilder::build`].
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        if let Err(err) = self.registry.register(tool) {
            self.error.get_or_insert(err);
        }
        self
    }

    /// Limits the number of model rounds in one turn.
    ///
    /// By default a turn runs until the model stops calling backend tools.
    #[inline]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = Some(max_rounds.max(1));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Result<Agent, ToolSetError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Agent {
            model_client: self.model_client,
            registry: self.registry,
            system_prompt: self.system_prompt,
            max_rounds: self.max_rounds,
        })
    }
}
