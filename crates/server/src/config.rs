use std::env;

use thiserror::Error;
use toolbridge_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

const DEFAULT_PORT: u16 = 8000;

/// A missing or malformed setting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    /// A variable does not parse.
    #[error("{name} has an invalid value `{value}`")]
    Invalid {
        /// Name of the variable.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Server settings, read from the environment.
///
/// | variable | meaning |
/// |---|---|
/// | `GEMINI_API_KEY` | API key of the model endpoint, required |
/// | `AGENT_MODEL` | model name, `gemini-2.0-flash` by default |
/// | `AGENT_BASE_URL` | OpenAI-compatible endpoint, Gemini's by default |
/// | `PORT` | listening port, `8000` by default |
#[derive(Debug)]
pub struct ServerConfig {
    /// Settings of the model provider.
    pub model: OpenAIConfig,
    /// Listening port.
    pub port: u16,
}

impl ServerConfig {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the settings through `lookup`, which maps a variable name to
    /// its value. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let api_key =
            var("GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
        let mut builder = OpenAIConfigBuilder::gemini(api_key);
        if let Some(model) = var("AGENT_MODEL") {
            builder = builder.with_model(model);
        }
        if let Some(base_url) = var("AGENT_BASE_URL") {
            builder = builder.with_base_url(base_url);
        }

        let port = match var("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            model: builder.build(),
            port,
        })
    }
}
