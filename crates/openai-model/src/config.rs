use std::fmt::Debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const GEMINI_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai";
const GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Builder for [`OpenAIConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfigBuilder {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
    send_parallel_tool_calls: bool,
}

impl OpenAIConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            send_parallel_tool_calls: true,
        }
    }

    /// Creates a builder targeting Gemini's OpenAI-compatible endpoint.
    ///
    /// The endpoint rejects the `parallel_tool_calls` parameter, so it is
    /// not sent.
    #[inline]
    pub fn gemini<S: Into<String>>(api_key: S) -> Self {
        Self::with_api_key(api_key)
            .with_base_url(GEMINI_BASE_URL)
            .with_model(GEMINI_MODEL)
            .with_parallel_tool_calls_param(false)
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets whether `parallel_tool_calls` is sent with the request.
    #[inline]
    pub fn with_parallel_tool_calls_param(mut self, enabled: bool) -> Self {
        self.send_parallel_tool_calls = enabled;
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OpenAIConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        OpenAIConfig {
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            base_url: base_url.trim_end_matches('/').to_owned(),
            send_parallel_tool_calls: self.send_parallel_tool_calls,
        }
    }
}

impl Debug for OpenAIConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfigBuilder")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("send_parallel_tool_calls", &self.send_parallel_tool_calls)
            .finish()
    }
}

/// Configuration for the OpenAI-compatible provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfig {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) send_parallel_tool_calls: bool,
}

impl OpenAIConfig {
    /// Returns the model name.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the base URL, without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("send_parallel_tool_calls", &self.send_parallel_tool_calls)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_preset() {
        let config = OpenAIConfigBuilder::gemini("key").build();
        assert_eq!(config.model(), "gemini-2.0-flash");
        assert_eq!(config.base_url(), GEMINI_BASE_URL);
        assert!(!config.send_parallel_tool_calls);

        let debug = format!("{config:?}");
        assert!(!debug.contains("key\""));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = OpenAIConfigBuilder::with_api_key("key")
            .with_base_url("http://localhost:8080/v1/")
            .build();
        assert_eq!(config.base_url(), "http://localhost:8080/v1");
        assert!(config.send_parallel_tool_calls);
    }
}
