use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use toolbridge_core::tool::{Tool, ToolResult};

#[derive(Deserialize, JsonSchema)]
pub struct WeatherParameters {
    #[schemars(description = "The city and state, e.g. San Francisco, CA")]
    location: String,
}

/// A canned weather lookup.
pub struct WeatherTool {
    parameter_schema: Value,
}

impl WeatherTool {
    /// Creates a new weather tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(WeatherParameters).to_value(),
        }
    }
}

impl Default for WeatherTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for WeatherTool {
    type Input = WeatherParameters;

    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather in a given location"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn call(&self, input: WeatherParameters) -> ToolResult {
        Ok(format!(
            "The weather for {} is 70 degrees, clear skies, 45% humidity, \
             5 mph wind, and feels like 72 degrees.",
            input.location
        ))
    }
}
