use serde_json::Value;

use crate::tool::{Tool, ToolResult};

/// Turns a tool's failures into ordinary results.
///
/// By default a failing handler aborts the turn. Wrapping a tool in
/// `Recovering` hands the failure back to the model instead, as a result
/// string of the form `Error: <reason>`, so it can react to it.
pub struct Recovering<T>(pub T);

impl<T: Tool> Tool for Recovering<T> {
    type Input = T::Input;

    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn call(&self, input: Self::Input) -> ToolResult {
        self.0.call(input).or_else(|err| {
            debug!("tool {} failed, reporting to the model: {err}", self.name());
            Ok(format!("Error: {}", err.reason()))
        })
    }
}
