//! Backend tools: the handler trait, descriptors, and the registry the
//! resolution loop dispatches through.

mod descriptor;
mod error;
mod recovering;
mod registry;
mod set;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use descriptor::{ParameterSchema, ToolDescriptor};
pub use error::{Error, ErrorKind};
pub use recovering::Recovering;
pub use registry::HandlerRegistry;
pub use set::{Ownership, ToolSet, ToolSetError};

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A backend-owned tool that can be called by the model.
///
/// Handlers run synchronously on the resolution loop, between two model
/// rounds. Nothing bounds their running time, so keep them short.
///
/// Implementations should be stateless. If the tool needs context (a base
/// directory, a client), make it an immutable field set at construction.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool, as a JSON schema object.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    fn call(&self, input: Self::Input) -> ToolResult;
}

pub(crate) type Arguments = Map<String, Value>;

/// Type-erased handler stored by the registry.
pub(crate) trait ToolObject: Send + Sync + 'static {
    fn call(&self, arguments: Arguments) -> ToolResult;
}

pub(crate) struct AnyTool<T: Tool>(pub T);

impl<T: Tool> ToolObject for AnyTool<T> {
    fn call(&self, arguments: Arguments) -> ToolResult {
        let input: T::Input =
            serde_json::from_value(Value::Object(arguments)).map_err(|err| {
                Error::invalid_input().with_reason(err.to_string())
            })?;
        self.0.call(input)
    }
}

pub(crate) struct FnTool<F>(pub F);

impl<F> ToolObject for FnTool<F>
where
    F: Fn(Arguments) -> ToolResult + Send + Sync + 'static,
{
    #[inline]
    fn call(&self, arguments: Arguments) -> ToolResult {
        (self.0)(arguments)
    }
}
