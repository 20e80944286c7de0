use std::collections::HashMap;

use crate::tool::{
    AnyTool, Arguments, FnTool, ParameterSchema, Tool, ToolDescriptor,
    ToolObject, ToolResult, ToolSetError,
};

struct Entry {
    descriptor: ToolDescriptor,
    handler: Box<dyn ToolObject>,
}

/// A static table of backend tool handlers, keyed by tool name.
///
/// Names are checked when a tool is registered, so a duplicate is a
/// configuration error rather than a surprise during a conversation.
/// Descriptors are listed in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<(), ToolSetError> {
        let descriptor = ToolDescriptor::new(
            tool.name(),
            tool.description(),
            ParameterSchema::from_json(tool.parameter_schema()),
        );
        self.insert(descriptor, Box::new(AnyTool(tool)))
    }

    /// Registers a plain function as the handler for `descriptor`.
    pub fn register_fn<F>(
        &mut self,
        descriptor: ToolDescriptor,
        handler: F,
    ) -> Result<(), ToolSetError>
    where
        F: Fn(Arguments) -> ToolResult + Send + Sync + 'static,
    {
        self.insert(descriptor, Box::new(FnTool(handler)))
    }

    fn insert(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Box<dyn ToolObject>,
    ) -> Result<(), ToolSetError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(ToolSetError::Duplicate(descriptor.name));
        }
        trace!("registering tool: {}", descriptor.name);
        self.index
            .insert(descriptor.name.clone(), self.entries.len());
        self.entries.push(Entry {
            descriptor,
            handler,
        });
        Ok(())
    }

    /// Returns whether a handler is registered under `name`.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the registry has no tools.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the descriptors of all registered tools.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.entries.iter().map(|entry| &entry.descriptor)
    }

    /// Calls the handler registered under `name`.
    ///
    /// Returns `None` if there is no such handler.
    pub fn call(&self, name: &str, arguments: Arguments) -> Option<ToolResult> {
        let entry = &self.entries[*self.index.get(name)?];
        Some(entry.handler.call(arguments))
    }
}
