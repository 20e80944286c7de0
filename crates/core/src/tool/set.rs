use std::collections::HashSet;

use thiserror::Error;
use toolbridge_model::ModelTool;

use crate::bridge::ActionDeclaration;
use crate::tool::{HandlerRegistry, ToolDescriptor};

/// Who executes a tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Declared by the UI layer and executed there.
    Frontend,
    /// Executed locally by a registered handler.
    Backend,
}

/// A misconfigured set of tools.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ToolSetError {
    /// The same name was declared twice on one side.
    #[error("tool `{0}` is declared more than once")]
    Duplicate(String),
    /// A frontend action shadows a backend tool.
    #[error("tool `{0}` is declared by both the frontend and the backend")]
    Conflict(String),
}

/// The tools offered to the model for one turn.
///
/// Frontend and backend names are disjoint, which is checked when the set
/// is built. A tool's ownership follows from the side it belongs to.
#[derive(Clone, Debug, Default)]
pub struct ToolSet {
    frontend: Vec<ToolDescriptor>,
    backend: Vec<ToolDescriptor>,
}

impl ToolSet {
    /// Builds the set from frontend-declared tools and the backend
    /// registry.
    pub fn new(
        frontend: Vec<ToolDescriptor>,
        registry: &HandlerRegistry,
    ) -> Result<Self, ToolSetError> {
        let mut seen = HashSet::new();
        for descriptor in &frontend {
            if !seen.insert(descriptor.name.as_str()) {
                return Err(ToolSetError::Duplicate(descriptor.name.clone()));
            }
            if registry.contains(&descriptor.name) {
                return Err(ToolSetError::Conflict(descriptor.name.clone()));
            }
        }
        Ok(Self {
            frontend,
            backend: registry.descriptors().cloned().collect(),
        })
    }

    /// Builds the set from the frontend's raw action declarations.
    #[inline]
    pub fn from_actions(
        actions: &[ActionDeclaration],
        registry: &HandlerRegistry,
    ) -> Result<Self, ToolSetError> {
        Self::new(
            actions.iter().map(ActionDeclaration::to_descriptor).collect(),
            registry,
        )
    }

    /// Returns the frontend-owned tools.
    #[inline]
    pub fn frontend(&self) -> &[ToolDescriptor] {
        &self.frontend
    }

    /// Returns the backend-owned tools.
    #[inline]
    pub fn backend(&self) -> &[ToolDescriptor] {
        &self.backend
    }

    /// Returns who owns the tool named `name`, if anyone does.
    pub fn ownership(&self, name: &str) -> Option<Ownership> {
        if self.frontend.iter().any(|d| d.name == name) {
            Some(Ownership::Frontend)
        } else if self.backend.iter().any(|d| d.name == name) {
            Some(Ownership::Backend)
        } else {
            None
        }
    }

    /// Returns whether `name` is a frontend-owned tool.
    #[inline]
    pub fn is_frontend(&self, name: &str) -> bool {
        self.ownership(name) == Some(Ownership::Frontend)
    }

    /// Frontend tools first, then backend tools.
    pub(crate) fn model_tools(&self) -> Vec<ModelTool> {
        self.frontend
            .iter()
            .chain(&self.backend)
            .map(ToolDescriptor::to_model_tool)
            .collect()
    }
}
