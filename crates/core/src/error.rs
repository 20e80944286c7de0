use std::error::Error as StdError;

use thiserror::Error;
use toolbridge_model::{ErrorKind, ModelProviderError};

use crate::tool::{self, ToolSetError};
use crate::transcript::TranscriptError;

/// A failed completion request, either while sending it or while
/// streaming its response.
#[derive(Debug, Error)]
#[error("completion request failed ({kind}): {source}")]
pub struct CompletionError {
    kind: ErrorKind,
    source: Box<dyn StdError + Send + Sync>,
}

impl CompletionError {
    pub(crate) fn new<E: ModelProviderError>(err: E) -> Self {
        Self {
            kind: err.kind(),
            source: Box::new(err),
        }
    }

    /// Returns the provider's classification of the failure.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Errors that abort a turn.
///
/// Nothing here is retried. Messages appended to the transcript before the
/// failure stay there.
#[derive(Debug, Error)]
pub enum Error {
    /// The model provider failed.
    #[error(transparent)]
    CompletionRequest(#[from] CompletionError),
    /// The model produced arguments that are not a JSON object.
    #[error("malformed arguments for tool `{tool}`: {source}")]
    ArgumentParse {
        /// Name of the invoked tool.
        tool: String,
        /// The parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// The model invoked a tool that is neither declared by the frontend
    /// nor registered on the backend.
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    /// A backend handler failed.
    #[error("tool `{tool}` failed: {source}")]
    HandlerExecution {
        /// Name of the invoked tool.
        tool: String,
        /// The handler's error.
        #[source]
        source: tool::Error,
    },
    /// The transcript is unusable.
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
    /// The tool set is misconfigured.
    #[error(transparent)]
    ToolSet(#[from] ToolSetError),
    /// The turn did not end within the configured number of rounds.
    #[error("turn did not end within {0} rounds")]
    RoundLimitExceeded(usize),
}
