//! Core logic: the tool-call resolution loop, tool dispatch, the frontend
//! bridge and the turn driver built on top of them.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod bridge;
mod conversation;
mod error;
mod model_client;
mod resolve;
pub mod tool;
mod transcript;

pub use agent::{Agent, AgentBuilder, TurnOutcome};
pub use conversation::Conversation;
pub use error::{CompletionError, Error};
pub use model_client::{ModelClient, ModelClientResponse};
pub use resolve::{Signal, resolve};
pub use transcript::{Transcript, TranscriptError};

/// Re-exports of the model protocol crate.
pub mod model {
    pub use toolbridge_model::*;
}
