//! Provider-neutral protocol between the agent and chat-completion models.
//!
//! The types here only describe data: what the agent sends to a model,
//! what a streamed response yields, and how failures are classified.
//! Concrete providers live in their own crates and translate these types
//! to and from their wire formats.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
