//! Text-completion client used by the analysis and summary stages.

pub mod client;
pub mod error;
mod wire;

pub use client::CompletionClient;
pub use error::LlmError;
