//! Chat-completions client used by the planner.
//!
//! Speaks the OpenAI Chat Completions API, so any compatible endpoint
//! (hosted or a local Ollama / llama.cpp server) can be used by changing
//! `planner.base_url` in the config.

pub mod client;
pub mod errors;
pub mod types;

pub use client::ChatClient;
pub use errors::InferenceError;
pub use types::{ChatMessage, Role};
