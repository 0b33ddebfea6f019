//! Language-model providers for the knowledge-augmented responder.
//!
//! Every backend implements `knowbridge_core::Provider`. Gemini, OpenAI and
//! most hosted models are reached through their OpenAI-compatible endpoint.

pub mod openai_compat;

pub use openai_compat::{OpenAiCompatProvider, from_config};
