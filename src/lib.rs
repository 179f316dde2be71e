//! Encarta - chat-completion client with supersession semantics
//!
//! This library sends prompts to an OpenAI-compatible chat-completions
//! endpoint, guaranteeing that only the latest request's result is ever
//! delivered, and defines the collaborator seams for the text recognition and
//! voice command screens.

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod speech;
pub mod telemetry;
pub mod vision;
