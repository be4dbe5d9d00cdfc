//! LLM chat-completion client
//!
//! A single OpenAI-compatible surface: bearer-token auth against a
//! `{base}/chat/completions` endpoint. Both the summary generator and the
//! chat assistant go through the [`ChatCompleter`] trait so tests can swap
//! in scripted completers.

mod client;
mod error;
mod types;

pub use client::OpenAiCompatClient;
pub use error::LlmError;
pub use types::{ChatCompleter, ChatMessage, Role};
