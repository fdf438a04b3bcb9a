//! `LanguageModel` implementations.

pub mod openai;
pub mod scripted;

pub use openai::{OpenAiChatModel, OpenAiSettings};
pub use scripted::ScriptedModel;
