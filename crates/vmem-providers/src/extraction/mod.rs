//! Extraction/translation chat providers.

pub mod openai;

pub use openai::OpenAiChatProvider;
