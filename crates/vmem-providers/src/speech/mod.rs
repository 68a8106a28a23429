//! Speech-to-text providers.

pub mod openai;

pub use openai::OpenAiSpeechProvider;
