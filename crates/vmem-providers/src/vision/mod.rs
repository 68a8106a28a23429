//! Vision captioning providers.

pub mod openai;

pub use openai::OpenAiVisionProvider;
