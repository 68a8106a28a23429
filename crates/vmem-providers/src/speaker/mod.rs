//! Speaker diarization providers.

pub mod http;

pub use http::HttpSpeakerLabeler;
