//! Chunked transcript translation via the chat LLM.
//!
//! Long transcripts are split into size-bounded chunks: the formatted
//! variant on line boundaries (keeping timestamps and speaker labels
//! intact), the raw variant on sentence boundaries. A failed translation
//! keeps the original text rather than failing the job.

use std::sync::Arc;

use tracing::{info, warn};

use vmem_domain::constants::lang::language_name;
use vmem_domain::constants::media::TRANSLATION_CHUNK_CHARS;
use vmem_domain::error::Result;
use vmem_domain::ports::ChatProvider;

/// Transcript translator over a [`ChatProvider`].
pub struct Translator {
    chat: Arc<dyn ChatProvider>,
}

impl Translator {
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self { chat }
    }

    /// Translate both transcript variants to the target language. Returns
    /// the originals unchanged when translation fails.
    pub async fn translate_transcript(
        &self,
        raw_text: &str,
        formatted_text: &str,
        target_lang: &str,
    ) -> (String, String) {
        let lang_name = language_name(target_lang);

        match self.translate_both(raw_text, formatted_text, lang_name).await {
            Ok((raw, formatted)) => {
                info!(chars = formatted.len(), lang = lang_name, "translated transcript");
                (raw, formatted)
            }
            Err(e) => {
                warn!(error = %e, "translation failed, keeping original");
                (raw_text.to_owned(), formatted_text.to_owned())
            }
        }
    }

    async fn translate_both(
        &self,
        raw_text: &str,
        formatted_text: &str,
        lang_name: &str,
    ) -> Result<(String, String)> {
        let formatted = if formatted_text.len() <= TRANSLATION_CHUNK_CHARS {
            self.translate_chunk(formatted_text, lang_name, true).await?
        } else {
            let chunks = split_on_lines(formatted_text, TRANSLATION_CHUNK_CHARS);
            let mut parts = Vec::with_capacity(chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                info!(chunk = i + 1, total = chunks.len(), "translating formatted chunk");
                parts.push(self.translate_chunk(chunk, lang_name, true).await?);
            }
            parts.join("\n")
        };

        let raw = if raw_text.len() <= TRANSLATION_CHUNK_CHARS {
            self.translate_chunk(raw_text, lang_name, false).await?
        } else {
            let chunks = split_on_sentences(raw_text, TRANSLATION_CHUNK_CHARS);
            let mut parts = Vec::with_capacity(chunks.len());
            for chunk in &chunks {
                parts.push(self.translate_chunk(chunk, lang_name, false).await?);
            }
            parts.join(" ")
        };

        Ok((raw, formatted))
    }

    async fn translate_chunk(
        &self,
        text: &str,
        lang_name: &str,
        preserve_timestamps: bool,
    ) -> Result<String> {
        let instruction = if preserve_timestamps {
            format!(
                "Translate the following transcript to {lang_name}. \
                 Keep all timestamps (e.g. [0:00], [1:23]) and speaker labels exactly as they are. \
                 Only translate the spoken text. Return ONLY the translated transcript, nothing else."
            )
        } else {
            format!(
                "Translate the following text to {lang_name}. \
                 Return ONLY the translation, nothing else."
            )
        };

        let prompt = format!("{instruction}\n\n{text}");
        Ok(self.chat.chat_text(&prompt).await?.trim().to_owned())
    }
}

/// Split on line breaks so timestamps stay intact within a chunk.
fn split_on_lines(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        if current_len + line.len() > budget && !current.is_empty() {
            chunks.push(current.join("\n"));
            current.clear();
            current_len = 0;
        }
        current.push(line);
        current_len += line.len() + 1;
    }
    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }
    chunks
}

/// Split on sentence boundaries for prose.
fn split_on_sentences(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for part in text.split(". ") {
        if current_len + part.len() > budget && !current.is_empty() {
            chunks.push(current.join(". "));
            current.clear();
            current_len = 0;
        }
        current.push(part);
        current_len += part.len() + 2;
    }
    if !current.is_empty() {
        chunks.push(current.join(". "));
    }
    chunks
}
