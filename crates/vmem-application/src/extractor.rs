//! Structured content extraction via the chat LLM.
//!
//! The extractor is mode-aware: every mode populates the general fields
//! (title, summary, topics, ...); non-general modes additionally populate
//! one named payload object. Responses must be JSON; a malformed response
//! gets one repair attempt (extract the outermost JSON object) before the
//! stage fails.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use vmem_domain::entities::{
    ContentExtract, EntityMention, IngestMode, KeyPoint, Quote, ResourceLink, SourceStats,
};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::ChatProvider;
use vmem_domain::utils::new_content_id;

static OUTERMOST_JSON: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?s)\{.*\}").unwrap()
});

/// Everything the extractor needs about one processed media item.
pub struct ExtractRequest<'a> {
    pub transcript: &'a str,
    pub frame_descriptions: &'a [String],
    pub duration_seconds: Option<i64>,
    pub mode: IngestMode,
    pub source_url: Option<&'a str>,
    pub source_video: Option<&'a str>,
    pub stats: Option<&'a SourceStats>,
    pub formatted_transcript: &'a str,
    pub language: Option<&'a str>,
}

/// What the LLM is asked to return. Everything defaults so a sparse
/// response still maps (zero-segment media may yield minimal fields).
#[derive(Debug, Default, Deserialize)]
struct RawExtract {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    speaker: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    key_points: Vec<KeyPoint>,
    #[serde(default)]
    entities: Vec<EntityMention>,
    #[serde(default)]
    action_items: Vec<String>,
    #[serde(default)]
    quotes: Vec<Quote>,
    #[serde(default)]
    resources: Vec<ResourceLink>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    recipe: Option<Value>,
    #[serde(default)]
    learn: Option<Value>,
    #[serde(default)]
    creator: Option<Value>,
    #[serde(default)]
    meeting: Option<Value>,
}

/// Mode-aware content extractor over a [`ChatProvider`].
pub struct ContentExtractor {
    chat: Arc<dyn ChatProvider>,
}

impl ContentExtractor {
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self { chat }
    }

    /// Run the extraction and assemble a [`ContentExtract`].
    pub async fn extract(&self, request: &ExtractRequest<'_>) -> Result<ContentExtract> {
        let prompt = build_prompt(request);
        let response = self.chat.chat_json(&prompt).await?;
        let raw = parse_with_repair(&response)?;

        let mut content = ContentExtract {
            id: new_content_id(),
            title: non_empty_or(raw.title, "Untitled"),
            summary: raw.summary,
            content_type: non_empty_or(raw.content_type, "other"),
            mode: request.mode.as_str().to_owned(),
            speaker: raw.speaker,
            topics: raw.topics,
            key_points: raw.key_points,
            entities: raw.entities,
            action_items: raw.action_items,
            quotes: raw.quotes,
            resources: raw.resources,
            tags: raw.tags,
            transcript: if request.formatted_transcript.is_empty() {
                request.transcript.to_owned()
            } else {
                request.formatted_transcript.to_owned()
            },
            segments: Vec::new(),
            frame_descriptions: request.frame_descriptions.to_vec(),
            frame_analyses: None,
            timeline: None,
            duration_seconds: request.duration_seconds,
            source_url: request.source_url.map(str::to_owned),
            source_video: request.source_video.map(str::to_owned),
            collections: Vec::new(),
            file_size_bytes: 0,
            created_at: chrono::Utc::now().to_rfc3339(),
            metadata: serde_json::Map::new(),
            recipe: None,
            learn: None,
            creator: None,
            meeting: None,
        };

        // Only the requested mode keeps its payload.
        match request.mode {
            IngestMode::Recipe => content.recipe = raw.recipe,
            IngestMode::Learn => content.learn = raw.learn,
            IngestMode::Creator => content.creator = raw.creator,
            IngestMode::Meeting => content.meeting = raw.meeting,
            IngestMode::General => {}
        }

        debug!(title = %content.title, entities = content.entities.len(), "extracted content");
        Ok(content)
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_owned()
    } else {
        value
    }
}

/// Parse the LLM response, retrying once with the outermost-JSON-object
/// repair rule before failing.
fn parse_with_repair(response: &str) -> Result<RawExtract> {
    match serde_json::from_str(response) {
        Ok(raw) => Ok(raw),
        Err(first_err) => {
            warn!(error = %first_err, "extractor returned malformed JSON, attempting repair");
            let repaired = OUTERMOST_JSON
                .find(response)
                .map(|m| m.as_str())
                .ok_or_else(|| {
                    Error::extraction(format!(
                        "Could not parse extraction JSON: {}",
                        truncate(response, 500)
                    ))
                })?;
            serde_json::from_str(repaired).map_err(|e| {
                Error::extraction(format!("Extraction JSON repair failed: {e}"))
            })
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn build_prompt(request: &ExtractRequest<'_>) -> String {
    let frame_text = if request.frame_descriptions.is_empty() {
        "No visual descriptions available.".to_owned()
    } else {
        request.frame_descriptions.join("\n")
    };

    let duration_line = request
        .duration_seconds
        .map(|d| format!("\nVIDEO DURATION: {} seconds", d))
        .unwrap_or_default();

    let stats_block = request
        .stats
        .map(|s| {
            format!(
                "\nSOURCE STATS:\nviews: {}, likes: {}, comments: {}, channel: {}, uploaded: {}\n",
                s.view_count, s.like_count, s.comment_count, s.channel, s.upload_date
            )
        })
        .unwrap_or_default();

    let language_line = request
        .language
        .map(|l| format!("\nWrite all extracted text in language code '{l}'."))
        .unwrap_or_default();

    format!(
        "You are an AI assistant that extracts structured information from video \
transcripts and visual descriptions.\n\n\
Given the following transcript and frame descriptions, extract the content information.\n\n\
TRANSCRIPT:\n{transcript}\n\n\
VISUAL DESCRIPTIONS FROM KEY FRAMES:\n{frame_text}\n{duration_line}{stats_block}\n\
Extract and return a JSON object with this EXACT structure:\n\
{{\n\
    \"title\": \"Concise content title\",\n\
    \"summary\": \"2-3 sentence summary\",\n\
    \"content_type\": \"tutorial|lecture|interview|how-to|review|vlog|other\",\n\
    \"speaker\": \"Main speaker or presenter name if identifiable\",\n\
    \"topics\": [\"topic\", ...],\n\
    \"key_points\": [{{\"point\": \"...\", \"timestamp\": \"MM:SS if known\", \"details\": \"...\"}}],\n\
    \"entities\": [{{\"name\": \"...\", \"type\": \"person|product|concept|place|organization\", \"description\": \"...\"}}],\n\
    \"action_items\": [\"actionable takeaway\", ...],\n\
    \"quotes\": [{{\"text\": \"...\", \"speaker\": \"...\", \"timestamp\": \"MM:SS if known\"}}],\n\
    \"resources\": [{{\"name\": \"...\", \"url\": \"url if mentioned\", \"description\": \"...\"}}],\n\
    \"tags\": [\"relevant\", \"search\", \"tags\"]{mode_fields}\n\
}}\n\n\
Be thorough - extract ALL key points and entities mentioned.{mode_instructions}{language_line}\n\
Return ONLY the JSON object, no other text.",
        transcript = request.transcript,
        frame_text = frame_text,
        duration_line = duration_line,
        stats_block = stats_block,
        mode_fields = mode_fields(request.mode),
        mode_instructions = mode_instructions(request.mode),
        language_line = language_line,
    )
}

fn mode_fields(mode: IngestMode) -> &'static str {
    match mode {
        IngestMode::General => "",
        IngestMode::Recipe => {
            ",\n    \"recipe\": {\"name\": \"...\", \"cuisine\": \"...\", \"difficulty\": \"easy|medium|hard\", \"prep_time_minutes\": 0, \"cook_time_minutes\": 0, \"servings\": 0, \"ingredients\": [{\"name\": \"...\", \"quantity\": \"...\", \"unit\": \"...\", \"notes\": \"...\"}], \"instructions\": [{\"step\": 1, \"description\": \"...\", \"timestamp\": \"MM:SS\", \"tips\": \"...\"}], \"tips\": [\"...\"]}"
        }
        IngestMode::Learn => {
            ",\n    \"learn\": {\"subject\": \"...\", \"level\": \"beginner|intermediate|advanced\", \"concepts\": [{\"name\": \"...\", \"explanation\": \"...\"}], \"study_questions\": [\"...\"], \"further_reading\": [\"...\"]}"
        }
        IngestMode::Creator => {
            ",\n    \"creator\": {\"hook\": \"...\", \"structure\": [\"...\"], \"audience\": \"...\", \"engagement_tactics\": [\"...\"], \"improvement_ideas\": [\"...\"]}"
        }
        IngestMode::Meeting => {
            ",\n    \"meeting\": {\"attendees\": [\"...\"], \"decisions\": [\"...\"], \"action_items\": [{\"owner\": \"...\", \"task\": \"...\", \"due\": \"...\"}], \"open_questions\": [\"...\"]}"
        }
    }
}

fn mode_instructions(mode: IngestMode) -> &'static str {
    match mode {
        IngestMode::General => "",
        IngestMode::Recipe => {
            " Extract ALL ingredients and steps mentioned; estimate quantities from context when unspecified."
        }
        IngestMode::Learn => " Focus on concepts a learner should retain and test themselves on.",
        IngestMode::Creator => {
            " Analyze the video as a content creator would: hook, pacing, audience, engagement."
        }
        IngestMode::Meeting => " Produce meeting minutes: decisions, owners, deadlines.",
    }
}
