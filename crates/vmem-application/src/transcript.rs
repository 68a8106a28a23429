//! Transcript grouping and formatting.
//!
//! Raw speech segments are short (a few seconds each); display and timeline
//! views group them into paragraphs. The break rules mirror natural
//! reading: a speaker change always breaks, enough finished sentences
//! break, and a long silence breaks once a paragraph has substance.

use vmem_domain::constants::media::{
    PARAGRAPH_GAP_BREAK_SECS, PARAGRAPH_SENTENCE_BREAK, PARAGRAPH_SENTENCE_SOFT_BREAK,
    PARAGRAPH_SOFT_BREAK_ELAPSED_SECS,
};
use vmem_domain::entities::{SpeakerTurn, TranscriptParagraph, TranscriptSegment};
use vmem_domain::utils::format_timestamp;

/// Group transcript segments into paragraphs with timestamps, end times,
/// and speakers.
pub fn group_paragraphs(segments: &[TranscriptSegment]) -> Vec<TranscriptParagraph> {
    if segments.is_empty() {
        return Vec::new();
    }

    let mut paragraphs = Vec::new();
    let mut current_text: Vec<&str> = Vec::new();
    let mut current_start = 0.0;
    let mut current_end = 0.0;
    let mut current_speaker: Option<String> = None;
    let mut sentence_count = 0usize;

    for (i, seg) in segments.iter().enumerate() {
        let text = seg.text.trim();
        if text.is_empty() {
            continue;
        }

        let prev_end = if i > 0 { segments[i - 1].end } else { 0.0 };

        // Breaks triggered by the incoming segment flush before it is
        // appended, so the new speaker (or the speech after a silence)
        // opens its own paragraph instead of being absorbed.
        if !current_text.is_empty() {
            let speaker_changed = matches!(
                (&seg.speaker, &current_speaker),
                (Some(s), Some(c)) if s != c
            );
            let gap_break =
                current_text.len() > 1 && seg.start - prev_end > PARAGRAPH_GAP_BREAK_SECS;

            if speaker_changed || gap_break {
                paragraphs.push(TranscriptParagraph {
                    timestamp: current_start,
                    end: current_end,
                    speaker: current_speaker.clone(),
                    text: current_text.join(" ").trim().to_owned(),
                });
                current_text.clear();
                sentence_count = 0;
            }
        }

        if current_text.is_empty() {
            current_start = seg.start;
            current_speaker = seg.speaker.clone();
        }

        current_text.push(text);
        current_end = seg.end;

        sentence_count += text.matches(['.', '!', '?']).count();

        // Sentence-count breaks flush after the append: the segment that
        // finished the paragraph belongs to it.
        let should_break = sentence_count >= PARAGRAPH_SENTENCE_BREAK
            || (sentence_count >= PARAGRAPH_SENTENCE_SOFT_BREAK
                && seg.start - current_start > PARAGRAPH_SOFT_BREAK_ELAPSED_SECS);

        if should_break {
            paragraphs.push(TranscriptParagraph {
                timestamp: current_start,
                end: current_end,
                speaker: current_speaker.clone(),
                text: current_text.join(" ").trim().to_owned(),
            });
            current_text.clear();
            sentence_count = 0;
        }
    }

    if !current_text.is_empty() {
        paragraphs.push(TranscriptParagraph {
            timestamp: current_start,
            end: current_end,
            speaker: current_speaker,
            text: current_text.join(" ").trim().to_owned(),
        });
    }

    paragraphs
}

/// Rewrite a raw diarizer label into display form (`SPEAKER_00` → `Speaker 1`).
///
/// Unknown or unparsable labels pass through unchanged; the literal
/// `Unknown` label is dropped.
pub fn display_speaker(label: &str) -> Option<String> {
    if label.is_empty() || label == "Unknown" {
        return None;
    }
    if let Some(rest) = label.strip_prefix("SPEAKER_") {
        if let Ok(n) = rest.parse::<u32>() {
            return Some(format!("Speaker {}", n + 1));
        }
    }
    Some(label.to_owned())
}

/// Format segments into a readable transcript with `[M:SS]` stamps and
/// speaker headers.
pub fn format_transcript(segments: &[TranscriptSegment]) -> String {
    let paragraphs = group_paragraphs(segments);
    if paragraphs.is_empty() {
        return String::new();
    }

    let mut parts = Vec::with_capacity(paragraphs.len());
    for p in &paragraphs {
        let stamp = format_timestamp(p.timestamp);
        match p.speaker.as_deref().and_then(display_speaker) {
            Some(speaker) => parts.push(format!("[{stamp}] {speaker}\n{}", p.text)),
            None => parts.push(format!("[{stamp}]\n{}", p.text)),
        }
    }
    parts.join("\n\n")
}

/// Attach speaker labels to transcript segments by turn overlap: each
/// segment takes the speaker talking at its midpoint.
pub fn merge_speaker_turns(
    segments: &[TranscriptSegment],
    turns: &[SpeakerTurn],
) -> Vec<TranscriptSegment> {
    segments
        .iter()
        .map(|seg| {
            let mid = (seg.start + seg.end) / 2.0;
            let speaker = turns
                .iter()
                .find(|t| t.start <= mid && mid <= t.end)
                .map_or_else(|| "Unknown".to_owned(), |t| t.speaker.clone());
            TranscriptSegment {
                start: seg.start,
                end: seg.end,
                text: seg.text.clone(),
                speaker: Some(speaker),
            }
        })
        .collect()
}
