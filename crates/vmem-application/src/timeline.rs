//! Unified chronological timeline: transcript paragraphs merged with
//! vision frame descriptions.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use vmem_domain::entities::{FrameAnalysis, TimelineEntry, TranscriptSegment};

use crate::transcript::{display_speaker, group_paragraphs};

static VISION_LINE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?s)^\[(\d+(?:\.\d+)?)s\]\s*(.*)").unwrap()
});

/// Build a time-sorted timeline from raw segments and `[Ns] ...` vision
/// description lines.
///
/// The sort is stable and transcript entries are added first, so a
/// transcript paragraph precedes a vision entry at an equal timestamp.
pub fn build_timeline(
    segments: &[TranscriptSegment],
    frame_descriptions: &[String],
    frame_analyses: Option<&[FrameAnalysis]>,
    content_id: Option<&str>,
    api_base_url: &str,
) -> Vec<TimelineEntry> {
    let mut timeline = Vec::new();

    let caption_map: HashMap<i64, String> = frame_analyses
        .unwrap_or_default()
        .iter()
        .map(|fa| (fa.timestamp as i64, fa.caption.clone()))
        .collect();

    for p in group_paragraphs(segments) {
        timeline.push(TimelineEntry::Transcript {
            timestamp: p.timestamp,
            end: p.end,
            text: p.text,
            speaker: p.speaker.as_deref().and_then(display_speaker),
        });
    }

    for desc in frame_descriptions {
        let Some(captures) = VISION_LINE.captures(desc) else {
            continue;
        };
        let Ok(ts) = captures[1].parse::<f64>() else {
            continue;
        };
        let text = captures[2].trim().to_owned();

        let caption = caption_map.get(&(ts as i64)).filter(|c| !c.is_empty()).cloned();
        let thumbnail = content_id
            .map(|id| format!("{api_base_url}/api/thumbnails/{id}/{}.jpg", ts as i64));

        timeline.push(TimelineEntry::Vision {
            timestamp: ts,
            text,
            caption,
            thumbnail,
        });
    }

    timeline.sort_by(|a, b| {
        a.timestamp()
            .partial_cmp(&b.timestamp())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    timeline
}
