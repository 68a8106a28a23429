//! Media processing knobs shared by the pipeline and the adapters.

/// Default seconds between sampled frames.
pub const FRAME_INTERVAL_SECONDS: f64 = 30.0;

/// Hard cap on sampled frames per video; the interval widens adaptively
/// for long media so the cap is never exceeded.
pub const MAX_FRAMES: usize = 20;

/// Maximum in-flight vision captioning calls.
pub const VISION_MAX_CONCURRENCY: usize = 3;

/// Fraction of the speech service's upload limit each chunk must stay under.
pub const SPEECH_CHUNK_SAFETY: f64 = 0.9;

/// Character budget per translation chunk (model context safety).
pub const TRANSLATION_CHUNK_CHARS: usize = 10_000;

/// Transcript prefix length included in the searchable-text concatenation.
pub const SEARCHABLE_TRANSCRIPT_CHARS: usize = 1_000;

/// Thumbnail target width in pixels (aspect ratio preserved).
pub const THUMBNAIL_WIDTH: u32 = 320;

/// Platform description truncation applied at metadata parse time.
pub const STATS_DESCRIPTION_CHARS: usize = 500;

// Paragraph break rules (see transcript grouping):
/// Terminal punctuation count that always breaks a paragraph.
pub const PARAGRAPH_SENTENCE_BREAK: usize = 5;
/// Terminal punctuation count that breaks once the paragraph is long enough.
pub const PARAGRAPH_SENTENCE_SOFT_BREAK: usize = 3;
/// Elapsed seconds that arm the soft sentence break.
pub const PARAGRAPH_SOFT_BREAK_ELAPSED_SECS: f64 = 25.0;
/// Inter-segment silence that breaks a multi-line paragraph.
pub const PARAGRAPH_GAP_BREAK_SECS: f64 = 3.0;
