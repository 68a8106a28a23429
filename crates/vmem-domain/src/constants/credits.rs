//! Published pricing and tier quota tables.

use crate::entities::{Tier, TierLimits};

/// Minutes of audio covered by one credit block.
pub const AUDIO_BLOCK_MINUTES: f64 = 10.0;

/// Credits charged per started audio block.
pub const AUDIO_CREDITS_PER_BLOCK: i64 = 1;

/// Flat surcharge for the vision track. Frame analysis is capped at
/// [`super::media::MAX_FRAMES`] captions regardless of duration, so the
/// surcharge does not scale with length.
pub const FRAME_ANALYSIS_SURCHARGE: i64 = 4;

/// Length of a monthly credit period in days.
pub const MONTHLY_PERIOD_DAYS: i64 = 30;

/// Quota limits for a tier.
#[must_use]
pub fn tier_limits(tier: Tier) -> TierLimits {
    match tier {
        Tier::Free => TierLimits {
            max_video_minutes: 60,
            storage_limit_mb: 1_024,
            monthly_credits: 100,
        },
        Tier::Starter => TierLimits {
            max_video_minutes: 120,
            storage_limit_mb: 10_240,
            monthly_credits: 500,
        },
        Tier::Pro => TierLimits {
            max_video_minutes: 300,
            storage_limit_mb: 51_200,
            monthly_credits: 2_000,
        },
        Tier::Team => TierLimits {
            max_video_minutes: 600,
            storage_limit_mb: 204_800,
            monthly_credits: 5_000,
        },
    }
}

/// Deterministic credit cost of processing one video.
///
/// One credit per started [`AUDIO_BLOCK_MINUTES`] block (minimum one), plus
/// the flat vision surcharge when frame analysis is on.
#[must_use]
pub fn video_cost(duration_minutes: f64, analyze_frames: bool) -> i64 {
    let blocks = (duration_minutes / AUDIO_BLOCK_MINUTES).ceil() as i64;
    let audio = blocks.max(1) * AUDIO_CREDITS_PER_BLOCK;
    if analyze_frames {
        audio + FRAME_ANALYSIS_SURCHARGE
    } else {
        audio
    }
}

/// Cheapest tier whose duration ceiling admits the given length, if any.
#[must_use]
pub fn tier_for_duration(duration_minutes: f64) -> Option<Tier> {
    [Tier::Free, Tier::Starter, Tier::Pro, Tier::Team]
        .into_iter()
        .find(|t| tier_limits(*t).max_video_minutes as f64 >= duration_minutes)
}
