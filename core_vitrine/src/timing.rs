//! Hold, fade and breath duration distributions.
//!
//! All values are milliseconds. Every function draws from a caller-supplied
//! rng so decisions can be seeded per cell and per tick.

use rand::{rngs::SmallRng, Rng};

use vitrine_schema::SlotKind;

/// Hold before the very first pick when a cell mounted without content.
const STARTUP_HOLD_MS: (u64, u64) = (300, 1200);
/// Near-immediate hold when a cell morphs between photo and review duty.
const MORPH_HOLD_MS: (u64, u64) = (50, 150);
/// Lead-in applied when a running cell is rescheduled by a kind change.
const RESCHEDULE_LEAD_MS: (u64, u64) = (0, 80);

const STAR_ONLY_HOLD_MS: (u64, u64) = (8_000, 12_000);
const TEXT_HOLD_BASE_MS: (u64, u64) = (12_000, 18_000);
const TEXT_HOLD_EXTRA_MS: (u64, u64) = (3_000, 7_000);
const TEXT_HOLD_LINGER_MS: (u64, u64) = (3_000, 6_000);
const LINGER_CHANCE: f64 = 0.18;
/// Body length beyond which longer text stops extending the hold.
const TEXT_LENGTH_CEILING: usize = 260;

pub fn startup_hold_ms(rng: &mut SmallRng) -> u64 {
    rng.gen_range(STARTUP_HOLD_MS.0..=STARTUP_HOLD_MS.1)
}

pub fn morph_hold_ms(rng: &mut SmallRng) -> u64 {
    rng.gen_range(MORPH_HOLD_MS.0..=MORPH_HOLD_MS.1)
}

pub fn reschedule_lead_ms(rng: &mut SmallRng) -> u64 {
    rng.gen_range(RESCHEDULE_LEAD_MS.0..=RESCHEDULE_LEAD_MS.1)
}

/// Steady-state hold for a review card.
///
/// Star-only cards hold 8–12 s. Text cards hold 12–18 s plus up to 3–7 s
/// scaled by body length (capped at 260 chars), plus an occasional linger
/// bonus so the pacing never feels metronomic.
pub fn review_hold_ms(rng: &mut SmallRng, body: Option<&str>) -> u64 {
    let text = body.map(str::trim).unwrap_or("");
    if text.is_empty() {
        return rng.gen_range(STAR_ONLY_HOLD_MS.0..=STAR_ONLY_HOLD_MS.1);
    }

    let length_factor =
        text.chars().count().min(TEXT_LENGTH_CEILING) as f64 / TEXT_LENGTH_CEILING as f64;
    let base = rng.gen_range(TEXT_HOLD_BASE_MS.0..=TEXT_HOLD_BASE_MS.1);
    let extra = (length_factor
        * rng.gen_range(TEXT_HOLD_EXTRA_MS.0..=TEXT_HOLD_EXTRA_MS.1) as f64)
        .round() as u64;
    let linger = if rng.gen_bool(LINGER_CHANCE) {
        rng.gen_range(TEXT_HOLD_LINGER_MS.0..=TEXT_HOLD_LINGER_MS.1)
    } else {
        0
    };
    base + extra + linger
}

/// Cross-fade duration: mostly unhurried, sometimes quick, sometimes slow.
pub fn fade_ms(rng: &mut SmallRng) -> u32 {
    let r: f64 = rng.gen();
    if r < 0.12 {
        rng.gen_range(1_600..=2_200)
    } else if r < 0.82 {
        rng.gen_range(2_400..=3_200)
    } else {
        rng.gen_range(3_200..=4_200)
    }
}

/// Breathing pause after a fade completes, before the next hold is armed.
/// Photos settle back into rhythm slightly faster than reviews.
pub fn breath_ms(rng: &mut SmallRng, kind: SlotKind) -> u64 {
    let r: f64 = rng.gen();
    let quick_band = match kind {
        SlotKind::Review => 0.65,
        SlotKind::Photo => 0.72,
    };
    if r < quick_band {
        rng.gen_range(600..=1_200)
    } else if r < 0.92 {
        rng.gen_range(1_200..=2_200)
    } else {
        rng.gen_range(2_200..=3_800)
    }
}

/// Staggered first-hold schedule for `count` cells: a shuffled ramp so
/// cells never transition in lockstep at page load.
pub fn first_hold_schedule(rng: &mut SmallRng, count: usize) -> Vec<u64> {
    use rand::seq::SliceRandom;

    let mut order: Vec<u64> = (0..count as u64).collect();
    order.shuffle(rng);
    order
        .into_iter()
        .map(|slot| slot * 2_200 + rng.gen_range(0..=600))
        .collect()
}
