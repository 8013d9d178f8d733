use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::TypingConfig;

/// Delay between the individual backspaces of a correction.
pub const BACKSPACE_DELAY: Duration = Duration::from_millis(45);

/// Base seconds per character for a given typing speed.
///
/// Uses the 5-characters-per-word convention: 60 / (wpm * 5) = 12 / wpm.
pub fn base_delay(wpm: f64) -> f64 {
    12.0 / wpm.max(1.0)
}

/// Draw the speed for the next token, uniform across the configured range.
/// Sampled once per token so speed drifts word-by-word, not per character.
pub fn sample_wpm(cfg: &TypingConfig, rng: &mut impl Rng) -> f64 {
    rng.gen_range(cfg.min_wpm..=cfg.max_wpm)
}

/// Per-character delay: Gaussian around the base delay, clamped so a tail
/// sample can never stall the session or collapse to zero.
pub fn char_delay(base_wpm: f64, cfg: &TypingConfig, rng: &mut impl Rng) -> Duration {
    let base = base_delay(base_wpm);
    let stddev = base * cfg.jitter_std;
    let sampled = Normal::new(base, stddev)
        .map(|dist| dist.sample(rng))
        .unwrap_or(base);

    let max = (base * 3.0).max(0.001);
    Duration::from_secs_f64(sampled.clamp(0.001, max))
}

/// Human reaction time between making a mistake and starting to fix it.
pub fn correction_latency(cfg: &TypingConfig, rng: &mut impl Rng) -> Duration {
    let (min, max) = cfg.correction_latency;
    Duration::from_secs_f64(rng.gen_range(min..=max))
}
