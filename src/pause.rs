use std::time::Duration;

use rand::Rng;

use crate::config::TypingConfig;
use crate::token::{is_punctuation, is_sentence_end};

/// Words at least this long earn a small settling pause.
const LONG_WORD_LEN: usize = 8;

const LONG_WORD_PAUSE: (f64, f64) = (0.08, 0.22);
const THINK_PAUSE: (f64, f64) = (0.25, 0.9);
const SENTENCE_PAUSE: (f64, f64) = (0.25, 0.65);
const CLAUSE_PAUSE: (f64, f64) = (0.08, 0.25);

fn uniform(range: (f64, f64), rng: &mut impl Rng) -> Duration {
    Duration::from_secs_f64(rng.gen_range(range.0..=range.1))
}

/// Pauses owed after a word: a long-word pause and an independent "thinking"
/// pause. Both can fire for the same word; each is returned separately so the
/// session keeps one cancellation check per sleep.
pub fn after_word(word_len: usize, cfg: &TypingConfig, rng: &mut impl Rng) -> Vec<Duration> {
    let mut pauses = Vec::new();
    if !cfg.micro_pauses {
        return pauses;
    }

    if word_len >= LONG_WORD_LEN {
        pauses.push(uniform(LONG_WORD_PAUSE, rng));
    }
    if rng.gen::<f64>() < cfg.think_pause_chance {
        pauses.push(uniform(THINK_PAUSE, rng));
    }

    pauses
}

/// Pause owed after a punctuation mark: longer for sentence enders, shorter
/// for clause separators, none for anything else.
pub fn after_punct(mark: char, cfg: &TypingConfig, rng: &mut impl Rng) -> Option<Duration> {
    if !cfg.micro_pauses || !is_punctuation(mark) {
        return None;
    }

    if is_sentence_end(mark) {
        Some(uniform(SENTENCE_PAUSE, rng))
    } else {
        Some(uniform(CLAUSE_PAUSE, rng))
    }
}
