use rand::Rng;

use crate::config::TypingConfig;
use crate::keyboard::adjacent_key;
use crate::token::{is_punctuation, PUNCTUATION};

/// Minimum word length before letter typos are considered at all.
const MIN_TYPO_WORD_LEN: usize = 3;
/// Transpositions need an extra character so the swap stays interior enough.
const MIN_TRANSPOSITION_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypoKind {
    Substitution,
    Transposition,
    Duplication,
    Omission,
}

// Weighted draw: substitution 0.45, transposition 0.25, duplication 0.20,
// omission 0.10.
fn pick_kind(rng: &mut impl Rng) -> TypoKind {
    let roll: f64 = rng.gen();
    if roll < 0.45 {
        TypoKind::Substitution
    } else if roll < 0.70 {
        TypoKind::Transposition
    } else if roll < 0.90 {
        TypoKind::Duplication
    } else {
        TypoKind::Omission
    }
}

/// What a simulated mistake looks like on the wire: the keys typed before the
/// typist notices, and how many backspaces undo the damage.
///
/// The correct remainder always resumes at [`TypoOutcome::resume_index`];
/// typing `word[resume_index..]` after the backspaces reproduces the word
/// exactly, for every typo kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypoOutcome {
    pub typed_prefix: String,
    pub backspaces: usize,
}

impl TypoOutcome {
    /// Character index into the intended word where correct typing resumes.
    pub fn resume_index(&self) -> usize {
        self.typed_prefix.chars().count() - self.backspaces
    }
}

/// Hit a neighboring key at `index`, then backspace the wrong character.
pub fn substitution(word: &str, index: usize, wrong: char) -> TypoOutcome {
    let chars: Vec<char> = word.chars().collect();
    debug_assert!(index < chars.len());

    let mut typed: String = chars[..index].iter().collect();
    typed.push(wrong);
    TypoOutcome {
        typed_prefix: typed,
        backspaces: 1,
    }
}

/// Type the characters at `index` and `index + 1` in the wrong order, then
/// backspace both.
pub fn transposition(word: &str, index: usize) -> TypoOutcome {
    let chars: Vec<char> = word.chars().collect();
    debug_assert!(index + 1 < chars.len());

    let mut typed: String = chars[..index].iter().collect();
    typed.push(chars[index + 1]);
    typed.push(chars[index]);
    TypoOutcome {
        typed_prefix: typed,
        backspaces: 2,
    }
}

/// Double-tap the character at `index`, then backspace the extra copy.
pub fn duplication(word: &str, index: usize) -> TypoOutcome {
    let chars: Vec<char> = word.chars().collect();
    debug_assert!(index < chars.len());

    let mut typed: String = chars[..=index].iter().collect();
    typed.push(chars[index]);
    TypoOutcome {
        typed_prefix: typed,
        backspaces: 1,
    }
}

/// Stop short just before the character at `index`, then wipe the prefix and
/// start the word over.
pub fn omission(word: &str, index: usize) -> TypoOutcome {
    let chars: Vec<char> = word.chars().collect();
    debug_assert!(index >= 1 && index + 1 < chars.len());

    let typed: String = chars[..index].iter().collect();
    TypoOutcome {
        typed_prefix: typed,
        backspaces: index,
    }
}

/// Decide whether this word gets a simulated mistake, and which one.
///
/// At most one typo per word. A drawn kind that is not eligible for the word
/// (e.g. a transposition in a three-letter word) produces no typo rather than
/// falling back to another kind.
pub fn letter_typo(word: &str, cfg: &TypingConfig, rng: &mut impl Rng) -> Option<TypoOutcome> {
    if !cfg.enable_corrections {
        return None;
    }

    let chars: Vec<char> = word.chars().collect();
    let len = chars.len();
    if len < MIN_TYPO_WORD_LEN || rng.gen::<f64>() >= cfg.letter_typo_rate {
        return None;
    }

    match pick_kind(rng) {
        TypoKind::Substitution => {
            let i = rng.gen_range(0..len);
            let wrong = adjacent_key(chars[i], rng);
            Some(substitution(word, i, wrong))
        }
        TypoKind::Transposition => {
            if len < MIN_TRANSPOSITION_LEN {
                return None;
            }
            let i = rng.gen_range(0..len - 1);
            if chars[i].is_whitespace() || chars[i + 1].is_whitespace() {
                return None;
            }
            Some(transposition(word, i))
        }
        TypoKind::Duplication => {
            let i = rng.gen_range(0..len);
            Some(duplication(word, i))
        }
        TypoKind::Omission => {
            let i = rng.gen_range(1..=len - 2);
            Some(omission(word, i))
        }
    }
}

/// Decide whether this punctuation mark gets mistyped first, and as what.
/// Returns a uniformly random *different* member of the punctuation set.
pub fn punct_typo(mark: char, cfg: &TypingConfig, rng: &mut impl Rng) -> Option<char> {
    if !cfg.enable_corrections || !is_punctuation(mark) {
        return None;
    }
    if rng.gen::<f64>() >= cfg.punct_typo_rate {
        return None;
    }

    let candidates: Vec<char> = PUNCTUATION.iter().copied().filter(|&c| c != mark).collect();
    Some(candidates[rng.gen_range(0..candidates.len())])
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    /// Net visible text after typing the prefix, backspacing, and resuming
    /// the correct word — must equal the word for every typo path.
    fn net_result(word: &str, outcome: &TypoOutcome) -> String {
        let mut visible: Vec<char> = outcome.typed_prefix.chars().collect();
        for _ in 0..outcome.backspaces {
            visible.pop();
        }
        let remainder: Vec<char> = word.chars().collect();
        visible.extend(&remainder[outcome.resume_index()..]);
        visible.into_iter().collect()
    }

    fn typo_config(rate: f64) -> TypingConfig {
        TypingConfig {
            letter_typo_rate: rate,
            punct_typo_rate: rate,
            ..Default::default()
        }
    }

    #[test]
    fn substitution_at_word_start_retypes_the_whole_word() {
        let outcome = substitution("hello", 0, 'g');
        assert_eq!(outcome.typed_prefix, "g");
        assert_eq!(outcome.backspaces, 1);
        assert_eq!(outcome.resume_index(), 0);
        assert_eq!(net_result("hello", &outcome), "hello");
    }

    #[test]
    fn transposition_swaps_then_backspaces_twice() {
        let outcome = transposition("their", 1);
        assert_eq!(outcome.typed_prefix, "teh");
        assert_eq!(outcome.backspaces, 2);
        assert_eq!(outcome.resume_index(), 1);
        assert_eq!(net_result("their", &outcome), "their");
    }

    #[test]
    fn duplication_backspaces_the_extra_copy() {
        let outcome = duplication("hello", 1);
        assert_eq!(outcome.typed_prefix, "hee");
        assert_eq!(outcome.backspaces, 1);
        assert_eq!(outcome.resume_index(), 2);
        assert_eq!(net_result("hello", &outcome), "hello");
    }

    #[test]
    fn omission_wipes_and_restarts_the_word() {
        let outcome = omission("hello", 2);
        assert_eq!(outcome.typed_prefix, "he");
        assert_eq!(outcome.backspaces, 2);
        assert_eq!(outcome.resume_index(), 0);
        assert_eq!(net_result("hello", &outcome), "hello");
    }

    #[test]
    fn every_random_outcome_preserves_the_net_word() {
        let cfg = typo_config(1.0);
        let mut rng = StdRng::seed_from_u64(2024);
        let words = ["cat", "word", "keyboard", "Don't", "antidisestablishment"];
        for word in words {
            for _ in 0..2_000 {
                if let Some(outcome) = letter_typo(word, &cfg, &mut rng) {
                    assert_eq!(net_result(word, &outcome), word, "word {word:?}");
                }
            }
        }
    }

    #[test]
    fn short_words_never_get_typos() {
        let cfg = typo_config(1.0);
        let mut rng = StdRng::seed_from_u64(3);
        for word in ["a", "of", "Hi"] {
            for _ in 0..1_000 {
                assert_eq!(letter_typo(word, &cfg, &mut rng), None, "word {word:?}");
            }
        }
    }

    #[test]
    fn three_letter_words_never_transpose() {
        let cfg = typo_config(1.0);
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..5_000 {
            if let Some(outcome) = letter_typo("cat", &cfg, &mut rng) {
                // Only a transposition backspaces twice in a 3-letter word
                // (omission can only pick index 1 here).
                assert_ne!(outcome.backspaces, 2, "prefix {:?}", outcome.typed_prefix);
            }
        }
    }

    #[test]
    fn corrections_disabled_means_no_typos() {
        let cfg = TypingConfig {
            enable_corrections: false,
            letter_typo_rate: 1.0,
            punct_typo_rate: 1.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            assert_eq!(letter_typo("keyboard", &cfg, &mut rng), None);
            assert_eq!(punct_typo(',', &cfg, &mut rng), None);
        }
    }

    #[test]
    fn typo_frequency_tracks_the_configured_rate() {
        let rate = 0.25;
        let cfg = typo_config(rate);
        let mut rng = StdRng::seed_from_u64(6);

        let trials = 20_000;
        let mut hits = 0usize;
        for _ in 0..trials {
            // "keyboard" is eligible for every kind, so no draw is discarded.
            if letter_typo("keyboard", &cfg, &mut rng).is_some() {
                hits += 1;
            }
        }

        let observed = hits as f64 / trials as f64;
        assert!(
            (observed - rate).abs() < 0.02,
            "observed {observed}, expected ~{rate}"
        );
    }

    #[test]
    fn punct_typo_picks_a_different_mark_from_the_set() {
        let cfg = typo_config(1.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let wrong = punct_typo(',', &cfg, &mut rng).expect("rate 1.0 always fires");
            assert_ne!(wrong, ',');
            assert!(is_punctuation(wrong));
        }
    }

    #[test]
    fn punct_typo_ignores_non_punctuation() {
        let cfg = typo_config(1.0);
        let mut rng = StdRng::seed_from_u64(8);
        assert_eq!(punct_typo('x', &cfg, &mut rng), None);
        assert_eq!(punct_typo(' ', &cfg, &mut rng), None);
    }
}
