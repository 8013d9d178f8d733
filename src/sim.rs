//! Test and dry-run support: an actuator that only records, a decoder that
//! reconstructs the net visible text from recorded key events, and duration
//! estimates for the `preview` command. No OS side effects anywhere.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::actuator::{KeyActuator, KeyState};
use crate::config::TypingConfig;
use crate::delay::{base_delay, BACKSPACE_DELAY};
use crate::keyboard::{char_to_keystroke, KEY_BACKSPACE, KEY_LEFTSHIFT, KEY_RIGHTSHIFT};
use crate::token::{is_sentence_end, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keycode: u32,
    pub state: KeyState,
}

/// A [`KeyActuator`] that logs every key event instead of injecting it.
///
/// Clones share the same event log, so a test can keep one clone and move the
/// other into a session. `failing_after` turns it into a fault injector for
/// exercising the mid-run failure path.
#[derive(Debug, Default, Clone)]
pub struct RecordingActuator {
    events: Arc<Mutex<Vec<KeyEvent>>>,
    fail_after: Option<usize>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every key action once `count` events have been recorded.
    pub fn failing_after(count: usize) -> Self {
        Self {
            events: Arc::default(),
            fail_after: Some(count),
        }
    }

    pub fn events(&self) -> Vec<KeyEvent> {
        self.events.lock().expect("event log poisoned").clone()
    }

    fn record(&mut self, keycode: u32, state: KeyState) -> Result<()> {
        let mut events = self.events.lock().expect("event log poisoned");
        if let Some(limit) = self.fail_after {
            if events.len() >= limit {
                return Err(anyhow!("injected actuator failure after {limit} events"));
            }
        }
        events.push(KeyEvent { keycode, state });
        Ok(())
    }
}

impl KeyActuator for RecordingActuator {
    fn press_key(&mut self, keycode: u32) -> Result<()> {
        self.record(keycode, KeyState::Pressed)
    }

    fn release_key(&mut self, keycode: u32) -> Result<()> {
        self.record(keycode, KeyState::Released)
    }
}

fn us_keystroke_map() -> HashMap<(u32, bool), char> {
    let mut map = HashMap::new();

    let mut candidates = vec!['\n', ' '];
    for b in 33u8..=126u8 {
        candidates.push(b as char);
    }

    for c in candidates {
        if let Some(stroke) = char_to_keystroke(c) {
            map.insert((stroke.keycode, stroke.shift), c);
        }
    }

    map
}

/// Reconstruct the text a US-QWERTY editor would show after these key events:
/// Shift is tracked, Backspace deletes, everything else appends.
pub fn net_text(events: &[KeyEvent]) -> Result<String> {
    let decode = us_keystroke_map();
    let mut shift_down = false;
    let mut visible: Vec<char> = Vec::new();

    for event in events {
        if matches!(event.keycode, KEY_LEFTSHIFT | KEY_RIGHTSHIFT) {
            shift_down = event.state == KeyState::Pressed;
            continue;
        }
        if event.state == KeyState::Released {
            continue;
        }
        if event.keycode == KEY_BACKSPACE {
            visible.pop();
            continue;
        }

        let c = decode
            .get(&(event.keycode, shift_down))
            .copied()
            .ok_or_else(|| {
                anyhow!(
                    "net_text does not know keycode {} (shift={shift_down})",
                    event.keycode
                )
            })?;
        visible.push(c);
    }

    Ok(visible.into_iter().collect())
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    pub words: usize,
    pub punctuation: usize,
    pub other: usize,
    pub chars: usize,
    pub expected_secs: f64,
}

/// Expected-value duration estimate for typing `tokens` under `cfg`.
///
/// Uses the midpoint WPM and the mean of every pause range; real sessions
/// will scatter around this.
pub fn estimate(tokens: &[Token], cfg: &TypingConfig) -> SessionStats {
    let mid_wpm = (cfg.min_wpm + cfg.max_wpm) / 2.0;
    let per_char = base_delay(mid_wpm);
    let latency_mean = (cfg.correction_latency.0 + cfg.correction_latency.1) / 2.0;
    let backspace = BACKSPACE_DELAY.as_secs_f64();

    let mut stats = SessionStats::default();

    for token in tokens {
        match token {
            Token::Word(word) => {
                let len = word.chars().count();
                stats.words += 1;
                stats.chars += len;
                stats.expected_secs += len as f64 * per_char;

                if cfg.enable_corrections && len >= 3 {
                    // A typo costs the reaction pause, roughly two extra
                    // keystrokes, and the backspaces in between.
                    stats.expected_secs += cfg.letter_typo_rate
                        * (latency_mean + 2.0 * per_char + 1.5 * backspace);
                }
                if cfg.micro_pauses {
                    if len >= 8 {
                        stats.expected_secs += 0.15;
                    }
                    stats.expected_secs += cfg.think_pause_chance * 0.575;
                }
            }
            Token::Punct(mark) => {
                stats.punctuation += 1;
                stats.chars += 1;
                stats.expected_secs += per_char;

                if cfg.enable_corrections {
                    stats.expected_secs +=
                        cfg.punct_typo_rate * (latency_mean + per_char + backspace);
                }
                if cfg.micro_pauses {
                    stats.expected_secs += if is_sentence_end(*mark) { 0.45 } else { 0.165 };
                }
            }
            Token::Other(_) => {
                stats.other += 1;
                stats.chars += 1;
                stats.expected_secs += per_char;
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::token::tokenize;

    #[test]
    fn net_text_decodes_typed_characters() {
        let mut rec = RecordingActuator::new();
        for c in "Hi, there!".chars() {
            rec.type_char(c).expect("recording never fails");
        }
        assert_eq!(net_text(&rec.events()).expect("decodable"), "Hi, there!");
    }

    #[test]
    fn net_text_applies_backspaces() {
        let mut rec = RecordingActuator::new();
        for c in "helxx".chars() {
            rec.type_char(c).expect("recording never fails");
        }
        rec.backspace().expect("recording never fails");
        rec.backspace().expect("recording never fails");
        for c in "lo".chars() {
            rec.type_char(c).expect("recording never fails");
        }
        assert_eq!(net_text(&rec.events()).expect("decodable"), "hello");
    }

    #[test]
    fn clones_share_the_event_log() {
        let rec = RecordingActuator::new();
        let mut moved = rec.clone();
        moved.type_char('a').expect("recording never fails");
        assert_eq!(rec.events().len(), moved.events().len());
        assert!(!rec.events().is_empty());
    }

    #[test]
    fn failing_actuator_errors_after_the_limit() {
        let mut rec = RecordingActuator::failing_after(2);
        rec.press_key(crate::keyboard::KEY_A).expect("first");
        rec.release_key(crate::keyboard::KEY_A).expect("second");
        assert!(rec.press_key(crate::keyboard::KEY_A).is_err());
    }

    #[test]
    fn estimate_counts_tokens_and_scales_with_length() {
        let cfg = TypingConfig::default();
        let short = estimate(&tokenize("Hi."), &cfg);
        assert_eq!(short.words, 1);
        assert_eq!(short.punctuation, 1);
        assert_eq!(short.other, 0);
        assert_eq!(short.chars, 3);

        let long = estimate(&tokenize("Hello there, this is a longer sentence."), &cfg);
        assert!(long.expected_secs > short.expected_secs);
    }
}
