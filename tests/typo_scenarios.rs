use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use typist::actuator::KeyActuator;
use typist::config::TypingConfig;
use typist::keyboard::{KEY_BACKSPACE, KEY_G, KEY_SEMICOLON};
use typist::session::{FnSink, SessionOutcome, Typist};
use typist::sim::{net_text, RecordingActuator};
use typist::typo::{self, TypoOutcome};

fn typo_heavy_config() -> TypingConfig {
    TypingConfig {
        min_wpm: 2_000.0,
        max_wpm: 3_000.0,
        letter_typo_rate: 1.0,
        punct_typo_rate: 1.0,
        enable_corrections: true,
        micro_pauses: false,
        think_pause_chance: 0.0,
        jitter_std: 0.2,
        correction_latency: (0.0, 0.001),
    }
}

/// Drive one word's typo outcome through a recording actuator the way the
/// session does: wrong prefix, backspaces, then the correct remainder.
fn play_outcome(word: &str, outcome: &TypoOutcome) -> Vec<typist::sim::KeyEvent> {
    let mut recorder = RecordingActuator::new();
    for c in outcome.typed_prefix.chars() {
        recorder.type_char(c).expect("recording never fails");
    }
    for _ in 0..outcome.backspaces {
        recorder.backspace().expect("recording never fails");
    }
    let chars: Vec<char> = word.chars().collect();
    for &c in &chars[outcome.resume_index()..] {
        recorder.type_char(c).expect("recording never fails");
    }
    recorder.events()
}

#[test]
fn substitution_scenario_hello_with_neighbor_g() {
    let outcome = typo::substitution("hello", 0, 'g');
    let events = play_outcome("hello", &outcome);

    // The very first keystroke is the wrong neighbor.
    assert_eq!(events[0].keycode, KEY_G);
    // One backspace undoes it, then the full word lands.
    let backspaces = events.iter().filter(|e| e.keycode == KEY_BACKSPACE).count();
    assert_eq!(backspaces, 2); // press + release of a single Backspace tap
    assert_eq!(net_text(&events).expect("decodable"), "hello");
}

#[test]
fn transposition_scenario_their() {
    let outcome = typo::transposition("their", 1);
    assert_eq!(outcome.typed_prefix, "teh");
    assert_eq!(outcome.backspaces, 2);
    assert_eq!(outcome.resume_index(), 1);

    let events = play_outcome("their", &outcome);
    assert_eq!(net_text(&events).expect("decodable"), "their");
}

#[test]
fn punctuation_substitution_scenario_comma() {
    let cfg = typo_heavy_config();
    let mut rng = StdRng::seed_from_u64(42);
    let wrong = typo::punct_typo(',', &cfg, &mut rng).expect("rate 1.0 always fires");
    assert_ne!(wrong, ',');

    let mut recorder = RecordingActuator::new();
    recorder.type_char(wrong).expect("recording never fails");
    recorder.backspace().expect("recording never fails");
    recorder.type_char(',').expect("recording never fails");

    let events = recorder.events();
    assert_eq!(net_text(&events).expect("decodable"), ",");

    // With seed 42 the wrong mark is stable; pin one concrete case so the
    // keystroke shape is visible in the test.
    if wrong == ';' {
        assert_eq!(events[0].keycode, KEY_SEMICOLON);
    }
}

#[test]
fn every_session_reproduces_its_input_despite_typos() {
    let texts = [
        "Hello, world! How's it going?",
        "The quick brown fox jumps over the lazy dog.",
        "Line one.\nLine two; with clauses: and marks!\n",
        "Numbers 12345 and snake_case_words mixed in, too.",
    ];

    for (i, text) in texts.iter().enumerate() {
        for seed in 0..10u64 {
            let recorder = RecordingActuator::new();
            let mut typist = Typist::new(typo_heavy_config());
            typist
                .start(
                    text,
                    0,
                    Box::new(recorder.clone()),
                    Box::new(FnSink(|_| {})),
                    StdRng::seed_from_u64(seed * 100 + i as u64),
                )
                .expect("session should start");
            assert_eq!(typist.wait().expect("wait"), SessionOutcome::Completed);

            assert_eq!(
                net_text(&recorder.events()).expect("decodable"),
                *text,
                "text {i} seed {seed}"
            );
        }
    }
}

#[test]
fn corrections_off_types_straight_through() {
    let text = "No mistakes here, promise.";
    let recorder = RecordingActuator::new();
    let mut typist = Typist::new(TypingConfig {
        enable_corrections: false,
        ..typo_heavy_config()
    });
    typist
        .start(
            text,
            0,
            Box::new(recorder.clone()),
            Box::new(FnSink(|_| {})),
            StdRng::seed_from_u64(1),
        )
        .expect("session should start");
    typist.wait().expect("wait");

    let events = recorder.events();
    assert!(
        events.iter().all(|e| e.keycode != KEY_BACKSPACE),
        "expected no backspaces without corrections"
    );
    assert_eq!(net_text(&events).expect("decodable"), text);
}
