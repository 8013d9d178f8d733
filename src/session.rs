use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, bail, ensure, Context, Result};
use rand::rngs::StdRng;

use crate::actuator::KeyActuator;
use crate::config::TypingConfig;
use crate::delay::{char_delay, correction_latency, sample_wpm, BACKSPACE_DELAY};
use crate::keyboard::find_first_unsupported_char;
use crate::pause;
use crate::token::{normalize_line_endings, tokenize, Token};
use crate::typo;

/// Progress reports emitted by a session, in state-machine order: preparing,
/// one countdown tick per remaining second, typing, then exactly one terminal
/// status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Preparing,
    Countdown(u64),
    Typing,
    Completed,
    Stopped,
    Failed(String),
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Stopped | Status::Failed(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Preparing => f.write_str("Preparing. Click into your target window now..."),
            Status::Countdown(secs) => write!(f, "Typing starts in {secs}..."),
            Status::Typing => f.write_str("Typing in progress..."),
            Status::Completed => f.write_str("Typing completed."),
            Status::Stopped => f.write_str("Typing stopped."),
            Status::Failed(reason) => write!(f, "Typing failed: {reason}"),
        }
    }
}

/// Where a session's status reports go. Runs on the session thread.
pub trait StatusSink: Send {
    fn status(&mut self, status: Status);
}

/// Adapter so a plain closure can serve as a [`StatusSink`].
pub struct FnSink<F>(pub F);

impl<F: FnMut(Status) + Send> StatusSink for FnSink<F> {
    fn status(&mut self, status: Status) {
        (self.0)(status);
    }
}

/// Stderr sink with the same coloring as the CLI's other output.
pub struct ConsoleStatus;

impl StatusSink for ConsoleStatus {
    fn status(&mut self, status: Status) {
        const RESET: &str = "\x1b[0m";
        const INFO: &str = "\x1b[34m";
        const DONE: &str = "\x1b[32m";
        const WARN: &str = "\x1b[33m";

        let color = match status {
            Status::Completed => DONE,
            Status::Stopped | Status::Failed(_) => WARN,
            _ => INFO,
        };
        eprintln!("{color}{status}{RESET}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Stopped,
}

/// Control surface for one background typing run.
#[derive(Debug)]
pub struct SessionHandle {
    cancel: Arc<AtomicBool>,
    join: Option<JoinHandle<Result<SessionOutcome>>>,
}

impl SessionHandle {
    /// Request cancellation. Idempotent; safe after completion. The session
    /// observes the flag at its next suspension point and stops without
    /// finishing the current token.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// The shared stop flag, e.g. for a Ctrl+C handler.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Non-blocking completion check.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map(JoinHandle::is_finished).unwrap_or(true)
    }

    /// Block until the session reaches a terminal state. Cancellation is not
    /// an error; an actuator failure is.
    pub fn wait(&mut self) -> Result<SessionOutcome> {
        let join = self
            .join
            .take()
            .ok_or_else(|| anyhow!("session was already waited on"))?;
        join.join()
            .map_err(|_| anyhow!("typing session thread panicked"))?
    }
}

/// The typing engine: owns the configuration and at most one live session.
pub struct Typist {
    config: TypingConfig,
    session: Option<SessionHandle>,
}

impl Typist {
    pub fn new(config: TypingConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &TypingConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn handle(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Start typing `text` after `countdown_secs` seconds of countdown.
    ///
    /// Configuration and text are validated here, synchronously: nothing is
    /// spawned and no key event is emitted when this returns an error. A
    /// session that is still running must be stopped explicitly first.
    pub fn start(
        &mut self,
        text: &str,
        countdown_secs: u64,
        actuator: Box<dyn KeyActuator>,
        sink: Box<dyn StatusSink>,
        rng: StdRng,
    ) -> Result<&SessionHandle> {
        ensure!(
            !self.is_running(),
            "a typing session is already running; stop it before starting a new one"
        );
        self.config.validate()?;

        let text = normalize_line_endings(text);
        if let Some((byte_idx, c)) = find_first_unsupported_char(&text) {
            let (line, col) = line_col(&text, byte_idx);
            bail!(
                "unsupported character {c:?} (U+{:04X}) at line {line}, column {col}; only characters on a US keyboard can be typed",
                c as u32
            );
        }
        let tokens = tokenize(&text);

        let cancel = Arc::new(AtomicBool::new(false));
        let thread_cancel = cancel.clone();
        let cfg = self.config.clone();

        let join = thread::Builder::new()
            .name("typist-session".to_string())
            .spawn(move || {
                run_session(
                    tokens,
                    cfg,
                    countdown_secs,
                    actuator,
                    sink,
                    thread_cancel,
                    rng,
                )
            })
            .context("failed to spawn typing session thread")?;

        let handle = self.session.insert(SessionHandle {
            cancel,
            join: Some(join),
        });
        Ok(handle)
    }

    /// Request cancellation of the live session, if any. Idempotent.
    pub fn stop(&self) {
        if let Some(handle) = &self.session {
            handle.stop();
        }
    }

    /// Block until the current session finishes and return its outcome.
    pub fn wait(&mut self) -> Result<SessionOutcome> {
        let handle = self
            .session
            .as_mut()
            .ok_or_else(|| anyhow!("no typing session has been started"))?;
        let outcome = handle.wait();
        self.session = None;
        outcome
    }
}

fn line_col(text: &str, byte_idx: usize) -> (usize, usize) {
    let mut line = 1usize;
    let mut col = 1usize;
    for (i, c) in text.char_indices() {
        if i >= byte_idx {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Sleep in short slices so a stop request is observed within ~50ms even
/// inside the longest pause.
fn sleep_interruptible(cancel: &AtomicBool, total: Duration) {
    const STEP: Duration = Duration::from_millis(50);
    let mut remaining = total;
    while !remaining.is_zero() {
        if cancel.load(Ordering::SeqCst) {
            return;
        }
        let step = remaining.min(STEP);
        thread::sleep(step);
        remaining -= step;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Cancelled,
}

fn run_session(
    tokens: Vec<Token>,
    cfg: TypingConfig,
    countdown_secs: u64,
    mut actuator: Box<dyn KeyActuator>,
    mut sink: Box<dyn StatusSink>,
    cancel: Arc<AtomicBool>,
    mut rng: StdRng,
) -> Result<SessionOutcome> {
    sink.status(Status::Preparing);

    for remaining in (1..=countdown_secs).rev() {
        if cancel.load(Ordering::SeqCst) {
            sink.status(Status::Stopped);
            return Ok(SessionOutcome::Stopped);
        }
        sink.status(Status::Countdown(remaining));
        sleep_interruptible(&cancel, Duration::from_secs(1));
    }
    if cancel.load(Ordering::SeqCst) {
        sink.status(Status::Stopped);
        return Ok(SessionOutcome::Stopped);
    }

    let result = match actuator.prepare() {
        Ok(()) => {
            sink.status(Status::Typing);
            type_tokens(&tokens, &cfg, actuator.as_mut(), &cancel, &mut rng)
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(Step::Continue) => {
            sink.status(Status::Completed);
            Ok(SessionOutcome::Completed)
        }
        Ok(Step::Cancelled) => {
            sink.status(Status::Stopped);
            Ok(SessionOutcome::Stopped)
        }
        Err(err) => {
            actuator.reset();
            sink.status(Status::Failed(format!("{err:#}")));
            Err(err)
        }
    }
}

fn type_tokens(
    tokens: &[Token],
    cfg: &TypingConfig,
    actuator: &mut dyn KeyActuator,
    cancel: &AtomicBool,
    rng: &mut StdRng,
) -> Result<Step> {
    for token in tokens {
        if cancel.load(Ordering::SeqCst) {
            return Ok(Step::Cancelled);
        }

        // One speed per token, so pace drifts word-by-word.
        let wpm = sample_wpm(cfg, rng);

        let step = match token {
            Token::Word(word) => type_word(actuator, word, wpm, cfg, cancel, rng)?,
            Token::Punct(mark) => type_punct(actuator, *mark, wpm, cfg, cancel, rng)?,
            Token::Other(c) => type_run(actuator, &[*c], wpm, cfg, cancel, rng)?,
        };
        if step == Step::Cancelled {
            return Ok(Step::Cancelled);
        }
    }

    Ok(Step::Continue)
}

fn type_run(
    actuator: &mut dyn KeyActuator,
    chars: &[char],
    wpm: f64,
    cfg: &TypingConfig,
    cancel: &AtomicBool,
    rng: &mut StdRng,
) -> Result<Step> {
    for &c in chars {
        if cancel.load(Ordering::SeqCst) {
            return Ok(Step::Cancelled);
        }
        actuator.type_char(c)?;
        sleep_interruptible(cancel, char_delay(wpm, cfg, rng));
    }
    Ok(Step::Continue)
}

fn erase(actuator: &mut dyn KeyActuator, count: usize, cancel: &AtomicBool) -> Result<Step> {
    for _ in 0..count {
        if cancel.load(Ordering::SeqCst) {
            return Ok(Step::Cancelled);
        }
        actuator.backspace()?;
        sleep_interruptible(cancel, BACKSPACE_DELAY);
    }
    Ok(Step::Continue)
}

fn type_word(
    actuator: &mut dyn KeyActuator,
    word: &str,
    wpm: f64,
    cfg: &TypingConfig,
    cancel: &AtomicBool,
    rng: &mut StdRng,
) -> Result<Step> {
    let chars: Vec<char> = word.chars().collect();

    if let Some(outcome) = typo::letter_typo(word, cfg, rng) {
        let wrong: Vec<char> = outcome.typed_prefix.chars().collect();
        if type_run(actuator, &wrong, wpm, cfg, cancel, rng)? == Step::Cancelled {
            return Ok(Step::Cancelled);
        }

        // The typist "notices" the mistake, then fixes it.
        sleep_interruptible(cancel, correction_latency(cfg, rng));
        if erase(actuator, outcome.backspaces, cancel)? == Step::Cancelled {
            return Ok(Step::Cancelled);
        }

        let resume = outcome.resume_index();
        if type_run(actuator, &chars[resume..], wpm, cfg, cancel, rng)? == Step::Cancelled {
            return Ok(Step::Cancelled);
        }
    } else if type_run(actuator, &chars, wpm, cfg, cancel, rng)? == Step::Cancelled {
        return Ok(Step::Cancelled);
    }

    for pause in pause::after_word(chars.len(), cfg, rng) {
        if cancel.load(Ordering::SeqCst) {
            return Ok(Step::Cancelled);
        }
        sleep_interruptible(cancel, pause);
    }

    Ok(Step::Continue)
}

fn type_punct(
    actuator: &mut dyn KeyActuator,
    mark: char,
    wpm: f64,
    cfg: &TypingConfig,
    cancel: &AtomicBool,
    rng: &mut StdRng,
) -> Result<Step> {
    if let Some(wrong) = typo::punct_typo(mark, cfg, rng) {
        if type_run(actuator, &[wrong], wpm, cfg, cancel, rng)? == Step::Cancelled {
            return Ok(Step::Cancelled);
        }
        sleep_interruptible(cancel, correction_latency(cfg, rng));
        if erase(actuator, 1, cancel)? == Step::Cancelled {
            return Ok(Step::Cancelled);
        }
    }

    if type_run(actuator, &[mark], wpm, cfg, cancel, rng)? == Step::Cancelled {
        return Ok(Step::Cancelled);
    }

    if let Some(pause) = pause::after_punct(mark, cfg, rng) {
        if cancel.load(Ordering::SeqCst) {
            return Ok(Step::Cancelled);
        }
        sleep_interruptible(cancel, pause);
    }

    Ok(Step::Continue)
}
