use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;

use typist::actuator::{self, Backend};
use typist::config::{Preset, TypingConfig};
use typist::delay::{base_delay, sample_wpm};
use typist::session::{ConsoleStatus, SessionOutcome, Typist};
use typist::sim;
use typist::token::{normalize_line_endings, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Auto,
    Wayland,
    X11,
}

impl BackendArg {
    fn to_library(self) -> Backend {
        match self {
            BackendArg::Auto => Backend::Auto,
            BackendArg::Wayland => Backend::Wayland,
            BackendArg::X11 => Backend::X11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PresetArg {
    /// Mid-range speed with occasional mistakes.
    Balanced,
    /// High speed, more typos, fewer pauses.
    FastButMessy,
    /// Low speed, few typos, frequent thinking pauses.
    SlowAndCareful,
}

impl PresetArg {
    fn to_library(self) -> Preset {
        match self {
            PresetArg::Balanced => Preset::Balanced,
            PresetArg::FastButMessy => Preset::FastButMessy,
            PresetArg::SlowAndCareful => Preset::SlowAndCareful,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct TuningArgs {
    /// Start from a named typing personality.
    #[arg(long, value_enum, conflicts_with = "config")]
    preset: Option<PresetArg>,

    /// Load the typing configuration from a JSON file instead of a preset.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Slowest sampled typing speed, words per minute.
    #[arg(long)]
    min_wpm: Option<f64>,

    /// Fastest sampled typing speed, words per minute.
    #[arg(long)]
    max_wpm: Option<f64>,

    /// Chance per word of a simulated letter typo (0.0-1.0).
    #[arg(long)]
    letter_typo_rate: Option<f64>,

    /// Chance per punctuation mark of a simulated wrong mark (0.0-1.0).
    #[arg(long)]
    punct_typo_rate: Option<f64>,

    /// Disable simulated mistakes and corrections entirely.
    #[arg(long)]
    no_corrections: bool,

    /// Disable word and punctuation micro-pauses.
    #[arg(long)]
    no_micro_pauses: bool,

    /// Chance of an extra thinking pause after a word (0.0-1.0).
    #[arg(long)]
    think_pause_chance: Option<f64>,

    /// Per-character jitter stddev as a fraction of the base delay.
    #[arg(long)]
    jitter_std: Option<f64>,

    /// Minimum seconds before a mistake is corrected.
    #[arg(long)]
    correction_latency_min: Option<f64>,

    /// Maximum seconds before a mistake is corrected.
    #[arg(long)]
    correction_latency_max: Option<f64>,
}

impl TuningArgs {
    fn resolve(&self) -> Result<TypingConfig> {
        let mut cfg = match (&self.config, self.preset) {
            (Some(path), _) => load_config(path)?,
            (None, Some(preset)) => preset.to_library().config(),
            (None, None) => TypingConfig::default(),
        };

        if let Some(v) = self.min_wpm {
            cfg.min_wpm = v;
        }
        if let Some(v) = self.max_wpm {
            cfg.max_wpm = v;
        }
        if let Some(v) = self.letter_typo_rate {
            cfg.letter_typo_rate = v;
        }
        if let Some(v) = self.punct_typo_rate {
            cfg.punct_typo_rate = v;
        }
        if self.no_corrections {
            cfg.enable_corrections = false;
        }
        if self.no_micro_pauses {
            cfg.micro_pauses = false;
        }
        if let Some(v) = self.think_pause_chance {
            cfg.think_pause_chance = v;
        }
        if let Some(v) = self.jitter_std {
            cfg.jitter_std = v;
        }
        if let Some(v) = self.correction_latency_min {
            cfg.correction_latency.0 = v;
        }
        if let Some(v) = self.correction_latency_max {
            cfg.correction_latency.1 = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Debug, Parser)]
#[command(name = "typist")]
#[command(about = "Human-like typing simulator for Wayland and X11", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Type the input text into the currently focused window
    Type {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Countdown seconds before typing starts
        #[arg(long, default_value_t = 3)]
        countdown: u64,

        /// Injection backend.
        ///
        /// - auto: choose a backend based on the runtime environment
        /// - wayland: force Wayland injection (virtual keyboard)
        /// - x11: force X11 injection (XTEST)
        #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
        backend: BackendArg,

        /// Wayland seat name to attach the virtual keyboard to (e.g. seat0).
        #[arg(long, value_name = "NAME")]
        seat: Option<String>,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Show what a session would do without pressing any keys
    Preview {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        tuning: TuningArgs,
    },
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_config(path: &PathBuf) -> Result<TypingConfig> {
    let json =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("failed to parse typing config {}", path.display()))
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn run_type(
    input: PathBuf,
    countdown: u64,
    backend: BackendArg,
    seat: Option<String>,
    seed: Option<u64>,
    tuning: TuningArgs,
) -> Result<()> {
    let text = read_input(&input)?;
    if text.trim().is_empty() {
        return Err(anyhow!("input text is empty; nothing to type"));
    }
    let cfg = tuning.resolve()?;

    // Fail fast on unsupported environments before any countdown starts.
    let actuator = actuator::connect(backend.to_library(), seat.as_deref())?;

    let mut typist = Typist::new(cfg);
    let handle = typist.start(
        &text,
        countdown,
        actuator,
        Box::new(ConsoleStatus),
        rng_from_seed(seed),
    )?;

    let stop = handle.stop_flag();
    ctrlc::set_handler(move || {
        stop.store(true, std::sync::atomic::Ordering::SeqCst);
    })
    .context("failed to install Ctrl+C handler")?;

    match typist.wait()? {
        SessionOutcome::Completed | SessionOutcome::Stopped => Ok(()),
    }
}

fn run_preview(input: PathBuf, seed: Option<u64>, tuning: TuningArgs) -> Result<()> {
    let text = normalize_line_endings(&read_input(&input)?);
    let cfg = tuning.resolve()?;
    let tokens = tokenize(&text);
    let stats = sim::estimate(&tokens, &cfg);

    let mut rng = rng_from_seed(seed);
    let samples: Vec<f64> = (0..5).map(|_| sample_wpm(&cfg, &mut rng)).collect();
    let sample_wpms: Vec<String> = samples.iter().map(|w| format!("{w:.1}")).collect();
    let sample_delays: Vec<String> = samples
        .iter()
        .map(|w| format!("{:.3}s", base_delay(*w)))
        .collect();

    println!(
        "{} words, {} punctuation marks, {} other characters ({} total)",
        stats.words, stats.punctuation, stats.other, stats.chars
    );
    println!(
        "Expected duration: ~{:.1} min at {:.0}-{:.0} WPM",
        stats.expected_secs / 60.0,
        cfg.min_wpm,
        cfg.max_wpm
    );
    println!("Sample WPMs: {}", sample_wpms.join(", "));
    println!("Base char delays: {}", sample_delays.join(", "));
    println!(
        "Letter typos: {:.0}%  Punctuation typos: {:.0}%  Think pauses: {:.0}%",
        cfg.letter_typo_rate * 100.0,
        cfg.punct_typo_rate * 100.0,
        cfg.think_pause_chance * 100.0
    );
    println!(
        "Corrections: {}  Micro-pauses: {}",
        if cfg.enable_corrections { "on" } else { "off" },
        if cfg.micro_pauses { "on" } else { "off" }
    );

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Type {
            input,
            countdown,
            backend,
            seat,
            seed,
            tuning,
        } => run_type(input, countdown, backend, seat, seed, tuning),
        Command::Preview {
            input,
            seed,
            tuning,
        } => run_preview(input, seed, tuning),
    }
}
