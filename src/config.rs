use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Tuning knobs for one typing session. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypingConfig {
    pub min_wpm: f64,
    pub max_wpm: f64,
    /// Chance per eligible word of simulating a letter-level mistake.
    pub letter_typo_rate: f64,
    /// Chance per punctuation mark of typing a wrong mark first.
    pub punct_typo_rate: f64,
    pub enable_corrections: bool,
    pub micro_pauses: bool,
    /// Chance of an extra "thinking" pause after a word.
    pub think_pause_chance: f64,
    /// Gaussian jitter stddev as a fraction of the base per-character delay.
    pub jitter_std: f64,
    /// Seconds between making a mistake and starting to correct it.
    pub correction_latency: (f64, f64),
}

impl Default for TypingConfig {
    fn default() -> Self {
        Preset::Balanced.config()
    }
}

impl TypingConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_wpm.is_finite() && self.max_wpm.is_finite(),
            "min_wpm and max_wpm must be finite"
        );
        ensure!(self.min_wpm > 0.0, "min_wpm must be > 0");
        ensure!(self.min_wpm <= self.max_wpm, "min_wpm must be <= max_wpm");

        ensure!(
            (0.0..=1.0).contains(&self.letter_typo_rate),
            "letter_typo_rate must be between 0.0 and 1.0"
        );
        ensure!(
            (0.0..=1.0).contains(&self.punct_typo_rate),
            "punct_typo_rate must be between 0.0 and 1.0"
        );
        ensure!(
            (0.0..=1.0).contains(&self.think_pause_chance),
            "think_pause_chance must be between 0.0 and 1.0"
        );

        ensure!(
            self.jitter_std.is_finite() && self.jitter_std >= 0.0,
            "jitter_std must be >= 0"
        );

        let (lat_min, lat_max) = self.correction_latency;
        ensure!(
            lat_min.is_finite() && lat_max.is_finite() && lat_min >= 0.0,
            "correction_latency bounds must be finite and >= 0"
        );
        ensure!(
            lat_min <= lat_max,
            "correction_latency min must be <= correction_latency max"
        );

        Ok(())
    }
}

/// Named typing personalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Balanced,
    FastButMessy,
    SlowAndCareful,
}

impl Preset {
    pub fn config(self) -> TypingConfig {
        match self {
            Preset::Balanced => TypingConfig {
                min_wpm: 45.0,
                max_wpm: 70.0,
                letter_typo_rate: 0.03,
                punct_typo_rate: 0.02,
                enable_corrections: true,
                micro_pauses: true,
                think_pause_chance: 0.08,
                jitter_std: 0.25,
                correction_latency: (0.15, 0.55),
            },
            Preset::FastButMessy => TypingConfig {
                min_wpm: 70.0,
                max_wpm: 110.0,
                letter_typo_rate: 0.06,
                punct_typo_rate: 0.04,
                think_pause_chance: 0.05,
                jitter_std: 0.28,
                ..Preset::Balanced.config()
            },
            Preset::SlowAndCareful => TypingConfig {
                min_wpm: 30.0,
                max_wpm: 45.0,
                letter_typo_rate: 0.015,
                punct_typo_rate: 0.01,
                think_pause_chance: 0.12,
                jitter_std: 0.18,
                ..Preset::Balanced.config()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        TypingConfig::default().validate().expect("default config");
        Preset::FastButMessy.config().validate().expect("fast");
        Preset::SlowAndCareful.config().validate().expect("slow");
    }

    #[test]
    fn rejects_non_positive_min_wpm() {
        let cfg = TypingConfig {
            min_wpm: 0.0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("min_wpm"));
    }

    #[test]
    fn rejects_inverted_wpm_range() {
        let cfg = TypingConfig {
            min_wpm: 90.0,
            max_wpm: 40.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_probabilities() {
        for bad in [-0.1, 1.5] {
            let cfg = TypingConfig {
                letter_typo_rate: bad,
                ..Default::default()
            };
            assert!(cfg.validate().is_err(), "letter_typo_rate {bad}");

            let cfg = TypingConfig {
                think_pause_chance: bad,
                ..Default::default()
            };
            assert!(cfg.validate().is_err(), "think_pause_chance {bad}");
        }
    }

    #[test]
    fn rejects_inverted_correction_latency() {
        let cfg = TypingConfig {
            correction_latency: (0.8, 0.2),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = Preset::FastButMessy.config();
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: TypingConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, cfg);
    }
}
