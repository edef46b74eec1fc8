//! Controller configuration parameters
//!
//! All tunable parameters for the dispenser.  Defaults match the bench
//! rig; a JSON file passed with `--config` overrides any subset of them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispenserConfig {
    // --- Pumps ---
    /// Seconds of pump run time per unit of volume (mL).
    pub flow_rate_secs_per_unit: f64,
    /// Persisted pump slot table.
    pub pump_config_path: PathBuf,
    /// Optional recipe catalog overriding the built-in one.
    pub recipes_path: Option<PathBuf>,
    /// Relay boards on the bench rig switch on when the line is driven LOW.
    pub active_low: bool,

    // --- Indicator ---
    /// Animation tick while a dispense is running (milliseconds)
    pub indicator_cadence_ms: u64,
    /// Length of the one-shot completion cue (milliseconds)
    pub success_cue_ms: u64,

    // --- Timing ---
    /// Progress reporter polling interval (milliseconds)
    pub progress_interval_ms: u64,
    /// Pause after a job before input is accepted again (milliseconds)
    pub settle_ms: u64,
    /// How long every pump runs during a clean cycle (seconds)
    pub clean_secs: f64,
    /// Per-pump run time for the one-at-a-time pump test (seconds)
    pub pump_test_secs: f64,
    /// Pause between pumps during the pump test (milliseconds)
    pub pump_test_pause_ms: u64,

    // --- Remote ---
    pub remote: RemoteConfig,
}

/// Settings for the remote-command deployment mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Seconds between mailbox checks, and the back-off after a failure.
    pub poll_interval_secs: u64,
    /// Only commands whose subject contains this text are accepted.
    pub subject_filter: String,
    /// Only commands from this sender are accepted (empty = any sender).
    pub sender: String,
    /// Confirmation recipient.
    pub recipient: String,
    /// Spool transport: incoming command files.
    pub inbox_dir: PathBuf,
    /// Spool transport: outgoing confirmation files.
    pub outbox_dir: PathBuf,
}

impl Default for DispenserConfig {
    fn default() -> Self {
        Self {
            // Pumps
            flow_rate_secs_per_unit: 60.0 / 100.0, // 0.6 s per mL
            pump_config_path: PathBuf::from("pump_config.json"),
            recipes_path: None,
            active_low: true,

            // Indicator
            indicator_cadence_ms: 200,
            success_cue_ms: 1000,

            // Timing
            progress_interval_ms: 100,
            settle_ms: 500,
            clean_secs: 5.0,
            pump_test_secs: 30.0,
            pump_test_pause_ms: 300,

            remote: RemoteConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15,
            subject_filter: "Drink Order".to_owned(),
            sender: String::new(),
            recipient: String::new(),
            inbox_dir: PathBuf::from("spool/inbox"),
            outbox_dir: PathBuf::from("spool/outbox"),
        }
    }
}

impl RemoteConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl DispenserConfig {
    /// Load from a JSON file, filling unspecified fields with defaults,
    /// then validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.flow_rate_secs_per_unit.is_finite() || self.flow_rate_secs_per_unit < 0.0 {
            return Err(ConfigError::Invalid(
                "flow_rate_secs_per_unit must be a finite value >= 0".to_owned(),
            ));
        }
        if !(10..=5000).contains(&self.indicator_cadence_ms) {
            return Err(ConfigError::Invalid(
                "indicator_cadence_ms must be 10-5000".to_owned(),
            ));
        }
        if !(10..=5000).contains(&self.progress_interval_ms) {
            return Err(ConfigError::Invalid(
                "progress_interval_ms must be 10-5000".to_owned(),
            ));
        }
        for (name, secs) in [
            ("clean_secs", self.clean_secs),
            ("pump_test_secs", self.pump_test_secs),
        ] {
            if !secs.is_finite() || !(0.0..=600.0).contains(&secs) {
                return Err(ConfigError::Invalid(format!("{name} must be 0-600")));
            }
        }
        if self.remote.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "remote.poll_interval_secs must be > 0".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn indicator_cadence(&self) -> Duration {
        Duration::from_millis(self.indicator_cadence_ms)
    }

    pub fn success_cue(&self) -> Duration {
        Duration::from_millis(self.success_cue_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn clean_duration(&self) -> Duration {
        Duration::from_secs_f64(self.clean_secs)
    }

    pub fn pump_test_duration(&self) -> Duration {
        Duration::from_secs_f64(self.pump_test_secs)
    }

    pub fn pump_test_pause(&self) -> Duration {
        Duration::from_millis(self.pump_test_pause_ms)
    }
}
