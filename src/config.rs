// Transport configuration
// Stored as RON, the same format the project files use

use crate::error::ConfigError;
use crate::transport::timeline::{DEFAULT_PPQ, Tempo, TimeSignature};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name inside the user config directory
const CONFIG_FILE_NAME: &str = "transport.ron";

/// What `stop()` does with the playhead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopPolicy {
    /// Return to tick 0
    #[default]
    Reset,
    /// Keep the current tick
    Preserve,
}

/// Which clock data advances the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BeatPolicy {
    /// Use beat+fraction when a sample carries it, time deltas otherwise
    #[default]
    PreferBeatData,
    /// Always advance from time deltas, ignoring beat data
    DeltaOnly,
}

/// Clock handoff and cadence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Capacity of the clock → authority beat ring
    pub beat_capacity: usize,
    /// Capacity of the authority → clock control ring
    pub control_capacity: usize,
    /// Rendered time between two beat messages
    pub emit_interval_ms: f64,
    /// Sleep period of the degraded timer clock
    pub timer_interval_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            beat_capacity: 256,
            control_capacity: 64,
            emit_interval_ms: 10.0,
            timer_interval_ms: 16,
        }
    }
}

/// Scheduler backlog policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Queue length above which the scheduler considers itself lagging
    pub max_queue_len: usize,
    /// Tick distance since the last processed tick above which the
    /// scheduler considers itself lagging
    pub max_tick_gap: u64,
    /// Maximum number of overdue events released by one tick while lagging
    pub max_burst: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_queue_len: 4096,
            max_tick_gap: DEFAULT_PPQ as u64 * 4,
            max_burst: 64,
        }
    }
}

/// Complete transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub ppq: u32,
    pub initial_tempo: f64,
    pub time_signature: TimeSignature,
    pub stop_policy: StopPolicy,
    pub beat_policy: BeatPolicy,
    /// Playing with no tick for this long marks the transport stale
    pub stale_after_ms: u64,
    pub clock: ClockConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ppq: DEFAULT_PPQ,
            initial_tempo: 120.0,
            time_signature: TimeSignature::four_four(),
            stop_policy: StopPolicy::default(),
            beat_policy: BeatPolicy::default(),
            stale_after_ms: 500,
            clock: ClockConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl TransportConfig {
    /// Parse and validate a RON document
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty RON
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::default())?)
    }

    /// Load and validate a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&source)
    }

    /// Write the config as RON, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// `<config dir>/scoreclock/transport.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scoreclock").join(CONFIG_FILE_NAME))
    }

    /// Load the default config file if present, defaults otherwise
    ///
    /// A file that exists but fails to parse is an error, not silently
    /// replaced by defaults.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::info!(path = %path.display(), "loading transport config");
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ppq == 0 {
            return Err(ConfigError::Invalid("ppq must be > 0".into()));
        }
        Tempo::try_new(self.initial_tempo)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.time_signature
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.clock.beat_capacity == 0 || self.clock.control_capacity == 0 {
            return Err(ConfigError::Invalid(
                "clock ring capacities must be > 0".into(),
            ));
        }
        if !self.clock.emit_interval_ms.is_finite() || self.clock.emit_interval_ms <= 0.0 {
            return Err(ConfigError::Invalid(
                "clock.emit_interval_ms must be > 0".into(),
            ));
        }
        if self.clock.timer_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "clock.timer_interval_ms must be > 0".into(),
            ));
        }
        if self.scheduler.max_burst == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.max_burst must be > 0".into(),
            ));
        }
        Ok(())
    }
}
