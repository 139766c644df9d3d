//! Configuration loading and typed config structures for the Kingdoms
//! simulation.
//!
//! The canonical configuration lives in `kingdoms-config.yaml` at the project
//! root. Every section and every field has a default, so an empty file (or
//! no file at all) yields the classic two-kingdom setup.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use kingdoms_economy::EconomyConfig;
use kingdoms_types::AgentKind;

/// Environment variable that overrides `world.seed`.
pub const SEED_ENV: &str = "KINGDOMS_SEED";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes an unusable simulation.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `kingdoms-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Seed and kingdom names.
    #[serde(default)]
    pub world: WorldConfig,

    /// Agent production intervals.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// War scheduler timing.
    #[serde(default)]
    pub war: WarConfig,

    /// Shutdown timing.
    #[serde(default)]
    pub shutdown: ShutdownConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `KINGDOMS_SEED`, when set, overrides `world.seed`. The result is
    /// validated before it is returned.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Applies the same environment override and validation as
    /// [`SimulationConfig::from_file`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config
            .world
            .apply_seed_override(std::env::var(SEED_ENV).ok().as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the simulation cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [first, second] = &self.world.kingdom_names;
        if first.trim().is_empty() || second.trim().is_empty() {
            return Err(invalid("kingdom names must not be empty"));
        }
        if first == second {
            return Err(invalid(format!("both kingdoms are named {first:?}")));
        }

        for kind in AgentKind::ALL {
            if self.economy.base_interval_ms(kind) == 0 {
                return Err(invalid(format!("economy interval for {kind} must be positive")));
            }
        }
        if self.economy.min_delay_ms == 0 {
            return Err(invalid("economy.min_delay_ms must be positive"));
        }

        if self.war.battle_interval_min_ms == 0 {
            return Err(invalid("war.battle_interval_min_ms must be positive"));
        }
        if self.war.battle_interval_min_ms > self.war.battle_interval_max_ms {
            return Err(invalid(format!(
                "war battle interval range is inverted ({} > {})",
                self.war.battle_interval_min_ms, self.war.battle_interval_max_ms
            )));
        }

        if self.shutdown.join_timeout_ms == 0 {
            return Err(invalid("shutdown.join_timeout_ms must be positive"));
        }
        Ok(())
    }

    /// The per-kingdom timing handed to `kingdoms-economy`, with the join
    /// timeout taken from the `shutdown` section.
    #[must_use]
    pub fn economy_config(&self) -> EconomyConfig {
        EconomyConfig {
            join_timeout_ms: self.shutdown.join_timeout_ms,
            ..self.economy.clone()
        }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Master seed. `None` draws one from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Display names of the two kingdoms.
    #[serde(default = "default_kingdom_names")]
    pub kingdom_names: [String; 2],
}

impl WorldConfig {
    /// Replace the seed with `value` when it is present.
    pub fn apply_seed_override(&mut self, value: Option<&str>) -> Result<(), ConfigError> {
        let Some(raw) = value else {
            return Ok(());
        };
        let seed = raw
            .trim()
            .parse::<u64>()
            .map_err(|error| invalid(format!("{SEED_ENV}={raw:?} is not a u64 seed: {error}")))?;
        self.seed = Some(seed);
        Ok(())
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: None,
            kingdom_names: default_kingdom_names(),
        }
    }
}

/// War scheduler timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WarConfig {
    /// Delay before the first battle, in ms.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Shortest pause between battles, in ms.
    #[serde(default = "default_battle_interval_min_ms")]
    pub battle_interval_min_ms: u64,

    /// Longest pause between battles, in ms (inclusive).
    #[serde(default = "default_battle_interval_max_ms")]
    pub battle_interval_max_ms: u64,

    /// Give up after this long, in ms. Zero waits for a victor forever.
    #[serde(default)]
    pub max_duration_ms: u64,
}

impl WarConfig {
    /// The grace period as a [`Duration`].
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// The war time limit, if any.
    pub const fn max_duration(&self) -> Option<Duration> {
        if self.max_duration_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.max_duration_ms))
        }
    }
}

impl Default for WarConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            battle_interval_min_ms: default_battle_interval_min_ms(),
            battle_interval_max_ms: default_battle_interval_max_ms(),
            max_duration_ms: 0,
        }
    }
}

/// Shutdown timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShutdownConfig {
    /// Per-task join timeout when stopping a kingdom, in ms.
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,

    /// How long to keep the kingdoms running after the war ends, in ms.
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u64,
}

impl ShutdownConfig {
    /// The linger period as a [`Duration`].
    pub const fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            join_timeout_ms: default_join_timeout_ms(),
            linger_ms: default_linger_ms(),
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, coloured when attached to a terminal.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Line format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_kingdom_names() -> [String; 2] {
    ["Kingdom 1".to_owned(), "Kingdom 2".to_owned()]
}

const fn default_grace_period_ms() -> u64 {
    18_000
}

const fn default_battle_interval_min_ms() -> u64 {
    2_000
}

const fn default_battle_interval_max_ms() -> u64 {
    3_999
}

const fn default_join_timeout_ms() -> u64 {
    1_000
}

const fn default_linger_ms() -> u64 {
    3_000
}

fn default_log_level() -> String {
    "info".to_owned()
}
