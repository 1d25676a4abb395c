//! Configuration loading and typed config structures for the companion
//! simulation.
//!
//! The canonical configuration lives in `companion-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads the file. Every section
//! and key is optional; anything missing falls back to its default.

use std::path::Path;

use serde::Deserialize;

use companion_agents::BehaviorConfig;

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
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `companion-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, timing, extent).
    #[serde(default)]
    pub world: WorldConfig,

    /// Identity of the peer running this process.
    #[serde(default)]
    pub peer: PeerConfig,

    /// Demo scenario population.
    #[serde(default)]
    pub scenario: ScenarioConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Behavior controller tunables.
    #[serde(default)]
    pub behavior: BehaviorConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `COMPANION_PEER` environment variable overrides
    /// `peer.local_peer`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.peer.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        if yaml.trim().is_empty() {
            let mut config = Self::default();
            config.peer.apply_env_overrides();
            return Ok(config);
        }
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.peer.apply_env_overrides();
        Ok(config)
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable world name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for the demo layout.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Milliseconds per tick. Also the simulated tick length.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Half the side of the square walkable area, in meters.
    #[serde(default = "default_half_extent")]
    pub half_extent: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
            half_extent: default_half_extent(),
        }
    }
}

/// Local peer identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeerConfig {
    /// Peer id of this process. Only agents this peer is authoritative
    /// for are ticked.
    #[serde(default = "default_local_peer")]
    pub local_peer: String,
}

impl PeerConfig {
    /// Override the peer id with `COMPANION_PEER` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("COMPANION_PEER") {
            self.local_peer = val;
        }
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            local_peer: default_local_peer(),
        }
    }
}

/// Demo scenario population.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScenarioConfig {
    /// Companions spawned for the owner.
    #[serde(default = "default_companions")]
    pub companions: u32,

    /// Trees scattered around the spawn.
    #[serde(default = "default_trees")]
    pub trees: u32,

    /// Rocks scattered around the spawn.
    #[serde(default = "default_rocks")]
    pub rocks: u32,

    /// Ore deposits scattered around the spawn.
    #[serde(default = "default_ore_deposits")]
    pub ore_deposits: u32,

    /// Hostile creatures placed at the edge of the area.
    #[serde(default = "default_hostiles")]
    pub hostiles: u32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            companions: default_companions(),
            trees: default_trees(),
            rocks: default_rocks(),
            ore_deposits: default_ore_deposits(),
            hostiles: default_hostiles(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Simulation boundary parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Hard stop after this many ticks. 0 runs until every agent is gone.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Log a summary line every N ticks.
    #[serde(default = "default_summary_interval")]
    pub summary_interval: u64,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            summary_interval: default_summary_interval(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Homestead".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_half_extent() -> f32 {
    60.0
}

fn default_local_peer() -> String {
    "host".to_owned()
}

const fn default_companions() -> u32 {
    2
}

const fn default_trees() -> u32 {
    8
}

const fn default_rocks() -> u32 {
    6
}

const fn default_ore_deposits() -> u32 {
    4
}

const fn default_hostiles() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_max_ticks() -> u64 {
    3000
}

const fn default_summary_interval() -> u64 {
    50
}
