//! Configuration loading and typed config structures for the Evolve simulation.
//!
//! The canonical configuration lives in `evolve-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every field has a default, so an empty document is a valid config.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Environment variable overriding `world.seed`.
pub const SEED_ENV: &str = "EVOLVE_SEED";

/// Environment variable overriding `simulation.max_ticks`.
pub const MAX_TICKS_ENV: &str = "EVOLVE_MAX_TICKS";

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
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
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
/// Mirrors the structure of `evolve-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, timing).
    #[serde(default)]
    pub world: WorldConfig,

    /// Arena geometry, collision cooldown, and per-tick board checks.
    #[serde(default)]
    pub board: BoardConfig,

    /// Run boundaries.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Which demo scenario the engine binary populates the board with.
    #[serde(default)]
    pub scenario: ScenarioConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `EVOLVE_SEED` overrides `world.seed`
    /// - `EVOLVE_MAX_TICKS` overrides `simulation.max_ticks`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override values with environment variables when set and parseable.
    pub fn apply_env_overrides(&mut self) {
        if let Some(seed) = env_u64(SEED_ENV) {
            self.world.seed = seed;
        }
        if let Some(max_ticks) = env_u64(MAX_TICKS_ENV) {
            self.simulation.max_ticks = max_ticks;
        }
    }

    /// Check that the configuration describes a runnable simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let board = &self.board;
        for (field, value) in [
            ("board.arena_width", board.arena_width),
            ("board.arena_height", board.arena_height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{field} must be finite and positive, got {value}")));
            }
        }
        if board.sectors_number == 0 {
            return Err(invalid("board.sectors_number must be at least 1"));
        }
        if board.scan_radius < 0 {
            return Err(invalid(format!(
                "board.scan_radius must be non-negative, got {}",
                board.scan_radius
            )));
        }
        if self.world.tick_delta_ms == 0 {
            return Err(invalid("world.tick_delta_ms must be at least 1"));
        }
        let size = self.scenario.agent_size;
        if !size.is_finite()
            || size <= 0.0
            || size > board.arena_width
            || size > board.arena_height
        {
            return Err(invalid(format!(
                "scenario.agent_size must be positive and fit in the arena, got {size}"
            )));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(variable = name, value = %raw, %err, "Ignoring unparseable override");
            None
        }
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Simulated milliseconds covered by one tick.
    #[serde(default = "default_tick_delta_ms")]
    pub tick_delta_ms: u64,

    /// Real-time milliseconds to wait between ticks (0 = run flat out).
    #[serde(default)]
    pub tick_interval_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            tick_delta_ms: default_tick_delta_ms(),
            tick_interval_ms: 0,
        }
    }
}

/// Arena and spatial-index configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoardConfig {
    /// Arena width.
    #[serde(default = "default_arena_side")]
    pub arena_width: f64,

    /// Arena height.
    #[serde(default = "default_arena_side")]
    pub arena_height: f64,

    /// Sectors per axis; the grid is square.
    #[serde(default = "default_sectors_number")]
    pub sectors_number: usize,

    /// Cooldown armed on each reported collision, in simulated ms.
    #[serde(default = "default_collision_cooldown_ms")]
    pub collision_cooldown_ms: u64,

    /// Sector radius used by the per-tick neighbor scan.
    #[serde(default = "default_scan_radius")]
    pub scan_radius: i64,

    /// Which board checks run every tick.
    #[serde(default)]
    pub checks: BoardChecksConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            arena_width: default_arena_side(),
            arena_height: default_arena_side(),
            sectors_number: default_sectors_number(),
            collision_cooldown_ms: default_collision_cooldown_ms(),
            scan_radius: default_scan_radius(),
            checks: BoardChecksConfig::default(),
        }
    }
}

/// Per-tick board check toggles.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BoardChecksConfig {
    /// Rebuild the colliding-pair cache.
    #[serde(default = "default_true")]
    pub collision: bool,

    /// Rebuild the same-sector pair cache.
    #[serde(default)]
    pub sector_pairs: bool,

    /// Rebuild every agent's neighbor cache.
    #[serde(default)]
    pub neighbors: bool,
}

impl Default for BoardChecksConfig {
    fn default() -> Self {
        Self {
            collision: true,
            sector_pairs: false,
            neighbors: false,
        }
    }
}

/// Run boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of ticks before the run ends (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

/// Demo scenarios shipped with the engine binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// Agents trade damage on contact until one side dies.
    #[default]
    Fight,
    /// Agents drift and bounce elastically off each other and the walls.
    Space,
}

/// How a scenario places its starting agents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnLayout {
    /// A regular grid with a free margin around the arena edges.
    #[default]
    Even,
    /// Uniformly random positions.
    Uniform,
}

/// Demo scenario selection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioConfig {
    /// Which scenario to run.
    #[serde(default)]
    pub kind: ScenarioKind,

    /// Number of agents to spawn.
    #[serde(default = "default_scenario_agents")]
    pub agents: u32,

    /// Side length of each spawned agent.
    #[serde(default = "default_agent_size")]
    pub agent_size: f64,

    /// Starting placement for scenarios that scatter their agents.
    #[serde(default)]
    pub layout: SpawnLayout,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            kind: ScenarioKind::default(),
            agents: default_scenario_agents(),
            agent_size: default_agent_size(),
            layout: SpawnLayout::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Emit a JSON board snapshot every N ticks (0 = never).
    #[serde(default)]
    pub snapshot_interval_ticks: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            snapshot_interval_ticks: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Evolve".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_delta_ms() -> u64 {
    16
}

const fn default_arena_side() -> f64 {
    800.0
}

const fn default_sectors_number() -> usize {
    8
}

const fn default_collision_cooldown_ms() -> u64 {
    100
}

const fn default_scan_radius() -> i64 {
    1
}

const fn default_true() -> bool {
    true
}

const fn default_scenario_agents() -> u32 {
    2
}

const fn default_agent_size() -> f64 {
    20.0
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.tick_delta_ms, 16);
        assert_eq!(config.board.sectors_number, 8);
        assert!(config.board.checks.collision);
        assert!(!config.board.checks.neighbors);
        assert_eq!(config.scenario.kind, ScenarioKind::Fight);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let from_yaml: SimulationConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(from_yaml, SimulationConfig::default());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
world:
  name: "Test Arena"
  seed: 7
  tick_delta_ms: 10
  tick_interval_ms: 5

board:
  arena_width: 100.0
  arena_height: 50.0
  sectors_number: 5
  collision_cooldown_ms: 250
  scan_radius: 2
  checks:
    collision: false
    sector_pairs: true
    neighbors: true

simulation:
  max_ticks: 300

scenario:
  kind: space
  agents: 40
  agent_size: 4.0
  layout: uniform

logging:
  level: "debug"
  format: json
  snapshot_interval_ticks: 10
"#;
        let config: SimulationConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.world.name, "Test Arena");
        assert_eq!(config.world.tick_interval_ms, 5);
        assert!((config.board.arena_height - 50.0).abs() < f64::EPSILON);
        assert_eq!(config.board.collision_cooldown_ms, 250);
        assert_eq!(config.board.scan_radius, 2);
        assert!(!config.board.checks.collision);
        assert!(config.board.checks.sector_pairs);
        assert_eq!(config.simulation.max_ticks, 300);
        assert_eq!(config.scenario.kind, ScenarioKind::Space);
        assert_eq!(config.scenario.agents, 40);
        assert_eq!(config.scenario.layout, SpawnLayout::Uniform);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.snapshot_interval_ticks, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: SimulationConfig =
            serde_yml::from_str("board:\n  sectors_number: 3\n").unwrap();
        assert_eq!(config.board.sectors_number, 3);
        assert_eq!(config.board.collision_cooldown_ms, 100);
        assert_eq!(config.world.seed, 42);
    }

    #[test]
    fn validate_rejects_bad_geometry() {
        let mut config = SimulationConfig::default();
        config.board.sectors_number = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = SimulationConfig::default();
        config.board.arena_width = -1.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.board.scan_radius = -1;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.world.tick_delta_ms = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.scenario.agent_size = 900.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let result = SimulationConfig::parse("board: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = SimulationConfig::from_file(Path::new("/nonexistent/evolve-config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
