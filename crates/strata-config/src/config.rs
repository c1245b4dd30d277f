//! Configuration structs with sensible defaults, validation, and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Terrain grid and world-shape settings.
    pub terrain: TerrainConfig,
    /// Chunk streaming settings.
    pub streaming: StreamingConfig,
    /// Block editing settings.
    pub edit: EditConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Terrain grid configuration.
///
/// Fixed once the terrain is constructed; every component reads it through
/// a shared grid built from these values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Chunk dimensions in blocks along X, Y and Z.
    pub chunk_size_in_blocks: [u32; 3],
    /// Edge length of one block in world units.
    pub block_size: f32,
    /// Horizontal radius (in chunks) of the square kept around the observer.
    pub visible_chunks_radius: u32,
    /// Sea level, in global block rows.
    pub water_level_in_blocks: i32,
    /// Highest vertical chunk index the streamer will request.
    pub max_chunk_layer: i32,
    /// Seed for procedural block typing.
    pub seed: u32,
}

/// Chunk streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Chunks generated per tick while a streaming pass is in flight.
    pub chunks_per_tick: u32,
}

/// Block editing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditConfig {
    /// Distance (in blocks) a raycast hit is pushed along the ray.
    pub raycast_offset: f32,
    /// Default reach of ray-driven edits, in world units.
    pub raycast_max_distance: f32,
    /// Lower bound of the impulse applied to a detached block.
    pub detach_impulse_min: f32,
    /// Upper bound (exclusive) of the impulse applied to a detached block.
    pub detach_impulse_max: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            chunk_size_in_blocks: [8, 64, 8],
            block_size: 1.0,
            visible_chunks_radius: 10,
            water_level_in_blocks: 27,
            max_chunk_layer: 0,
            seed: 0,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self { chunks_per_tick: 1 }
    }
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            raycast_offset: 0.01,
            raycast_max_distance: 3.0,
            detach_impulse_min: 10.0,
            detach_impulse_max: 20.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Validation ---

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl TerrainConfig {
    /// Rejects values that would make the block grid degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size_in_blocks.contains(&0) {
            return Err(invalid(
                "terrain.chunk_size_in_blocks",
                format!("every dimension must be non-zero, got {:?}", self.chunk_size_in_blocks),
            ));
        }
        if !self.block_size.is_finite() || self.block_size <= 0.0 {
            return Err(invalid(
                "terrain.block_size",
                format!("must be a positive finite number, got {}", self.block_size),
            ));
        }
        Ok(())
    }
}

impl StreamingConfig {
    /// A zero budget would leave a streaming pass in flight forever.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunks_per_tick == 0 {
            return Err(invalid("streaming.chunks_per_tick", "must be at least 1"));
        }
        Ok(())
    }
}

impl EditConfig {
    /// Checks reach and impulse bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.raycast_max_distance.is_finite() || self.raycast_max_distance < 0.0 {
            return Err(invalid(
                "edit.raycast_max_distance",
                format!("must be a non-negative finite number, got {}", self.raycast_max_distance),
            ));
        }
        if !(self.detach_impulse_min < self.detach_impulse_max) {
            return Err(invalid(
                "edit.detach_impulse_min",
                format!(
                    "must be below detach_impulse_max ({} >= {})",
                    self.detach_impulse_min, self.detach_impulse_max
                ),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terrain.validate()?;
        self.streaming.validate()?;
        self.edit.validate()
    }
}

// --- Load / Save / Reload ---

/// Platform config directory for Strata (`<config_dir>/strata`), or the
/// working directory when the platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("strata"))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.validate()?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("visible_chunks_radius: 10"));
        assert!(ron_str.contains("water_level_in_blocks: 27"));
        assert!(ron_str.contains("chunks_per_tick: 1"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(terrain: (visible_chunks_radius: 3))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.terrain.visible_chunks_radius, 3);
        assert_eq!(config.terrain.chunk_size_in_blocks, [8, 64, 8]);
        assert_eq!(config.edit, EditConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_dimension_rejected() {
        let mut config = Config::default();
        config.terrain.chunk_size_in_blocks = [8, 0, 8];
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "terrain.chunk_size_in_blocks",
                ..
            }
        ));
    }

    #[test]
    fn test_non_positive_block_size_rejected() {
        let mut config = Config::default();
        config.terrain.block_size = 0.0;
        assert!(config.validate().is_err());
        config.terrain.block_size = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut config = Config::default();
        config.streaming.chunks_per_tick = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_impulse_range_rejected() {
        let mut config = Config::default();
        config.edit.detach_impulse_min = 30.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.terrain.visible_chunks_radius = 4;
        config.terrain.seed = 99;
        config.debug.log_level = "debug".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ron"),
            "(terrain: (block_size: -1.0))",
        )
        .unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.terrain.visible_chunks_radius = 2;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().terrain.visible_chunks_radius, 2);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
