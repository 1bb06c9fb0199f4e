//! Configuration sections with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const FILE_NAME: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub world: WorldConfig,
    pub meshing: MeshingConfig,
    pub render: RenderConfig,
    pub debug: DebugConfig,
}

/// Chunk streaming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Streaming radius in chunks.
    pub render_distance: u32,
    /// Lowest chunk-y that is streamed in.
    pub min_chunk_y: i32,
    /// Highest chunk-y that is streamed in.
    pub max_chunk_y: i32,
    /// Cap on chunks being generated at once.
    pub max_generation_in_flight: usize,
    /// Generation threads (0 = half the logical CPUs).
    pub generation_threads: usize,
}

/// Greedy meshing and the mesh worker pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeshingConfig {
    /// Bridge culled gaps inside a row.
    pub greedier_rows: bool,
    /// Merge rows whose visible spans differ but whose windows cover both.
    pub greedier_merge: bool,
    /// Longest culled gap that may be bridged.
    pub greedier_culling_limit: usize,
    /// Mesh worker threads (0 = one per logical CPU).
    pub worker_threads: usize,
    /// Capacity of each priority lane.
    pub queue_capacity: usize,
    /// Queue wait after which a job is reported as starved.
    pub starvation_warning_ms: u64,
}

/// Chunk rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub occlusion_culling: bool,
    /// Distance in chunks beyond which the coarse LOD mesh is drawn (0 = off).
    pub lod_distance: u32,
    /// Frames a retired GPU buffer is kept alive.
    pub frames_in_flight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter override (e.g. "debug" or "info,lattice_mesh=trace").
    pub log_level: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            render_distance: 8,
            min_chunk_y: -4,
            max_chunk_y: 8,
            max_generation_in_flight: 8,
            generation_threads: 0,
        }
    }
}

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            greedier_rows: true,
            greedier_merge: true,
            greedier_culling_limit: 32,
            worker_threads: 0,
            queue_capacity: 4096,
            starvation_warning_ms: 100,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            occlusion_culling: true,
            lod_distance: 8,
            frames_in_flight: 2,
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

/// Platform config directory for lattice, e.g. `~/.config/lattice` on Linux.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| base.join("lattice"))
        .ok_or(ConfigError::NoConfigDir)
}

impl Config {
    /// Loads `config.ron` from `config_dir`, writing the defaults if it is missing.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(FILE_NAME);
        if path.exists() {
            let config = Self::read(&path)?;
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Writes the config to `config_dir/config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_dir.join(FILE_NAME);
        let write_error = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_error)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&path, serialized).map_err(write_error)
    }

    /// Re-reads the file; `Some` only when it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read(&config_dir.join(FILE_NAME))?;
        if &fresh != self {
            log::info!("Config reloaded with changes");
            Ok(Some(fresh))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
