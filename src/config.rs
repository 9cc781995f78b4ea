//! # Engine Configuration
//!
//! Load-time settings for streaming, terrain, room carving and meshing. The
//! chunk footprint itself is fixed at compile time (see
//! [`CHUNK_SIZE`](crate::engine_state::voxels::chunk::CHUNK_SIZE) and
//! [`CHUNK_HEIGHT`](crate::engine_state::voxels::chunk::CHUNK_HEIGHT)).
//!
//! Every field has a default, so a configuration file only needs the values
//! it changes:
//!
//! ```json
//! {
//!     "streaming": { "visible_radius": 3, "worker_threads": 2 },
//!     "terrain": { "seed": 1337 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine_state::voxels::{
    block::block_type::BlockType,
    chunk::{CHUNK_HEIGHT, CHUNK_SIZE},
};

/// Largest accepted visible radius, in chunks.
pub const MAX_VISIBLE_RADIUS: i32 = 32;

/// Errors raised while loading or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file was read but is not valid configuration JSON.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value parsed correctly but is outside its allowed range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Human readable constraint that was violated.
        reason: String,
    },
}

/// Distance metric used to decide whether a chunk coordinate is inside the
/// visible radius around the camera's chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusMetric {
    /// `max(|dx|, |dz|) <= radius`, a square working set.
    #[default]
    Chebyshev,
    /// `|dx| + |dz| <= radius`, a diamond working set.
    Manhattan,
}

impl RadiusMetric {
    /// Returns true if the offset `(dx, dz)` lies within `radius`.
    pub fn contains(self, dx: i32, dz: i32, radius: i32) -> bool {
        match self {
            RadiusMetric::Chebyshev => dx.abs().max(dz.abs()) <= radius,
            RadiusMetric::Manhattan => dx.abs() + dz.abs() <= radius,
        }
    }
}

/// Settings for the camera-driven working set and the generation workers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Chunk-grid radius around the camera's chunk that stays loaded.
    pub visible_radius: i32,
    /// Metric applied to `visible_radius`.
    pub radius_metric: RadiusMetric,
    /// Number of background generation threads. Zero generates inline on the
    /// thread that processes the task queue.
    pub worker_threads: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            visible_radius: 2,
            radius_metric: RadiusMetric::Chebyshev,
            worker_threads: 4,
        }
    }
}

/// Parameters of the height-field terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Noise seed. Identical seeds produce identical worlds.
    pub seed: u32,
    /// Elevation around which the terrain oscillates, in blocks.
    pub base_height: f64,
    /// Peak deviation from `base_height`, in blocks.
    pub amplitude: f64,
    /// Horizontal frequency applied to world coordinates before sampling.
    pub scale: f64,
    /// Number of summed noise octaves.
    pub octaves: u32,
    /// Columns whose surface lies below this level are flooded with water.
    pub water_level: i32,
    /// Number of dirt blocks between the surface block and stone.
    pub dirt_depth: i32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            base_height: 24.0,
            amplitude: 12.0,
            scale: 0.015,
            octaves: 4,
            water_level: 18,
            dirt_depth: 3,
        }
    }
}

/// Parameters for the optional carved room inside each chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Whether rooms are carved at all.
    pub enabled: bool,
    /// Probability in `0.0..=1.0` that a given chunk receives a room.
    pub chance: f64,
    /// Smallest extent along any axis, in blocks.
    pub min_extent: i32,
    /// Largest extent along any axis before clamping, in blocks.
    pub max_extent: i32,
    /// Material written into the room volume.
    pub material: BlockType,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chance: 0.35,
            min_extent: 3,
            max_extent: 8,
            material: BlockType::AIR,
        }
    }
}

/// Which optional vertex streams the mesh builder emits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Emit per-vertex atlas texture coordinates.
    pub texcoords: bool,
    /// Emit per-vertex tangents and bitangents.
    pub tangents: bool,
    /// Number of tiles along each edge of the square texture atlas.
    pub atlas_tiles: u32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            texcoords: true,
            tangents: false,
            atlas_tiles: 4,
        }
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Working-set and worker settings.
    pub streaming: StreamingConfig,
    /// Height-field settings.
    pub terrain: TerrainConfig,
    /// Room carving settings.
    pub rooms: RoomConfig,
    /// Mesh stream settings.
    pub mesh: MeshConfig,
}

impl EngineConfig {
    /// Parses and validates a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Checks every value against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let streaming = &self.streaming;
        if !(0..=MAX_VISIBLE_RADIUS).contains(&streaming.visible_radius) {
            return Err(invalid(
                "streaming.visible_radius",
                format!("must be within 0..={MAX_VISIBLE_RADIUS}"),
            ));
        }

        let terrain = &self.terrain;
        if terrain.octaves == 0 {
            return Err(invalid("terrain.octaves", "must be at least 1".into()));
        }
        if !(terrain.scale.is_finite() && terrain.scale > 0.0) {
            return Err(invalid("terrain.scale", "must be a positive number".into()));
        }
        if !(terrain.base_height.is_finite() && terrain.amplitude.is_finite()) {
            return Err(invalid(
                "terrain.base_height",
                "base height and amplitude must be finite".into(),
            ));
        }
        if terrain.dirt_depth < 0 {
            return Err(invalid("terrain.dirt_depth", "must not be negative".into()));
        }

        let rooms = &self.rooms;
        if !(0.0..=1.0).contains(&rooms.chance) {
            return Err(invalid("rooms.chance", "must be within 0.0..=1.0".into()));
        }
        // Rooms keep a one block shell from each horizontal chunk edge.
        let max_fit = (CHUNK_SIZE as i32 - 2).min(CHUNK_HEIGHT as i32 - 2);
        if rooms.min_extent < 1 || rooms.min_extent > max_fit {
            return Err(invalid(
                "rooms.min_extent",
                format!("must be within 1..={max_fit}"),
            ));
        }
        if rooms.max_extent < rooms.min_extent {
            return Err(invalid(
                "rooms.max_extent",
                "must not be smaller than rooms.min_extent".into(),
            ));
        }

        if self.mesh.atlas_tiles == 0 {
            return Err(invalid("mesh.atlas_tiles", "must be at least 1".into()));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
