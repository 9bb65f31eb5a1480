use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SimError};

/// Tuning knobs for a scene. Every field has a default, so a config file
/// only needs to mention what it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Edge length of one tile grid bucket, in world units.
    pub tile_size: f64,
    /// Largest frame delta callers should feed to `Scene::tick`.
    /// The scene itself never clamps.
    pub max_frame_dt: f64,
    pub bullet: BulletConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletConfig {
    pub mass: f64,
    pub half_extent: f64,
    /// Share of the shooter's sideways velocity the bullet keeps.
    pub velocity_inherit: f64,
    /// Impulse magnitude pushed onto whatever the bullet hits.
    pub knockback: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tile_size: 32.0,
            max_frame_dt: 0.05,
            bullet: BulletConfig::default(),
        }
    }
}

impl Default for BulletConfig {
    fn default() -> Self {
        Self {
            mass: 0.1,
            half_extent: 4.0,
            velocity_inherit: 0.5,
            knockback: 0.0,
        }
    }
}

impl SimConfig {
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "loading simulation config");
        Self::from_ron_str(&source)
    }

    pub fn clamp_dt(&self, dt: f64) -> f64 {
        dt.clamp(0.0, self.max_frame_dt)
    }

    /// Rejects values the scene cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(SimError::Configuration(format!(
                "tile_size must be positive, got {}",
                self.tile_size
            )));
        }

        if !(self.bullet.mass.is_finite() && self.bullet.mass > 0.0) {
            return Err(SimError::Configuration(format!(
                "bullet mass must be positive, got {}",
                self.bullet.mass
            )));
        }

        if !(self.bullet.half_extent.is_finite() && self.bullet.half_extent > 0.0) {
            return Err(SimError::Configuration(format!(
                "bullet half_extent must be positive, got {}",
                self.bullet.half_extent
            )));
        }

        Ok(())
    }
}
