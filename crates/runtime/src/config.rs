//! Session configuration.
//!
//! Every field has a default, so a JSON file only needs the values it changes.

use std::path::{Path, PathBuf};

use glam::Vec3;
use hair_physics::SolverConfig;
use hair_render::{Light, RenderConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} = {value} is out of range: {reason}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// Where the camera starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 1.5, 0.0),
            distance: 0.9,
            yaw: 0.6,
            pitch: 0.2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fixed physics timestep in seconds.
    pub dt: f32,
    /// Upper bound on physics steps run for one host frame.
    pub max_steps_per_frame: u32,
    /// Unsimulated time kept after a frame, in seconds. The rest is dropped.
    pub max_time_debt: f64,
    pub gravity: Vec3,
    pub wind: Vec3,
    /// Multiplier on every strand's rest length.
    pub length_scale: f32,
    pub solver: SolverConfig,
    pub render: RenderConfig,
    pub lights: Vec<Light>,
    pub camera: CameraConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            max_steps_per_frame: 4,
            max_time_debt: 0.1,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            wind: Vec3::ZERO,
            length_scale: 1.0,
            solver: SolverConfig::default(),
            render: RenderConfig::default(),
            lights: Light::studio(),
            camera: CameraConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or holds
    /// values [`Self::validate`] rejects.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "session config loaded");
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for the first unusable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(out_of_range("dt", f64::from(self.dt), "expected a finite value > 0"));
        }
        if self.max_steps_per_frame == 0 {
            return Err(out_of_range("max_steps_per_frame", 0.0, "expected at least 1"));
        }
        if !self.max_time_debt.is_finite() || self.max_time_debt < 0.0 {
            return Err(out_of_range(
                "max_time_debt",
                self.max_time_debt,
                "expected a finite value >= 0",
            ));
        }
        if !self.length_scale.is_finite() || self.length_scale <= 0.0 {
            return Err(out_of_range(
                "length_scale",
                f64::from(self.length_scale),
                "expected a finite value > 0",
            ));
        }
        Ok(())
    }
}

fn out_of_range(field: &'static str, value: f64, reason: &'static str) -> ConfigError {
    ConfigError::OutOfRange { field, value, reason }
}
