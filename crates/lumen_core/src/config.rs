//! Render configuration.
//!
//! Every option the integrator, photon map and render loop read lives in
//! [`RenderConfig`]. A JSON file only needs to name the fields it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Camera samples per pixel
    pub samples_per_pixel: u32,
    /// Russian-roulette termination probability at diffuse surfaces, in (0, 1)
    pub termination_probability: f32,
    /// Light samples per direct-light estimate
    pub shadow_rays_per_intersection: u32,
    /// Build and consult the photon map
    pub use_photon_mapping: bool,
    /// Total number of photons emitted from the lights
    pub photon_count: usize,
    /// Number of photon emission shares, `None` uses the rayon thread count
    pub photon_workers: Option<usize>,
    /// Radius of the photon and shadow-photon gather disk
    pub photon_search_radius: f32,
    /// Maximum number of nodes in one light-path tree
    pub max_tree_nodes: usize,
    /// A branch is dropped once every channel of its importance falls below this
    pub importance_epsilon: f32,
    /// Image rows rendered between join barriers
    pub rows_per_batch: u32,
    /// Base seed for every per-thread random generator
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            samples_per_pixel: 100,
            termination_probability: 0.2,
            shadow_rays_per_intersection: 1,
            use_photon_mapping: true,
            photon_count: 500_000,
            photon_workers: None,
            photon_search_radius: 0.2,
            max_tree_nodes: 512,
            importance_epsilon: 1e-4,
            rows_per_batch: 16,
            seed: 0x5EED,
        }
    }
}

impl RenderConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: RenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk and validate it.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded render config from {}", path.display());
        Ok(config)
    }

    /// Check that every option is inside its legal range.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(out_of_range(
                "resolution",
                "non-zero",
                format!("{}x{}", self.width, self.height),
            ));
        }
        if self.samples_per_pixel == 0 {
            return Err(out_of_range("samples_per_pixel", ">= 1", self.samples_per_pixel));
        }
        if !(self.termination_probability > 0.0 && self.termination_probability < 1.0) {
            return Err(out_of_range(
                "termination_probability",
                "in (0, 1)",
                self.termination_probability,
            ));
        }
        if self.shadow_rays_per_intersection == 0 {
            return Err(out_of_range(
                "shadow_rays_per_intersection",
                ">= 1",
                self.shadow_rays_per_intersection,
            ));
        }
        if !(self.photon_search_radius > 0.0 && self.photon_search_radius.is_finite()) {
            return Err(out_of_range(
                "photon_search_radius",
                "a positive finite number",
                self.photon_search_radius,
            ));
        }
        if self.photon_workers == Some(0) {
            return Err(out_of_range("photon_workers", ">= 1 or null", 0));
        }
        if self.max_tree_nodes == 0 {
            return Err(out_of_range("max_tree_nodes", ">= 1", self.max_tree_nodes));
        }
        if !(self.importance_epsilon >= 0.0) {
            return Err(out_of_range(
                "importance_epsilon",
                "non-negative",
                self.importance_epsilon,
            ));
        }
        if self.rows_per_batch == 0 {
            return Err(out_of_range("rows_per_batch", ">= 1", self.rows_per_batch));
        }
        Ok(())
    }

    /// Probability that a path survives Russian roulette.
    #[inline]
    pub fn survival_probability(&self) -> f32 {
        1.0 - self.termination_probability
    }
}

fn out_of_range(
    field: &'static str,
    expected: &'static str,
    value: impl ToString,
) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        expected,
        value: value.to_string(),
    }
}
