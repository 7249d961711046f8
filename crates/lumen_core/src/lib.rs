//! Lumen Core - scene description and render configuration.
//!
//! This crate provides:
//!
//! - **Scene description types**: `Scene`, `Object`, `Shape`, `Material`, `AreaLight`
//! - **Render configuration**: `RenderConfig` with JSON loading and validation
//!
//! The types here are renderer-agnostic; `lumen_renderer` turns them into
//! intersectable geometry.
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::{RenderConfig, Scene};
//!
//! let config = RenderConfig::load("render.json")?;
//! let scene = Scene::hexagon_room();
//! println!("{} objects, {} lights", scene.object_count(), scene.light_count());
//! ```

pub mod config;
pub mod scene;

// Re-export commonly used types
pub use config::{ConfigError, ConfigResult, RenderConfig};
pub use scene::{AreaLight, Material, Object, Scene, Shape, SurfaceKind};
