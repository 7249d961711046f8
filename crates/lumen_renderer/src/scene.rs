//! Scene assembly: geometry, photon map, and settings shared by every
//! light-path tree.

use lumen_core::{ConfigError, RenderConfig, Scene};
use lumen_math::{Color, Ray, Vec3};
use rand::RngCore;
use thiserror::Error;

use crate::geometry::{Geometry, SceneGeometry};
use crate::hittable::Hit;
use crate::path_tree::LightPathTree;
use crate::photon_map::PhotonMap;

/// Errors that can occur while assembling a scene for rendering.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("invalid render configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("scene has no lights")]
    NoLights,

    #[error("degenerate shape: {0}")]
    DegenerateShape(String),
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Read-only state consulted while tracing.
///
/// Built once, then shared by reference with every rendering thread.
pub struct SceneContext {
    geometry: Box<dyn Geometry>,
    photon_map: Option<PhotonMap>,
    config: RenderConfig,
}

impl SceneContext {
    /// Build geometry and, when enabled, the photon map.
    pub fn build(scene: &Scene, config: &RenderConfig) -> SceneResult<Self> {
        config.validate()?;

        let geometry = SceneGeometry::from_scene(scene)?;
        if geometry.lights().is_empty() {
            return Err(SceneError::NoLights);
        }

        log::info!(
            "Assembled scene: {} objects, {} lights",
            scene.object_count(),
            scene.light_count()
        );

        let photon_map = config
            .use_photon_mapping
            .then(|| PhotonMap::build(&geometry, config));

        Ok(Self::new(Box::new(geometry), photon_map, config.clone()))
    }

    /// Assemble from parts that are already built.
    pub fn new(
        geometry: Box<dyn Geometry>,
        photon_map: Option<PhotonMap>,
        config: RenderConfig,
    ) -> Self {
        Self {
            geometry,
            photon_map,
            config,
        }
    }

    pub fn geometry(&self) -> &dyn Geometry {
        self.geometry.as_ref()
    }

    pub fn photon_map(&self) -> Option<&PhotonMap> {
        self.photon_map.as_ref()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Build the light-path tree for a camera ray.
    pub fn trace(&self, ray: &Ray, rng: &mut dyn RngCore) -> LightPathTree {
        let mut tree = LightPathTree::new(*ray, self.config.max_tree_nodes);
        tree.construct(self, rng);
        tree
    }

    /// Radiance arriving along a camera ray.
    pub fn evaluate(&self, ray: &Ray, rng: &mut dyn RngCore) -> Color {
        self.trace(ray, rng).evaluate()
    }

    /// Direct light reaching a diffuse hit, estimated with shadow rays.
    ///
    /// Each light gets `shadow_rays_per_intersection` uniform samples.
    pub fn direct_light(&self, hit: &Hit<'_>, outgoing: Vec3, rng: &mut dyn RngCore) -> Color {
        let samples = self.config.shadow_rays_per_intersection.max(1);
        let point = hit.intersection.point;
        let normal = hit.intersection.normal;
        let brdf = &hit.surface.brdf;

        let mut total = Color::ZERO;
        for light in self.geometry.lights() {
            let mut sum = Color::ZERO;
            for _ in 0..samples {
                let target = light.sample_point(rng);
                let offset = target - point;
                let distance_squared = offset.length_squared();
                if distance_squared <= f32::EPSILON {
                    continue;
                }
                let towards = offset / distance_squared.sqrt();
                let cos_surface = towards.dot(normal);
                let cos_light = -towards.dot(light.normal());
                if cos_surface <= 0.0 || cos_light <= 0.0 {
                    continue;
                }
                if !self.geometry.visible(point, target, normal) {
                    continue;
                }
                sum += brdf.evaluate(towards, outgoing, normal)
                    * light.radiance()
                    * (cos_surface * cos_light * light.area() / distance_squared);
            }
            total += sum / samples as f32;
        }

        total * hit.surface.color
    }
}
