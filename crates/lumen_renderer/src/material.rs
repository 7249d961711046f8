//! Surface properties consulted by the integrator and the photon map.

use lumen_core::{Material, SurfaceKind};
use lumen_math::Color;

use crate::brdf::Brdf;

/// Shading data attached to every intersectable object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    /// Interaction model dispatched on by the light-path tree
    pub kind: SurfaceKind,
    /// Surface color; emitted radiance for lights
    pub color: Color,
    /// Reflectance model
    pub brdf: Brdf,
}

impl Surface {
    /// Create a surface with the reflectance model picked for `kind`.
    pub fn new(kind: SurfaceKind, color: Color) -> Self {
        Self::from_material(&Material {
            kind,
            color,
            ..Default::default()
        })
    }

    /// Convert a scene-description material.
    pub fn from_material(material: &Material) -> Self {
        Self {
            kind: material.kind,
            color: material.color,
            brdf: Brdf::for_material(material),
        }
    }

    /// Emitting surface with the given radiance.
    pub fn light(radiance: Color) -> Self {
        Self::from_material(&Material::light(radiance))
    }
}
