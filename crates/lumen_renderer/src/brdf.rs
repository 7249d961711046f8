//! Reflectance models.
//!
//! Both variants are pure functions of the directions and the fixed model
//! parameters. Callers always receive a value clamped to [0, 1].

use std::f32::consts::PI;

use lumen_core::{Material, SurfaceKind};
use lumen_math::{Interval, Vec3};

/// Bidirectional reflectance distribution function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Brdf {
    /// Lambertian: albedo / pi in every direction
    IdealDiffuse { albedo: f32 },
    /// Oren-Nayar rough diffuse with precomputed A and B coefficients
    RoughDiffuse { albedo: f32, a: f32, b: f32 },
}

impl Brdf {
    /// Lambertian reflector.
    pub fn ideal_diffuse(albedo: f32) -> Self {
        Brdf::IdealDiffuse { albedo }
    }

    /// Oren-Nayar reflector; `roughness` is the standard deviation of the
    /// facet slope distribution.
    pub fn oren_nayar(albedo: f32, roughness: f32) -> Self {
        let sigma2 = roughness * roughness;
        Brdf::RoughDiffuse {
            albedo,
            a: 1.0 - 0.5 * (sigma2 / (sigma2 + 0.33)),
            b: 0.45 * (sigma2 / (sigma2 + 0.09)),
        }
    }

    /// Pick the model for a material: rough diffuse for DIFFUSE surfaces
    /// with non-zero roughness, ideal diffuse otherwise.
    pub fn for_material(material: &Material) -> Self {
        match material.kind {
            SurfaceKind::Diffuse if material.roughness > 0.0 => {
                Self::oren_nayar(material.albedo, material.roughness)
            }
            _ => Self::ideal_diffuse(material.albedo),
        }
    }

    /// Reflectance between `incoming` and `outgoing` about `normal`.
    ///
    /// All three vectors are unit length and point away from the surface.
    pub fn evaluate(&self, incoming: Vec3, outgoing: Vec3, normal: Vec3) -> f32 {
        let value = match *self {
            Brdf::IdealDiffuse { albedo } => albedo / PI,
            Brdf::RoughDiffuse { albedo, a, b } => {
                oren_nayar(albedo, a, b, incoming, outgoing, normal)
            }
        };
        if value.is_finite() {
            Interval::UNIT.clamp(value)
        } else {
            0.0
        }
    }
}

fn oren_nayar(albedo: f32, a: f32, b: f32, incoming: Vec3, outgoing: Vec3, normal: Vec3) -> f32 {
    // Round-off can push the cosines just outside acos' domain
    let cos_in = incoming.dot(normal).clamp(-1.0, 1.0);
    let cos_out = outgoing.dot(normal).clamp(-1.0, 1.0);
    let theta_in = cos_in.acos();
    let theta_out = cos_out.acos();
    let alpha = theta_in.max(theta_out);
    let beta = theta_in.min(theta_out);

    let cos_phi = azimuthal_cosine(incoming, outgoing, normal);

    albedo / PI * (a + b * cos_phi.max(0.0) * alpha.sin() * beta.tan())
}

/// Cosine of the azimuth between two directions projected onto the tangent plane.
fn azimuthal_cosine(incoming: Vec3, outgoing: Vec3, normal: Vec3) -> f32 {
    let tangent_in = incoming - incoming.dot(normal) * normal;
    let tangent_out = outgoing - outgoing.dot(normal) * normal;
    let len_in = tangent_in.length();
    let len_out = tangent_out.length();
    if len_in < 1e-6 || len_out < 1e-6 {
        return 0.0;
    }
    (tangent_in.dot(tangent_out) / (len_in * len_out)).clamp(-1.0, 1.0)
}
