//! Parallelogram area lights.

use std::f32::consts::PI;

use lumen_core::AreaLight;
use lumen_math::{Color, Interval, Ray, Vec3};
use rand::RngCore;

use crate::gen_f32;
use crate::hittable::{Hittable, ShapeHit};
use crate::material::Surface;
use crate::optics::cosine_hemisphere;

/// An emitting parallelogram `corner + a * edge_u + b * edge_v`, `a, b ∈ [0, 1]`.
///
/// Emits on the side of `edge_u × edge_v`.
#[derive(Debug, Clone)]
pub struct QuadLight {
    name: String,
    corner: Vec3,
    edge_u: Vec3,
    edge_v: Vec3,
    normal: Vec3,
    /// Plane offset, `normal · corner`
    d: f32,
    /// Scaled normal used to project hit points onto the edge basis
    w: Vec3,
    area: f32,
    surface: Surface,
}

impl QuadLight {
    /// Returns `None` if the edges are parallel or zero.
    pub fn new(
        name: impl Into<String>,
        corner: Vec3,
        edge_u: Vec3,
        edge_v: Vec3,
        radiance: Color,
    ) -> Option<Self> {
        let n = edge_u.cross(edge_v);
        let area = n.length();
        if area <= f32::EPSILON || !area.is_finite() {
            return None;
        }
        let normal = n / area;
        Some(Self {
            name: name.into(),
            corner,
            edge_u,
            edge_v,
            normal,
            d: normal.dot(corner),
            w: n / n.length_squared(),
            area,
            surface: Surface::light(radiance),
        })
    }

    pub fn from_area_light(light: &AreaLight) -> Option<Self> {
        Self::new(
            light.name.clone(),
            light.corner,
            light.edge_u,
            light.edge_v,
            light.radiance,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit normal on the emitting side.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn area(&self) -> f32 {
        self.area
    }

    /// Emitted radiance, constant over the surface.
    pub fn radiance(&self) -> Color {
        self.surface.color
    }

    /// Total emitted power of a Lambertian emitter: radiance × area × π.
    pub fn power(&self) -> Color {
        self.radiance() * self.area * PI
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Uniformly distributed point on the light.
    pub fn sample_point(&self, rng: &mut dyn RngCore) -> Vec3 {
        self.corner + gen_f32(rng) * self.edge_u + gen_f32(rng) * self.edge_v
    }

    /// Photon emission ray: uniform origin, cosine-weighted direction about
    /// the emitting normal.
    pub fn sample_emission(&self, rng: &mut dyn RngCore) -> Ray {
        let origin = self.sample_point(rng);
        let direction = cosine_hemisphere(self.normal, self.edge_u, gen_f32(rng), gen_f32(rng));
        Ray::new(origin, direction)
    }
}

impl Hittable for QuadLight {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<ShapeHit> {
        let denom = self.normal.dot(ray.direction());

        // Ray is parallel to the plane
        if denom.abs() < 1e-8 {
            return None;
        }

        let t = (self.d - self.normal.dot(ray.origin())) / denom;
        if !ray_t.surrounds(t) {
            return None;
        }

        // Planar coordinates of the hit point in the edge basis
        let planar = ray.at(t) - self.corner;
        let alpha = self.w.dot(planar.cross(self.edge_v));
        let beta = self.w.dot(self.edge_u.cross(planar));
        if !Interval::UNIT.contains(alpha) || !Interval::UNIT.contains(beta) {
            return None;
        }

        Some(ShapeHit {
            t,
            outward_normal: self.normal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hittable::T_MIN;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ceiling() -> QuadLight {
        QuadLight::from_area_light(&AreaLight::ceiling_square(
            "key",
            Vec3::new(0.0, 0.0, 2.0),
            1.0,
            Vec3::splat(10.0),
        ))
        .unwrap()
    }

    #[test]
    fn test_power_and_area() {
        let light = ceiling();
        assert!((light.area() - 1.0).abs() < 1e-6);
        assert!((light.power() - Vec3::splat(10.0 * PI)).length() < 1e-4);
        assert!((light.normal() - Vec3::NEG_Z).length() < 1e-6);
        assert_eq!(light.name(), "key");
    }

    #[test]
    fn test_quad_hit_and_miss() {
        let light = ceiling();
        let forward = Interval::new(T_MIN, f32::INFINITY);

        let up = Ray::new(Vec3::new(0.2, -0.3, 0.0), Vec3::Z);
        let hit = light.hit(&up, forward).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-5);

        let outside = Ray::new(Vec3::new(0.8, 0.0, 0.0), Vec3::Z);
        assert!(light.hit(&outside, forward).is_none());
    }

    #[test]
    fn test_samples_stay_on_light_and_emit_forward() {
        let light = ceiling();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let ray = light.sample_emission(&mut rng);
            let p = ray.origin();
            assert!((p.z - 2.0).abs() < 1e-5);
            assert!(p.x.abs() <= 0.5 + 1e-5 && p.y.abs() <= 0.5 + 1e-5);
            assert!(ray.direction().dot(light.normal()) >= -1e-6);
        }
    }

    #[test]
    fn test_degenerate_light() {
        assert!(QuadLight::new("flat", Vec3::ZERO, Vec3::X, Vec3::X, Vec3::ONE).is_none());
    }
}
