//! Sphere primitive for ray tracing.

use lumen_math::{Interval, Ray, Vec3};

use crate::hittable::{Hittable, ShapeHit};

/// A sphere primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
}

impl Sphere {
    /// Create a new sphere. Negative radii are clamped to zero.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    /// Both roots of the ray-sphere quadratic, nearest first.
    fn roots(&self, ray: &Ray) -> Option<(f32, f32)> {
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();
        Some(((h - sqrtd) / a, (h + sqrtd) / a))
    }

    fn shape_hit(&self, ray: &Ray, t: f32) -> ShapeHit {
        ShapeHit {
            t,
            outward_normal: (ray.at(t) - self.center) / self.radius,
        }
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<ShapeHit> {
        let (near, far) = self.roots(ray)?;

        // Find the nearest root in the acceptable range
        let root = if ray_t.surrounds(near) {
            near
        } else if ray_t.surrounds(far) {
            far
        } else {
            return None;
        };

        Some(self.shape_hit(ray, root))
    }

    fn hits(&self, ray: &Ray, ray_t: Interval, out: &mut Vec<ShapeHit>) {
        let Some((near, far)) = self.roots(ray) else {
            return;
        };
        for root in [near, far] {
            if ray_t.surrounds(root) {
                out.push(self.shape_hit(ray, root));
            }
        }
    }
}
