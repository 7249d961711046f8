//! Hittable trait and intersection records.

use lumen_math::{Interval, Ray, Vec3};

use crate::material::Surface;

/// Smallest accepted ray parameter; avoids re-hitting the surface a ray
/// starts on.
pub const T_MIN: f32 = 1e-3;

/// Raw shape intersection before the face normal is resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit {
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Unit normal pointing out of the shape
    pub outward_normal: Vec3,
}

/// Record of a ray-object intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Point of intersection
    pub point: Vec3,
    /// Surface normal at intersection (always points against ray)
    pub normal: Vec3,
    /// Distance along the ray
    pub t: f32,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
}

impl Intersection {
    /// Resolve a shape hit against the ray that produced it.
    pub fn new(ray: &Ray, hit: ShapeHit) -> Self {
        let mut intersection = Self {
            point: ray.at(hit.t),
            normal: hit.outward_normal,
            t: hit.t,
            front_face: true,
        };
        intersection.set_face_normal(ray, hit.outward_normal);
        intersection
    }

    /// Set the face normal based on ray direction and outward normal.
    ///
    /// The normal is always stored pointing against the ray direction,
    /// so we need to track whether we hit the front or back face.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        self.front_face = ray.direction().dot(outward_normal) < 0.0;
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

/// An intersection together with the surface that was hit.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub intersection: Intersection,
    pub surface: &'a Surface,
}

/// Trait for shapes that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Nearest intersection with `t` strictly inside `ray_t`.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<ShapeHit>;

    /// Append every intersection inside `ray_t`, in any order.
    ///
    /// Shapes that can be entered and left along one ray override this.
    fn hits(&self, ray: &Ray, ray_t: Interval, out: &mut Vec<ShapeHit>) {
        if let Some(hit) = self.hit(ray, ray_t) {
            out.push(hit);
        }
    }
}
