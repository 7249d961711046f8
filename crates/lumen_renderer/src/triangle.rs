//! Triangle and tetrahedron primitives.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use lumen_math::{Interval, Ray, Vec3};

use crate::hittable::{Hittable, ShapeHit};

/// A triangle primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Vertices
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    /// Pre-computed face normal (unit length, counter-clockwise winding)
    normal: Vec3,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    ///
    /// Returns `None` for degenerate (zero-area) triangles.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Option<Self> {
        let normal = (v1 - v0).cross(v2 - v0).try_normalize()?;
        Some(Self { v0, v1, v2, normal })
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }
}

impl Hittable for Triangle {
    /// Möller-Trumbore ray-triangle intersection algorithm.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<ShapeHit> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction().cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if !ray_t.surrounds(t) {
            return None;
        }

        Some(ShapeHit {
            t,
            outward_normal: self.normal,
        })
    }
}

/// Regular tetrahedron inscribed in the cube `center ± radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tetrahedron {
    faces: [Triangle; 4],
}

impl Tetrahedron {
    /// Build the solid with outward-facing faces. Returns `None` when
    /// `radius` is not positive.
    pub fn new(center: Vec3, radius: f32) -> Option<Self> {
        if radius <= 0.0 || !radius.is_finite() {
            return None;
        }
        let a = center + radius * Vec3::new(1.0, 1.0, 1.0);
        let b = center + radius * Vec3::new(-1.0, -1.0, 1.0);
        let c = center + radius * Vec3::new(-1.0, 1.0, -1.0);
        let d = center + radius * Vec3::new(1.0, -1.0, -1.0);

        let face = |p: Vec3, q: Vec3, r: Vec3, opposite: Vec3| {
            let tri = Triangle::new(p, q, r)?;
            // Wind each face so its normal points away from the opposite vertex
            if tri.normal().dot(opposite - p) > 0.0 {
                Triangle::new(p, r, q)
            } else {
                Some(tri)
            }
        };

        Some(Self {
            faces: [
                face(a, b, c, d)?,
                face(a, b, d, c)?,
                face(a, c, d, b)?,
                face(b, c, d, a)?,
            ],
        })
    }

    pub fn faces(&self) -> &[Triangle; 4] {
        &self.faces
    }
}

impl Hittable for Tetrahedron {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<ShapeHit> {
        let mut closest = None;
        let mut closest_so_far = ray_t.max;
        for face in &self.faces {
            if let Some(hit) = face.hit(ray, ray_t.with_max(closest_so_far)) {
                closest_so_far = hit.t;
                closest = Some(hit);
            }
        }
        closest
    }

    fn hits(&self, ray: &Ray, ray_t: Interval, out: &mut Vec<ShapeHit>) {
        for face in &self.faces {
            face.hits(ray, ray_t, out);
        }
    }
}
