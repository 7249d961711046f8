//! Specular transport and sampling helpers shared by the light-path tree and
//! the photon tracer.

use std::f32::consts::PI;

use lumen_math::Vec3;

/// Refractive index outside every object.
pub const AIR_INDEX: f32 = 1.0;
/// Refractive index of transparent objects.
pub const GLASS_INDEX: f32 = 1.5;

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract unit vector `v` through a surface with normal `n` facing against it.
///
/// `eta` is n1 / n2. Returns `None` when no transmitted direction exists.
#[inline]
pub fn refract(v: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = -v.dot(n);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    Some((eta * v + (eta * cos_i - k.sqrt()) * n).normalize())
}

/// Incidence angle above which light leaving glass is totally reflected.
#[inline]
pub fn critical_angle() -> f32 {
    (AIR_INDEX / GLASS_INDEX).asin()
}

/// Angle between the normal and the reversed travel direction, in radians.
#[inline]
pub fn incidence_angle(direction: Vec3, normal: Vec3) -> f32 {
    (-direction).dot(normal).clamp(-1.0, 1.0).acos()
}

/// Schlick's approximation of the Fresnel reflection coefficient.
#[inline]
pub fn schlick(n1: f32, n2: f32, incidence_angle: f32) -> f32 {
    let r0 = ((n1 - n2) / (n1 + n2)).powi(2);
    r0 + (1.0 - r0) * (1.0 - incidence_angle.cos()).powi(5)
}

/// Outcome of a ray meeting a transparent boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DielectricSplit {
    /// Fraction of energy reflected
    pub reflection_coefficient: f32,
    /// Whether the ray was totally internally reflected
    pub total_internal_reflection: bool,
    /// Direction and energy fraction of the reflected branch, if spawned
    pub reflected: Option<(Vec3, f32)>,
    /// Direction and energy fraction of the refracted branch, if spawned
    pub refracted: Option<(Vec3, f32)>,
}

/// Split a ray at a glass boundary.
///
/// * `inside` - the ray travels inside the glass
/// * `internally_reflected` - the ray is itself the product of a reflection
///   inside the glass; a second total internal reflection ends the branch
///
/// Outside the medium both branches are spawned. Inside, only the refracted
/// branch leaves, or the reflected one on total internal reflection. The
/// energy of a partial reflection inside the glass is not followed.
pub fn split_at_dielectric(
    direction: Vec3,
    normal: Vec3,
    inside: bool,
    internally_reflected: bool,
) -> DielectricSplit {
    let angle = incidence_angle(direction, normal);
    let (n1, n2) = if inside {
        (GLASS_INDEX, AIR_INDEX)
    } else {
        (AIR_INDEX, GLASS_INDEX)
    };

    if inside && angle > critical_angle() {
        return DielectricSplit {
            reflection_coefficient: 1.0,
            total_internal_reflection: true,
            reflected: (!internally_reflected).then(|| (reflect(direction, normal), 1.0)),
            refracted: None,
        };
    }

    let r = schlick(n1, n2, angle);
    DielectricSplit {
        reflection_coefficient: r,
        total_internal_reflection: false,
        reflected: (!inside).then(|| (reflect(direction, normal), r)),
        refracted: refract(direction, normal, n1 / n2).map(|d| (d, 1.0 - r)),
    }
}

/// Orthonormal frame around a surface normal.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Frame {
    /// Build a frame whose tangent follows the projection of `incoming` onto
    /// the surface. Falls back to an arbitrary tangent at normal incidence.
    pub fn new(normal: Vec3, incoming: Vec3) -> Self {
        let projected = incoming - incoming.dot(normal) * normal;
        let tangent = if projected.length_squared() > 1e-8 {
            projected.normalize()
        } else {
            normal.any_orthonormal_vector()
        };
        Self {
            tangent,
            bitangent: normal.cross(tangent),
            normal,
        }
    }

    /// Transform local coordinates (z along the normal) into world space.
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        local.x * self.tangent + local.y * self.bitangent + local.z * self.normal
    }
}

/// Cosine-weighted direction in the hemisphere about `normal`.
///
/// `r1` and `r2` are independent uniform numbers in [0, 1).
pub fn cosine_hemisphere(normal: Vec3, incoming: Vec3, r1: f32, r2: f32) -> Vec3 {
    let frame = Frame::new(normal, incoming);
    let phi = 2.0 * PI * r1;
    let sin_theta = r2.sqrt();
    let cos_theta = (1.0 - r2).max(0.0).sqrt();
    frame
        .to_world(Vec3::new(
            sin_theta * phi.cos(),
            sin_theta * phi.sin(),
            cos_theta,
        ))
        .normalize()
}
