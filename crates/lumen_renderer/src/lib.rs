//! Lumen renderer - path tracing with a photon-mapped radiance cache
//!
//! Every camera sample builds a light-path tree: mirror, glass and diffuse
//! sub-rays expanded breadth-first up to a node cap and collapsed bottom-up.
//! Diffuse hits outside any shadow read their radiance from a photon map
//! traced once per scene; shadowed hits fall back to shadow rays and a
//! Russian-roulette bounce.

mod brdf;
mod camera;
mod geometry;
mod hittable;
mod light;
mod material;
mod optics;
mod path_tree;
mod photon_map;
mod renderer;
mod scene;
mod sphere;
mod triangle;

#[cfg(test)]
mod testing;

pub use brdf::Brdf;
pub use camera::Camera;
pub use geometry::{Geometry, SceneGeometry, SceneObject};
pub use hittable::{Hit, Hittable, Intersection, ShapeHit, T_MIN};
pub use light::QuadLight;
pub use material::Surface;
pub use optics::{
    cosine_hemisphere, critical_angle, reflect, refract, schlick, split_at_dielectric,
    DielectricSplit, AIR_INDEX, GLASS_INDEX,
};
pub use path_tree::{LightPathTree, NodeId, NodeState, PathNode, ROOT};
pub use photon_map::{PhotonMap, PhotonMapStats, PhotonNode, ShadowPhoton};
pub use renderer::{
    color_to_rgba, generate_row_batches, render, render_pixel, ImageBuffer, RenderOutput, RowBatch,
};
pub use scene::{SceneContext, SceneError, SceneResult};
pub use sphere::Sphere;
pub use triangle::{Tetrahedron, Triangle};

/// Re-export common math types from lumen_math
pub use lumen_math::{Color, Interval, Ray, Vec3};

use rand::{Rng, RngCore};

/// Uniform sample in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen()
}

/// Seed for an independent generator stream derived from a base seed.
///
/// SplitMix64 finalizer, so neighbouring streams get unrelated seeds.
pub fn stream_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed.wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
