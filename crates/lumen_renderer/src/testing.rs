//! Small hand-built scenes shared by the unit tests.

use lumen_core::{AreaLight, Material, Scene, Shape};
use lumen_math::{Color, Vec3};

/// Large floor triangle at z = 0 under a 1x1 light at z = 2 facing down.
///
/// The origin lies well inside the triangle, away from any edge.
pub fn lit_floor(radiance: Color) -> Scene {
    let mut scene = Scene::new();
    scene.add_object(
        "floor",
        Shape::Triangle {
            v0: Vec3::new(-10.0, -10.0, 0.0),
            v1: Vec3::new(30.0, -10.0, 0.0),
            v2: Vec3::new(-10.0, 30.0, 0.0),
        },
        Material::diffuse(Vec3::splat(0.8)),
    );
    scene.add_light(AreaLight::ceiling_square(
        "key",
        Vec3::new(0.0, 0.0, 2.0),
        1.0,
        radiance,
    ));
    scene
}

/// `lit_floor` with an opaque ball hanging between the light and the floor.
pub fn lit_floor_with_blocker() -> Scene {
    let mut scene = lit_floor(Color::splat(5.0));
    scene.add_object(
        "blocker",
        Shape::Sphere {
            center: Vec3::new(0.0, 0.0, 1.0),
            radius: 0.3,
        },
        Material::diffuse(Vec3::splat(0.5)),
    );
    scene
}

/// A light hanging inside a closed diffuse sphere.
pub fn lit_sphere_room() -> Scene {
    let mut scene = Scene::new();
    scene.add_object(
        "shell",
        Shape::Sphere {
            center: Vec3::ZERO,
            radius: 3.0,
        },
        Material::diffuse(Vec3::splat(0.7)),
    );
    scene.add_light(AreaLight::ceiling_square(
        "key",
        Vec3::new(0.0, 0.0, 1.0),
        0.5,
        Vec3::splat(4.0),
    ));
    scene
}
