//! Scene description types for Lumen.
//!
//! This module describes *what* is in a scene independently of how it is
//! intersected. `lumen_renderer` converts a [`Scene`] into geometry.

use lumen_math::Vec3;

/// How a surface interacts with light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Rough or ideal diffuse reflector
    Diffuse,
    /// Perfect mirror
    Reflector,
    /// Refractive dielectric (glass)
    Transparent,
    /// Area light emitter
    Light,
}

/// Surface appearance of an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Interaction model
    pub kind: SurfaceKind,

    /// Surface color (RGB, 0-1); emitted radiance for lights
    pub color: Vec3,

    /// Fraction of light reflected by the diffuse model, 1 - albedo is absorbed
    pub albedo: f32,

    /// Oren-Nayar roughness (standard deviation of facet slopes); 0 selects ideal diffuse
    pub roughness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kind: SurfaceKind::Diffuse,
            color: Vec3::new(0.8, 0.8, 0.8),
            albedo: 0.9,
            roughness: 0.5,
        }
    }
}

impl Material {
    /// Create a rough diffuse material.
    pub fn diffuse(color: Vec3) -> Self {
        Self {
            kind: SurfaceKind::Diffuse,
            color,
            ..Default::default()
        }
    }

    /// Create a perfect mirror.
    pub fn reflector(color: Vec3) -> Self {
        Self {
            kind: SurfaceKind::Reflector,
            color,
            roughness: 0.0,
            ..Default::default()
        }
    }

    /// Create a glass-like refractive material.
    pub fn transparent(color: Vec3) -> Self {
        Self {
            kind: SurfaceKind::Transparent,
            color,
            roughness: 0.0,
            ..Default::default()
        }
    }

    /// Create an emitter with the given radiance.
    pub fn light(radiance: Vec3) -> Self {
        Self {
            kind: SurfaceKind::Light,
            color: radiance,
            albedo: 0.0,
            roughness: 0.0,
        }
    }

    /// Builder method to set roughness.
    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.max(0.0);
        self
    }

    /// Builder method to set albedo.
    pub fn with_albedo(mut self, albedo: f32) -> Self {
        self.albedo = albedo.clamp(0.0, 1.0);
        self
    }
}

/// Geometric primitive of an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Triangle { v0: Vec3, v1: Vec3, v2: Vec3 },
    Sphere { center: Vec3, radius: f32 },
    /// Regular tetrahedron whose vertices lie `radius * sqrt(3)` from `center`
    Tetrahedron { center: Vec3, radius: f32 },
}

/// A shape with a material.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub name: String,
    pub shape: Shape,
    pub material: Material,
}

/// A parallelogram light source emitting on the side of `edge_u x edge_v`.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaLight {
    pub name: String,
    pub corner: Vec3,
    pub edge_u: Vec3,
    pub edge_v: Vec3,
    /// Emitted radiance (constant over the surface)
    pub radiance: Vec3,
}

impl AreaLight {
    /// Axis-aligned square light facing down (-Z), centered at `center`.
    pub fn ceiling_square(
        name: impl Into<String>,
        center: Vec3,
        side: f32,
        radiance: Vec3,
    ) -> Self {
        let half = side * 0.5;
        Self {
            name: name.into(),
            corner: center - Vec3::new(half, half, 0.0),
            edge_u: Vec3::new(0.0, side, 0.0),
            edge_v: Vec3::new(side, 0.0, 0.0),
            radiance,
        }
    }

    /// Unit normal on the emitting side.
    pub fn normal(&self) -> Vec3 {
        self.edge_u.cross(self.edge_v).normalize_or_zero()
    }

    /// Surface area.
    pub fn area(&self) -> f32 {
        self.edge_u.cross(self.edge_v).length()
    }
}

/// A complete scene: objects plus the lights that illuminate them.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: Vec<Object>,
    lights: Vec<AreaLight>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object to the scene.
    pub fn add_object(&mut self, name: impl Into<String>, shape: Shape, material: Material) {
        self.objects.push(Object {
            name: name.into(),
            shape,
            material,
        });
    }

    /// Add an area light to the scene.
    pub fn add_light(&mut self, light: AreaLight) {
        self.lights.push(light);
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn lights(&self) -> &[AreaLight] {
        &self.lights
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// The closed hexagonal room used as the default render.
    ///
    /// Floor at z = -5, ceiling at z = 5, six walls (three red, three green),
    /// a square ceiling light and a handful of props of every surface kind.
    pub fn hexagon_room() -> Self {
        let mut scene = Scene::new();

        // Hexagon outline, counter-clockwise seen from above
        let outline = [
            Vec3::new(-3.0, 0.0, 0.0),
            Vec3::new(0.0, -6.0, 0.0),
            Vec3::new(10.0, -6.0, 0.0),
            Vec3::new(13.0, 0.0, 0.0),
            Vec3::new(10.0, 6.0, 0.0),
            Vec3::new(0.0, 6.0, 0.0),
        ];
        let floor_z = Vec3::new(0.0, 0.0, -5.0);
        let ceiling_z = Vec3::new(0.0, 0.0, 5.0);
        let center = Vec3::new(5.0, 0.0, 0.0);

        // Floor and ceiling as fans around the room center
        for i in 0..outline.len() {
            let a = outline[i];
            let b = outline[(i + 1) % outline.len()];
            scene.add_object(
                format!("floor_{i}"),
                Shape::Triangle {
                    v0: center + floor_z,
                    v1: a + floor_z,
                    v2: b + floor_z,
                },
                Material::diffuse(Vec3::new(0.8, 0.8, 0.8)),
            );
            scene.add_object(
                format!("ceiling_{i}"),
                Shape::Triangle {
                    v0: center + ceiling_z,
                    v1: b + ceiling_z,
                    v2: a + ceiling_z,
                },
                Material::diffuse(Vec3::new(1.0, 1.0, 1.0)),
            );
        }

        // Walls, two triangles each
        let wall_colors = [
            Vec3::new(1.0, 0.2, 0.2),
            Vec3::new(1.0, 0.2, 0.2),
            Vec3::new(1.0, 0.2, 0.2),
            Vec3::new(0.2, 1.0, 0.2),
            Vec3::new(0.2, 1.0, 0.2),
            Vec3::new(0.2, 1.0, 0.2),
        ];
        for i in 0..outline.len() {
            let a = outline[i];
            let b = outline[(i + 1) % outline.len()];
            let material = Material::diffuse(wall_colors[i]);
            scene.add_object(
                format!("wall_{i}_lower"),
                Shape::Triangle {
                    v0: a + floor_z,
                    v1: b + floor_z,
                    v2: b + ceiling_z,
                },
                material,
            );
            scene.add_object(
                format!("wall_{i}_upper"),
                Shape::Triangle {
                    v0: a + floor_z,
                    v1: b + ceiling_z,
                    v2: a + ceiling_z,
                },
                material,
            );
        }

        // Props
        scene.add_object(
            "glass_sphere",
            Shape::Sphere {
                center: Vec3::new(5.0, 2.0, -2.0),
                radius: 1.0,
            },
            Material::transparent(Vec3::ONE),
        );
        scene.add_object(
            "mirror_sphere",
            Shape::Sphere {
                center: Vec3::new(8.0, 0.0, -3.5),
                radius: 1.5,
            },
            Material::reflector(Vec3::ONE),
        );
        scene.add_object(
            "white_sphere",
            Shape::Sphere {
                center: Vec3::new(6.0, -3.5, -3.0),
                radius: 1.5,
            },
            Material::diffuse(Vec3::ONE),
        );
        scene.add_object(
            "tetrahedron",
            Shape::Tetrahedron {
                center: Vec3::new(3.0, -2.0, -1.0),
                radius: 0.8,
            },
            Material::diffuse(Vec3::new(0.0, 0.5, 0.94)),
        );

        // Slightly below the ceiling so the two never coincide
        scene.add_light(AreaLight::ceiling_square(
            "ceiling_light",
            Vec3::new(7.0, 0.0, 4.99),
            1.0,
            Vec3::splat(100.0),
        ));

        log::debug!(
            "Built hexagon room with {} objects and {} lights",
            scene.object_count(),
            scene.light_count()
        );

        scene
    }
}
