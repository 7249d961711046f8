//! Ray-vs-scene queries consumed by the light-path tree and the photon map.

use lumen_core::{Scene, Shape, SurfaceKind};
use lumen_math::{Interval, Ray, Vec3};

use crate::hittable::{Hit, Hittable, Intersection, ShapeHit, T_MIN};
use crate::light::QuadLight;
use crate::material::Surface;
use crate::scene::{SceneError, SceneResult};
use crate::sphere::Sphere;
use crate::triangle::{Tetrahedron, Triangle};

/// Intersection and visibility queries over a whole scene.
pub trait Geometry: Send + Sync {
    /// Nearest hit with `t > T_MIN`. The normal faces against the ray.
    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>>;

    /// Every hit with `t > T_MIN`, ordered by distance.
    fn intersect_all(&self, ray: &Ray) -> Vec<Hit<'_>>;

    /// Whether `to` can be seen from `from`, a point on a surface with
    /// `normal`. Points behind the surface are never visible; transparent
    /// objects and lights do not occlude.
    fn visible(&self, from: Vec3, to: Vec3, normal: Vec3) -> bool;

    /// Area lights, also returned by the intersection queries.
    fn lights(&self) -> &[QuadLight];
}

/// A named shape and its surface.
pub struct SceneObject {
    pub name: String,
    pub shape: Box<dyn Hittable>,
    pub surface: Surface,
}

impl SceneObject {
    fn occludes(&self) -> bool {
        !matches!(self.surface.kind, SurfaceKind::Transparent | SurfaceKind::Light)
    }
}

/// Flat list of objects and lights, tested exhaustively.
#[derive(Default)]
pub struct SceneGeometry {
    objects: Vec<SceneObject>,
    lights: Vec<QuadLight>,
}

impl SceneGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build intersectable geometry from a scene description.
    pub fn from_scene(scene: &Scene) -> SceneResult<Self> {
        let mut geometry = Self::new();

        for object in scene.objects() {
            let degenerate = || SceneError::DegenerateShape(object.name.clone());
            let shape: Box<dyn Hittable> = match object.shape {
                Shape::Triangle { v0, v1, v2 } => {
                    Box::new(Triangle::new(v0, v1, v2).ok_or_else(degenerate)?)
                }
                Shape::Sphere { center, radius } => {
                    if radius <= 0.0 || !radius.is_finite() {
                        return Err(degenerate());
                    }
                    Box::new(Sphere::new(center, radius))
                }
                Shape::Tetrahedron { center, radius } => {
                    Box::new(Tetrahedron::new(center, radius).ok_or_else(degenerate)?)
                }
            };
            geometry.add(object.name.clone(), shape, Surface::from_material(&object.material));
        }

        for light in scene.lights() {
            let quad = QuadLight::from_area_light(light)
                .ok_or_else(|| SceneError::DegenerateShape(light.name.clone()))?;
            geometry.add_light(quad);
        }

        log::debug!(
            "Scene geometry: {} objects, {} lights",
            geometry.objects.len(),
            geometry.lights.len()
        );

        Ok(geometry)
    }

    /// Add an object to the list.
    pub fn add(&mut self, name: impl Into<String>, shape: Box<dyn Hittable>, surface: Surface) {
        self.objects.push(SceneObject {
            name: name.into(),
            shape,
            surface,
        });
    }

    pub fn add_light(&mut self, light: QuadLight) {
        self.lights.push(light);
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Every shape with its surface, lights included.
    fn entries(&self) -> impl Iterator<Item = (&dyn Hittable, &Surface)> + '_ {
        self.objects
            .iter()
            .map(|o| (o.shape.as_ref() as &dyn Hittable, &o.surface))
            .chain(self.lights.iter().map(|l| (l as &dyn Hittable, l.surface())))
    }
}

impl Geometry for SceneGeometry {
    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        let mut closest: Option<(ShapeHit, &Surface)> = None;
        let mut closest_so_far = f32::INFINITY;

        for (shape, surface) in self.entries() {
            if let Some(hit) = shape.hit(ray, Interval::new(T_MIN, closest_so_far)) {
                closest_so_far = hit.t;
                closest = Some((hit, surface));
            }
        }

        closest.map(|(hit, surface)| Hit {
            intersection: Intersection::new(ray, hit),
            surface,
        })
    }

    fn intersect_all(&self, ray: &Ray) -> Vec<Hit<'_>> {
        let forward = Interval::new(T_MIN, f32::INFINITY);
        let mut hits = Vec::new();
        let mut scratch = Vec::new();

        for (shape, surface) in self.entries() {
            scratch.clear();
            shape.hits(ray, forward, &mut scratch);
            hits.extend(scratch.iter().map(|&hit| Hit {
                intersection: Intersection::new(ray, hit),
                surface,
            }));
        }

        hits.sort_by(|a, b| a.intersection.t.total_cmp(&b.intersection.t));
        hits
    }

    fn visible(&self, from: Vec3, to: Vec3, normal: Vec3) -> bool {
        let offset = to - from;
        let distance = offset.length();
        if distance <= 2.0 * T_MIN || offset.dot(normal) <= 0.0 {
            return false;
        }

        let ray = Ray::new(from, offset);
        let segment = Interval::new(T_MIN, distance - T_MIN);
        !self
            .objects
            .iter()
            .filter(|o| o.occludes())
            .any(|o| o.shape.hit(&ray, segment).is_some())
    }

    fn lights(&self) -> &[QuadLight] {
        &self.lights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{AreaLight, Material};

    fn box_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add_object(
            "floor",
            Shape::Sphere {
                center: Vec3::new(0.0, 0.0, -101.0),
                radius: 100.0,
            },
            Material::diffuse(Vec3::splat(0.8)),
        );
        scene.add_object(
            "blocker",
            Shape::Sphere {
                center: Vec3::new(3.0, 0.0, 0.0),
                radius: 0.5,
            },
            Material::diffuse(Vec3::splat(0.5)),
        );
        scene.add_object(
            "glass",
            Shape::Sphere {
                center: Vec3::new(-3.0, 0.0, 0.0),
                radius: 0.5,
            },
            Material::transparent(Vec3::ONE),
        );
        scene.add_light(AreaLight::ceiling_square(
            "key",
            Vec3::new(0.0, 0.0, 4.0),
            1.0,
            Vec3::splat(5.0),
        ));
        scene
    }

    #[test]
    fn test_from_scene_counts() {
        let geometry = SceneGeometry::from_scene(&box_scene()).unwrap();
        assert_eq!(geometry.objects().len(), 3);
        assert_eq!(geometry.lights().len(), 1);
    }

    #[test]
    fn test_from_scene_rejects_degenerate_triangle() {
        let mut scene = Scene::new();
        scene.add_object(
            "sliver",
            Shape::Triangle {
                v0: Vec3::ZERO,
                v1: Vec3::X,
                v2: Vec3::X * 2.0,
            },
            Material::default(),
        );
        let err = SceneGeometry::from_scene(&scene).err().unwrap();
        assert!(matches!(err, SceneError::DegenerateShape(name) if name == "sliver"));
    }

    #[test]
    fn test_intersect_finds_nearest_and_light() {
        let geometry = SceneGeometry::from_scene(&box_scene()).unwrap();

        let down = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hit = geometry.intersect(&down).unwrap();
        assert!((hit.intersection.t - 1.0).abs() < 1e-3);
        assert_eq!(hit.surface.kind, SurfaceKind::Diffuse);
        assert!(hit.intersection.normal.dot(down.direction()) < 0.0);

        let up = Ray::new(Vec3::ZERO, Vec3::Z);
        let hit = geometry.intersect(&up).unwrap();
        assert_eq!(hit.surface.kind, SurfaceKind::Light);
        assert!((hit.intersection.t - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_intersect_all_is_sorted() {
        let geometry = SceneGeometry::from_scene(&box_scene()).unwrap();
        let ray = Ray::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::X);
        let hits = geometry.intersect_all(&ray);
        assert_eq!(hits.len(), 4);
        assert!(hits.windows(2).all(|w| w[0].intersection.t <= w[1].intersection.t));
        assert_eq!(hits[0].surface.kind, SurfaceKind::Transparent);
        assert_eq!(hits[2].surface.kind, SurfaceKind::Diffuse);
    }

    #[test]
    fn test_visibility() {
        let geometry = SceneGeometry::from_scene(&box_scene()).unwrap();
        let origin = Vec3::ZERO;

        assert!(geometry.visible(origin, Vec3::new(0.0, 0.0, 4.0), Vec3::Z));
        // Behind the surface
        assert!(!geometry.visible(origin, Vec3::new(0.0, 0.0, 4.0), Vec3::NEG_Z));
        // Opaque sphere in the way
        assert!(!geometry.visible(origin, Vec3::new(6.0, 0.0, 0.0), Vec3::X));
        // Glass does not occlude
        assert!(geometry.visible(origin, Vec3::new(-6.0, 0.0, 0.0), Vec3::NEG_X));
    }
}
