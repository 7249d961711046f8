//! Photon map: parallel photon emission, kd-tree storage, and the density
//! queries used by diffuse light-path nodes.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::time::Instant;

use kd_tree::{KdPoint, KdTree};
use lumen_core::{RenderConfig, SurfaceKind};
use lumen_math::{is_negligible, Color, Ray, Vec3};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::geometry::Geometry;
use crate::hittable::{Hit, Intersection, T_MIN};
use crate::light::QuadLight;
use crate::material::Surface;
use crate::optics::{cosine_hemisphere, reflect, split_at_dielectric};
use crate::{gen_f32, stream_seed};

/// Energy deposited on a diffuse surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotonNode {
    pub position: Vec3,
    pub flux: Color,
    /// Travel direction of the photon when it landed
    pub direction: Vec3,
}

impl KdPoint for PhotonNode {
    type Scalar = f32;
    type Dim = typenum::U3;
    fn at(&self, k: usize) -> f32 {
        self.position[k]
    }
}

/// A point reached by light only after passing through something else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowPhoton {
    pub position: Vec3,
}

impl KdPoint for ShadowPhoton {
    type Scalar = f32;
    type Dim = typenum::U3;
    fn at(&self, k: usize) -> f32 {
        self.position[k]
    }
}

/// Query point for radius searches.
struct SearchPoint(Vec3);

impl KdPoint for SearchPoint {
    type Scalar = f32;
    type Dim = typenum::U3;
    fn at(&self, k: usize) -> f32 {
        self.0[k]
    }
}

/// Counts reported after a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhotonMapStats {
    /// Photons emitted from the lights
    pub emitted: usize,
    /// Photon nodes stored on diffuse surfaces
    pub photons: usize,
    /// Shadow markers stored
    pub shadow_photons: usize,
}

/// Immutable photon and shadow-marker storage.
///
/// Built once per scene; every query takes `&self` and is safe to call from
/// any number of rendering threads.
pub struct PhotonMap {
    photons: KdTree<PhotonNode>,
    shadows: KdTree<ShadowPhoton>,
    radius: f32,
    stats: PhotonMapStats,
}

impl std::fmt::Debug for PhotonMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotonMap")
            .field("radius", &self.radius)
            .field("stats", &self.stats)
            .finish()
    }
}

impl PhotonMap {
    /// Emit `config.photon_count` photons from the lights of `geometry`.
    ///
    /// Emission is split into shares traced in parallel; each share has its
    /// own generator and buffer, merged after the join.
    pub fn build(geometry: &dyn Geometry, config: &RenderConfig) -> Self {
        let start = Instant::now();
        let lights = geometry.lights();
        let total = config.photon_count;

        if lights.is_empty() || total == 0 {
            log::warn!("Photon map is empty: {} lights, {} photons requested", lights.len(), total);
            return Self::from_parts(Vec::new(), Vec::new(), config.photon_search_radius);
        }

        let workers = config
            .photon_workers
            .unwrap_or_else(rayon::current_num_threads)
            .max(1);
        let base = total / workers;
        let extra = total % workers;
        let flux_scale = lights.len() as f32 / total as f32;
        for light in lights {
            log::debug!(
                "Light '{}': {:.3} power, {:.3} per photon",
                light.name(),
                light.power().max_element(),
                light.power().max_element() * flux_scale
            );
        }

        let buffers: Vec<PhotonBuffer> = (0..workers)
            .into_par_iter()
            .map(|share| {
                let count = base + usize::from(share < extra);
                let first = share * base + share.min(extra);
                let mut rng = StdRng::seed_from_u64(stream_seed(config.seed, share as u64));
                let mut tracer = PhotonTracer::new(geometry, config);

                for k in first..first + count {
                    let light = &lights[k % lights.len()];
                    tracer.emit(light, light.power() * flux_scale, &mut rng);
                }

                log::debug!(
                    "Photon share {}: {} emitted, {} stored, {} shadow markers",
                    share,
                    count,
                    tracer.buffer.photons.len(),
                    tracer.buffer.shadows.len()
                );
                tracer.buffer
            })
            .collect();

        let mut merged = PhotonBuffer::default();
        for buffer in buffers {
            merged.photons.extend(buffer.photons);
            merged.shadows.extend(buffer.shadows);
        }

        let mut map = Self::from_parts(merged.photons, merged.shadows, config.photon_search_radius);
        map.stats.emitted = total;

        log::info!(
            "Photon map built in {:.2?}: {} emitted, {} stored, {} shadow markers, radius {}",
            start.elapsed(),
            map.stats.emitted,
            map.stats.photons,
            map.stats.shadow_photons,
            map.radius()
        );

        map
    }

    /// Bulk-load a map from already traced photons.
    pub fn from_parts(photons: Vec<PhotonNode>, shadows: Vec<ShadowPhoton>, radius: f32) -> Self {
        let stats = PhotonMapStats {
            emitted: 0,
            photons: photons.len(),
            shadow_photons: shadows.len(),
        };
        Self {
            photons: KdTree::build_by(photons, |a, b, k| a.position[k].total_cmp(&b.position[k])),
            shadows: KdTree::build_by(shadows, |a, b, k| a.position[k].total_cmp(&b.position[k])),
            radius,
            stats,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn stats(&self) -> PhotonMapStats {
        self.stats
    }

    /// Whether any shadow marker lies within the search radius of `point`.
    pub fn are_shadow_photons_present(&self, point: Vec3) -> bool {
        self.stats.shadow_photons > 0
            && !self
                .shadows
                .within_radius(&SearchPoint(point), self.radius)
                .is_empty()
    }

    /// Density estimate of the radiance leaving `intersection` along
    /// `outgoing`.
    ///
    /// Only photons that arrived on the side the normal faces are gathered.
    pub fn radiance_contribution(
        &self,
        outgoing: Vec3,
        surface: &Surface,
        intersection: &Intersection,
    ) -> Color {
        if self.stats.photons == 0 {
            return Color::ZERO;
        }

        let normal = intersection.normal;
        let flux: Color = self
            .photons
            .within_radius(&SearchPoint(intersection.point), self.radius)
            .into_iter()
            .filter(|photon| photon.direction.dot(normal) < 0.0)
            .map(|photon| surface.brdf.evaluate(-photon.direction, outgoing, normal) * photon.flux)
            .sum();

        flux * surface.color / (PI * self.radius * self.radius)
    }
}

/// Per-share output, merged after the join.
#[derive(Default)]
struct PhotonBuffer {
    photons: Vec<PhotonNode>,
    shadows: Vec<ShadowPhoton>,
}

/// One leg of a photon walk.
#[derive(Debug, Clone, Copy)]
struct PhotonSegment {
    ray: Ray,
    /// Product of attenuation factors since emission
    weight: Color,
    inside: bool,
    internally_reflected: bool,
}

/// Random-walk state for a single emission share.
struct PhotonTracer<'g> {
    geometry: &'g dyn Geometry,
    termination_probability: f32,
    survival_probability: f32,
    importance_epsilon: f32,
    max_segments: usize,
    buffer: PhotonBuffer,
}

impl<'g> PhotonTracer<'g> {
    fn new(geometry: &'g dyn Geometry, config: &RenderConfig) -> Self {
        Self {
            geometry,
            termination_probability: config.termination_probability,
            survival_probability: config.survival_probability(),
            importance_epsilon: config.importance_epsilon,
            max_segments: config.max_tree_nodes.max(1),
            buffer: PhotonBuffer::default(),
        }
    }

    /// Trace one photon carrying `flux` from a random point on `light`.
    fn emit(&mut self, light: &QuadLight, flux: Color, rng: &mut dyn RngCore) {
        let geometry = self.geometry;
        let ray = light.sample_emission(rng);
        let hits = geometry.intersect_all(&ray);
        let Some(first) = hits.first().copied() else {
            return;
        };

        // Everything past the first surface along the emission ray is in shadow
        let first_t = first.intersection.t;
        self.buffer.shadows.extend(
            hits.iter()
                .skip(1)
                .filter(|hit| hit.intersection.t - first_t > T_MIN)
                .map(|hit| ShadowPhoton {
                    position: hit.intersection.point,
                }),
        );

        let start = PhotonSegment {
            ray,
            weight: Color::ONE,
            inside: false,
            internally_reflected: false,
        };
        let mut pending = VecDeque::new();
        let mut segments = 1;
        self.interact(start, &first, flux, &mut pending, rng);

        while let Some(segment) = pending.pop_front() {
            if segments >= self.max_segments {
                break;
            }
            segments += 1;
            if let Some(hit) = geometry.intersect(&segment.ray) {
                self.interact(segment, &hit, flux, &mut pending, rng);
            }
        }
    }

    /// Deposit and scatter at a single surface.
    fn interact(
        &mut self,
        segment: PhotonSegment,
        hit: &Hit<'_>,
        flux: Color,
        pending: &mut VecDeque<PhotonSegment>,
        rng: &mut dyn RngCore,
    ) {
        if is_negligible(segment.weight, self.importance_epsilon) {
            return;
        }

        let direction = segment.ray.direction();
        let point = hit.intersection.point;
        let normal = hit.intersection.normal;
        let surface = hit.surface;

        match surface.kind {
            SurfaceKind::Light => {}
            SurfaceKind::Diffuse => {
                self.buffer.photons.push(PhotonNode {
                    position: point,
                    flux: flux * segment.weight,
                    direction,
                });

                if gen_f32(rng) < self.termination_probability {
                    return;
                }
                let bounce = cosine_hemisphere(normal, direction, gen_f32(rng), gen_f32(rng));
                let brdf = surface.brdf.evaluate(-direction, bounce, normal);
                pending.push_back(PhotonSegment {
                    ray: Ray::new(point, bounce),
                    weight: segment.weight * surface.color * brdf * PI / self.survival_probability,
                    inside: segment.inside,
                    internally_reflected: false,
                });
            }
            SurfaceKind::Reflector => {
                pending.push_back(PhotonSegment {
                    ray: Ray::new(point, reflect(direction, normal)),
                    internally_reflected: false,
                    ..segment
                });
            }
            SurfaceKind::Transparent => {
                let split = split_at_dielectric(
                    direction,
                    normal,
                    segment.inside,
                    segment.internally_reflected,
                );
                if let Some((reflected, fraction)) = split.reflected {
                    pending.push_back(PhotonSegment {
                        ray: Ray::new(point, reflected),
                        weight: segment.weight * fraction,
                        inside: segment.inside,
                        internally_reflected: true,
                    });
                }
                if let Some((refracted, fraction)) = split.refracted {
                    pending.push_back(PhotonSegment {
                        ray: Ray::new(point, refracted),
                        weight: segment.weight * fraction,
                        inside: !segment.inside,
                        internally_reflected: false,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SceneGeometry;
    use crate::testing::{lit_floor, lit_floor_with_blocker, lit_sphere_room};

    fn config(photons: usize) -> RenderConfig {
        RenderConfig {
            photon_count: photons,
            photon_workers: Some(4),
            seed: 7,
            ..Default::default()
        }
    }

    fn floor_hit(point: Vec3) -> Intersection {
        Intersection {
            point,
            normal: Vec3::Z,
            t: 1.0,
            front_face: true,
        }
    }

    #[test]
    fn test_empty_map() {
        let map = PhotonMap::from_parts(Vec::new(), Vec::new(), 0.2);
        assert!(!map.are_shadow_photons_present(Vec3::ZERO));
        let surface = Surface::new(SurfaceKind::Diffuse, Color::ONE);
        assert_eq!(
            map.radiance_contribution(Vec3::Z, &surface, &floor_hit(Vec3::ZERO)),
            Color::ZERO
        );
    }

    #[test]
    fn test_shadow_marker_found_at_its_own_position() {
        let p = Vec3::new(1.5, -2.0, 0.25);
        let map = PhotonMap::from_parts(Vec::new(), vec![ShadowPhoton { position: p }], 0.2);
        assert!(map.are_shadow_photons_present(p));
        assert!(map.are_shadow_photons_present(p + Vec3::new(0.1, 0.0, 0.0)));
        assert!(!map.are_shadow_photons_present(p + Vec3::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn test_radiance_gathers_only_nearby_photons_from_above() {
        let down = PhotonNode {
            position: Vec3::new(0.05, 0.0, 0.0),
            flux: Color::splat(2.0),
            direction: Vec3::NEG_Z,
        };
        let from_below = PhotonNode {
            direction: Vec3::Z,
            ..down
        };
        let far = PhotonNode {
            position: Vec3::new(5.0, 5.0, 0.0),
            ..down
        };
        let radius = 0.2;
        let map = PhotonMap::from_parts(vec![down, from_below, far], Vec::new(), radius);
        let surface = Surface::new(SurfaceKind::Diffuse, Color::new(1.0, 0.5, 0.25));

        let estimate = map.radiance_contribution(Vec3::Z, &surface, &floor_hit(Vec3::ZERO));
        let brdf = surface.brdf.evaluate(Vec3::Z, Vec3::Z, Vec3::Z);
        let expected = Color::splat(2.0) * brdf * surface.color / (PI * radius * radius);
        assert!((estimate - expected).length() < 1e-4);

        let nothing = map.radiance_contribution(Vec3::Z, &surface, &floor_hit(Vec3::splat(-5.0)));
        assert_eq!(nothing, Color::ZERO);
    }

    #[test]
    fn test_build_is_deterministic() {
        let geometry = SceneGeometry::from_scene(&lit_floor(Color::splat(5.0))).unwrap();
        let a = PhotonMap::build(&geometry, &config(5_000));
        let b = PhotonMap::build(&geometry, &config(5_000));
        assert_eq!(a.stats(), b.stats());
        assert_eq!(a.stats().emitted, 5_000);
        assert_eq!(a.radius(), config(5_000).photon_search_radius);
    }

    #[test]
    fn test_closed_room_stores_every_emission() {
        let geometry = SceneGeometry::from_scene(&lit_sphere_room()).unwrap();
        let map = PhotonMap::build(&geometry, &config(2_000));
        let stats = map.stats();
        assert_eq!(stats.emitted, 2_000);
        assert!(stats.photons >= stats.emitted);
    }

    #[test]
    fn test_blocker_casts_shadow_markers() {
        let geometry = SceneGeometry::from_scene(&lit_floor_with_blocker()).unwrap();
        let map = PhotonMap::build(&geometry, &config(4_000));
        assert!(map.stats().shadow_photons > 0);

        // Right under the blocker, on the floor
        assert!(map.are_shadow_photons_present(Vec3::ZERO));
        // Far from the blocker's shadow
        assert!(!map.are_shadow_photons_present(Vec3::new(4.5, 4.5, 0.0)));
    }

    #[test]
    fn test_no_lights_builds_empty_map() {
        let geometry = SceneGeometry::new();
        let map = PhotonMap::build(&geometry, &config(100));
        assert_eq!(map.stats(), PhotonMapStats::default());
        assert_eq!(map.radius(), RenderConfig::default().photon_search_radius);
    }
}
