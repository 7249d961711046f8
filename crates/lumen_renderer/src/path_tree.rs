//! Per-sample light-path tree.
//!
//! A camera ray is expanded breadth-first into reflected, refracted and
//! diffuse sub-rays stored in an arena, then collapsed bottom-up into the
//! radiance arriving along the camera ray. Children are always pushed after
//! their parent, so evaluation is a single reverse sweep over the arena.

use std::collections::VecDeque;
use std::f32::consts::PI;

use lumen_core::SurfaceKind;
use lumen_math::{is_negligible, safe_divide, Color, Ray};
use rand::RngCore;

use crate::gen_f32;
use crate::hittable::{Hit, Intersection};
use crate::material::Surface;
use crate::optics::{cosine_hemisphere, reflect, split_at_dielectric};
use crate::scene::SceneContext;

/// Index of a node in its tree's arena.
pub type NodeId = usize;

/// The camera ray's node.
pub const ROOT: NodeId = 0;

/// Where a node is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Queued, not yet intersected
    Unresolved,
    /// Resolved without children; radiance is its local contribution
    Terminal,
    /// Resolved with at least one child
    Branching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// One segment of a light path.
#[derive(Debug, Clone)]
pub struct PathNode {
    pub ray: Ray,
    /// Product of attenuation factors from the camera to this segment
    pub importance: Color,
    /// The segment travels inside a refractive medium
    pub inside: bool,
    /// A diffuse bounce happened earlier on the path
    pub after_diffuse: bool,
    pub intersection: Option<Intersection>,
    pub surface: Option<Surface>,
    /// Fresnel reflection coefficient, for transparent hits
    pub reflectance: Option<f32>,
    /// Light added at this node on top of what its children carry
    pub local: Color,
    pub state: NodeState,
    pub parent: Option<NodeId>,
    /// Reflected or diffuse continuation
    pub left: Option<NodeId>,
    /// Refracted continuation
    pub right: Option<NodeId>,
}

impl PathNode {
    fn new(
        ray: Ray,
        importance: Color,
        inside: bool,
        after_diffuse: bool,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            ray,
            importance,
            inside,
            after_diffuse,
            intersection: None,
            surface: None,
            reflectance: None,
            local: Color::ZERO,
            state: NodeState::Unresolved,
            parent,
            left: None,
            right: None,
        }
    }

    pub fn kind(&self) -> Option<SurfaceKind> {
        self.surface.map(|s| s.kind)
    }

    pub fn child_count(&self) -> usize {
        usize::from(self.left.is_some()) + usize::from(self.right.is_some())
    }
}

/// Arena-backed tree of the sub-rays spawned by one camera ray.
#[derive(Debug, Clone)]
pub struct LightPathTree {
    nodes: Vec<PathNode>,
    capacity: usize,
    misses: usize,
    truncated: bool,
}

impl LightPathTree {
    /// Start a tree from `ray` with unit importance, allowing at most
    /// `capacity` nodes (at least the root).
    pub fn new(ray: Ray, capacity: usize) -> Self {
        Self {
            nodes: vec![PathNode::new(ray, Color::ONE, false, false, None)],
            capacity: capacity.max(1),
            misses: 0,
            truncated: false,
        }
    }

    /// Builder method to set the root importance.
    pub fn with_importance(mut self, importance: Color) -> Self {
        self.nodes[ROOT].importance = importance;
        self
    }

    /// Builder method for a root ray that starts inside glass.
    pub fn starting_inside(mut self, inside: bool) -> Self {
        self.nodes[ROOT].inside = inside;
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn node(&self, id: NodeId) -> &PathNode {
        &self.nodes[id]
    }

    pub fn root(&self) -> &PathNode {
        &self.nodes[ROOT]
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    /// Number of sub-rays that left the scene without hitting anything.
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Whether the node cap prevented a spawn.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Expand every queued node breadth-first.
    ///
    /// Once the cap is reached no more children are spawned, but the nodes
    /// already queued are still resolved.
    pub fn construct(&mut self, scene: &SceneContext, rng: &mut dyn RngCore) {
        let epsilon = scene.config().importance_epsilon;
        let mut queue = VecDeque::from([ROOT]);

        while let Some(id) = queue.pop_front() {
            if is_negligible(self.nodes[id].importance, epsilon) {
                self.nodes[id].state = NodeState::Terminal;
                continue;
            }

            let ray = self.nodes[id].ray;
            let Some(hit) = scene.geometry().intersect(&ray) else {
                self.misses += 1;
                log::debug!(
                    "Light path left the scene: origin {}, direction {}",
                    ray.origin(),
                    ray.direction()
                );
                self.nodes[id].state = NodeState::Terminal;
                continue;
            };

            self.nodes[id].intersection = Some(hit.intersection);
            self.nodes[id].surface = Some(*hit.surface);

            match hit.surface.kind {
                SurfaceKind::Light => {
                    // Light reaching a diffuse surface is counted there
                    if !self.nodes[id].after_diffuse {
                        self.nodes[id].local = hit.surface.color;
                    }
                }
                SurfaceKind::Reflector => {
                    let node = &self.nodes[id];
                    let mirrored = reflect(ray.direction(), hit.intersection.normal);
                    let child = PathNode::new(
                        Ray::new(hit.intersection.point, mirrored),
                        node.importance,
                        node.inside,
                        node.after_diffuse,
                        Some(id),
                    );
                    self.spawn(id, Side::Left, child, &mut queue);
                }
                SurfaceKind::Diffuse => self.resolve_diffuse(id, &hit, scene, &mut queue, rng),
                SurfaceKind::Transparent => self.resolve_transparent(id, &hit, &mut queue),
            }

            let node = &mut self.nodes[id];
            node.state = if node.child_count() > 0 {
                NodeState::Branching
            } else {
                NodeState::Terminal
            };
        }
    }

    fn resolve_diffuse(
        &mut self,
        id: NodeId,
        hit: &Hit<'_>,
        scene: &SceneContext,
        queue: &mut VecDeque<NodeId>,
        rng: &mut dyn RngCore,
    ) {
        let direction = self.nodes[id].ray.direction();
        let outgoing = -direction;
        let point = hit.intersection.point;
        let normal = hit.intersection.normal;

        if let Some(map) = scene.photon_map() {
            if !map.are_shadow_photons_present(point) {
                self.nodes[id].local =
                    map.radiance_contribution(outgoing, hit.surface, &hit.intersection);
                return;
            }
        }

        self.nodes[id].local = scene.direct_light(hit, outgoing, rng);

        let config = scene.config();
        if gen_f32(rng) < config.termination_probability {
            return;
        }

        let bounce = cosine_hemisphere(normal, direction, gen_f32(rng), gen_f32(rng));
        let brdf = hit.surface.brdf.evaluate(bounce, outgoing, normal);
        let node = &self.nodes[id];
        let child = PathNode::new(
            Ray::new(point, bounce),
            node.importance * hit.surface.color * brdf * PI / config.survival_probability(),
            node.inside,
            true,
            Some(id),
        );
        self.spawn(id, Side::Left, child, queue);
    }

    fn resolve_transparent(&mut self, id: NodeId, hit: &Hit<'_>, queue: &mut VecDeque<NodeId>) {
        // Reflected off glass by the parent: a second total internal
        // reflection ends the branch
        let internally_reflected = self.nodes[id].parent.is_some_and(|parent| {
            let parent = &self.nodes[parent];
            parent.left == Some(id) && parent.kind() == Some(SurfaceKind::Transparent)
        });

        let node = &self.nodes[id];
        let split = split_at_dielectric(
            node.ray.direction(),
            hit.intersection.normal,
            node.inside,
            internally_reflected,
        );
        let (importance, inside, after_diffuse) =
            (node.importance, node.inside, node.after_diffuse);
        let point = hit.intersection.point;
        self.nodes[id].reflectance = Some(split.reflection_coefficient);

        if let Some((direction, fraction)) = split.reflected {
            let child = PathNode::new(
                Ray::new(point, direction),
                importance * fraction,
                inside,
                after_diffuse,
                Some(id),
            );
            self.spawn(id, Side::Left, child, queue);
        }
        if let Some((direction, fraction)) = split.refracted {
            let child = PathNode::new(
                Ray::new(point, direction),
                importance * fraction,
                !inside,
                after_diffuse,
                Some(id),
            );
            self.spawn(id, Side::Right, child, queue);
        }
    }

    fn spawn(&mut self, parent: NodeId, side: Side, child: PathNode, queue: &mut VecDeque<NodeId>) {
        if self.nodes.len() >= self.capacity {
            self.truncated = true;
            return;
        }
        let id = self.nodes.len();
        self.nodes.push(child);
        match side {
            Side::Left => self.nodes[parent].left = Some(id),
            Side::Right => self.nodes[parent].right = Some(id),
        }
        queue.push_back(id);
    }

    /// Collapse the tree into the radiance arriving along the root ray.
    pub fn evaluate(&self) -> Color {
        let mut radiance = vec![Color::ZERO; self.nodes.len()];

        for (id, node) in self.nodes.iter().enumerate().rev() {
            radiance[id] = match (node.left, node.right) {
                (None, None) => node.local,
                (Some(child), None) | (None, Some(child)) => {
                    safe_divide(self.nodes[child].importance, node.importance) * radiance[child]
                        + node.local
                }
                (Some(left), Some(right)) => safe_divide(
                    radiance[left] * self.nodes[left].importance
                        + radiance[right] * self.nodes[right].importance,
                    node.importance,
                ),
            };
        }

        radiance[ROOT]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SceneGeometry;
    use crate::light::QuadLight;
    use crate::sphere::Sphere;
    use crate::testing::lit_floor;
    use lumen_core::RenderConfig;
    use lumen_math::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lamp() -> QuadLight {
        QuadLight::new(
            "lamp",
            Vec3::new(-20.0, -20.0, 20.0),
            Vec3::new(0.0, 40.0, 0.0),
            Vec3::new(40.0, 0.0, 0.0),
            Color::ONE,
        )
        .unwrap()
    }

    /// A single sphere of the given kind, no photon map.
    fn sphere_scene(kind: SurfaceKind, radius: f32, config: RenderConfig) -> SceneContext {
        let mut geometry = SceneGeometry::new();
        geometry.add(
            "ball",
            Box::new(Sphere::new(Vec3::ZERO, radius)),
            Surface::new(kind, Color::splat(0.9)),
        );
        geometry.add_light(lamp());
        SceneContext::new(Box::new(geometry), None, config)
    }

    fn floor_context(radiance: Color) -> SceneContext {
        let config = RenderConfig {
            photon_count: 20_000,
            photon_workers: Some(4),
            seed: 42,
            ..Default::default()
        };
        SceneContext::build(&lit_floor(radiance), &config).unwrap()
    }

    fn camera_ray() -> Ray {
        Ray::between(Vec3::new(0.0, -3.0, 1.0), Vec3::ZERO)
    }

    #[test]
    fn test_diffuse_floor_uses_photon_map() {
        let scene = floor_context(Color::splat(5.0));
        let mut rng = StdRng::seed_from_u64(0);

        let mut tree = LightPathTree::new(camera_ray(), 512);
        tree.construct(&scene, &mut rng);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().kind(), Some(SurfaceKind::Diffuse));
        assert_eq!(tree.root().state, NodeState::Terminal);

        let color = tree.evaluate();
        assert!(color.is_finite());
        assert!(color.min_element() >= 0.0);
        assert!(color.max_element() > 0.0);
    }

    #[test]
    fn test_diffuse_floor_scales_with_light_power() {
        let dim = floor_context(Color::splat(5.0));
        let bright = floor_context(Color::splat(10.0));

        let a = dim.evaluate(&camera_ray(), &mut StdRng::seed_from_u64(0));
        let b = bright.evaluate(&camera_ray(), &mut StdRng::seed_from_u64(0));
        assert!(a.max_element() > 0.0);
        assert!((b - 2.0 * a).length() <= 1e-4 * b.length());
    }

    #[test]
    fn test_reflector_child_keeps_importance() {
        let scene = sphere_scene(SurfaceKind::Reflector, 1.0, RenderConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);

        let mut tree = LightPathTree::new(ray, 512).with_importance(Color::splat(0.5));
        tree.construct(&scene, &mut rng);

        let root = tree.root();
        assert_eq!(root.kind(), Some(SurfaceKind::Reflector));
        assert_eq!(root.child_count(), 1);
        let child = tree.node(root.left.unwrap());
        assert_eq!(child.importance, Color::splat(0.5));
        assert_eq!(child.parent, Some(ROOT));
        assert!((child.ray.direction() - Vec3::Z).length() < 1e-5);
        // The reflected ray heads for the lamp
        assert_eq!(child.kind(), Some(SurfaceKind::Light));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.evaluate(), Color::ONE);
    }

    #[test]
    fn test_total_internal_reflection_stops_on_second_bounce() {
        let scene = sphere_scene(SurfaceKind::Transparent, 1.0, RenderConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        let ray = Ray::new(Vec3::new(0.0, 0.9, 0.0), Vec3::X);

        let mut tree = LightPathTree::new(ray, 512).starting_inside(true);
        tree.construct(&scene, &mut rng);

        let root = tree.root();
        assert_eq!(root.reflectance, Some(1.0));
        assert!(root.right.is_none());
        let child = tree.node(root.left.unwrap());
        assert!(child.inside);
        assert_eq!(child.reflectance, Some(1.0));
        assert_eq!(child.child_count(), 0);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.evaluate(), Color::ZERO);
    }

    #[test]
    fn test_glass_from_outside_splits() {
        let scene = sphere_scene(SurfaceKind::Transparent, 1.0, RenderConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        let ray = Ray::new(Vec3::new(0.3, 0.0, 5.0), Vec3::NEG_Z);

        let mut tree = LightPathTree::new(ray, 512);
        tree.construct(&scene, &mut rng);

        let root = tree.root();
        let left = tree.node(root.left.unwrap());
        let right = tree.node(root.right.unwrap());
        let r = root.reflectance.unwrap();
        assert!(!left.inside);
        assert!(right.inside);
        assert!((left.importance - Color::splat(r)).length() < 1e-6);
        assert!((right.importance - Color::splat(1.0 - r)).length() < 1e-6);
        assert!(tree.evaluate().is_finite());
    }

    #[test]
    fn test_node_cap_is_respected() {
        let config = RenderConfig {
            max_tree_nodes: 8,
            ..Default::default()
        };
        let scene = sphere_scene(SurfaceKind::Reflector, 5.0, config);
        let mut rng = StdRng::seed_from_u64(0);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.3, 0.1));

        let tree = scene.trace(&ray, &mut rng);
        assert_eq!(tree.len(), 8);
        assert!(tree.truncated());
        assert!(tree.nodes().iter().all(|n| n.state != NodeState::Unresolved));
        assert_eq!(tree.evaluate(), Color::ZERO);
    }

    #[test]
    fn test_node_cap_bounds_glass_trees() {
        let config = RenderConfig {
            max_tree_nodes: 16,
            ..Default::default()
        };
        let scene = sphere_scene(SurfaceKind::Transparent, 1.0, config);
        let mut rng = StdRng::seed_from_u64(9);
        for i in 0..64 {
            let x = -0.95 + i as f32 * 0.03;
            let tree = scene.trace(&Ray::new(Vec3::new(x, 0.1, 4.0), Vec3::NEG_Z), &mut rng);
            assert!(tree.len() <= 16);
            for (id, node) in tree.nodes().iter().enumerate().skip(1) {
                let parent = tree.node(node.parent.unwrap());
                assert!(parent.left == Some(id) || parent.right == Some(id));
            }
        }
    }

    #[test]
    fn test_miss_is_counted_not_fatal() {
        let scene = sphere_scene(SurfaceKind::Diffuse, 1.0, RenderConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        let tree = scene.trace(&Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::X), &mut rng);
        assert_eq!(tree.misses(), 1);
        assert_eq!(tree.evaluate(), Color::ZERO);
    }

    #[test]
    fn test_light_seen_after_diffuse_bounce_is_dark() {
        let mut tree = LightPathTree::new(Ray::new(Vec3::ZERO, Vec3::Z), 4);
        let mut geometry = SceneGeometry::new();
        geometry.add_light(lamp());
        let scene = SceneContext::new(Box::new(geometry), None, RenderConfig::default());

        tree.nodes[ROOT].after_diffuse = true;
        tree.construct(&scene, &mut StdRng::seed_from_u64(0));
        assert_eq!(tree.root().kind(), Some(SurfaceKind::Light));
        assert_eq!(tree.evaluate(), Color::ZERO);
    }

    #[test]
    fn test_negligible_importance_is_dropped() {
        let scene = sphere_scene(SurfaceKind::Reflector, 1.0, RenderConfig::default());
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let mut tree = LightPathTree::new(ray, 512).with_importance(Color::splat(1e-6));
        tree.construct(&scene, &mut StdRng::seed_from_u64(0));
        assert_eq!(tree.len(), 1);
        assert!(tree.root().intersection.is_none());
    }

    #[test]
    fn test_evaluate_weights_children() {
        let ray = Ray::default();
        let mut tree = LightPathTree::new(ray, 8).with_importance(Color::splat(0.5));
        let mut left = PathNode::new(ray, Color::splat(0.1), false, false, Some(ROOT));
        left.local = Color::splat(2.0);
        let mut right = PathNode::new(ray, Color::splat(0.4), true, false, Some(ROOT));
        right.local = Color::splat(1.0);
        tree.nodes.push(left);
        tree.nodes.push(right);
        tree.nodes[ROOT].left = Some(1);
        tree.nodes[ROOT].right = Some(2);

        // (2 * 0.1 + 1 * 0.4) / 0.5
        assert!((tree.evaluate() - Color::splat(1.2)).length() < 1e-6);

        // Zero importance divides to zero instead of NaN
        tree.nodes[ROOT].importance = Color::ZERO;
        assert_eq!(tree.evaluate(), Color::ZERO);
    }

    #[test]
    fn test_photon_map_off_uses_direct_light() {
        let config = RenderConfig {
            use_photon_mapping: false,
            termination_probability: 0.5,
            ..Default::default()
        };
        let scene = SceneContext::build(&lit_floor(Color::splat(5.0)), &config).unwrap();
        assert!(scene.photon_map().is_none());

        let mut rng = StdRng::seed_from_u64(3);
        let tree = scene.trace(&camera_ray(), &mut rng);
        assert!(tree.root().local.max_element() > 0.0);
        if let Some(child) = tree.root().left {
            assert!(tree.node(child).after_diffuse);
        }
    }
}
