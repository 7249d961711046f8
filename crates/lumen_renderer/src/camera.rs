//! Pinhole camera for ray generation.

use lumen_math::{Ray, Vec3};
use rand::RngCore;

use crate::gen_f32;

/// Camera for generating rays into the scene.
#[derive(Debug, Clone)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,
    vfov: f32, // Vertical field of view in degrees

    // Cached computed values (set by initialize())
    center: Vec3,
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        let mut camera = Self {
            image_width: 800,
            image_height: 800,
            look_from: Vec3::new(-1.0, 0.0, 0.0),
            look_at: Vec3::ZERO,
            vup: Vec3::Z,
            vfov: 90.0,
            center: Vec3::ZERO,
            pixel00_loc: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
        };
        camera.initialize();
        camera
    }

    /// Eye one unit behind a 2x2 screen at the origin, looking down +X.
    pub fn near_eye(width: u32, height: u32) -> Self {
        Self::new().with_resolution(width, height)
    }

    /// Eye two units behind the same screen; narrower field of view.
    pub fn far_eye(width: u32, height: u32) -> Self {
        Self::new()
            .with_resolution(width, height)
            .with_position(Vec3::new(-2.0, 0.0, 0.0), Vec3::ZERO, Vec3::Z)
            .with_fov(2.0 * 0.5f32.atan().to_degrees())
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width.max(1);
        self.image_height = height.max(1);
        self.initialize();
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.initialize();
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self.initialize();
        self
    }

    pub fn look_from(&self) -> Vec3 {
        self.look_from
    }

    /// Recompute the viewport from the current settings.
    fn initialize(&mut self) {
        self.center = self.look_from;

        let focal_length = (self.look_from - self.look_at).length();
        let h = (self.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h * focal_length;
        let viewport_width = viewport_height * (self.image_width as f32 / self.image_height as f32);

        // Camera basis vectors
        let w = (self.look_from - self.look_at).normalize_or_zero();
        let u = self.vup.cross(w).normalize_or_zero();
        let v = w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;

        self.pixel_delta_u = viewport_u / self.image_width as f32;
        self.pixel_delta_v = viewport_v / self.image_height as f32;

        let viewport_upper_left =
            self.center - focal_length * w - viewport_u / 2.0 - viewport_v / 2.0;
        self.pixel00_loc = viewport_upper_left + 0.5 * (self.pixel_delta_u + self.pixel_delta_v);
    }

    /// Generate a ray for pixel (i, j) with random sampling.
    pub fn get_ray(&self, i: u32, j: u32, rng: &mut dyn RngCore) -> Ray {
        let offset_u = gen_f32(rng) - 0.5;
        let offset_v = gen_f32(rng) - 0.5;

        let pixel_sample = self.pixel00_loc
            + (i as f32 + offset_u) * self.pixel_delta_u
            + (j as f32 + offset_v) * self.pixel_delta_v;

        Ray::between(self.center, pixel_sample)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
