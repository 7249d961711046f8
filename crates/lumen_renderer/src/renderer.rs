//! Row-batched parallel render loop and image output.
//!
//! Rows are rendered in batches; each batch is a rayon fork-join, and every
//! row owns a generator seeded from the base seed and its row index.

use std::path::Path;
use std::time::{Duration, Instant};

use lumen_math::Color;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::scene::SceneContext;
use crate::stream_seed;

/// Offset separating row generators from photon-share generators.
const ROW_STREAM_OFFSET: u64 = 1 << 32;

/// A horizontal band of rows rendered between two join barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBatch {
    /// First row of the batch
    pub y: u32,
    /// Number of rows
    pub height: u32,
    /// Index of this batch in render order
    pub index: usize,
}

/// Split `height` rows into batches of at most `rows_per_batch`.
pub fn generate_row_batches(height: u32, rows_per_batch: u32) -> Vec<RowBatch> {
    let step = rows_per_batch.max(1);
    (0..height)
        .step_by(step as usize)
        .enumerate()
        .map(|(index, y)| RowBatch {
            y,
            height: step.min(height - y),
            index,
        })
        .collect()
}

/// Radiance of one pixel averaged over `samples` camera rays.
///
/// Returns the color and the number of sub-rays that missed the scene.
pub fn render_pixel(
    scene: &SceneContext,
    camera: &Camera,
    x: u32,
    y: u32,
    samples: u32,
    rng: &mut dyn RngCore,
) -> (Color, usize) {
    let samples = samples.max(1);
    let mut pixel_color = Color::ZERO;
    let mut misses = 0;

    for _ in 0..samples {
        let ray = camera.get_ray(x, y, rng);
        let tree = scene.trace(&ray, rng);
        pixel_color += tree.evaluate();
        misses += tree.misses();
    }

    (pixel_color / samples as f32, misses)
}

/// Pixels of one row and its miss count.
struct RowResult {
    pixels: Vec<Color>,
    misses: usize,
}

fn render_row(scene: &SceneContext, camera: &Camera, y: u32) -> RowResult {
    let config = scene.config();
    let mut rng = StdRng::seed_from_u64(stream_seed(config.seed, ROW_STREAM_OFFSET + y as u64));
    let mut misses = 0;
    let pixels = (0..camera.image_width)
        .map(|x| {
            let (color, missed) =
                render_pixel(scene, camera, x, y, config.samples_per_pixel, &mut rng);
            misses += missed;
            color
        })
        .collect();
    RowResult { pixels, misses }
}

/// Finished image plus render statistics.
pub struct RenderOutput {
    pub image: ImageBuffer,
    /// Sub-rays that left the scene without a hit
    pub missed_rays: usize,
    pub elapsed: Duration,
}

/// Render the whole image with the camera's resolution.
pub fn render(scene: &SceneContext, camera: &Camera) -> RenderOutput {
    let start = Instant::now();
    let config = scene.config();
    let mut image = ImageBuffer::new(camera.image_width, camera.image_height);
    let batches = generate_row_batches(camera.image_height, config.rows_per_batch);
    let mut missed_rays = 0;

    log::info!(
        "Rendering {}x{} at {} spp in {} batches",
        camera.image_width,
        camera.image_height,
        config.samples_per_pixel,
        batches.len()
    );

    for batch in &batches {
        let rows: Vec<RowResult> = (batch.y..batch.y + batch.height)
            .into_par_iter()
            .map(|y| render_row(scene, camera, y))
            .collect();

        let mut batch_misses = 0;
        for (offset, row) in rows.into_iter().enumerate() {
            let y = batch.y + offset as u32;
            for (x, color) in row.pixels.into_iter().enumerate() {
                image.set(x as u32, y, color);
            }
            batch_misses += row.misses;
        }

        if batch_misses > 0 {
            log::warn!(
                "Batch {} (rows {}..{}): {} rays left the scene",
                batch.index,
                batch.y,
                batch.y + batch.height,
                batch_misses
            );
        }
        missed_rays += batch_misses;
        log::debug!("Batch {}/{} done", batch.index + 1, batches.len());
    }

    let elapsed = start.elapsed();
    log::info!("Render finished in {:.2?}", elapsed);

    RenderOutput {
        image,
        missed_rays,
        elapsed,
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * clamp_01(linear_to_gamma(color.x))) as u8;
    let g = (255.0 * clamp_01(linear_to_gamma(color.y))) as u8;
    let b = (255.0 * clamp_01(linear_to_gamma(color.z))) as u8;
    [r, g, b, 255]
}

/// Linear-color image.
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

// Widened before multiplying; u32 products wrap past 65535x65535.
fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; pixel_count(width, height)],
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.index(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let index = self.index(x, y);
        self.pixels[index] = color;
    }

    /// Write the image; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
        let path = path.as_ref();
        let img = image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            image::Rgba(color_to_rgba(self.get(x, y)))
        });
        img.save(path)?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}
