//! Lumen - offline renderer for the hexagonal room.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lumen_core::{RenderConfig, Scene};
use lumen_renderer::{render, Camera, SceneContext};

/// Render the built-in hexagonal room with path tracing and a photon map.
#[derive(Parser, Debug)]
#[command(name = "lumen", version, about)]
struct Args {
    /// JSON render configuration; missing fields keep their defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output image path
    #[arg(short, long, value_name = "FILE", default_value = "render.png")]
    output: PathBuf,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Camera samples per pixel
    #[arg(short, long)]
    samples: Option<u32>,

    /// Photons emitted into the scene
    #[arg(long)]
    photons: Option<usize>,

    /// Photon search radius
    #[arg(long)]
    radius: Option<f32>,

    /// Skip the photon map; diffuse hits use shadow rays only
    #[arg(long)]
    no_photon_map: bool,

    /// Use the far eye position (x = -2) instead of the near one
    #[arg(long)]
    far_eye: bool,

    /// Worker threads (default: all cores)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Base seed for every random stream
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    /// Load the configuration file, if any, and apply command line overrides.
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => RenderConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(samples) = self.samples {
            config.samples_per_pixel = samples;
        }
        if let Some(photons) = self.photons {
            config.photon_count = photons;
        }
        if let Some(radius) = self.radius {
            config.photon_search_radius = radius;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.no_photon_map {
            config.use_photon_mapping = false;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    log::info!("Starting Lumen");

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure the thread pool")?;
    }
    log::info!("Using {} threads", rayon::current_num_threads());

    let config = args.render_config()?;
    let scene = Scene::hexagon_room();
    let context = SceneContext::build(&scene, &config).context("failed to assemble scene")?;

    let camera = if args.far_eye {
        Camera::far_eye(config.width, config.height)
    } else {
        Camera::near_eye(config.width, config.height)
    };

    let output = render(&context, &camera);
    if output.missed_rays > 0 {
        log::warn!("{} rays left the scene in total", output.missed_rays);
    }

    output
        .image
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    Ok(())
}
