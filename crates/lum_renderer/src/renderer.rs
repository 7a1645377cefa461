//! Progressive renderer and its lifecycle.
//!
//! Each frame traces one sample per pixel and blends it into the camera
//! films as a running average, so the image converges as frames accumulate.
//! Buckets of a frame may run in parallel; frames never do, since frame `n`
//! averages against the film left by frame `n - 1`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use lum_core::{
    CameraError, CameraParams, FilmError, ImageFilm, Scene, StratifiedRegularSampler, FILM_HIT,
    FILM_RGBA,
};
use lum_math::Color;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bucket::{
    generate_buckets, render_bucket, BucketResult, FrameContext, DEFAULT_BUCKET_SIZE,
};
use crate::cancel::CancelToken;
use crate::integrator::PathSettings;

/// Errors that can occur while driving the renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Renderer has been shut down")]
    ShutDown,

    #[error("Renderer is not running")]
    NotRunning,

    #[error("No scene loaded")]
    NoScene,

    #[error("Render cancelled before frame {frame}")]
    Cancelled { frame: u32 },

    #[error("Invalid render configuration: {0}")]
    InvalidConfig(String),

    #[error("Film '{name}' is {width}x{height}, expected {expected_width}x{expected_height}")]
    FilmSize {
        name: String,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Film(#[from] FilmError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Maximum number of ray segments per path
    pub max_path_length: u32,
    /// Frames rendered by a default `render_frames` call
    pub frames: u32,
    /// Save the film every this many frames; 0 disables saving
    pub save_interval: u32,
    /// Where the RGBA film is saved
    pub output: PathBuf,
    /// Seed for all per-bucket random streams
    pub seed: u64,
    pub bucket_size: u32,
    /// Lower bound of the interval of secondary rays
    pub ray_epsilon: f32,
    /// Optional reflectance threshold for early path termination
    pub russian_roulette: Option<f32>,
    /// Render buckets on the rayon thread pool
    pub parallel: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            max_path_length: 8,
            frames: 16,
            save_interval: 0,
            output: PathBuf::from("render.png"),
            seed: 0,
            bucket_size: DEFAULT_BUCKET_SIZE,
            ray_epsilon: 1e-4,
            russian_roulette: None,
            parallel: true,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidConfig(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.bucket_size == 0 {
            return Err(RenderError::InvalidConfig("bucket_size must be non-zero".into()));
        }
        if self.ray_epsilon.is_nan() || self.ray_epsilon < 0.0 {
            return Err(RenderError::InvalidConfig(format!(
                "ray_epsilon must be non-negative, got {}",
                self.ray_epsilon
            )));
        }
        Ok(())
    }

    pub fn path_settings(&self) -> PathSettings {
        PathSettings {
            max_path_length: self.max_path_length,
            ray_epsilon: self.ray_epsilon,
            russian_roulette: self.russian_roulette,
        }
    }
}

/// Renderer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Stopped,
    Running,
    /// Terminal; the renderer cannot be restarted
    ShutDown,
}

/// Counters accumulated over rendered frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    pub frames_rendered: u32,
    pub paths_traced: u64,
    pub paths_contributed: u64,
    pub elapsed: Duration,
}

impl RenderStats {
    fn add(&mut self, other: &RenderStats) {
        self.frames_rendered += other.frames_rendered;
        self.paths_traced += other.paths_traced;
        self.paths_contributed += other.paths_contributed;
        self.elapsed += other.elapsed;
    }
}

/// Progressive path tracer over a [`Scene`].
#[derive(Debug)]
pub struct Renderer {
    config: RenderConfig,
    state: RenderState,
    scene: Option<Scene>,
    /// 0-based index of the next frame
    nframe: u32,
    stats: RenderStats,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> RenderResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: RenderState::Stopped,
            scene: None,
            nframe: 0,
            stats: RenderStats::default(),
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Number of frames blended since the last reset.
    pub fn nframe(&self) -> u32 {
        self.nframe
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Mutable scene access. Call [`Renderer::reset`] after changes that
    /// invalidate the accumulated image.
    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// Stopped or running to running.
    pub fn start(&mut self) -> RenderResult<()> {
        if self.state == RenderState::ShutDown {
            log::warn!("Refusing to start a shut down renderer");
            return Err(RenderError::ShutDown);
        }
        self.state = RenderState::Running;
        log::info!("Renderer started");
        Ok(())
    }

    /// Running to stopped; the renderer can be started again.
    pub fn stop(&mut self) -> RenderResult<()> {
        if self.state == RenderState::ShutDown {
            return Err(RenderError::ShutDown);
        }
        self.state = RenderState::Stopped;
        log::info!("Renderer stopped after {} frames", self.nframe);
        Ok(())
    }

    /// Release the scene and enter the terminal state.
    pub fn shutdown(&mut self) -> RenderResult<()> {
        if self.state == RenderState::ShutDown {
            return Err(RenderError::ShutDown);
        }
        self.scene = None;
        self.state = RenderState::ShutDown;
        log::info!(
            "Renderer shut down: {} frames, {} paths in {:.2?}",
            self.stats.frames_rendered,
            self.stats.paths_traced,
            self.stats.elapsed
        );
        Ok(())
    }

    /// Install a scene and size its camera films to the configured
    /// resolution. The RGBA film is created when missing.
    pub fn set_scene(&mut self, mut scene: Scene) -> RenderResult<()> {
        if self.state == RenderState::ShutDown {
            return Err(RenderError::ShutDown);
        }
        let camera = scene.camera_mut();
        if camera.film(FILM_RGBA).is_none() {
            camera.add_film(FILM_RGBA, ImageFilm::new(self.config.width, self.config.height, 4)?);
        }
        camera.resize_films(self.config.width, self.config.height)?;

        self.scene = Some(scene);
        self.reset();
        Ok(())
    }

    /// Apply camera settings to the current scene and restart accumulation.
    pub fn set_camera_params(&mut self, params: &CameraParams) -> RenderResult<()> {
        if self.state == RenderState::ShutDown {
            return Err(RenderError::ShutDown);
        }
        let scene = self.scene.as_mut().ok_or(RenderError::NoScene)?;
        params.apply(scene.camera_mut())?;
        self.reset();
        Ok(())
    }

    /// Clear every film and start accumulating from frame 0.
    pub fn reset(&mut self) {
        self.nframe = 0;
        if let Some(scene) = self.scene.as_mut() {
            let camera = scene.camera_mut();
            let names: Vec<String> = camera.film_names().map(str::to_string).collect();
            for name in names {
                if let Some(film) = camera.film_mut(&name) {
                    film.fill(Color::ZERO);
                }
            }
        }
    }

    /// Render `frames` progressive frames, saving every `save_interval`
    /// frames (0 never saves).
    ///
    /// The token is checked before each frame and between bucket rows; a
    /// cancelled frame is discarded so the films only ever hold whole frames.
    pub fn render_frames(
        &mut self,
        frames: u32,
        save_interval: u32,
        cancel: &CancelToken,
    ) -> RenderResult<RenderStats> {
        let mut total = RenderStats::default();
        for _ in 0..frames {
            if cancel.is_cancelled() {
                log::info!("Render cancelled before frame {}", self.nframe);
                return Err(RenderError::Cancelled { frame: self.nframe });
            }
            let frame = self.render_frame(cancel)?;
            total.add(&frame);

            if save_interval > 0 && self.nframe % save_interval == 0 {
                let output = self.config.output.clone();
                self.save(&output)?;
            }
        }
        Ok(total)
    }

    /// Render and blend one frame.
    pub fn render_frame(&mut self, cancel: &CancelToken) -> RenderResult<RenderStats> {
        match self.state {
            RenderState::Running => {}
            RenderState::Stopped => return Err(RenderError::NotRunning),
            RenderState::ShutDown => return Err(RenderError::ShutDown),
        }
        let scene = self.scene.as_ref().ok_or(RenderError::NoScene)?;

        let start = Instant::now();
        let frame = self.nframe;
        let (width, height) = match scene.camera().film(FILM_RGBA) {
            Some(film) => (film.width(), film.height()),
            None => (self.config.width, self.config.height),
        };
        let camera = scene.camera();
        for name in camera.film_names() {
            let Some(film) = camera.film(name) else {
                continue;
            };
            if film.width() != width || film.height() != height {
                log::warn!("Film '{}' does not match the {}x{} frame", name, width, height);
                return Err(RenderError::FilmSize {
                    name: name.to_string(),
                    width: film.width(),
                    height: film.height(),
                    expected_width: width,
                    expected_height: height,
                });
            }
        }
        let buckets = generate_buckets(width, height, self.config.bucket_size);
        let ctx = FrameContext {
            scene,
            camera: scene.camera(),
            settings: self.config.path_settings(),
            width,
            height,
            seed: self.config.seed,
            frame,
            cancel,
        };

        let results: Vec<Option<BucketResult>> = if self.config.parallel {
            buckets
                .par_iter()
                .map_init(StratifiedRegularSampler::new, |sampler, bucket| {
                    render_bucket(bucket, &ctx, sampler)
                })
                .collect()
        } else {
            let mut sampler = StratifiedRegularSampler::new();
            buckets
                .iter()
                .map(|bucket| render_bucket(bucket, &ctx, &mut sampler))
                .collect()
        };

        let Some(results) = results.into_iter().collect::<Option<Vec<_>>>() else {
            log::info!("Frame {} cancelled, discarding partial results", frame);
            return Err(RenderError::Cancelled { frame });
        };

        let stats = self.blend(&results, frame)?;
        let stats = RenderStats {
            elapsed: start.elapsed(),
            ..stats
        };
        self.nframe += 1;
        self.stats.add(&stats);

        log::info!(
            "Frame {} done in {:.2?}: {} paths, {} contributed",
            frame,
            stats.elapsed,
            stats.paths_traced,
            stats.paths_contributed
        );
        Ok(stats)
    }

    /// Fold bucket results into the camera films.
    fn blend(&mut self, results: &[BucketResult], frame: u32) -> RenderResult<RenderStats> {
        let scene = self.scene.as_mut().ok_or(RenderError::NoScene)?;
        let camera = scene.camera_mut();
        let mut stats = RenderStats {
            frames_rendered: 1,
            ..Default::default()
        };

        for result in results {
            let b = &result.bucket;
            for (i, sample) in result.samples.iter().enumerate() {
                let x = b.x + i as u32 % b.width;
                let y = b.y + i as u32 / b.width;
                stats.paths_traced += 1;

                if sample.contributed {
                    stats.paths_contributed += 1;
                    if let Some(film) = camera.film_mut(FILM_RGBA) {
                        film.accumulate(x, y, sample.intensity, frame)?;
                    }
                }
                if let Some(film) = camera.film_mut(FILM_HIT) {
                    let coverage = if sample.primary_hit { 1.0 } else { 0.0 };
                    film.accumulate(x, y, Color::splat(coverage), frame)?;
                }
            }
        }
        Ok(stats)
    }

    /// The named film of the current camera.
    pub fn film(&self, name: &str) -> Option<&ImageFilm> {
        self.scene.as_ref()?.camera().film(name)
    }

    /// Save the RGBA film to `path`, and the Hit film next to it with a
    /// `_hit` suffix when the camera has one.
    pub fn save(&self, path: &Path) -> RenderResult<()> {
        let scene = self.scene.as_ref().ok_or(RenderError::NoScene)?;
        let camera = scene.camera();
        if let Some(film) = camera.film(FILM_RGBA) {
            film.save_file(path)?;
        }
        if let Some(film) = camera.film(FILM_HIT) {
            film.save_file(suffixed(path, "_hit"))?;
        }
        Ok(())
    }
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    path.with_file_name(name)
}
