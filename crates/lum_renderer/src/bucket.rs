//! Bucket-based tile rendering.
//!
//! Divides the image into tiles (buckets) that are traced independently,
//! each with its own random stream, so they can run in parallel with rayon
//! and still produce the same frame as a serial render.

use lum_core::{Camera, Scene, StratifiedRegularSampler};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cancel::CancelToken;
use crate::integrator::{trace_path, PathSample, PathSettings};

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// X coordinate of bucket's top-left corner
    pub x: u32,
    /// Y coordinate of bucket's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Index of this bucket in the render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    /// Get the total number of pixels in this bucket.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }
}

/// Default bucket size in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 32;

/// Generate buckets for an image, sorted in spiral order from center.
///
/// Buckets near the center are rendered first so the most important part
/// of a progressive preview fills in early.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let bucket_size = bucket_size.max(1);
    let mut buckets = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let bw = bucket_size.min(width - x);
            let bh = bucket_size.min(height - y);
            buckets.push(Bucket::new(x, y, bw, bh, buckets.len()));
            x += bucket_size;
        }
        y += bucket_size;
    }

    sort_spiral(&mut buckets, width, height);
    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }

    buckets
}

/// Sort buckets by distance from image center.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;

    let dist = |b: &Bucket| {
        let cx = b.x as f32 + b.width as f32 / 2.0;
        let cy = b.y as f32 + b.height as f32 / 2.0;
        (cx - center_x).powi(2) + (cy - center_y).powi(2)
    };

    // Stable sort keeps row-major order among equidistant buckets
    buckets.sort_by(|a, b| {
        dist(a)
            .partial_cmp(&dist(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Seed of the random stream for one bucket of one frame.
pub fn bucket_seed(seed: u64, frame: u32, bucket: usize) -> u64 {
    // splitmix64 finalizer over the combined key
    let mut z = seed
        ^ (frame as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (bucket as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Result of rendering a bucket.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,
    /// One path sample per pixel, row-major within the bucket
    pub samples: Vec<PathSample>,
}

/// Inputs shared by every bucket of a frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub settings: PathSettings,
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    pub frame: u32,
    pub cancel: &'a CancelToken,
}

/// Trace one sample per pixel of `bucket`.
///
/// Returns `None` if the render was cancelled part way; cancellation is
/// checked once per bucket row.
pub fn render_bucket(
    bucket: &Bucket,
    ctx: &FrameContext<'_>,
    sampler: &mut StratifiedRegularSampler,
) -> Option<BucketResult> {
    let mut rng = StdRng::seed_from_u64(bucket_seed(ctx.seed, ctx.frame, bucket.index));
    sampler.prepare(bucket.x, bucket.y, bucket.width, bucket.height);

    let mut samples = Vec::with_capacity(bucket.pixel_count() as usize);
    for row in sampler.samples().chunks(bucket.width.max(1) as usize) {
        if ctx.cancel.is_cancelled() {
            return None;
        }
        for p in row {
            // Film row 0 is the top of the screen
            let u = p.x / ctx.width as f32;
            let v = 1.0 - p.y / ctx.height as f32;
            let ray = ctx.camera.get_ray(u, v);
            samples.push(trace_path(ctx.scene, ray, &ctx.settings, &mut rng));
        }
    }

    Some(BucketResult {
        bucket: *bucket,
        samples,
    })
}
