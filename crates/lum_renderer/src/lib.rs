//! LUM Renderer - Progressive CPU path tracer.
//!
//! Traces one path per pixel per frame and refines the camera films as a
//! running average. Frames are split into buckets rendered in parallel
//! with rayon; every bucket has its own seeded random stream, so results
//! do not depend on thread scheduling.

pub mod bucket;
pub mod cancel;
pub mod integrator;
pub mod renderer;

pub use bucket::{generate_buckets, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use cancel::CancelToken;
pub use integrator::{trace_path, PathSample, PathSettings};
pub use renderer::{RenderConfig, RenderError, RenderResult, RenderState, RenderStats, Renderer};
