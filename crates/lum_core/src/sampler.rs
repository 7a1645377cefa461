//! Pixel and direction samplers.
//!
//! Randomness always comes from an explicitly passed generator; nothing in
//! this module owns global random state.

use std::f32::consts::TAU;

use lum_math::{Vec2, Vec3};
use rand::{Rng, RngCore};

/// Uniform `f32` in `[0, 1)`.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// One sample per pixel at the pixel center, precomputed for a rectangular
/// pixel range.
///
/// The backing grid is only reallocated when the requested range has a
/// different shape from the current one.
#[derive(Debug, Clone, Default)]
pub struct StratifiedRegularSampler {
    x0: u32,
    y0: u32,
    width: u32,
    height: u32,
    grid: Vec<Vec2>,
    allocations: usize,
}

impl StratifiedRegularSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare samples for the pixels `[x0, x0 + width) x [y0, y0 + height)`.
    pub fn prepare(&mut self, x0: u32, y0: u32, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) || self.grid.is_empty() {
            self.grid = vec![Vec2::ZERO; (width * height) as usize];
            self.width = width;
            self.height = height;
            self.allocations += 1;
            log::trace!("Sampler grid resized to {}x{}", width, height);
        } else if (x0, y0) == (self.x0, self.y0) {
            return;
        }
        self.x0 = x0;
        self.y0 = y0;

        for j in 0..height {
            for i in 0..width {
                self.grid[(j * width + i) as usize] =
                    Vec2::new((x0 + i) as f32 + 0.5, (y0 + j) as f32 + 0.5);
            }
        }
    }

    /// Sample position for image pixel `(x, y)`, which must lie in the
    /// prepared range.
    pub fn sample(&self, x: u32, y: u32) -> Option<Vec2> {
        if x < self.x0 || y < self.y0 || x >= self.x0 + self.width || y >= self.y0 + self.height {
            return None;
        }
        let idx = ((y - self.y0) * self.width + (x - self.x0)) as usize;
        self.grid.get(idx).copied()
    }

    /// All samples of the prepared range in row-major order.
    pub fn samples(&self) -> &[Vec2] {
        &self.grid
    }

    /// Shape `(width, height)` of the current grid.
    pub fn shape(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of times the grid has been (re)allocated.
    pub fn allocations(&self) -> usize {
        self.allocations
    }
}

/// Uniform-by-area samples on the unit disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitDiskUniformSampler;

impl UnitDiskUniformSampler {
    /// Map `(u1, u2)` in `[0, 1)^2` to the disk: `r = sqrt(u1)`, `theta = 2 pi u2`.
    pub fn sample_with(&self, u1: f32, u2: f32) -> Vec2 {
        let r = u1.sqrt();
        let (sin, cos) = (TAU * u2).sin_cos();
        Vec2::new(r * cos, r * sin)
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> Vec2 {
        let u1 = gen_f32(rng);
        let u2 = gen_f32(rng);
        self.sample_with(u1, u2)
    }
}

/// Hemisphere samples around +Z made by lifting a disk sample.
///
/// The resulting density is uniform over the projected disk, not cosine
/// weighted; callers scale the BRDF by pi to compensate.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitHemisphereUniformSampler {
    disk: UnitDiskUniformSampler,
}

impl UnitHemisphereUniformSampler {
    /// Lift `(x, y)` to `(x, y, sqrt(max(0, 1 - x^2 - y^2)))` and renormalize.
    pub fn from_disk(&self, p: Vec2) -> Vec3 {
        let z = (1.0 - p.x * p.x - p.y * p.y).max(0.0).sqrt();
        Vec3::new(p.x, p.y, z).normalize()
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> Vec3 {
        self.from_disk(self.disk.sample(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_stratified_samples_are_pixel_centers() {
        let mut sampler = StratifiedRegularSampler::new();
        sampler.prepare(10, 20, 4, 3);
        assert_eq!(sampler.samples().len(), 12);
        assert_eq!(sampler.sample(10, 20), Some(Vec2::new(10.5, 20.5)));
        assert_eq!(sampler.sample(13, 22), Some(Vec2::new(13.5, 22.5)));
        assert_eq!(sampler.sample(14, 22), None);
        assert_eq!(sampler.sample(9, 20), None);
    }

    #[test]
    fn test_stratified_reallocates_only_on_shape_change() {
        let mut sampler = StratifiedRegularSampler::new();
        sampler.prepare(0, 0, 8, 8);
        assert_eq!(sampler.allocations(), 1);

        // Same shape, different origin: reuse the grid
        sampler.prepare(8, 0, 8, 8);
        assert_eq!(sampler.allocations(), 1);
        assert_eq!(sampler.sample(8, 0), Some(Vec2::new(8.5, 0.5)));

        // Same range again
        sampler.prepare(8, 0, 8, 8);
        assert_eq!(sampler.allocations(), 1);

        sampler.prepare(0, 8, 8, 4);
        assert_eq!(sampler.allocations(), 2);
        assert_eq!(sampler.shape(), (8, 4));
    }

    #[test]
    fn test_disk_samples_inside_unit_disk() {
        let disk = UnitDiskUniformSampler;
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let p = disk.sample(&mut rng);
            assert!(p.length_squared() <= 1.0 + 1e-6);
        }
        assert_eq!(disk.sample_with(0.0, 0.3), Vec2::ZERO);
        assert!((disk.sample_with(1.0, 0.0) - Vec2::X).length() < 1e-6);
    }

    #[test]
    fn test_disk_density_is_uniform_by_area() {
        // Rings of equal area should receive roughly equal counts, as should
        // the four quadrants.
        let disk = UnitDiskUniformSampler;
        let mut rng = StdRng::seed_from_u64(1234);
        let n = 40_000;
        let rings = 4;
        let mut ring_counts = vec![0usize; rings];
        let mut quadrant_counts = [0usize; 4];
        for _ in 0..n {
            let p = disk.sample(&mut rng);
            let r2 = p.length_squared().min(0.999_999);
            ring_counts[(r2 * rings as f32) as usize] += 1;
            let q = (p.x >= 0.0) as usize * 2 + (p.y >= 0.0) as usize;
            quadrant_counts[q] += 1;
        }

        let expected = n as f32 / rings as f32;
        for count in ring_counts {
            assert!((count as f32 - expected).abs() / expected < 0.05, "ring count {}", count);
        }
        let expected = n as f32 / 4.0;
        for count in quadrant_counts {
            assert!((count as f32 - expected).abs() / expected < 0.05, "quadrant count {}", count);
        }
    }

    #[test]
    fn test_hemisphere_samples_are_unit_and_upper() {
        let hemi = UnitHemisphereUniformSampler::default();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..5_000 {
            let d = hemi.sample(&mut rng);
            assert!((d.length() - 1.0).abs() < 1e-5);
            assert!(d.z >= 0.0);
        }
        assert_eq!(hemi.from_disk(Vec2::ZERO), Vec3::Z);
    }

    #[test]
    fn test_seeded_samplers_are_reproducible() {
        let disk = UnitDiskUniformSampler;
        let mut a = StdRng::seed_from_u64(5);
        let mut b = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            assert_eq!(disk.sample(&mut a), disk.sample(&mut b));
        }
    }
}
