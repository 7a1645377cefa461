use crate::{Color, Interval, Vec3, WHITE};

/// A ray in 3D space together with the transport state of the path it
/// belongs to.
///
/// A ray is created once per pixel sample and mutated in place as the path
/// bounces: `origin`/`direction` move to each new segment, `reflectance`
/// accumulates the multiplicative throughput and `intensity` the additive
/// radiance estimate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
    /// Valid parametric range `[t_min, t_max]`.
    pub t: Interval,
    /// Number of segments traced so far.
    pub path_length: u32,
    pub reflectance: Color,
    pub intensity: Color,
}

impl Ray {
    /// Create a fresh ray with unit reflectance and zero intensity.
    ///
    /// `direction` is normalized here.
    pub fn new(origin: Vec3, direction: Vec3, t: Interval) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
            t,
            path_length: 0,
            reflectance: WHITE,
            intensity: Color::ZERO,
        }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Start the next path segment at `origin` heading along `direction`.
    ///
    /// Transport state is kept; the parametric range becomes `t`.
    pub fn advance(&mut self, origin: Vec3, direction: Vec3, t: Interval) {
        self.origin = origin;
        self.direction = direction.normalize();
        self.t = t;
        self.path_length += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_creation() {
        let ray = Ray::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 2.0, 0.0),
            Interval::new(0.1, 100.0),
        );

        assert_eq!(ray.origin, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ray.direction, Vec3::Y);
        assert_eq!(ray.t, Interval::new(0.1, 100.0));
        assert_eq!(ray.path_length, 0);
        assert_eq!(ray.reflectance, Color::ONE);
        assert_eq!(ray.intensity, Color::ZERO);
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X, Interval::UNIVERSE);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_advance_keeps_transport_state() {
        let mut ray = Ray::new(Vec3::ZERO, Vec3::Z, Interval::new(1.0, 10.0));
        ray.reflectance = Color::splat(0.5);
        ray.advance(Vec3::ONE, Vec3::new(3.0, 0.0, 0.0), Interval::new(0.001, f32::INFINITY));

        assert_eq!(ray.origin, Vec3::ONE);
        assert_eq!(ray.direction, Vec3::X);
        assert_eq!(ray.path_length, 1);
        assert_eq!(ray.reflectance, Color::splat(0.5));
        assert_eq!(ray.t.min, 0.001);
    }
}
