//! Orthonormal basis used for shading frames.

use crate::Vec3;
use thiserror::Error;

/// Inputs shorter than this are treated as zero when normalizing.
const MIN_LENGTH: f32 = 1e-12;

/// Errors raised while constructing a basis.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum BasisError {
    #[error("Cannot normalize near-zero vector {0:?}")]
    DegenerateVector(Vec3),

    #[error("Vectors {0:?} and {1:?} are parallel")]
    ParallelVectors(Vec3, Vec3),
}

/// Right-handed orthonormal basis `(u, v, w)`; `w` is the surface normal.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Onb {
    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
}

impl Onb {
    /// The world axes.
    pub const IDENTITY: Onb = Onb {
        u: Vec3::X,
        v: Vec3::Y,
        w: Vec3::Z,
    };

    /// Build a basis from two spanning vectors.
    ///
    /// `u` follows `a`, `w` is the normal `a x b`, and `v = w x u`.
    pub fn from_two(a: Vec3, b: Vec3) -> Result<Self, BasisError> {
        let u = normalize(a)?;
        let n = a.cross(b);
        if n.length_squared() < MIN_LENGTH * MIN_LENGTH {
            return Err(BasisError::ParallelVectors(a, b));
        }
        let w = n.normalize();
        let v = w.cross(u);
        Ok(Self { u, v, w })
    }

    /// Build a basis whose `w` axis is `n`.
    pub fn from_normal(n: Vec3) -> Result<Self, BasisError> {
        let w = normalize(n)?;
        // Pick the world axis least aligned with w as the helper.
        let helper = if w.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
        let v = w.cross(helper).normalize();
        let u = v.cross(w);
        Ok(Self { u, v, w })
    }

    /// The surface normal.
    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.w
    }

    /// Mirror the basis so `w` points the other way, keeping it right-handed.
    pub fn flipped(&self) -> Self {
        Self {
            u: self.v,
            v: self.u,
            w: -self.w,
        }
    }

    /// Express local coordinates `(x, y, z)` in world space.
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.u * local.x + self.v * local.y + self.w * local.z
    }

    /// Express a world-space vector in basis coordinates.
    #[inline]
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        Vec3::new(world.dot(self.u), world.dot(self.v), world.dot(self.w))
    }
}

fn normalize(a: Vec3) -> Result<Vec3, BasisError> {
    let len = a.length();
    if len < MIN_LENGTH {
        return Err(BasisError::DegenerateVector(a));
    }
    Ok(a / len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(b: &Onb) {
        assert!((b.u.length() - 1.0).abs() < 1e-5);
        assert!((b.v.length() - 1.0).abs() < 1e-5);
        assert!((b.w.length() - 1.0).abs() < 1e-5);
        assert!(b.u.dot(b.v).abs() < 1e-5);
        assert!(b.u.dot(b.w).abs() < 1e-5);
        assert!(b.v.dot(b.w).abs() < 1e-5);
        // Right-handed
        assert!((b.u.cross(b.v) - b.w).length() < 1e-5);
    }

    #[test]
    fn test_from_two_xy_plane() {
        let basis = Onb::from_two(Vec3::new(2.0, 0.0, 0.0), Vec3::new(1.0, 3.0, 0.0)).unwrap();
        assert_orthonormal(&basis);
        assert!((basis.u - Vec3::X).length() < 1e-6);
        assert!((basis.w - Vec3::Z).length() < 1e-6);
        assert!((basis.v - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_from_two_rejects_degenerate() {
        assert_eq!(
            Onb::from_two(Vec3::ZERO, Vec3::X),
            Err(BasisError::DegenerateVector(Vec3::ZERO))
        );
        assert!(matches!(
            Onb::from_two(Vec3::X, Vec3::new(-2.0, 0.0, 0.0)),
            Err(BasisError::ParallelVectors(_, _))
        ));
    }

    #[test]
    fn test_from_normal() {
        for n in [Vec3::X, Vec3::Y, -Vec3::Z, Vec3::new(1.0, 1.0, 1.0)] {
            let basis = Onb::from_normal(n).unwrap();
            assert_orthonormal(&basis);
            assert!((basis.normal() - n.normalize()).length() < 1e-5);
        }
    }

    #[test]
    fn test_flipped() {
        let basis = Onb::from_normal(Vec3::new(0.3, -0.2, 0.9)).unwrap();
        let flipped = basis.flipped();
        assert_orthonormal(&flipped);
        assert_eq!(flipped.w, -basis.w);
    }

    #[test]
    fn test_local_world_roundtrip() {
        let basis = Onb::from_two(Vec3::new(1.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 1.0)).unwrap();
        let world = Vec3::new(0.2, -0.7, 0.4);
        let back = basis.to_world(basis.to_local(world));
        assert!((back - world).length() < 1e-5);
        assert_eq!(Onb::IDENTITY.to_world(world), world);
    }
}
