//! Primitive trait and HitRecord for ray-primitive intersection.

use std::fmt;

use lum_math::{BBox, Onb, Ray, Vec2, Vec3};

/// Record of a ray-primitive intersection.
///
/// The "no hit" state is `distance == f32::INFINITY` with no primitive.
#[derive(Clone)]
pub struct HitRecord<'a> {
    /// Ray parameter of the closest hit
    pub distance: f32,
    /// Point of intersection
    pub position: Vec3,
    /// The primitive that was hit
    pub primitive: Option<&'a dyn Primitive>,
    /// Shading frame; `basis.w` is the geometric normal
    pub basis: Onb,
    /// Index into the scene material table
    pub material_index: Option<usize>,
    /// Face index within the primitive
    pub face: usize,
    /// Barycentric coordinates (b1, b2) of the hit on that face
    pub barycentric: Vec2,
    /// Texture coordinates, interpolated when the primitive has them
    pub tex_uv: Vec2,
}

impl<'a> Default for HitRecord<'a> {
    fn default() -> Self {
        Self {
            distance: f32::INFINITY,
            position: Vec3::ZERO,
            primitive: None,
            basis: Onb::IDENTITY,
            material_index: None,
            face: 0,
            barycentric: Vec2::ZERO,
            tex_uv: Vec2::ZERO,
        }
    }
}

impl<'a> HitRecord<'a> {
    /// True once a primitive has been recorded.
    pub fn is_hit(&self) -> bool {
        self.primitive.is_some() && self.distance.is_finite()
    }

    /// Keep whichever of `self` and `other` is closer.
    pub fn closest(self, other: HitRecord<'a>) -> HitRecord<'a> {
        if other.distance < self.distance {
            other
        } else {
            self
        }
    }
}

impl fmt::Debug for HitRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitRecord")
            .field("distance", &self.distance)
            .field("position", &self.position)
            .field("primitive", &self.primitive.map(|p| p.name().to_string()))
            .field("normal", &self.basis.w)
            .field("material_index", &self.material_index)
            .field("face", &self.face)
            .finish()
    }
}

/// Geometry that can be intersected by rays.
pub trait Primitive: Send + Sync + fmt::Debug {
    /// Name used for lookups and debug output.
    fn name(&self) -> &str;

    /// Find the closest intersection within `ray.t`.
    fn ray_intersect(&self, ray: &Ray) -> Option<HitRecord<'_>>;

    /// Get the axis-aligned bounding box of this primitive.
    fn bbox(&self) -> BBox;

    /// Material table index, when one has been assigned.
    fn material_index(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_no_hit() {
        let rec = HitRecord::default();
        assert!(!rec.is_hit());
        assert_eq!(rec.distance, f32::INFINITY);
        assert!(rec.primitive.is_none());
    }

    #[test]
    fn test_closest_prefers_smaller_distance() {
        let near = HitRecord {
            distance: 1.0,
            ..Default::default()
        };
        let far = HitRecord {
            distance: 4.0,
            ..Default::default()
        };
        assert_eq!(far.clone().closest(near.clone()).distance, 1.0);
        assert_eq!(near.closest(far).distance, 1.0);
    }
}
