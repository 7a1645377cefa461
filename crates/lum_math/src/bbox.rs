use crate::Vec3;

/// Axis-aligned bounding box stored as componentwise min/max corners.
///
/// An invalidated box (`min = +inf`, `max = -inf`) is the empty volume and is
/// the identity for [`BBox::insert_point`] and [`BBox::insert_bbox`]. Boxes
/// only grow through insertion; the only way to shrink one is
/// [`BBox::invalidate`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox {
    /// The empty box.
    pub const INVALID: BBox = BBox {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a box from two corners, ordering each axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The unit cube `[0,0,0]-[1,1,1]`.
    pub fn unit_cube() -> Self {
        Self::new(Vec3::ZERO, Vec3::ONE)
    }

    /// Create the smallest box containing every point of the iterator.
    ///
    /// Returns [`BBox::INVALID`] for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut bbox = Self::INVALID;
        for p in points {
            bbox.insert_point(p);
        }
        bbox
    }

    /// Reset to the empty box.
    pub fn invalidate(&mut self) {
        *self = Self::INVALID;
    }

    /// Grow the box to contain `p`.
    pub fn insert_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow the box to contain `other`. Inserting an empty box is a no-op.
    pub fn insert_bbox(&mut self, other: &BBox) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// True unless the box is empty (`min[i] > max[i]` on some axis).
    ///
    /// Flat boxes, such as the bounds of a single planar triangle, still
    /// count as having volume here: they occupy space in the scene.
    pub fn has_volume(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Size along each axis, zero for an empty box.
    pub fn extent(&self) -> Vec3 {
        if self.has_volume() {
            self.max - self.min
        } else {
            Vec3::ZERO
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns true if `p` lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }
}

impl Default for BBox {
    fn default() -> Self {
        Self::INVALID
    }
}
