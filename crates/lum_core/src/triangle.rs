//! Triangle primitive.
//!
//! Uses the Cramer's-rule (signed volume) formulation for ray-triangle
//! intersection.

use lum_math::{BBox, Interval, Onb, Ray, Vec2, Vec3};

use crate::hit::{HitRecord, Primitive};

/// Raw result of a ray-triangle test.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TriangleHit {
    pub t: f32,
    pub b1: f32,
    pub b2: f32,
    pub basis: Onb,
}

/// Intersect the segment `origin + t * dir`, `t` in `range`, with the
/// triangle `(v0, v1, v2)`.
///
/// A divisor of exactly zero means the ray is parallel to the triangle plane
/// and is reported as a miss; there is no tolerance band around zero.
pub(crate) fn intersect_triangle(
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    origin: Vec3,
    dir: Vec3,
    range: Interval,
) -> Option<TriangleHit> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let s1 = dir.cross(e2);
    let divisor = s1.dot(e1);
    if divisor == 0.0 {
        return None;
    }
    let inv_divisor = 1.0 / divisor;

    // First barycentric coordinate
    let d = origin - v0;
    let b1 = d.dot(s1) * inv_divisor;
    if !(0.0..=1.0).contains(&b1) {
        return None;
    }

    // Second barycentric coordinate
    let s2 = d.cross(e1);
    let b2 = dir.dot(s2) * inv_divisor;
    if b2 < 0.0 || b1 + b2 > 1.0 {
        return None;
    }

    let t = e2.dot(s2) * inv_divisor;
    if !range.contains(t) {
        return None;
    }

    match Onb::from_two(e1, e2) {
        Ok(basis) => Some(TriangleHit { t, b1, b2, basis }),
        Err(err) => {
            log::trace!("Rejecting hit on degenerate triangle: {}", err);
            None
        }
    }
}

/// A single triangle.
#[derive(Debug, Clone)]
pub struct Triangle {
    name: String,
    vertices: [Vec3; 3],
    material_index: Option<usize>,
    bbox: BBox,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(name: impl Into<String>, v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            name: name.into(),
            vertices: [v0, v1, v2],
            material_index: None,
            bbox: BBox::from_points([v0, v1, v2]),
        }
    }

    /// Set the material table index.
    pub fn with_material_index(mut self, index: usize) -> Self {
        self.material_index = Some(index);
        self
    }

    pub fn vertices(&self) -> &[Vec3; 3] {
        &self.vertices
    }
}

impl Primitive for Triangle {
    fn name(&self) -> &str {
        &self.name
    }

    fn ray_intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let [v0, v1, v2] = self.vertices;
        let hit = intersect_triangle(v0, v1, v2, ray.origin, ray.direction, ray.t)?;
        let barycentric = Vec2::new(hit.b1, hit.b2);
        Some(HitRecord {
            distance: hit.t,
            position: ray.at(hit.t),
            primitive: Some(self),
            basis: hit.basis,
            material_index: self.material_index,
            face: 0,
            barycentric,
            tex_uv: barycentric,
        })
    }

    fn bbox(&self) -> BBox {
        self.bbox
    }

    fn material_index(&self) -> Option<usize> {
        self.material_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy_triangle() -> Triangle {
        // Triangle in XY plane at z=-1
        Triangle::new(
            "tri",
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
        )
    }

    #[test]
    fn test_triangle_hit() {
        let tri = xy_triangle();
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Interval::new(0.001, 100.0));

        let rec = tri.ray_intersect(&ray).expect("ray through the center must hit");
        assert!((rec.distance - 1.0).abs() < 0.001);
        assert!((rec.position - Vec3::new(0.0, 0.0, -1.0)).length() < 0.001);
        assert!(rec.is_hit());
        // Normal is e1 x e2, +Z for this winding
        assert!((rec.basis.w - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_triangle_hit_barycentric_interior_points() {
        let tri = xy_triangle();
        let [v0, v1, v2] = *tri.vertices();
        for (b1, b2) in [(0.2, 0.2), (0.5, 0.1), (0.1, 0.7), (0.33, 0.33)] {
            let target = v0 + b1 * (v1 - v0) + b2 * (v2 - v0);
            let origin = Vec3::new(0.3, -0.2, 4.0);
            let ray = Ray::new(origin, target - origin, Interval::new(0.0, 100.0));
            let rec = tri.ray_intersect(&ray).expect("interior point must hit");
            assert!((rec.barycentric.x - b1).abs() < 1e-4);
            assert!((rec.barycentric.y - b2).abs() < 1e-4);
        }
    }

    #[test]
    fn test_triangle_miss_outside() {
        let tri = xy_triangle();
        let ray = Ray::new(
            Vec3::new(5.0, 5.0, 0.0),
            Vec3::new(0.0, 0.0, -1.0),
            Interval::new(0.0, 100.0),
        );
        assert!(tri.ray_intersect(&ray).is_none());

        // Ray pointing away
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), Interval::new(0.001, 100.0));
        assert!(tri.ray_intersect(&ray).is_none());
    }

    #[test]
    fn test_triangle_parallel_ray_misses() {
        let tri = xy_triangle();
        // Lies in a plane parallel to the triangle: divisor is exactly zero
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::X, Interval::new(0.0, 100.0));
        assert!(tri.ray_intersect(&ray).is_none());

        // Inside the triangle's own plane
        let ray = Ray::new(Vec3::new(-5.0, 0.0, -1.0), Vec3::X, Interval::new(0.0, 100.0));
        assert!(tri.ray_intersect(&ray).is_none());
    }

    #[test]
    fn test_triangle_respects_interval() {
        let tri = xy_triangle();
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Interval::new(0.001, 0.5));
        assert!(tri.ray_intersect(&ray).is_none());

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Interval::new(2.0, 5.0));
        assert!(tri.ray_intersect(&ray).is_none());
    }

    #[test]
    fn test_degenerate_triangle_never_hits() {
        let tri = Triangle::new("line", Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0));
        let ray = Ray::new(Vec3::new(0.5, 0.0, 1.0), -Vec3::Z, Interval::new(0.0, 10.0));
        assert!(tri.ray_intersect(&ray).is_none());
    }

    #[test]
    fn test_triangle_bbox_and_material() {
        let tri = xy_triangle().with_material_index(3);
        let bbox = tri.bbox();
        assert_eq!(bbox.min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(bbox.max, Vec3::new(1.0, 1.0, -1.0));
        assert_eq!(tri.material_index(), Some(3));
    }
}
