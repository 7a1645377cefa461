//! Triangle mesh geometry.
//!
//! A `TriMesh` stores shared vertex positions plus per-face index triples,
//! with optional parallel index lists for texture coordinates and normals.
//! Intersection is a linear scan over all faces.

use lum_math::{BBox, Ray, Vec2, Vec3};

use crate::hit::{HitRecord, Primitive};
use crate::triangle::intersect_triangle;

/// A named triangle mesh.
#[derive(Clone, Debug)]
pub struct TriMesh {
    /// Mesh name, unique within a scene
    pub name: String,

    /// Vertex positions
    pub vertices: Vec<Vec3>,

    /// Triangle vertex indices
    pub faces: Vec<[u32; 3]>,

    /// Texture coordinates and their per-face indices (parallel to `faces`)
    pub texcoords: Vec<Vec2>,
    pub texcoord_faces: Option<Vec<[u32; 3]>>,

    /// Normals and their per-face indices (parallel to `faces`)
    pub normals: Vec<Vec3>,
    pub normal_faces: Option<Vec<[u32; 3]>>,

    /// Name of the material assigned by the scene description
    pub material_name: Option<String>,

    /// Resolved index into the scene material table
    pub material_index: Option<usize>,

    bbox: BBox,
}

impl TriMesh {
    /// Create a mesh from positions and face indices.
    pub fn new(name: impl Into<String>, vertices: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        let mut mesh = Self {
            name: name.into(),
            vertices,
            faces,
            texcoords: Vec::new(),
            texcoord_faces: None,
            normals: Vec::new(),
            normal_faces: None,
            material_name: None,
            material_index: None,
            bbox: BBox::INVALID,
        };
        mesh.update_bbox();
        mesh
    }

    /// Attach texture coordinates with one index triple per face.
    pub fn with_texcoords(mut self, texcoords: Vec<Vec2>, faces: Vec<[u32; 3]>) -> Self {
        self.texcoords = texcoords;
        self.texcoord_faces = Some(faces);
        self
    }

    /// Attach normals with one index triple per face.
    pub fn with_normals(mut self, normals: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        self.normals = normals;
        self.normal_faces = Some(faces);
        self
    }

    /// Name the material this mesh should be bound to.
    pub fn with_material(mut self, material_name: impl Into<String>) -> Self {
        self.material_name = Some(material_name.into());
        self
    }

    /// Recompute the bounding box from all vertex positions.
    pub fn update_bbox(&mut self) {
        self.bbox = BBox::from_points(self.vertices.iter().copied());
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Vertex positions of face `i`, or `None` if the face references a
    /// vertex that does not exist.
    pub fn triangle(&self, i: usize) -> Option<[Vec3; 3]> {
        let [a, b, c] = *self.faces.get(i)?;
        Some([
            *self.vertices.get(a as usize)?,
            *self.vertices.get(b as usize)?,
            *self.vertices.get(c as usize)?,
        ])
    }

    /// Count faces whose indices fall outside their attribute arrays.
    ///
    /// Such faces are skipped during intersection.
    pub fn invalid_face_count(&self) -> usize {
        let out_of_range = |f: &[u32; 3], len: usize| f.iter().any(|&i| i as usize >= len);
        let mut count = 0;
        for (i, face) in self.faces.iter().enumerate() {
            let bad_uv = self
                .texcoord_faces
                .as_ref()
                .and_then(|tf| tf.get(i))
                .is_some_and(|tf| out_of_range(tf, self.texcoords.len()));
            if out_of_range(face, self.vertices.len()) || bad_uv {
                count += 1;
            }
        }
        count
    }

    /// Interpolate the texture coordinates of face `i` at `(b1, b2)`.
    ///
    /// Falls back to the barycentrics themselves when the mesh has no
    /// texcoords.
    fn tex_uv(&self, face: usize, b1: f32, b2: f32) -> Vec2 {
        let lookup = || {
            let [a, b, c] = *self.texcoord_faces.as_ref()?.get(face)?;
            let ta = *self.texcoords.get(a as usize)?;
            let tb = *self.texcoords.get(b as usize)?;
            let tc = *self.texcoords.get(c as usize)?;
            Some(ta * (1.0 - b1 - b2) + tb * b1 + tc * b2)
        };
        lookup().unwrap_or(Vec2::new(b1, b2))
    }
}

impl Primitive for TriMesh {
    fn name(&self) -> &str {
        &self.name
    }

    fn ray_intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let mut range = ray.t;
        let mut closest: Option<(usize, crate::triangle::TriangleHit)> = None;

        for face in 0..self.faces.len() {
            let Some([v0, v1, v2]) = self.triangle(face) else {
                continue;
            };
            if let Some(hit) = intersect_triangle(v0, v1, v2, ray.origin, ray.direction, range) {
                range = range.with_max(hit.t);
                closest = Some((face, hit));
            }
        }

        let (face, hit) = closest?;
        Some(HitRecord {
            distance: hit.t,
            position: ray.at(hit.t),
            primitive: Some(self),
            basis: hit.basis,
            material_index: self.material_index,
            face,
            barycentric: Vec2::new(hit.b1, hit.b2),
            tex_uv: self.tex_uv(face, hit.b1, hit.b2),
        })
    }

    fn bbox(&self) -> BBox {
        self.bbox
    }

    fn material_index(&self) -> Option<usize> {
        self.material_index
    }
}
