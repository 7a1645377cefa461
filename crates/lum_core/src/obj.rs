//! Wavefront OBJ ingestion via `tobj`.
//!
//! Each OBJ model becomes one [`TriMesh`]; faces are triangulated and the
//! texcoord/normal index lists are kept parallel to the position faces.

use std::path::Path;

use lum_math::{Vec2, Vec3};

use crate::mesh::TriMesh;
use crate::scene::{SceneError, SceneResult};

/// Load every model of an OBJ file as a triangle mesh.
///
/// Meshes are named after their OBJ model (or `<file stem>_<index>` when the
/// model is unnamed) and carry the name of their OBJ material, if any.
pub fn load_obj_meshes(path: &Path) -> SceneResult<Vec<TriMesh>> {
    if !path.is_file() {
        return Err(SceneError::MissingGeometryFile(path.to_path_buf()));
    }

    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: false,
        ..Default::default()
    };
    let (models, materials) = tobj::load_obj(path, &options).map_err(|e| SceneError::Obj {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let material_names: Vec<String> = match materials {
        Ok(materials) => materials.into_iter().map(|m| m.name).collect(),
        Err(e) => {
            log::warn!("No usable MTL for {}: {}", path.display(), e);
            Vec::new()
        }
    };

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "mesh".to_string());

    let meshes = models
        .into_iter()
        .enumerate()
        .map(|(i, model)| {
            let name = if model.name.is_empty() {
                format!("{}_{}", stem, i)
            } else {
                model.name
            };
            let m = model.mesh;

            let vertices = m
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2]))
                .collect();
            let mut mesh = TriMesh::new(name, vertices, triples(&m.indices));

            if !m.texcoords.is_empty() && m.texcoord_indices.len() == m.indices.len() {
                let texcoords = m
                    .texcoords
                    .chunks_exact(2)
                    .map(|t| Vec2::new(t[0], t[1]))
                    .collect();
                mesh = mesh.with_texcoords(texcoords, triples(&m.texcoord_indices));
            }
            if !m.normals.is_empty() && m.normal_indices.len() == m.indices.len() {
                let normals = m
                    .normals
                    .chunks_exact(3)
                    .map(|n| Vec3::new(n[0], n[1], n[2]))
                    .collect();
                mesh = mesh.with_normals(normals, triples(&m.normal_indices));
            }
            if let Some(name) = m.material_id.and_then(|id| material_names.get(id)) {
                mesh = mesh.with_material(name.clone());
            }

            let invalid = mesh.invalid_face_count();
            if invalid > 0 {
                log::warn!("Mesh '{}' has {} faces with out-of-range indices", mesh.name, invalid);
            }
            log::debug!(
                "Loaded OBJ model '{}': {} vertices, {} triangles",
                mesh.name,
                mesh.vertex_count(),
                mesh.triangle_count()
            );
            mesh
        })
        .collect();

    Ok(meshes)
}

fn triples(indices: &[u32]) -> Vec<[u32; 3]> {
    indices.chunks_exact(3).map(|f| [f[0], f[1], f[2]]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_scene_error() {
        let err = load_obj_meshes(Path::new("/definitely/not/here.obj")).unwrap_err();
        assert!(matches!(err, SceneError::MissingGeometryFile(_)));
    }

    #[test]
    fn test_load_quad() {
        let path = std::env::temp_dir().join(format!("lum_obj_test_{}.obj", std::process::id()));
        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "o floor").unwrap();
            writeln!(f, "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0").unwrap();
            writeln!(f, "vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1").unwrap();
            writeln!(f, "f 1/1 2/2 3/3 4/4").unwrap();
        }

        let meshes = load_obj_meshes(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.name, "floor");
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.texcoord_faces.as_ref().map(|f| f.len()), Some(2));
        assert!(mesh.material_name.is_none());
    }

    #[test]
    fn test_triples() {
        assert_eq!(triples(&[0, 1, 2, 2, 3, 0]), vec![[0, 1, 2], [2, 3, 0]]);
    }
}
