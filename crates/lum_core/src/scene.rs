//! Render-ready scenes and their construction.
//!
//! A [`Scene`] bundles the scene graph, the current camera, a flat list of
//! renderable primitives and the material table. [`SceneBuilder`] checks
//! names and material references up front, so an inconsistent scene is
//! never handed to the renderer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lum_math::{BBox, Ray};
use thiserror::Error;

use crate::camera::{Camera, CameraError};
use crate::graph::{self, Node, NodeError};
use crate::hit::{HitRecord, Primitive};
use crate::material::{Material, MaterialTable};
use crate::mesh::TriMesh;
use crate::obj::load_obj_meshes;
use crate::texture::TextureError;
use crate::triangle::Triangle;

/// Errors raised while assembling a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Geometry '{geometry}' references unknown material '{material}'")]
    UnknownMaterial { geometry: String, material: String },

    #[error("Geometry '{geometry}' has material index {index}, but only {count} materials exist")]
    InvalidMaterialIndex {
        geometry: String,
        index: usize,
        count: usize,
    },

    #[error("Duplicate material name '{0}'")]
    DuplicateMaterial(String),

    #[error("Duplicate geometry name '{0}'")]
    DuplicateGeometry(String),

    #[error("Geometry file not found: {0}")]
    MissingGeometryFile(PathBuf),

    #[error("Failed to load OBJ {path}: {message}")]
    Obj { path: PathBuf, message: String },

    #[error("Scene has no camera")]
    MissingCamera,

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Texture(#[from] TextureError),
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Everything the integrator reads while rendering.
#[derive(Debug)]
pub struct Scene {
    root: Node,
    camera: Camera,
    /// Primitives with a material index, in intersection order
    geometry: Vec<Arc<dyn Primitive>>,
    materials: MaterialTable,
    environment: Option<usize>,
    bbox: BBox,
}

impl Scene {
    /// Assemble a scene from already-parsed parts.
    ///
    /// Primitives without a material index stay in the graph but are not
    /// rendered. A material index past the end of the table is an error.
    pub fn from_parts(
        mut root: Node,
        camera: Camera,
        geometry: Vec<Arc<dyn Primitive>>,
        materials: MaterialTable,
    ) -> SceneResult<Self> {
        let count = materials.len();
        let mut names = HashSet::new();
        for prim in &geometry {
            if !names.insert(prim.name()) {
                return Err(SceneError::DuplicateGeometry(prim.name().to_string()));
            }
            if let Some(index) = prim.material_index().filter(|i| *i >= count) {
                return Err(SceneError::InvalidMaterialIndex {
                    geometry: prim.name().to_string(),
                    index,
                    count,
                });
            }
        }

        let total = geometry.len();
        let geometry: Vec<_> = geometry
            .into_iter()
            .filter(|p| p.material_index().is_some())
            .collect();
        if geometry.len() < total {
            log::debug!(
                "{} primitives have no material and will not be rendered",
                total - geometry.len()
            );
        }

        let environment = materials.environment();
        if environment.is_none() {
            log::warn!("Scene has no environment material; escaping rays return black");
        }

        let bbox = graph::update_bboxes(&mut root);
        log::info!(
            "Scene ready: {} nodes, {} primitives, {} materials, bounds [{} .. {}]",
            root.node_count(),
            geometry.len(),
            materials.len(),
            bbox.min,
            bbox.max
        );

        Ok(Self {
            root,
            camera,
            geometry,
            materials,
            environment,
            bbox,
        })
    }

    /// Closest hit along `ray` over all renderable primitives.
    pub fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let mut probe = *ray;
        let mut closest = None;
        for prim in &self.geometry {
            if let Some(hit) = prim.ray_intersect(&probe) {
                probe.t = probe.t.with_max(hit.distance);
                closest = Some(hit);
            }
        }
        closest
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Replace the current camera, keeping the films of the old one.
    pub fn set_camera(&mut self, mut camera: Camera) {
        for name in self.camera.film_names().map(str::to_string).collect::<Vec<_>>() {
            if camera.film(&name).is_none() {
                if let Some(film) = self.camera.remove_film(&name) {
                    camera.add_film(name, film);
                }
            }
        }
        self.camera = camera;
    }

    pub fn geometry(&self) -> &[Arc<dyn Primitive>] {
        &self.geometry
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn material(&self, index: usize) -> Option<&dyn Material> {
        self.materials.get(index)
    }

    /// The material describing light from outside the scene.
    pub fn environment(&self) -> Option<&dyn Material> {
        self.environment.and_then(|i| self.materials.get(i))
    }

    /// Bounds of the whole scene (the unit cube for an empty scene).
    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    /// Recompute the graph bounds.
    pub fn update_bbox(&mut self) -> BBox {
        self.bbox = graph::update_bboxes(&mut self.root);
        self.bbox
    }

    /// Indented text dump of the scene graph.
    pub fn dump(&mut self) -> String {
        graph::dump(&mut self.root)
    }
}

enum PendingGeometry {
    /// A mesh and the material to use when its own is not registered
    Mesh(TriMesh, Option<String>),
    Triangle(Triangle, Option<String>),
}

impl PendingGeometry {
    fn name(&self) -> &str {
        match self {
            PendingGeometry::Mesh(m, _) => &m.name,
            PendingGeometry::Triangle(t, _) => t.name(),
        }
    }

    fn material_name(&self) -> Option<&str> {
        match self {
            PendingGeometry::Mesh(m, _) => m.material_name.as_deref(),
            PendingGeometry::Triangle(_, material) => material.as_deref(),
        }
    }

    fn fallback_material(&self) -> Option<&str> {
        match self {
            PendingGeometry::Mesh(_, fallback) => fallback.as_deref(),
            PendingGeometry::Triangle(..) => None,
        }
    }

    fn into_primitive(self, material_index: Option<usize>) -> Arc<dyn Primitive> {
        match self {
            PendingGeometry::Mesh(mut mesh, _) => {
                mesh.material_index = material_index;
                Arc::new(mesh)
            }
            PendingGeometry::Triangle(tri, _) => match material_index {
                Some(index) => Arc::new(tri.with_material_index(index)),
                None => Arc::new(tri),
            },
        }
    }
}

/// Collects materials, geometry and a camera, then validates them into a
/// [`Scene`].
///
/// Material references are resolved by name in [`SceneBuilder::build`], so
/// materials and geometry may be added in any order.
#[derive(Default)]
pub struct SceneBuilder {
    materials: MaterialTable,
    geometry: Vec<PendingGeometry>,
    groups: Vec<(String, Vec<PendingGeometry>)>,
    names: HashSet<String>,
    camera: Option<Camera>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material and return its table index.
    pub fn add_material(&mut self, material: Arc<dyn Material>) -> SceneResult<usize> {
        self.materials.insert(material)
    }

    /// Add a mesh; its `material_name` is resolved at build time.
    pub fn add_mesh(&mut self, mesh: TriMesh) -> SceneResult<()> {
        self.claim_name(&mesh.name)?;
        self.geometry.push(PendingGeometry::Mesh(mesh, None));
        Ok(())
    }

    /// Add a single triangle bound to `material`.
    pub fn add_triangle(&mut self, triangle: Triangle, material: Option<&str>) -> SceneResult<()> {
        self.claim_name(triangle.name())?;
        self.geometry
            .push(PendingGeometry::Triangle(triangle, material.map(str::to_string)));
        Ok(())
    }

    /// Load every model of an OBJ file into a group named after the file.
    ///
    /// Models without an OBJ material, or whose OBJ material is not
    /// registered, get `default_material`. Returns the number of meshes
    /// added.
    pub fn add_obj_file(
        &mut self,
        path: impl AsRef<Path>,
        default_material: Option<&str>,
    ) -> SceneResult<usize> {
        let path = path.as_ref();
        let meshes = load_obj_meshes(path)?;
        let group = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "obj".to_string());

        let mut items = Vec::with_capacity(meshes.len());
        for mut mesh in meshes {
            self.claim_name(&mesh.name)?;
            if mesh.material_name.is_none() {
                mesh.material_name = default_material.map(str::to_string);
            }
            items.push(PendingGeometry::Mesh(mesh, default_material.map(str::to_string)));
        }
        let count = items.len();
        log::info!("Added {} meshes from {}", count, path.display());
        self.groups.push((group, items));
        Ok(count)
    }

    pub fn set_camera(&mut self, camera: Camera) -> &mut Self {
        self.camera = Some(camera);
        self
    }

    fn claim_name(&mut self, name: &str) -> SceneResult<()> {
        if !self.names.insert(name.to_string()) {
            return Err(SceneError::DuplicateGeometry(name.to_string()));
        }
        Ok(())
    }

    fn resolve(&self, item: PendingGeometry) -> SceneResult<Arc<dyn Primitive>> {
        let index = match item.material_name() {
            Some(material) => match self.materials.index_of(material) {
                Some(index) => Some(index),
                None => {
                    let fallback = item
                        .fallback_material()
                        .and_then(|f| self.materials.index_of(f).map(|i| (f, i)));
                    let Some((fallback, index)) = fallback else {
                        return Err(SceneError::UnknownMaterial {
                            geometry: item.name().to_string(),
                            material: material.to_string(),
                        });
                    };
                    log::warn!(
                        "Geometry '{}' uses unknown material '{}', falling back to '{}'",
                        item.name(),
                        material,
                        fallback
                    );
                    Some(index)
                }
            },
            None => None,
        };
        Ok(item.into_primitive(index))
    }

    /// Resolve materials, build the graph and return the finished scene.
    pub fn build(mut self) -> SceneResult<Scene> {
        let camera = self.camera.take().ok_or(SceneError::MissingCamera)?;

        let mut root = Node::group("scene");
        root.append_child(Node::camera("camera", camera.clone()))?;
        for (index, material) in self.materials.iter().enumerate() {
            root.append_child(Node::material(material.name(), index))?;
        }

        let mut geometry = Vec::new();
        for item in std::mem::take(&mut self.geometry) {
            let prim = self.resolve(item)?;
            root.append_child(Node::primitive(prim.clone()))?;
            geometry.push(prim);
        }
        for (name, items) in std::mem::take(&mut self.groups) {
            let mut group = Node::group(name);
            for item in items {
                let prim = self.resolve(item)?;
                group.append_child(Node::primitive(prim.clone()))?;
                geometry.push(prim);
            }
            root.append_child(group)?;
        }

        Scene::from_parts(root, camera, geometry, self.materials)
    }
}
