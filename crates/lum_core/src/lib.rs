//! LUM Core - Scene representation for the LUM path tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Triangle`, `TriMesh` and the `Primitive` hit contract
//! - **Scene graph**: group/primitive/material/camera nodes walked by `Traversal` strategies
//! - **Camera**: perspective/orthographic ray generation owning named `ImageFilm`s
//! - **Sampling**: pixel-center and disk/hemisphere direction samplers
//! - **Materials**: diffuse and environment materials in a flat `MaterialTable`
//! - **Scene building**: `SceneBuilder` with OBJ loading through `tobj`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lum_core::{Camera, DiffuseMaterial, EnvironmentMaterial, SceneBuilder};
//! use lum_math::{Color, Vec3};
//!
//! let mut builder = SceneBuilder::new();
//! builder.add_material(Arc::new(EnvironmentMaterial::constant("sky", Color::ONE)))?;
//! builder.add_material(Arc::new(DiffuseMaterial::constant("grey", Color::splat(0.5))))?;
//! builder.add_obj_file("bunny.obj", Some("grey"))?;
//! builder.set_camera(Camera::new(Vec3::new(0.0, 1.0, 5.0), Vec3::NEG_Z, Vec3::Y)?);
//! let scene = builder.build()?;
//! ```

pub mod camera;
pub mod film;
pub mod graph;
pub mod hit;
pub mod material;
pub mod mesh;
pub mod obj;
pub mod sampler;
pub mod scene;
pub mod texture;
pub mod triangle;

// Re-export commonly used types
pub use camera::{Camera, CameraError, CameraParams, CameraResult, Projection, FILM_HIT, FILM_RGBA};
pub use film::{FilmError, FilmResult, ImageFilm};
pub use graph::{walk, Node, NodeError, NodeResult, Traversal};
pub use hit::{HitRecord, Primitive};
pub use material::{DiffuseMaterial, EnvironmentMaterial, Material, MaterialTable};
pub use mesh::TriMesh;
pub use sampler::{StratifiedRegularSampler, UnitDiskUniformSampler, UnitHemisphereUniformSampler};
pub use scene::{Scene, SceneBuilder, SceneError, SceneResult};
pub use texture::{ConstantTexture, ImageTexture, Texture, TextureError, TextureResult};
pub use triangle::Triangle;
