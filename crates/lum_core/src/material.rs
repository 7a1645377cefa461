//! Surface and environment materials.
//!
//! Primitives only carry an index into a scene-wide [`MaterialTable`], so
//! geometry never holds a reference back to its material.

use std::collections::HashMap;
use std::f32::consts::{FRAC_1_PI, PI, TAU};
use std::fmt;
use std::sync::Arc;

use lum_math::{Color, Onb, Vec2, Vec3};
use rand::RngCore;

use crate::sampler::UnitHemisphereUniformSampler;
use crate::scene::{SceneError, SceneResult};
use crate::texture::{ConstantTexture, Texture};

/// Light interaction of a named material.
///
/// Everything defaults to black so a material only overrides the responses
/// it actually has.
pub trait Material: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn is_emit(&self) -> bool {
        false
    }

    /// True for the material that describes light arriving from outside the
    /// scene.
    fn is_environment(&self) -> bool {
        false
    }

    /// Radiance emitted toward `out_dir`.
    fn emit_radiance(
        &self,
        _basis: &Onb,
        _out_dir: Vec3,
        _tex_point: Vec3,
        _tex_uv: Vec2,
    ) -> Color {
        Color::ZERO
    }

    /// Radiance seen by a ray leaving the scene along `incident_dir`.
    fn ambient_response(
        &self,
        _basis: &Onb,
        _incident_dir: Vec3,
        _tex_point: Vec3,
        _tex_uv: Vec2,
    ) -> Color {
        Color::ZERO
    }

    /// BRDF for the direction pair `(out_v0, out_v1)`.
    fn explicit_brdf(
        &self,
        _basis: &Onb,
        _out_v0: Vec3,
        _out_v1: Vec3,
        _tex_point: Vec3,
        _tex_uv: Vec2,
    ) -> Color {
        Color::ZERO
    }

    /// Sample a scattered direction for a ray arriving along `incident_dir`.
    ///
    /// Returns the BRDF value for the sampled pair and the world-space
    /// direction, which lies in the hemisphere the ray came from.
    fn diffuse_direction(
        &self,
        basis: &Onb,
        incident_dir: Vec3,
        tex_point: Vec3,
        tex_uv: Vec2,
        rng: &mut dyn RngCore,
    ) -> (Color, Vec3);
}

/// Basis whose `w` axis faces the side `incident_dir` arrived from.
pub fn facing_basis(basis: &Onb, incident_dir: Vec3) -> Onb {
    if incident_dir.dot(basis.w) > 0.0 {
        basis.flipped()
    } else {
        *basis
    }
}

/// Latitude/longitude texture coordinates of a direction.
pub fn direction_to_uv(dir: Vec3) -> Vec2 {
    let u = 0.5 + dir.x.atan2(-dir.z) / TAU;
    let v = 0.5 + dir.y.clamp(-1.0, 1.0).asin() / PI;
    Vec2::new(u, v)
}

/// Lambertian reflector with optional emission.
#[derive(Debug, Clone)]
pub struct DiffuseMaterial {
    name: String,
    texture: Arc<dyn Texture>,
    emission: Option<Color>,
    hemisphere: UnitHemisphereUniformSampler,
}

impl DiffuseMaterial {
    pub fn new(name: impl Into<String>, texture: Arc<dyn Texture>) -> Self {
        Self {
            name: name.into(),
            texture,
            emission: None,
            hemisphere: UnitHemisphereUniformSampler::default(),
        }
    }

    /// Diffuse material with a constant reflectance.
    pub fn constant(name: impl Into<String>, reflectance: Color) -> Self {
        Self::new(name, Arc::new(ConstantTexture::new(reflectance)))
    }

    /// Make the material an emitter of `radiance`.
    pub fn with_emission(mut self, radiance: Color) -> Self {
        self.emission = Some(radiance);
        self
    }

    pub fn emission(&self) -> Option<Color> {
        self.emission
    }

    pub fn texture(&self) -> &Arc<dyn Texture> {
        &self.texture
    }
}

impl Material for DiffuseMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_emit(&self) -> bool {
        self.emission.is_some()
    }

    fn emit_radiance(
        &self,
        _basis: &Onb,
        _out_dir: Vec3,
        _tex_point: Vec3,
        _tex_uv: Vec2,
    ) -> Color {
        self.emission.unwrap_or(Color::ZERO)
    }

    fn explicit_brdf(
        &self,
        _basis: &Onb,
        _out_v0: Vec3,
        _out_v1: Vec3,
        tex_point: Vec3,
        tex_uv: Vec2,
    ) -> Color {
        self.texture.value(tex_point, tex_uv) * FRAC_1_PI
    }

    fn diffuse_direction(
        &self,
        basis: &Onb,
        incident_dir: Vec3,
        tex_point: Vec3,
        tex_uv: Vec2,
        rng: &mut dyn RngCore,
    ) -> (Color, Vec3) {
        let local = facing_basis(basis, incident_dir);
        let dir = local.to_world(self.hemisphere.sample(rng)).normalize();
        let brdf = self.explicit_brdf(&local, -incident_dir, dir, tex_point, tex_uv);
        (brdf, dir)
    }
}

/// Light arriving from outside the scene. Has no surface response.
#[derive(Debug, Clone)]
pub struct EnvironmentMaterial {
    name: String,
    texture: Arc<dyn Texture>,
}

impl EnvironmentMaterial {
    pub fn new(name: impl Into<String>, texture: Arc<dyn Texture>) -> Self {
        Self {
            name: name.into(),
            texture,
        }
    }

    /// Uniform environment of the given color.
    pub fn constant(name: impl Into<String>, color: Color) -> Self {
        Self::new(name, Arc::new(ConstantTexture::new(color)))
    }
}

impl Material for EnvironmentMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_environment(&self) -> bool {
        true
    }

    fn ambient_response(
        &self,
        _basis: &Onb,
        _incident_dir: Vec3,
        tex_point: Vec3,
        tex_uv: Vec2,
    ) -> Color {
        self.texture.value(tex_point, tex_uv)
    }

    fn diffuse_direction(
        &self,
        _basis: &Onb,
        incident_dir: Vec3,
        _tex_point: Vec3,
        _tex_uv: Vec2,
        _rng: &mut dyn RngCore,
    ) -> (Color, Vec3) {
        (Color::ZERO, incident_dir)
    }
}

/// Flat list of materials with a name to index map.
#[derive(Clone, Default)]
pub struct MaterialTable {
    materials: Vec<Arc<dyn Material>>,
    by_name: HashMap<String, usize>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a material and return its index. Names must be unique.
    pub fn insert(&mut self, material: Arc<dyn Material>) -> SceneResult<usize> {
        let name = material.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(SceneError::DuplicateMaterial(name));
        }
        let index = self.materials.len();
        self.materials.push(material);
        self.by_name.insert(name, index);
        Ok(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Material> {
        self.materials.get(index).map(|m| m.as_ref())
    }

    /// Index of the first environment material, if any.
    pub fn environment(&self) -> Option<usize> {
        self.materials.iter().position(|m| m.is_environment())
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Material> {
        self.materials.iter().map(|m| m.as_ref())
    }
}

impl fmt::Debug for MaterialTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.materials.iter().map(|m| m.name()))
            .finish()
    }
}
