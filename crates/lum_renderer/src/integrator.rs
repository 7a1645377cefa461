//! Unidirectional path tracing of a single pixel sample.
//!
//! Light is only found by hitting an emitter or escaping to the environment;
//! there is no next-event estimation.

use std::f32::consts::PI;

use lum_core::material::direction_to_uv;
use lum_core::Scene;
use lum_math::{Color, Interval, Onb, Ray};
use rand::RngCore;

/// Per-path settings taken from the render configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSettings {
    /// Maximum number of ray segments per path
    pub max_path_length: u32,
    /// Lower bound of the interval of secondary rays
    pub ray_epsilon: f32,
    /// Terminate a path once its largest reflectance component drops below
    /// this value. `None` traces every path to completion.
    pub russian_roulette: Option<f32>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            max_path_length: 8,
            ray_epsilon: 1e-4,
            russian_roulette: None,
        }
    }
}

/// Outcome of tracing one path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    /// Radiance estimate carried back along the path
    pub intensity: Color,
    /// True when the path ended on an emitter or the environment, i.e. the
    /// estimate should be blended into the film
    pub contributed: bool,
    /// True when the primary ray hit geometry
    pub primary_hit: bool,
}

impl PathSample {
    fn lost(primary_hit: bool) -> Self {
        Self {
            intensity: Color::ZERO,
            contributed: false,
            primary_hit,
        }
    }
}

/// Follow `ray` through `scene` until it hits a light, escapes, or runs out
/// of segments.
pub fn trace_path(
    scene: &Scene,
    mut ray: Ray,
    settings: &PathSettings,
    rng: &mut dyn RngCore,
) -> PathSample {
    let mut primary_hit = false;

    while ray.path_length < settings.max_path_length {
        let Some(hit) = scene.intersect(&ray) else {
            // Escaped to the environment
            if let Some(env) = scene.environment() {
                let dir = ray.direction;
                let response =
                    env.ambient_response(&Onb::IDENTITY, dir, dir, direction_to_uv(dir));
                ray.intensity += ray.reflectance * response;
            }
            return PathSample {
                intensity: ray.intensity,
                contributed: true,
                primary_hit,
            };
        };

        if ray.path_length == 0 {
            primary_hit = true;
        }

        let Some(material) = hit.material_index.and_then(|i| scene.material(i)) else {
            log::trace!("Hit without a material at {}", hit.position);
            return PathSample::lost(primary_hit);
        };

        if material.is_emit() {
            let radiance =
                material.emit_radiance(&hit.basis, -ray.direction, hit.position, hit.tex_uv);
            ray.intensity += ray.reflectance * radiance;
            return PathSample {
                intensity: ray.intensity,
                contributed: true,
                primary_hit,
            };
        }

        // The hemisphere sampler is not cosine weighted; pi compensates.
        let (brdf, dir) =
            material.diffuse_direction(&hit.basis, ray.direction, hit.position, hit.tex_uv, rng);
        ray.reflectance *= PI * brdf;

        if let Some(threshold) = settings.russian_roulette {
            if ray.reflectance.truncate().max_element() < threshold {
                return PathSample::lost(primary_hit);
            }
        }

        ray.advance(hit.position, dir, Interval::new(settings.ray_epsilon, f32::INFINITY));
    }

    PathSample::lost(primary_hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use lum_core::{Camera, DiffuseMaterial, EnvironmentMaterial, SceneBuilder, TriMesh};
    use lum_math::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ENV: Color = Color::new(0.25, 0.5, 0.75, 1.0);

    fn scene_with(floor: Option<Arc<dyn lum_core::Material>>) -> Scene {
        let mut b = SceneBuilder::new();
        b.add_material(Arc::new(EnvironmentMaterial::constant("env", ENV))).unwrap();
        if let Some(material) = floor {
            let name = material.name().to_string();
            b.add_material(material).unwrap();
            b.add_mesh(
                TriMesh::new(
                    "floor",
                    vec![
                        Vec3::new(-10.0, -10.0, 0.0),
                        Vec3::new(10.0, -10.0, 0.0),
                        Vec3::new(10.0, 10.0, 0.0),
                        Vec3::new(-10.0, 10.0, 0.0),
                    ],
                    vec![[0, 1, 2], [0, 2, 3]],
                )
                .with_material(name),
            )
            .unwrap();
        }
        b.set_camera(Camera::default());
        b.build().unwrap()
    }

    fn down_ray() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::NEG_Z, Interval::new(0.0, f32::INFINITY))
    }

    #[test]
    fn test_escape_returns_environment() {
        let scene = scene_with(None);
        let mut rng = StdRng::seed_from_u64(1);
        let s = trace_path(&scene, down_ray(), &PathSettings::default(), &mut rng);
        assert!(s.contributed);
        assert!(!s.primary_hit);
        assert_eq!(s.intensity, ENV);
    }

    #[test]
    fn test_emitter_terminates_path() {
        let light = DiffuseMaterial::constant("light", lum_math::BLACK)
            .with_emission(Color::new(3.0, 2.0, 1.0, 1.0));
        let scene = scene_with(Some(Arc::new(light)));
        let mut rng = StdRng::seed_from_u64(1);
        let s = trace_path(&scene, down_ray(), &PathSettings::default(), &mut rng);
        assert!(s.contributed && s.primary_hit);
        assert_eq!(s.intensity, Color::new(3.0, 2.0, 1.0, 1.0));
    }

    #[test]
    fn test_single_bounce_scales_environment_by_albedo() {
        let grey = DiffuseMaterial::constant("grey", Color::new(0.5, 0.5, 0.5, 1.0));
        let scene = scene_with(Some(Arc::new(grey)));
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let s = trace_path(&scene, down_ray(), &PathSettings::default(), &mut rng);
            assert!(s.contributed && s.primary_hit);
            let expected = Color::new(0.5, 0.5, 0.5, 1.0) * ENV;
            assert!((s.intensity - expected).length() < 1e-5, "{}", s.intensity);
        }
    }

    #[test]
    fn test_path_length_limit_drops_sample() {
        let grey = DiffuseMaterial::constant("grey", Color::new(0.5, 0.5, 0.5, 1.0));
        let scene = scene_with(Some(Arc::new(grey)));
        let mut rng = StdRng::seed_from_u64(2);
        let settings = PathSettings {
            max_path_length: 1,
            ..Default::default()
        };
        let s = trace_path(&scene, down_ray(), &settings, &mut rng);
        assert!(!s.contributed);
        assert!(s.primary_hit);
    }

    #[test]
    fn test_russian_roulette_only_when_enabled() {
        let dark = DiffuseMaterial::constant("dark", Color::new(0.01, 0.01, 0.01, 1.0));
        let scene = scene_with(Some(Arc::new(dark)));

        let mut rng = StdRng::seed_from_u64(3);
        let off = trace_path(&scene, down_ray(), &PathSettings::default(), &mut rng);
        assert!(off.contributed);

        let settings = PathSettings {
            russian_roulette: Some(0.05),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let on = trace_path(&scene, down_ray(), &settings, &mut rng);
        assert!(!on.contributed);
    }
}
