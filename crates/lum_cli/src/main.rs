use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lum_core::{
    Camera, CameraParams, DiffuseMaterial, EnvironmentMaterial, ImageFilm, ImageTexture, Scene,
    SceneBuilder, TriMesh, FILM_HIT,
};
use lum_math::{BBox, Color, Vec3};
use lum_renderer::{CancelToken, RenderConfig, Renderer};
use serde::{Deserialize, Serialize};

/// Contents of a `--config` file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CliConfig {
    #[serde(flatten)]
    render: RenderConfig,
    camera: Option<CameraParams>,
}

/// Progressive path tracer. Renders a built-in box scene or an OBJ file.
#[derive(Parser, Debug, Default)]
#[command(name = "lum", version)]
struct Args {
    /// Render settings as JSON, with an optional "camera" block
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render an OBJ file instead of the built-in box
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Image texture for OBJ meshes without a material
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Number of progressive frames
    #[arg(long)]
    frames: Option<u32>,

    /// Save the image every n frames (0 = only at the end)
    #[arg(long = "save-every")]
    save_every: Option<u32>,

    /// Output image path
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Render buckets on the calling thread
    #[arg(long)]
    single_thread: bool,

    /// Also write a primary-hit coverage image
    #[arg(long)]
    hit: bool,

    /// Print the scene graph before rendering
    #[arg(long)]
    dump: bool,
}

fn load_config(args: &Args) -> Result<CliConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => CliConfig::default(),
    };

    let render = &mut config.render;
    if let Some(frames) = args.frames {
        render.frames = frames;
    }
    if let Some(n) = args.save_every {
        render.save_interval = n;
    }
    if let Some(output) = &args.output {
        render.output = output.clone();
    }
    if let Some(width) = args.width {
        render.width = width;
    }
    if let Some(height) = args.height {
        render.height = height;
    }
    if args.single_thread {
        render.parallel = false;
    }
    Ok(config)
}

/// Axis-aligned quad `a b c d` as a two-triangle mesh.
fn quad(name: &str, corners: [Vec3; 4], material: &str) -> TriMesh {
    TriMesh::new(name, corners.to_vec(), vec![[0, 1, 2], [0, 2, 3]]).with_material(material)
}

/// A closed-back box with red and green side walls and a ceiling light.
fn cornell_box() -> Result<Scene> {
    let mut b = SceneBuilder::new();
    let diffuse = |name: &str, [r, g, b]: [f32; 3]| {
        Arc::new(DiffuseMaterial::constant(name, Color::new(r, g, b, 1.0)))
    };
    b.add_material(Arc::new(EnvironmentMaterial::constant(
        "environment",
        Color::new(0.02, 0.02, 0.03, 1.0),
    )))?;
    b.add_material(diffuse("white", [0.73, 0.73, 0.73]))?;
    b.add_material(diffuse("red", [0.65, 0.05, 0.05]))?;
    b.add_material(diffuse("green", [0.12, 0.45, 0.15]))?;
    b.add_material(Arc::new(
        DiffuseMaterial::constant("light", lum_math::BLACK)
            .with_emission(Color::new(12.0, 12.0, 12.0, 1.0)),
    ))?;

    let v = Vec3::new;
    let l = 0.3;
    let walls = [
        ("floor", [v(-1., -1., 1.), v(1., -1., 1.), v(1., -1., -1.), v(-1., -1., -1.)], "white"),
        ("ceiling", [v(-1., 1., 1.), v(-1., 1., -1.), v(1., 1., -1.), v(1., 1., 1.)], "white"),
        ("back", [v(-1., -1., -1.), v(1., -1., -1.), v(1., 1., -1.), v(-1., 1., -1.)], "white"),
        ("left", [v(-1., -1., 1.), v(-1., -1., -1.), v(-1., 1., -1.), v(-1., 1., 1.)], "red"),
        ("right", [v(1., -1., -1.), v(1., -1., 1.), v(1., 1., 1.), v(1., 1., -1.)], "green"),
        ("light", [v(-l, 0.99, l), v(-l, 0.99, -l), v(l, 0.99, -l), v(l, 0.99, l)], "light"),
    ];
    for (name, corners, material) in walls {
        b.add_mesh(quad(name, corners, material))?;
    }

    let mut camera = Camera::new(v(0.0, 0.0, 3.4), Vec3::NEG_Z, Vec3::Y)?;
    camera.set_fovy(40.0)?;
    b.set_camera(camera);
    Ok(b.build()?)
}

fn obj_scene(path: &Path, texture: Option<&Path>) -> Result<Scene> {
    let mut b = SceneBuilder::new();
    b.add_material(Arc::new(EnvironmentMaterial::constant(
        "environment",
        Color::new(0.8, 0.85, 1.0, 1.0),
    )))?;
    let default = match texture {
        Some(texture) => DiffuseMaterial::new("default", Arc::new(ImageTexture::open(texture)?)),
        None => DiffuseMaterial::constant("default", Color::new(0.7, 0.7, 0.7, 1.0)),
    };
    b.add_material(Arc::new(default))?;
    b.add_obj_file(path, Some("default"))
        .with_context(|| format!("Failed to load {}", path.display()))?;
    b.set_camera(Camera::default());

    let mut scene = b.build()?;
    let camera = frame_bbox(&scene.bbox())?;
    scene.set_camera(camera);
    Ok(scene)
}

/// Camera on +Z looking at the center of `bbox`, far enough back to see it.
fn frame_bbox(bbox: &BBox) -> Result<Camera> {
    let center = bbox.centroid();
    let radius = (bbox.extent().length() * 0.5).max(1e-3);
    let fovy: f32 = 45.0;
    let distance = radius / (fovy.to_radians() * 0.5).sin();

    let params = CameraParams {
        eye: center + Vec3::new(0.0, 0.0, distance),
        target: Some(center),
        fovy,
        ..Default::default()
    };
    Ok(params.to_camera()?)
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let render = config.render;

    log::info!("Starting LUM ({}x{}, {} frames)", render.width, render.height, render.frames);

    let mut scene = match &args.obj {
        Some(path) => obj_scene(path, args.texture.as_deref())?,
        None => cornell_box()?,
    };
    if let Some(params) = &config.camera {
        params.apply(scene.camera_mut())?;
    }
    if args.hit {
        scene
            .camera_mut()
            .add_film(FILM_HIT, ImageFilm::new(render.width, render.height, 1)?);
    }
    if args.dump {
        print!("{}", scene.dump());
    }

    let frames = render.frames;
    let save_interval = render.save_interval;
    let output = render.output.clone();

    let mut renderer = Renderer::new(render)?;
    renderer.set_scene(scene)?;
    renderer.start()?;

    let cancel = CancelToken::new();
    let stats = renderer.render_frames(frames, save_interval, &cancel)?;
    renderer
        .save(&output)
        .with_context(|| format!("Failed to save {}", output.display()))?;

    log::info!(
        "Rendered {} frames ({} paths, {} contributed) in {:.2?}",
        stats.frames_rendered,
        stats.paths_traced,
        stats.paths_contributed,
        stats.elapsed
    );

    renderer.shutdown()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("lum").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["--frames", "4", "--width", "64", "--single-thread", "-o", "x.png"])
            .unwrap();
        assert_eq!(parsed.frames, Some(4));
        assert_eq!(parsed.width, Some(64));
        assert!(parsed.single_thread);
        assert!(!parsed.hit);
        assert_eq!(parsed.output, Some(PathBuf::from("x.png")));

        let parsed = args(&["--save-every", "5", "--obj", "bunny.obj", "--dump"]).unwrap();
        assert_eq!(parsed.save_every, Some(5));
        assert_eq!(parsed.obj, Some(PathBuf::from("bunny.obj")));
        assert!(parsed.dump);
        assert_eq!(parsed.frames, None);

        assert!(args(&["--frames"]).is_err());
        assert!(args(&["--frames", "many"]).is_err());
        assert!(args(&["--frames", "-2"]).is_err());
        assert!(args(&["--bogus"]).is_err());
    }

    #[test]
    fn test_args_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let parsed = Args {
            frames: Some(3),
            height: Some(10),
            single_thread: true,
            ..Default::default()
        };
        let config = load_config(&parsed).unwrap();
        assert_eq!(config.render.frames, 3);
        assert_eq!(config.render.height, 10);
        assert_eq!(config.render.width, RenderConfig::default().width);
        assert!(!config.render.parallel);
        assert!(config.camera.is_none());
    }

    #[test]
    fn test_config_file_with_camera() {
        let json = r#"{
            "width": 48,
            "seed": 9,
            "camera": { "eye": [0.0, 1.0, 4.0], "fovy": 30.0 }
        }"#;
        let config: CliConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.render.width, 48);
        assert_eq!(config.render.seed, 9);
        let camera = config.camera.unwrap();
        assert_eq!(camera.eye, Vec3::new(0.0, 1.0, 4.0));
        assert_eq!(camera.fovy, 30.0);
    }

    #[test]
    fn test_cornell_box_builds() {
        let scene = cornell_box().unwrap();
        assert_eq!(scene.geometry().len(), 6);
        assert_eq!(scene.materials().len(), 5);
        assert!(scene.environment().is_some());
        assert!(scene.bbox().contains_point(Vec3::ZERO));
    }

    #[test]
    fn test_frame_bbox_sees_whole_box() {
        let bbox = BBox::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 3.0, 1.0));
        let camera = frame_bbox(&bbox).unwrap();
        assert!((camera.target() - bbox.centroid()).length() < 1e-4);
        assert!(camera.eye().z > bbox.max.z);
    }

    #[test]
    fn test_small_render_of_box() {
        // A non-square film keeps every pixel centre off the box edges and
        // the quad diagonals, so each primary ray lands inside a triangle
        let mut scene = cornell_box().unwrap();
        scene.camera_mut().add_film(FILM_HIT, ImageFilm::new(8, 7, 1).unwrap());
        let config = RenderConfig {
            width: 8,
            height: 7,
            bucket_size: 4,
            ..Default::default()
        };
        let mut renderer = Renderer::new(config).unwrap();
        renderer.set_scene(scene).unwrap();
        renderer.start().unwrap();

        let stats = renderer.render_frames(2, 0, &CancelToken::new()).unwrap();
        assert_eq!(stats.frames_rendered, 2);
        assert_eq!(stats.paths_traced, 2 * 56);
        let hit = renderer.film(FILM_HIT).unwrap();
        assert!(hit.data().iter().all(|v| *v == 1.0));
    }
}
