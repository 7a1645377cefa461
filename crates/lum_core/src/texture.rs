//! Reflectance textures for materials.
//!
//! A texture maps a surface point and its texture coordinates to a linear
//! RGBA color. Image textures are decoded with the `image` crate and stored
//! as linear floats.

use std::fmt;
use std::path::{Path, PathBuf};

use lum_math::{Color, Vec2, Vec3};
use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to open texture {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Texture has {pixels} pixels, expected {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        pixels: usize,
    },

    #[error("Texture must be at least 1x1, got {width}x{height}")]
    Empty { width: u32, height: u32 },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// Color lookup over a surface.
pub trait Texture: Send + Sync + fmt::Debug {
    /// Reflectance at `tex_point` (world position) with coordinates `tex_uv`.
    fn value(&self, tex_point: Vec3, tex_uv: Vec2) -> Color;
}

/// The same color everywhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantTexture {
    pub color: Color,
}

impl ConstantTexture {
    pub fn new(color: Color) -> Self {
        Self { color }
    }

    /// Opaque constant texture from an RGB triple.
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(Color::new(r, g, b, 1.0))
    }
}

impl Texture for ConstantTexture {
    fn value(&self, _tex_point: Vec3, _tex_uv: Vec2) -> Color {
        self.color
    }
}

/// A bitmap sampled with bilinear filtering and wrapped UVs.
#[derive(Clone, Debug)]
pub struct ImageTexture {
    width: u32,
    height: u32,
    /// Linear RGBA, row-major, row 0 at the top of the image
    pixels: Vec<[f32; 4]>,
    path: String,
}

impl ImageTexture {
    /// Create a texture from linear RGBA pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        if pixels.len() != (width * height) as usize {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                pixels: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            path: "<memory>".to_string(),
        })
    }

    /// Load an image file and convert it to linear RGBA.
    pub fn open(path: impl AsRef<Path>) -> TextureResult<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| TextureError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba
            .pixels()
            .map(|p| {
                [
                    srgb_to_linear(p[0]),
                    srgb_to_linear(p[1]),
                    srgb_to_linear(p[2]),
                    p[3] as f32 / 255.0,
                ]
            })
            .collect();

        let mut texture = Self::new(width, height, pixels)?;
        texture.path = path.to_string_lossy().to_string();
        log::debug!("Loaded texture: {} ({}x{})", texture.path, width, height);
        Ok(texture)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bilinear lookup; `(0, 0)` is the bottom-left corner.
    pub fn sample(&self, uv: Vec2) -> Color {
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);

        let x = u * (self.width - 1) as f32;
        let y = (1.0 - v) * (self.height - 1) as f32;

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x.fract();
        let fy = y.fract();

        let top = self.pixel(x0, y0).lerp(self.pixel(x1, y0), fx);
        let bottom = self.pixel(x0, y1).lerp(self.pixel(x1, y1), fx);
        top.lerp(bottom, fy)
    }

    fn pixel(&self, x: u32, y: u32) -> Color {
        let idx = (y * self.width + x) as usize;
        self.pixels
            .get(idx)
            .map(|p| Color::from_array(*p))
            .unwrap_or(lum_math::BLACK)
    }
}

impl Texture for ImageTexture {
    fn value(&self, _tex_point: Vec3, tex_uv: Vec2) -> Color {
        self.sample(tex_uv)
    }
}

/// Convert an sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
