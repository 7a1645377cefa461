//! Progressive image buffers.
//!
//! An `ImageFilm` is a `width x height x channels` float buffer with
//! `channels` in {1, 3, 4}. Row 0 is the top of the image.

use std::path::Path;

use lum_math::Color;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilmError {
    #[error("Unsupported channel count {0}, expected 1, 3 or 4")]
    InvalidChannels(usize),

    #[error("Film must be at least 1x1, got {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Pixel ({x}, {y}) is outside the {width}x{height} film")]
    OutOfRange { x: u32, y: u32, width: u32, height: u32 },

    #[error("Failed to save film to {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

pub type FilmResult<T> = Result<T, FilmError>;

/// Float image buffer with running-average accumulation.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageFilm {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<f32>,
}

impl ImageFilm {
    /// Create a zeroed film.
    pub fn new(width: u32, height: u32, channels: usize) -> FilmResult<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(FilmError::InvalidChannels(channels));
        }
        if width == 0 || height == 0 {
            return Err(FilmError::InvalidSize { width, height });
        }
        Ok(Self {
            width,
            height,
            channels,
            data: vec![0.0; width as usize * height as usize * channels],
        })
    }

    /// A zeroed film of a new size with the same channel layout.
    pub fn resized(&self, width: u32, height: u32) -> FilmResult<Self> {
        Self::new(width, height, self.channels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Raw channel data, row-major.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Raw channel data as bytes, for upload to a viewer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    fn offset(&self, x: u32, y: u32) -> FilmResult<usize> {
        if x >= self.width || y >= self.height {
            return Err(FilmError::OutOfRange {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok((y as usize * self.width as usize + x as usize) * self.channels)
    }

    /// Read a pixel. Single-channel films replicate into RGB, missing alpha
    /// reads as 1.
    pub fn get(&self, x: u32, y: u32) -> FilmResult<Color> {
        let i = self.offset(x, y)?;
        let p = &self.data[i..i + self.channels];
        Ok(match self.channels {
            1 => Color::new(p[0], p[0], p[0], 1.0),
            3 => Color::new(p[0], p[1], p[2], 1.0),
            _ => Color::new(p[0], p[1], p[2], p[3]),
        })
    }

    /// Write the first `channels` components of `color`.
    pub fn put(&mut self, x: u32, y: u32, color: Color) -> FilmResult<()> {
        let i = self.offset(x, y)?;
        let c = self.channels;
        self.data[i..i + c].copy_from_slice(&color.to_array()[..c]);
        Ok(())
    }

    /// Set every pixel to `color`.
    pub fn fill(&mut self, color: Color) {
        let c = self.channels;
        let src = color.to_array();
        for px in self.data.chunks_exact_mut(c) {
            px.copy_from_slice(&src[..c]);
        }
    }

    /// Blend a new sample into the running average.
    ///
    /// `nframe` is the 0-based frame index: the stored value becomes
    /// `(nframe * old + intensity) / (nframe + 1)`.
    pub fn accumulate(&mut self, x: u32, y: u32, intensity: Color, nframe: u32) -> FilmResult<()> {
        let old = self.get(x, y)?;
        let n = nframe as f32;
        self.put(x, y, (old * n + intensity) / (n + 1.0))
    }

    /// 8-bit RGBA preview: clamped, gamma 2, row 0 at the top.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for px in self.data.chunks_exact(self.channels) {
            let rgba = match px {
                [l] => [*l, *l, *l, 1.0],
                [r, g, b] => [*r, *g, *b, 1.0],
                [r, g, b, a] => [*r, *g, *b, *a],
                _ => [0.0, 0.0, 0.0, 1.0],
            };
            out.extend_from_slice(&[
                quantize(linear_to_gamma(rgba[0])),
                quantize(linear_to_gamma(rgba[1])),
                quantize(linear_to_gamma(rgba[2])),
                quantize(rgba[3]),
            ]);
        }
        out
    }

    /// Encode the film to an image file; the format follows the extension.
    ///
    /// 1, 3 and 4 channels map to grayscale, RGB and RGBA.
    pub fn save_file(&self, path: impl AsRef<Path>) -> FilmResult<()> {
        let path = path.as_ref();
        let (bytes, color_type): (Vec<u8>, image::ColorType) = match self.channels {
            1 => (
                self.data.iter().map(|v| quantize(linear_to_gamma(*v))).collect(),
                image::ColorType::L8,
            ),
            3 => (
                self.data.iter().map(|v| quantize(linear_to_gamma(*v))).collect(),
                image::ColorType::Rgb8,
            ),
            _ => (self.to_rgba8(), image::ColorType::Rgba8),
        };

        image::save_buffer(path, &bytes, self.width, self.height, color_type).map_err(
            |source| FilmError::Save {
                path: path.display().to_string(),
                source,
            },
        )?;
        log::info!("Saved {}x{} film to {}", self.width, self.height, path.display());
        Ok(())
    }
}

fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

fn quantize(v: f32) -> u8 {
    (255.0 * v.clamp(0.0, 1.0)).round() as u8
}
