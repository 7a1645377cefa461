// Re-export glam for convenience
pub use glam::*;

// LUM math types
mod basis;
mod bbox;
mod interval;
mod ray;

pub use basis::{BasisError, Onb};
pub use bbox::BBox;
pub use interval::Interval;
pub use ray::Ray;

/// RGBA color used for radiance, reflectance and film values.
pub type Color = Vec4;

/// Opaque black.
pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

/// Opaque white, the initial path reflectance.
pub const WHITE: Color = Color::ONE;
