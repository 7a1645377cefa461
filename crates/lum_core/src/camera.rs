//! Pinhole/orthographic camera for primary ray generation.
//!
//! Screen parameters (lower-left corner and the two in-plane edge vectors)
//! are recomputed eagerly by every mutator, so [`Camera::get_ray`] is a
//! constant-time, side-effect-free lookup.

use std::collections::BTreeMap;

use lum_math::{Interval, Ray, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::film::ImageFilm;

/// Name of the radiance film.
pub const FILM_RGBA: &str = "RGBA";

/// Name of the primary-hit coverage film.
pub const FILM_HIT: &str = "Hit";

/// Errors raised by invalid camera parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("View direction {0} has zero length")]
    ZeroView(Vec3),

    #[error("View direction {view} is parallel to up vector {up}")]
    ViewParallelToUp { view: Vec3, up: Vec3 },

    #[error("Vertical field of view must be in (0, 180) degrees, got {0}")]
    InvalidFov(f32),

    #[error("Aspect ratio must be positive, got {0}")]
    InvalidAspect(f32),

    #[error("Clip range must satisfy 0 <= near < far, got [{near}, {far}]")]
    InvalidClip { near: f32, far: f32 },

    #[error("Camera extent must be positive, got {0}")]
    InvalidExtent(f32),

    #[error("Film resolution must be non-zero, got {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
}

pub type CameraResult<T> = Result<T, CameraError>;

/// Projection model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Camera for generating rays into the scene.
#[derive(Debug, Clone)]
pub struct Camera {
    // Positioning
    eye: Vec3,
    view: Vec3,
    up: Vec3,

    // Lens settings
    fovy: f32,          // Vertical field of view in degrees
    ortho_width: f32,   // Screen width in orthographic mode
    aspect: f32,        // Width / height
    z_near: f32,
    z_far: f32,
    projection: Projection,
    target_distance: f32,
    focal_length: f32,  // Lens-to-screen distance

    // Cached screen values (set by update_screen())
    right: Vec3,
    screen_up: Vec3,
    corner: Vec3,
    ex: Vec3,
    ey: Vec3,

    films: BTreeMap<String, ImageFilm>,
}

impl Camera {
    /// Create a perspective camera at `eye` looking along `view`.
    pub fn new(eye: Vec3, view: Vec3, up: Vec3) -> CameraResult<Self> {
        let mut camera = Self {
            eye,
            ..Self::default()
        };
        camera.set_orientation(view, up)?;
        Ok(camera)
    }

    /// Set eye position.
    pub fn set_eye(&mut self, eye: Vec3) {
        self.eye = eye;
        self.update_screen();
    }

    /// Set view and up directions. Both are normalized.
    pub fn set_orientation(&mut self, view: Vec3, up: Vec3) -> CameraResult<()> {
        if view.length_squared() < 1e-12 {
            return Err(CameraError::ZeroView(view));
        }
        let view = view.normalize();
        let right = view.cross(up);
        if right.length_squared() < 1e-12 {
            return Err(CameraError::ViewParallelToUp { view, up });
        }
        self.view = view;
        self.up = up.normalize();
        self.right = right.normalize();
        self.screen_up = self.right.cross(self.view).normalize();
        self.update_screen();
        Ok(())
    }

    /// Aim the camera at `target`, keeping the current up vector.
    pub fn look_at(&mut self, target: Vec3) -> CameraResult<()> {
        let to_target = target - self.eye;
        self.set_orientation(to_target, self.up)?;
        self.target_distance = to_target.length();
        Ok(())
    }

    /// Set the vertical field of view in degrees.
    pub fn set_fovy(&mut self, fovy: f32) -> CameraResult<()> {
        if !(fovy > 0.0 && fovy < 180.0) {
            return Err(CameraError::InvalidFov(fovy));
        }
        self.fovy = fovy;
        self.update_screen();
        Ok(())
    }

    pub fn set_aspect(&mut self, aspect: f32) -> CameraResult<()> {
        if !(aspect > 0.0 && aspect.is_finite()) {
            return Err(CameraError::InvalidAspect(aspect));
        }
        self.aspect = aspect;
        self.update_screen();
        Ok(())
    }

    /// Set the near/far clip distances used as the primary ray interval.
    pub fn set_clip(&mut self, z_near: f32, z_far: f32) -> CameraResult<()> {
        if !(z_near >= 0.0 && z_near < z_far) {
            return Err(CameraError::InvalidClip {
                near: z_near,
                far: z_far,
            });
        }
        self.z_near = z_near;
        self.z_far = z_far;
        Ok(())
    }

    /// Set the lens-to-screen distance.
    pub fn set_focal_length(&mut self, focal_length: f32) -> CameraResult<()> {
        if !(focal_length > 0.0) {
            return Err(CameraError::InvalidExtent(focal_length));
        }
        self.focal_length = focal_length;
        self.update_screen();
        Ok(())
    }

    /// Set the screen width used by the orthographic projection.
    pub fn set_ortho_width(&mut self, width: f32) -> CameraResult<()> {
        if !(width > 0.0) {
            return Err(CameraError::InvalidExtent(width));
        }
        self.ortho_width = width;
        self.update_screen();
        Ok(())
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.update_screen();
    }

    pub fn set_target_distance(&mut self, distance: f32) {
        self.target_distance = distance;
    }

    /// Recompute the lower-left corner and screen edge vectors.
    fn update_screen(&mut self) {
        match self.projection {
            Projection::Perspective => {
                let height = 2.0 * self.focal_length * (self.fovy.to_radians() * 0.5).tan();
                let width = height * self.aspect;
                self.ex = self.right * width;
                self.ey = self.screen_up * height;
                self.corner =
                    self.eye + self.view * self.focal_length - self.ex * 0.5 - self.ey * 0.5;
            }
            Projection::Orthographic => {
                self.ex = self.right * self.ortho_width;
                self.ey = self.screen_up * (self.ortho_width / self.aspect);
                self.corner = self.eye - self.ex * 0.5 - self.ey * 0.5;
            }
        }
    }

    /// Generate the ray through normalized screen position `(u, v)`.
    ///
    /// `(0, 0)` is the lower-left corner of the screen, `(1, 1)` the upper
    /// right.
    pub fn get_ray(&self, u: f32, v: f32) -> Ray {
        let on_screen = self.corner + self.ex * u + self.ey * v;
        let range = Interval::new(self.z_near, self.z_far);
        match self.projection {
            Projection::Perspective => Ray::new(self.eye, on_screen - self.eye, range),
            Projection::Orthographic => Ray::new(on_screen, self.view, range),
        }
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn view(&self) -> Vec3 {
        self.view
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn fovy(&self) -> f32 {
        self.fovy
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn clip(&self) -> (f32, f32) {
        (self.z_near, self.z_far)
    }

    pub fn focal_length(&self) -> f32 {
        self.focal_length
    }

    pub fn target_distance(&self) -> f32 {
        self.target_distance
    }

    /// Point the camera is focused on, `target_distance` along the view.
    pub fn target(&self) -> Vec3 {
        self.eye + self.view * self.target_distance
    }

    /// Screen basis `(right, up')` derived from view and up.
    pub fn screen_basis(&self) -> (Vec3, Vec3) {
        (self.right, self.screen_up)
    }

    /// Attach (or replace) a named film.
    pub fn add_film(&mut self, name: impl Into<String>, film: ImageFilm) {
        self.films.insert(name.into(), film);
    }

    pub fn film(&self, name: &str) -> Option<&ImageFilm> {
        self.films.get(name)
    }

    pub fn film_mut(&mut self, name: &str) -> Option<&mut ImageFilm> {
        self.films.get_mut(name)
    }

    pub fn remove_film(&mut self, name: &str) -> Option<ImageFilm> {
        self.films.remove(name)
    }

    pub fn film_names(&self) -> impl Iterator<Item = &str> {
        self.films.keys().map(String::as_str)
    }

    /// Reallocate every film at `width x height` and match the aspect ratio.
    pub fn resize_films(&mut self, width: u32, height: u32) -> CameraResult<()> {
        if width == 0 || height == 0 {
            return Err(CameraError::InvalidResolution { width, height });
        }
        self.set_aspect(width as f32 / height as f32)?;
        for film in self.films.values_mut() {
            if film.width() != width || film.height() != height {
                *film = film
                    .resized(width, height)
                    .map_err(|_| CameraError::InvalidResolution { width, height })?;
            }
        }
        Ok(())
    }
}

impl Default for Camera {
    /// Perspective camera at the origin looking down -Z with +Y up.
    fn default() -> Self {
        let mut camera = Self {
            eye: Vec3::ZERO,
            view: Vec3::NEG_Z,
            up: Vec3::Y,
            fovy: 45.0,
            ortho_width: 2.0,
            aspect: 1.0,
            z_near: 0.001,
            z_far: f32::INFINITY,
            projection: Projection::Perspective,
            target_distance: 1.0,
            focal_length: 1.0,
            right: Vec3::X,
            screen_up: Vec3::Y,
            corner: Vec3::ZERO,
            ex: Vec3::ZERO,
            ey: Vec3::ZERO,
            films: BTreeMap::new(),
        };
        camera.update_screen();
        camera
    }
}

/// Serializable camera settings, applied through [`CameraParams::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    pub eye: Vec3,
    /// Point to look at; takes precedence over `view` when set.
    pub target: Option<Vec3>,
    pub view: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fovy: f32,
    pub projection: Projection,
    pub ortho_width: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub focal_length: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 5.0),
            target: None,
            view: Vec3::NEG_Z,
            up: Vec3::Y,
            fovy: 45.0,
            projection: Projection::Perspective,
            ortho_width: 2.0,
            z_near: 0.001,
            z_far: f32::MAX,
            focal_length: 1.0,
        }
    }
}

impl CameraParams {
    /// Apply these settings to `camera`, keeping its films and aspect.
    ///
    /// Either every field is applied or, on error, `camera` is unchanged.
    pub fn apply(&self, camera: &mut Camera) -> CameraResult<()> {
        let films = std::mem::take(&mut camera.films);
        let mut next = camera.clone();
        camera.films = films;

        self.apply_fields(&mut next)?;
        next.films = std::mem::take(&mut camera.films);
        *camera = next;
        Ok(())
    }

    fn apply_fields(&self, camera: &mut Camera) -> CameraResult<()> {
        camera.set_eye(self.eye);
        match self.target {
            Some(target) => {
                camera.set_orientation(target - self.eye, self.up)?;
                camera.set_target_distance((target - self.eye).length());
            }
            None => camera.set_orientation(self.view, self.up)?,
        }
        camera.set_fovy(self.fovy)?;
        camera.set_ortho_width(self.ortho_width)?;
        camera.set_clip(self.z_near, self.z_far)?;
        camera.set_focal_length(self.focal_length)?;
        camera.set_projection(self.projection);
        Ok(())
    }

    /// Build a fresh camera from these settings.
    pub fn to_camera(&self) -> CameraResult<Camera> {
        let mut camera = Camera::default();
        self.apply(&mut camera)?;
        Ok(camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn front_camera() -> Camera {
        Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, Vec3::Y).unwrap()
    }

    #[test]
    fn test_camera_basis() {
        let camera = front_camera();
        let (right, up) = camera.screen_basis();
        assert!((right - Vec3::X).length() < 1e-6);
        assert!((up - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_center_ray_points_along_view() {
        let camera = front_camera();
        let ray = camera.get_ray(0.5, 0.5);
        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, 5.0));
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-6);
        assert_eq!(ray.t.min, 0.001);
    }

    #[test]
    fn test_corner_rays_match_fov() {
        let mut camera = front_camera();
        camera.set_fovy(90.0).unwrap();
        // Top edge center: 45 degrees up from the view direction
        let ray = camera.get_ray(0.5, 1.0);
        let expected = Vec3::new(0.0, 1.0, -1.0).normalize();
        assert!((ray.direction - expected).length() < 1e-5);

        // Lower-left corner
        let ray = camera.get_ray(0.0, 0.0);
        let expected = Vec3::new(-1.0, -1.0, -1.0).normalize();
        assert!((ray.direction - expected).length() < 1e-5);
    }

    #[test]
    fn test_screen_recomputed_on_every_mutator() {
        let mut camera = front_camera();
        let before = camera.get_ray(1.0, 0.5).direction;

        camera.set_aspect(2.0).unwrap();
        let wider = camera.get_ray(1.0, 0.5).direction;
        assert!(wider.x > before.x);

        camera.set_eye(Vec3::new(1.0, 0.0, 5.0));
        assert_eq!(camera.get_ray(0.5, 0.5).origin, Vec3::new(1.0, 0.0, 5.0));

        camera.look_at(Vec3::new(1.0, 10.0, 5.0)).unwrap_err();
        camera.look_at(Vec3::new(11.0, 0.0, 5.0)).unwrap();
        assert!((camera.get_ray(0.5, 0.5).direction - Vec3::X).length() < 1e-6);
        assert!((camera.target_distance() - 10.0).abs() < 1e-5);
        assert!((camera.target() - Vec3::new(11.0, 0.0, 5.0)).length() < 1e-4);
    }

    #[test]
    fn test_get_ray_is_pure() {
        let camera = front_camera();
        let a = camera.get_ray(0.3, 0.7);
        let b = camera.get_ray(0.3, 0.7);
        assert_eq!(a, b);
    }

    #[test]
    fn test_orthographic_rays_are_parallel() {
        let mut camera = front_camera();
        camera.set_projection(Projection::Orthographic);
        camera.set_ortho_width(4.0).unwrap();

        let a = camera.get_ray(0.0, 0.0);
        let b = camera.get_ray(1.0, 1.0);
        assert_eq!(a.direction, Vec3::NEG_Z);
        assert_eq!(b.direction, Vec3::NEG_Z);
        assert!((a.origin - Vec3::new(-2.0, -2.0, 5.0)).length() < 1e-5);
        assert!((b.origin - Vec3::new(2.0, 2.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            Camera::new(Vec3::ZERO, Vec3::Y, Vec3::Y),
            Err(CameraError::ViewParallelToUp { .. })
        ));
        assert!(matches!(
            Camera::new(Vec3::ZERO, Vec3::ZERO, Vec3::Y),
            Err(CameraError::ZeroView(_))
        ));

        let mut camera = front_camera();
        assert_eq!(camera.set_fovy(180.0), Err(CameraError::InvalidFov(180.0)));
        assert_eq!(camera.set_aspect(0.0), Err(CameraError::InvalidAspect(0.0)));
        assert!(camera.set_clip(2.0, 1.0).is_err());
        // Failed mutators leave the camera untouched
        assert_eq!(camera.fovy(), 45.0);
        assert_eq!(camera.aspect(), 1.0);
    }

    #[test]
    fn test_films_resize() {
        let mut camera = front_camera();
        camera.add_film(FILM_RGBA, ImageFilm::new(4, 4, 4).unwrap());
        camera.add_film(FILM_HIT, ImageFilm::new(4, 4, 1).unwrap());

        camera.resize_films(64, 32).unwrap();
        let rgba = camera.film(FILM_RGBA).unwrap();
        assert_eq!((rgba.width(), rgba.height(), rgba.channels()), (64, 32, 4));
        assert_eq!(camera.film(FILM_HIT).unwrap().channels(), 1);
        assert_eq!(camera.aspect(), 2.0);
        assert_eq!(camera.film_names().collect::<Vec<_>>(), vec![FILM_HIT, FILM_RGBA]);
    }

    #[test]
    fn test_rejected_params_leave_camera_untouched() {
        let mut camera = front_camera();
        camera.add_film(FILM_RGBA, ImageFilm::new(4, 4, 4).unwrap());
        let before_ray = camera.get_ray(0.25, 0.75);

        let params = CameraParams {
            eye: Vec3::new(30.0, 0.0, 5.0),
            fovy: 0.0,
            ..Default::default()
        };
        assert_eq!(params.apply(&mut camera), Err(CameraError::InvalidFov(0.0)));
        assert_eq!(camera.eye(), Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.fovy(), 45.0);
        assert_eq!(camera.get_ray(0.25, 0.75), before_ray);
        assert!(camera.film(FILM_RGBA).is_some());

        let params = CameraParams {
            eye: Vec3::new(30.0, 0.0, 5.0),
            ..Default::default()
        };
        params.apply(&mut camera).unwrap();
        assert_eq!(camera.eye(), Vec3::new(30.0, 0.0, 5.0));
        assert!(camera.film(FILM_RGBA).is_some());
    }

    #[test]
    fn test_params_apply() {
        let params = CameraParams {
            eye: Vec3::new(0.0, 1.0, 5.0),
            target: Some(Vec3::new(0.0, 1.0, 0.0)),
            fovy: 60.0,
            ..Default::default()
        };
        let camera = params.to_camera().unwrap();
        assert_eq!(camera.eye(), Vec3::new(0.0, 1.0, 5.0));
        assert!((camera.view() - Vec3::NEG_Z).length() < 1e-6);
        assert_eq!(camera.fovy(), 60.0);
        assert!((camera.target_distance() - 5.0).abs() < 1e-6);
    }
}
