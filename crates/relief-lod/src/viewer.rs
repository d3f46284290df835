//! Camera state consumed by the LOD decision pass.

use glam::{Vec2, Vec3};

/// Per-frame viewer state: world position plus projection parameters.
#[derive(Clone, Copy, Debug)]
pub struct Viewer {
    /// World-space camera position.
    pub position: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    /// Output resolution height in pixels.
    pub screen_height_px: u32,
}

impl Viewer {
    pub fn new(position: Vec3, fov_y_degrees: f32, screen_height_px: u32) -> Self {
        Self {
            position,
            fov_y_degrees,
            screen_height_px,
        }
    }

    /// Willem de Boer's screen-space error constant `C = A / T`.
    ///
    /// `A = 1 / tan(fov_y / 2)` is the perspective scaling factor and
    /// `T = 2 * pixel_error / screen_height` the tolerated error in
    /// normalized screen units. `C` converts a world-space height difference
    /// into an equivalent screen-space pixel error, putting the variance and
    /// error metrics in comparable units.
    pub fn boer_constant(&self, pixel_error_tolerance: f32) -> f32 {
        let a = 1.0 / (self.fov_y_degrees.to_radians() * 0.5).tan();
        let t = 2.0 * pixel_error_tolerance / self.screen_height_px as f32;
        a / t
    }

    /// Distance from the camera to a node center on the terrain plane.
    pub fn distance_to(&self, center: Vec2) -> f32 {
        self.position.distance(Vec3::new(center.x, 0.0, center.y))
    }
}
