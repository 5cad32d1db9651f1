//! Camera for the 2D canvas

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

use crate::palette;

/// Camera uniform for GPU; matches `Camera` in the render shaders
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub slow_color: [f32; 4],
    pub fast_color: [f32; 4],
    /// Quad half-extent in pixels per unit of particle radius
    pub point_scale: f32,
    /// Reciprocal of the speed that maps to `fast_color`
    pub speed_scale: f32,
    pub _padding: [f32; 2],
}

impl CameraUniform {
    pub fn new(view_proj: Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            slow_color: palette::slow_color(),
            fast_color: palette::fast_color(),
            point_scale: 1.5,
            speed_scale: 1.0 / 40.0,
            _padding: [0.0; 2],
        }
    }
}

/// Orthographic camera in canvas pixels: origin top-left, y down,
/// matching the coordinates pointer events arrive in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasCamera {
    pub width: f32,
    pub height: f32,
}

impl CanvasCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1) as f32,
            height: height.max(1) as f32,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    pub fn extent(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(0.0, self.width, self.height, 0.0, -1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn project(camera: &CanvasCamera, x: f32, y: f32) -> Vec4 {
        camera.build_view_projection_matrix() * Vec4::new(x, y, 0.0, 1.0)
    }

    #[test]
    fn test_canvas_corners_map_to_clip_corners() {
        let camera = CanvasCamera::new(800, 600);

        let top_left = project(&camera, 0.0, 0.0);
        let bottom_right = project(&camera, 800.0, 600.0);
        let center = project(&camera, 400.0, 300.0);

        assert!((top_left.x + 1.0).abs() < 1e-6);
        assert!((top_left.y - 1.0).abs() < 1e-6);
        assert!((bottom_right.x - 1.0).abs() < 1e-6);
        assert!((bottom_right.y + 1.0).abs() < 1e-6);
        assert!(center.x.abs() < 1e-6 && center.y.abs() < 1e-6);
        assert!((0.0..=1.0).contains(&center.z));
    }

    #[test]
    fn test_resize_and_zero_extent() {
        let mut camera = CanvasCamera::new(0, 0);
        assert_eq!(camera.extent(), Vec2::ONE);

        camera.resize(1920, 1080);
        assert_eq!(camera.extent(), Vec2::new(1920.0, 1080.0));
    }

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 112);
    }
}
