//! Fixed viewing camera

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Camera uniform for GPU
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct RenderParameters {
    pub view_projection: [[f32; 4]; 4],
    /// xyz = eye position, w = padding
    pub eye_position: [f32; 4],
}

/// Camera looking down -Z at the origin from a fixed distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub distance: f32,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            distance: 1.5,
            aspect: width as f32 / height.max(1) as f32,
            fovy: 1.0,
            znear: 0.1,
            zfar: 50.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.distance)
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        let view = Mat4::from_translation(-self.position());
        let proj = Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar);
        proj * view
    }

    pub fn to_uniform(&self) -> RenderParameters {
        RenderParameters {
            view_projection: self.build_view_projection_matrix().to_cols_array_2d(),
            eye_position: self.position().extend(0.0).to_array(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::Vec4;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<RenderParameters>(), 80);
    }

    #[test]
    fn test_origin_projects_to_screen_center() {
        let camera = Camera::new(1280, 720);
        let clip = camera.build_view_projection_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;

        assert_abs_diff_eq!(ndc.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ndc.y, 0.0, epsilon = 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_seed_sphere_is_in_view() {
        let camera = Camera::new(1280, 720);
        let matrix = camera.build_view_projection_matrix();
        for point in [Vec3::X, Vec3::Y, Vec3::Z, -Vec3::Z] {
            let clip = matrix * (point * 0.6).extend(1.0);
            let ndc = clip / clip.w;
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{point} out of view");
        }
    }

    #[test]
    fn test_resize_changes_aspect_only() {
        let mut camera = Camera::new(1280, 720);
        let eye = camera.to_uniform().eye_position;
        camera.resize(800, 800);
        assert_eq!(camera.aspect, 1.0);
        assert_eq!(camera.to_uniform().eye_position, eye);
    }
}
