//! Perspective cameras and look-at math

use nalgebra::{Matrix3, Matrix4, Perspective3, Point3, Vector3};

/// Vertical field of view used when none is given, in degrees
pub const DEFAULT_FOV_DEGREES: f32 = 50.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 2000.0;

/// A perspective camera looking at a fixed target
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    /// Create a camera with the default lens, looking at the origin
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Point3::origin(),
            target: Point3::origin(),
            up: Vector3::y(),
            fov: DEFAULT_FOV_DEGREES,
            aspect_ratio,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }

    /// Point the camera at `target`
    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    /// World-space orientation of the camera (columns are its x, y, z axes)
    pub fn orientation(&self) -> Matrix3<f32> {
        look_at_rotation(&self.position, &self.target, &self.up)
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let rotation_t = self.orientation().transpose();
        let translation = -(rotation_t * self.position.coords);

        let mut view = rotation_t.to_homogeneous();
        view.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        view
    }

    /// Get the projection matrix (GL clip space, depth in [-1, 1])
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let perspective = Perspective3::new(self.aspect_ratio, self.fov.to_radians(), self.near, self.far);
        perspective.into_inner()
    }

    /// Projection times view
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Rotation whose -z axis points from `eye` towards `target`.
///
/// When `eye` and `target` coincide the camera looks down -z. When `up` is
/// parallel to the viewing direction the backward axis is nudged by 1e-4 so
/// the basis stays finite.
pub fn look_at_rotation(eye: &Point3<f32>, target: &Point3<f32>, up: &Vector3<f32>) -> Matrix3<f32> {
    let mut z = eye - target;
    if z.norm_squared() == 0.0 {
        z.z = 1.0;
    }
    z.normalize_mut();

    let mut x = up.cross(&z);
    if x.norm_squared() == 0.0 {
        if up.z.abs() == 1.0 {
            z.x += 0.0001;
        } else {
            z.z += 0.0001;
        }
        z.normalize_mut();
        x = up.cross(&z);
    }
    x.normalize_mut();

    let y = z.cross(&x);
    Matrix3::from_columns(&[x, y, z])
}

/// Maps GL clip space to wgpu clip space (depth [-1, 1] to [0, 1]).
///
/// With `flip_y` the image is mirrored vertically so that texture row 0
/// holds the bottom of the picture, the row order of a GL framebuffer.
pub fn gl_to_wgpu_clip(flip_y: bool) -> Matrix4<f32> {
    let sy = if flip_y { -1.0 } else { 1.0 };
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, sy, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    #[test]
    fn test_view_matches_nalgebra_look_at() {
        let mut camera = PerspectiveCamera::new(1.5);
        camera.position = Point3::new(2.0, -4.0, 3.0);
        camera.up = Vector3::z();
        camera.look_at(Point3::origin());

        let expected = Matrix4::look_at_rh(&camera.position, &camera.target, &camera.up);
        assert_relative_eq!(camera.view_matrix(), expected, epsilon = 1e-5);
    }

    #[test]
    fn test_up_parallel_to_view_direction_stays_finite() {
        let mut camera = PerspectiveCamera::new(1.0);
        camera.position = Point3::new(0.0, 0.0, 5.0);
        camera.up = Vector3::z();
        camera.look_at(Point3::origin());

        let view = camera.view_matrix();
        assert!(view.iter().all(|v| v.is_finite()));

        // The target still ends up straight ahead of the camera
        let target = view * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(target.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(target.y, 0.0, epsilon = 1e-3);
        assert_relative_eq!(target.z, -5.0, epsilon = 1e-3);
    }

    #[test]
    fn test_coincident_eye_and_target() {
        let rotation = look_at_rotation(&Point3::origin(), &Point3::origin(), &Vector3::y());
        assert_relative_eq!(rotation, Matrix3::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_projection_uses_aspect() {
        let camera = PerspectiveCamera::new(2.0);
        let projection = camera.projection_matrix();
        assert_relative_eq!(projection[(1, 1)] / projection[(0, 0)], 2.0, epsilon = 1e-5);

        let focal = 1.0 / (DEFAULT_FOV_DEGREES.to_radians() / 2.0).tan();
        assert_relative_eq!(projection[(1, 1)], focal, epsilon = 1e-5);
    }

    #[test]
    fn test_clip_correction() {
        let near_plane = gl_to_wgpu_clip(true) * Vector4::new(0.25, 0.5, -1.0, 1.0);
        assert_relative_eq!(near_plane, Vector4::new(0.25, -0.5, 0.0, 1.0));

        let far_plane = gl_to_wgpu_clip(false) * Vector4::new(0.25, 0.5, 1.0, 1.0);
        assert_relative_eq!(far_plane, Vector4::new(0.25, 0.5, 1.0, 1.0));
    }
}
