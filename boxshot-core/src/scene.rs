//! The fixed scene template: one textured slab, one point light, one camera

use crate::camera::PerspectiveCamera;
use crate::geometry::BoxGeometry;
use crate::image::FetchedImage;
use nalgebra::{Matrix4, Point3, Vector3};

/// Thickness of the slab along the world y axis
pub const SLAB_THICKNESS: f32 = 0.015;

/// World position of the point light
pub const LIGHT_POSITION: [f32; 3] = [3.0, 3.0, 5.0];

/// Opaque white
pub const BACKGROUND: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Texture filtering modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Texture wrapping modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
}

/// RGBA8 texture built straight from fetched pixels
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub image: FetchedImage,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

impl Texture {
    /// Raw data texture with nearest sampling and clamped edges
    pub fn new(image: FetchedImage) -> Self {
        Self {
            image,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
        }
    }
}

/// An unlit, textured mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: BoxGeometry,
    pub texture: Texture,
    pub position: Point3<f32>,
    pub scale: Vector3<f32>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    /// Object-to-world transform: translation after scale
    pub fn model_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.position.coords) * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// True when the transform mirrors the mesh (odd number of negative scales)
    pub fn is_mirrored(&self) -> bool {
        self.scale.x * self.scale.y * self.scale.z < 0.0
    }
}

/// Shadow camera settings of a point light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightShadow {
    /// Field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Edge length of the square depth map in texels
    pub map_size: u32,
}

impl Default for LightShadow {
    fn default() -> Self {
        Self {
            fov: 90.0,
            near: 0.5,
            far: 500.0,
            map_size: 512,
        }
    }
}

/// A point light
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Point3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
    pub cast_shadow: bool,
    pub shadow: LightShadow,
}

impl PointLight {
    /// White light of unit intensity
    pub fn new(position: Point3<f32>) -> Self {
        Self {
            position,
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            cast_shadow: false,
            shadow: LightShadow::default(),
        }
    }

    /// Camera the shadow map is rendered from, aimed at `target`
    pub fn shadow_camera(&self, target: Point3<f32>) -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(1.0);
        camera.fov = self.shadow.fov;
        camera.near = self.shadow.near;
        camera.far = self.shadow.far;
        camera.up = Vector3::z();
        camera.position = self.position;
        camera.look_at(target);
        camera
    }
}

/// Everything a single render needs
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub background: [f32; 4],
    pub mesh: Mesh,
    pub light: PointLight,
    pub camera: PerspectiveCamera,
}

impl Scene {
    /// Assemble the slab scene.
    ///
    /// The texture keeps the fetched image's own shape; `width` and
    /// `height` only size the slab and the camera's aspect ratio. The slab
    /// is mirrored along x by its negative scale. The camera uses a z-up
    /// world and always looks at the slab.
    pub fn build(image: FetchedImage, width: f64, height: f64, camera_position: Point3<f64>) -> Self {
        let (width, height) = (width as f32, height as f32);

        let mut texture = Texture::new(image);
        texture.min_filter = FilterMode::Linear;
        texture.wrap_s = WrapMode::Repeat;

        let mesh = Mesh {
            geometry: BoxGeometry::unit(),
            texture,
            position: Point3::origin(),
            scale: Vector3::new(-width, SLAB_THICKNESS, height),
            cast_shadow: true,
            receive_shadow: false,
        };

        let mut light = PointLight::new(Point3::from(LIGHT_POSITION));
        light.cast_shadow = true;

        let mut camera = PerspectiveCamera::new(width / height);
        camera.up = Vector3::z();
        camera.position = camera_position.cast::<f32>();
        camera.look_at(mesh.position);

        Self {
            background: BACKGROUND,
            mesh,
            light,
            camera,
        }
    }

    /// Whether a shadow pass has anything to do
    pub fn casts_shadows(&self) -> bool {
        self.light.cast_shadow && self.mesh.cast_shadow
    }
}
