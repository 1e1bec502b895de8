//! Box geometry for the textured slab

use bytemuck::{Pod, Zeroable};

/// Vertex with position, normal and texture coordinates
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[cfg(feature = "gpu")]
impl Vertex {
    /// Vertex buffer layout descriptor
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // UV
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Indexed triangle list for an axis-aligned box
#[derive(Debug, Clone, PartialEq)]
pub struct BoxGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

#[derive(Clone, Copy)]
enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl BoxGeometry {
    /// Unit cube centred on the origin
    pub fn unit() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// Box of the given extents, one quad (two triangles) per face.
    ///
    /// Faces are emitted in the order +x, -x, +y, -y, +z, -z. Within a face
    /// the texture's v axis runs opposite to the face's vertical axis, so
    /// uv (0, 0) sits at the face's upper-left corner.
    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        let mut geometry = Self {
            vertices: Vec::with_capacity(24),
            indices: Vec::with_capacity(36),
        };

        geometry.plane(Axis::Z, Axis::Y, Axis::X, -1.0, -1.0, [depth, height, width]);
        geometry.plane(Axis::Z, Axis::Y, Axis::X, 1.0, -1.0, [depth, height, -width]);
        geometry.plane(Axis::X, Axis::Z, Axis::Y, 1.0, 1.0, [width, depth, height]);
        geometry.plane(Axis::X, Axis::Z, Axis::Y, 1.0, -1.0, [width, depth, -height]);
        geometry.plane(Axis::X, Axis::Y, Axis::Z, 1.0, -1.0, [width, height, depth]);
        geometry.plane(Axis::X, Axis::Y, Axis::Z, -1.0, -1.0, [width, height, -depth]);

        geometry
    }

    /// `extent` is (face width, face height, signed distance across the box)
    fn plane(&mut self, u: Axis, v: Axis, w: Axis, u_dir: f32, v_dir: f32, extent: [f32; 3]) {
        let [face_width, face_height, depth] = extent;
        let base = self.vertices.len() as u32;

        for iy in 0..2 {
            for ix in 0..2 {
                let x = ix as f32 * face_width - face_width / 2.0;
                let y = iy as f32 * face_height - face_height / 2.0;

                let mut position = [0.0; 3];
                position[u as usize] = x * u_dir;
                position[v as usize] = y * v_dir;
                position[w as usize] = depth / 2.0;

                let mut normal = [0.0; 3];
                normal[w as usize] = if depth > 0.0 { 1.0 } else { -1.0 };

                self.vertices.push(Vertex {
                    position,
                    normal,
                    uv: [ix as f32, 1.0 - iy as f32],
                });
            }
        }

        // a: (0,0), b: (0,1), c: (1,1), d: (1,0)
        let a = base;
        let b = base + 2;
        let c = base + 3;
        let d = base + 1;
        self.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
