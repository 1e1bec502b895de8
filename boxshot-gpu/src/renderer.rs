//! Offscreen scene renderer

use crate::device::{ContextOptions, GpuContext};
use crate::precision::ShaderPrecision;
use crate::readback;
use crate::shadow::{ShadowMap, ShadowSettings, ShadowUniform};
use crate::target::{OffscreenTarget, TargetFilters, DEPTH_FORMAT, TARGET_FORMAT};
use crate::texture::GpuTexture;
use boxshot_core::{
    gl_to_wgpu_clip, Error, LightShadow, OffscreenSurface, RenderedFrame, RendererFactory, Resolution, Result, Scene, Vertex,
};
use bytemuck::{Pod, Zeroable};
use nalgebra::Matrix4;

/// Uniform data of the main pass
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub shadow_params: [f32; 4],
}

/// Renderer configuration
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    pub context: ContextOptions,
    pub shadows: ShadowSettings,
    pub target_filters: TargetFilters,
}

/// Renders one scene into an offscreen target it owns
pub struct OffscreenRenderer {
    pub gpu_context: GpuContext,
    pub config: RenderConfig,
    pub precision: ShaderPrecision,
    pub target: OffscreenTarget,
    pub scene_pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub shadow_map: ShadowMap,
}

impl OffscreenRenderer {
    /// Acquire a context and allocate a target of `resolution`
    pub fn create(resolution: Resolution, config: RenderConfig) -> Result<Self> {
        let gpu_context = pollster::block_on(GpuContext::with_options(&config.context))?;
        Self::with_context(gpu_context, resolution, config)
    }

    /// Build the renderer on an existing context
    pub fn with_context(gpu_context: GpuContext, resolution: Resolution, config: RenderConfig) -> Result<Self> {
        let max = gpu_context.max_texture_dimension();
        if resolution.width == 0 || resolution.height == 0 || resolution.width > max || resolution.height > max {
            return Err(Error::ContextCreation(format!(
                "unable to create a {}x{} drawing buffer (device limit {})",
                resolution.width, resolution.height, max
            )));
        }

        // The shadow setup depends on this, so it is always probed
        let precision = ShaderPrecision::query_or_default(&gpu_context.adapter);
        let target = OffscreenTarget::new(&gpu_context, resolution, config.target_filters);

        let bind_group_layout = gpu_context.create_bind_group_layout(
            "slab_bind_group_layout",
            &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        );

        let shader = gpu_context.create_shader_module("Slab Shader", include_str!("shaders/slab.wgsl"));
        let scene_pipeline = Self::create_render_pipeline(&gpu_context.device, &bind_group_layout, &shader);

        // With shadows off the slab pass still binds a 1x1 map it never reads
        let shadow_size = if config.shadows.enabled {
            LightShadow::default().map_size
        } else {
            1
        };
        let shadow_map = ShadowMap::new(&gpu_context, config.shadows, shadow_size);

        Ok(Self {
            gpu_context,
            config,
            precision,
            target,
            scene_pipeline,
            bind_group_layout,
            shadow_map,
        })
    }

    fn create_render_pipeline(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        shader: &wgpu::ShaderModule,
    ) -> wgpu::RenderPipeline {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Slab Render Pipeline Layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Slab Render Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: "vs_main",
                buffers: &[Vertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // No culling: the slab is mirrored and clip space is flipped
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }

    /// Light-space transform the shadow map is rendered with
    pub fn light_view_projection(scene: &Scene) -> Matrix4<f32> {
        let light_camera = scene.light.shadow_camera(scene.mesh.position);
        gl_to_wgpu_clip(false) * light_camera.view_projection()
    }

    /// Uniform block for the slab pass
    pub fn scene_uniform(&self, scene: &Scene) -> SceneUniform {
        let receive_shadow = self.config.shadows.enabled && scene.mesh.receive_shadow;
        let radius = self.config.shadows.map_type.kernel_radius();
        SceneUniform {
            view_proj: (gl_to_wgpu_clip(true) * scene.camera.view_projection()).into(),
            model: scene.mesh.model_matrix().into(),
            light_view_proj: Self::light_view_projection(scene).into(),
            shadow_params: [
                if receive_shadow { 1.0 } else { 0.0 },
                self.precision.shadow_bias(),
                self.shadow_map.texel_size(),
                radius as f32,
            ],
        }
    }

    /// Draw the scene into the offscreen target
    pub fn render(&self, scene: &Scene) -> Result<()> {
        let shadow_map = &self.shadow_map;
        let texture = GpuTexture::upload(&self.gpu_context, &scene.mesh.texture)?;

        let geometry = &scene.mesh.geometry;
        let vertex_buffer = self.gpu_context.create_buffer_init(
            "Slab Vertex Buffer",
            &geometry.vertices,
            wgpu::BufferUsages::VERTEX,
        );
        let index_buffer =
            self.gpu_context
                .create_buffer_init("Slab Index Buffer", &geometry.indices, wgpu::BufferUsages::INDEX);
        let index_count = geometry.indices.len() as u32;

        let uniform = self.scene_uniform(scene);
        let uniform_buffer = self.gpu_context.create_buffer_init(
            "Slab Uniform Buffer",
            std::slice::from_ref(&uniform),
            wgpu::BufferUsages::UNIFORM,
        );

        let bind_group = self.gpu_context.create_bind_group(
            "slab_bind_group",
            &self.bind_group_layout,
            &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
                },
            ],
        );

        let mut encoder = self.gpu_context.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Slab Render Encoder"),
        });

        if self.config.shadows.enabled && scene.casts_shadows() {
            let shadow_uniform = ShadowUniform {
                light_mvp: (Self::light_view_projection(scene) * scene.mesh.model_matrix()).into(),
            };
            shadow_map.record(
                &self.gpu_context,
                &mut encoder,
                &shadow_uniform,
                &vertex_buffer,
                &index_buffer,
                index_count,
            );
        }

        let store = if self.config.context.preserve_drawing_buffer {
            wgpu::StoreOp::Store
        } else {
            wgpu::StoreOp::Discard
        };
        let [r, g, b, a] = scene.background;

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Slab Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(r),
                            g: f64::from(g),
                            b: f64::from(b),
                            a: f64::from(a),
                        }),
                        store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.scene_pipeline);
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..index_count, 0, 0..1);
        }

        self.gpu_context.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Read the drawing buffer back as a top-down frame
    pub fn read_frame(&self) -> Result<RenderedFrame> {
        readback::read_frame(&self.gpu_context, &self.target)
    }
}

impl OffscreenSurface for OffscreenRenderer {
    fn render(&mut self, scene: &Scene) -> Result<()> {
        OffscreenRenderer::render(self, scene)
    }

    fn read_frame(&self) -> Result<RenderedFrame> {
        OffscreenRenderer::read_frame(self)
    }

    fn resolution(&self) -> Resolution {
        self.target.resolution
    }
}

/// Creates a fresh context and renderer for every call
#[derive(Debug, Clone, Default)]
pub struct WgpuRendererFactory {
    pub config: RenderConfig,
}

impl WgpuRendererFactory {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}

impl RendererFactory for WgpuRendererFactory {
    fn create(&self, resolution: Resolution) -> Result<Box<dyn OffscreenSurface>> {
        let renderer = OffscreenRenderer::create(resolution, self.config.clone())?;
        Ok(Box::new(renderer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use boxshot_core::{FetchedImage, Point3};
    use nalgebra::Vector4;

    /// Try to create a GPU context, return None if not available
    fn try_create_gpu_context() -> Option<GpuContext> {
        match pollster::block_on(GpuContext::new()) {
            Ok(gpu) => Some(gpu),
            Err(_) => {
                println!("⚠️  GPU not available, skipping GPU-dependent test");
                None
            }
        }
    }

    fn front_view_scene(image: FetchedImage) -> Scene {
        // Looking at the slab's -y face from straight ahead, z up on screen
        Scene::build(image, 1.0, 1.0, Point3::new(0.0, -3.0, 0.0))
    }

    #[test]
    fn test_light_looks_at_slab() {
        let scene = front_view_scene(FetchedImage::solid(1, 1, [0, 0, 0, 255]).unwrap());
        let clip = OffscreenRenderer::light_view_projection(&scene) * Vector4::new(0.0, 0.0, 0.0, 1.0);

        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
        let depth = clip.z / clip.w;
        assert!(depth > 0.0 && depth < 1.0, "depth {}", depth);
    }

    #[test]
    fn test_no_backend_is_a_context_error() {
        let mut config = RenderConfig::default();
        config.context.backends = wgpu::Backends::empty();

        let result = OffscreenRenderer::create(Resolution::new(8, 8), config);
        assert!(matches!(result, Err(Error::ContextCreation(_))));
    }

    #[test]
    fn test_oversized_target_is_a_context_error() {
        let Some(gpu) = try_create_gpu_context() else {
            return;
        };
        let too_wide = gpu.max_texture_dimension() + 1;
        let result = OffscreenRenderer::with_context(gpu, Resolution::new(too_wide, 4), RenderConfig::default());
        assert!(matches!(result, Err(Error::ContextCreation(_))));
    }

    #[test]
    fn test_render_solid_slab() {
        let Some(gpu) = try_create_gpu_context() else {
            return;
        };
        let resolution = Resolution::new(64, 48);
        let renderer = OffscreenRenderer::with_context(gpu, resolution, RenderConfig::default()).unwrap();

        let scene = front_view_scene(FetchedImage::solid(2, 2, [255, 0, 0, 255]).unwrap());
        renderer.render(&scene).unwrap();
        let frame = renderer.read_frame().unwrap();

        assert_eq!((frame.width(), frame.height()), (64, 48));
        assert_eq!(frame.pixel(32, 24), Some([255, 0, 0, 255]));
        assert_eq!(frame.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(frame.pixel(63, 47), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_frame_rows_are_top_down() {
        let Some(gpu) = try_create_gpu_context() else {
            return;
        };
        let renderer = OffscreenRenderer::with_context(gpu, Resolution::new(64, 48), RenderConfig::default()).unwrap();

        // Row 0 red, row 1 blue. On the -y face uv v=0 sits at the bottom
        // edge, so blue must come out above red.
        let pixels = [[255, 0, 0, 255], [255, 0, 0, 255], [0, 0, 255, 255], [0, 0, 255, 255]].concat();
        let scene = front_view_scene(FetchedImage::new(2, 2, pixels).unwrap());
        renderer.render(&scene).unwrap();
        let frame = renderer.read_frame().unwrap();

        assert_eq!(frame.pixel(32, 19), Some([0, 0, 255, 255]));
        assert_eq!(frame.pixel(32, 29), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_factory_surfaces_report_resolution() {
        if try_create_gpu_context().is_none() {
            return;
        }
        let factory = WgpuRendererFactory::default();
        let mut surface = factory.create(Resolution::new(20, 10)).unwrap();
        assert_eq!(surface.resolution(), Resolution::new(20, 10));

        let scene = Scene::build(FetchedImage::solid(1, 1, [0, 255, 0, 255]).unwrap(), 2.0, 1.0, Point3::new(0.0, -4.0, 1.0));
        surface.render(&scene).unwrap();
        let frame = surface.read_frame().unwrap();
        assert_eq!(frame.pixels().len(), 20 * 10 * 4);
    }
}
