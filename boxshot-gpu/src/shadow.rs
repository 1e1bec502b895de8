//! Shadow mapping for the point light

use crate::device::GpuContext;
use boxshot_core::Vertex;
use bytemuck::{Pod, Zeroable};

/// Depth format of the shadow map
pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Filtering applied when testing against the shadow map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowMapType {
    /// One unfiltered tap
    Basic,
    /// 3x3 unfiltered taps
    Pcf,
    /// 3x3 hardware-filtered taps
    PcfSoft,
}

impl ShadowMapType {
    /// Half-width of the sampling kernel in texels
    pub fn kernel_radius(&self) -> u32 {
        match self {
            ShadowMapType::Basic => 0,
            ShadowMapType::Pcf | ShadowMapType::PcfSoft => 1,
        }
    }

    /// Filter of the comparison sampler
    pub fn filter(&self) -> wgpu::FilterMode {
        match self {
            ShadowMapType::PcfSoft => wgpu::FilterMode::Linear,
            ShadowMapType::Basic | ShadowMapType::Pcf => wgpu::FilterMode::Nearest,
        }
    }
}

/// Renderer-wide shadow settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowSettings {
    pub enabled: bool,
    pub map_type: ShadowMapType,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            map_type: ShadowMapType::PcfSoft,
        }
    }
}

/// Uniform of the depth-only pass
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct ShadowUniform {
    pub light_mvp: [[f32; 4]; 4],
}

/// Depth map plus the pipeline that renders into it
pub struct ShadowMap {
    pub settings: ShadowSettings,
    pub size: u32,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl ShadowMap {
    /// Allocate a square shadow map of `size` texels
    pub fn new(gpu: &GpuContext, settings: ShadowSettings, size: u32) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let filter = settings.map_type.filter();
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let bind_group_layout = gpu.create_bind_group_layout(
            "shadow_bind_group_layout",
            &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        );

        let shader = gpu.create_shader_module("Shadow Depth Shader", include_str!("shaders/shadow.wgsl"));

        let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = gpu.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: None,
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
                format: SHADOW_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            settings,
            size,
            texture,
            view,
            sampler,
            pipeline,
            bind_group_layout,
        }
    }

    /// Width of one shadow map texel in uv units
    pub fn texel_size(&self) -> f32 {
        1.0 / self.size as f32
    }

    /// Record the depth-only pass for one mesh
    pub fn record(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        uniform: &ShadowUniform,
        vertex_buffer: &wgpu::Buffer,
        index_buffer: &wgpu::Buffer,
        index_count: u32,
    ) {
        let uniform_buffer = gpu.create_buffer_init(
            "Shadow Uniform Buffer",
            std::slice::from_ref(uniform),
            wgpu::BufferUsages::UNIFORM,
        );
        let bind_group = gpu.create_bind_group(
            "shadow_bind_group",
            &self.bind_group_layout,
            &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_soft_pcf() {
        let settings = ShadowSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.map_type, ShadowMapType::PcfSoft);
        assert_eq!(settings.map_type.filter(), wgpu::FilterMode::Linear);
        assert_eq!(settings.map_type.kernel_radius(), 1);
    }

    #[test]
    fn test_basic_uses_single_tap() {
        assert_eq!(ShadowMapType::Basic.kernel_radius(), 0);
        assert_eq!(ShadowMapType::Basic.filter(), wgpu::FilterMode::Nearest);
    }
}
