//! Framebuffer readback

use crate::device::GpuContext;
use crate::target::OffscreenTarget;
use boxshot_core::{Error, RenderedFrame, Result, BYTES_PER_PIXEL};

/// Row pitch of a buffer copy, padded to the copy alignment
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL as u32;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (unpadded + align - 1) / align * align
}

/// Copy the whole drawing buffer to host memory as a top-down frame.
///
/// The target holds rows in GL order (bottom row first); they are flipped
/// while the row padding is stripped.
pub fn read_frame(gpu: &GpuContext, target: &OffscreenTarget) -> Result<RenderedFrame> {
    let extent = target.extent();
    let (width, height) = (extent.width, extent.height);
    let padded = padded_bytes_per_row(width);

    let staging_buffer = gpu.create_buffer(
        "Framebuffer Staging Buffer",
        u64::from(padded) * u64::from(height),
        wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
    );

    let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Framebuffer Readback"),
    });

    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: &target.color,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging_buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        extent,
    );

    gpu.queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = staging_buffer.slice(..);
    let (sender, receiver) = flume::bounded(1);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    gpu.device.poll(wgpu::Maintain::Wait);
    receiver
        .recv()
        .map_err(|_| Error::Gpu("Failed to receive mapping result".into()))??;

    let data = buffer_slice.get_mapped_range();
    let frame = RenderedFrame::from_bottom_up(width, height, &data, padded as usize);

    drop(data);
    staging_buffer.unmap();

    frame
}
