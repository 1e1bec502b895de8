//! Rendered frames and framebuffer row order

use crate::{Error, Result};

/// Bytes per RGBA8 pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// A finished frame in top-down RGBA order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RenderedFrame {
    /// Create a frame from tightly packed top-down RGBA rows
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(Error::Render(format!(
                "frame buffer holds {} bytes, {}x{} needs {}",
                pixels.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Build a frame from a GL-ordered framebuffer copy.
    ///
    /// `data` holds `height` rows of `row_stride` bytes each, bottom row
    /// first; only the first `width * 4` bytes of every row are pixels.
    /// Framebuffer row `i` becomes output row `height - 1 - i`.
    pub fn from_bottom_up(width: u32, height: u32, data: &[u8], row_stride: usize) -> Result<Self> {
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        let rows = height as usize;
        if row_stride < row_bytes {
            return Err(Error::Render(format!(
                "row stride {} is shorter than a {} pixel row",
                row_stride, width
            )));
        }
        if rows > 0 && data.len() < row_stride * (rows - 1) + row_bytes {
            return Err(Error::Render(format!(
                "framebuffer copy holds {} bytes, too few for {} rows",
                data.len(),
                rows
            )));
        }

        let mut pixels = vec![0u8; row_bytes * rows];
        for fb_row in 0..rows {
            let src = &data[fb_row * row_stride..fb_row * row_stride + row_bytes];
            let img_row = rows - fb_row - 1;
            pixels[img_row * row_bytes..(img_row + 1) * row_bytes].copy_from_slice(src);
        }

        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at column `x`, row `y` (row 0 is the top)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let p = &self.pixels[offset..offset + BYTES_PER_PIXEL];
        Some([p[0], p[1], p[2], p[3]])
    }
}
