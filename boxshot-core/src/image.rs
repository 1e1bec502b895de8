//! Decoded source images

use crate::{Error, Result};

/// RGBA8 pixels of a fetched image, rows top-down
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl FetchedImage {
    /// Wrap decoded pixels, checking that the buffer matches the shape
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Fetch(format!("image has an empty shape {}x{}", width, height)));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(Error::Fetch(format!(
                "pixel buffer holds {} bytes, a {}x{} RGBA image needs {}",
                pixels.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self { pixels, width, height })
    }

    /// Single-colour image, mostly useful for tests and fallbacks
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
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

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}
