//! Render request parameters and their validation

use crate::{Error, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Pixel dimensions of an offscreen render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered by the target
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A validated `/generate` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub image_url: String,
    pub width: f64,
    pub height: f64,
    pub camera: Point3<f64>,
}

impl RenderRequest {
    /// Create a request, rejecting empty urls, non-finite numbers and
    /// non-positive slab dimensions
    pub fn new(image_url: impl Into<String>, width: f64, height: f64, camera: Point3<f64>) -> Result<Self> {
        let image_url = image_url.into();
        if image_url.trim().is_empty() {
            return Err(Error::Validation("parameter `img` must not be empty".to_string()));
        }
        // Scenes are built in f32, so every number must survive the narrowing
        for (name, value) in [("w", width), ("h", height)] {
            if !value.is_finite() || value <= 0.0 || !is_positive_f32(value) {
                return Err(Error::Validation(format!(
                    "parameter `{}` must be a positive finite number, got {}",
                    name, value
                )));
            }
        }
        if !((width as f32) / (height as f32)).is_finite() {
            return Err(Error::Validation(format!(
                "aspect ratio of {} / {} is out of range",
                width, height
            )));
        }
        for (name, value) in [("x", camera.x), ("y", camera.y), ("z", camera.z)] {
            if !value.is_finite() || !(value as f32).is_finite() {
                return Err(Error::Validation(format!(
                    "parameter `{}` must be a finite number, got {}",
                    name, value
                )));
            }
        }

        Ok(Self {
            image_url,
            width,
            height,
            camera,
        })
    }

    /// Build a request from decoded query pairs.
    ///
    /// The first occurrence of each key wins; unknown keys are ignored.
    pub fn from_query<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut fields: [Option<String>; 6] = Default::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "img" => 0,
                "w" => 1,
                "h" => 2,
                "x" => 3,
                "y" => 4,
                "z" => 5,
                _ => continue,
            };
            if fields[slot].is_none() {
                fields[slot] = Some(value.as_ref().to_string());
            }
        }

        let [img, w, h, x, y, z] = fields;
        let image_url = img.ok_or_else(|| Error::Validation("missing parameter `img`".to_string()))?;

        Self::new(
            image_url,
            parse_number("w", w)?,
            parse_number("h", h)?,
            Point3::new(parse_number("x", x)?, parse_number("y", y)?, parse_number("z", z)?),
        )
    }

    /// Width over height of the requested slab
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Render target size for a fixed vertical resolution.
    ///
    /// The horizontal size follows the aspect ratio and is truncated to
    /// whole pixels.
    pub fn resolution(&self, render_height: u32) -> Result<Resolution> {
        let width = (self.aspect() * f64::from(render_height)).floor();
        if !(width >= 1.0 && width <= f64::from(u32::MAX)) {
            return Err(Error::ContextCreation(format!(
                "cannot allocate a {}x{} drawing buffer",
                width, render_height
            )));
        }
        Ok(Resolution::new(width as u32, render_height))
    }
}

fn is_positive_f32(value: f64) -> bool {
    let narrowed = value as f32;
    narrowed.is_finite() && narrowed > 0.0
}

fn parse_number(name: &str, raw: Option<String>) -> Result<f64> {
    let raw = raw.ok_or_else(|| Error::Validation(format!("missing parameter `{}`", name)))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::Validation(format!("parameter `{}` is not a number: {:?}", name, raw)))
}
