//! # Boxshot GPU
//!
//! Offscreen rendering of boxshot scenes with wgpu.
//!
//! Every render acquires its own device, draws the shadow pass and the
//! textured slab into an RGBA8 target and copies the result back to host
//! memory. The target is written in GL row order and flipped on readback.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use boxshot_core::{FetchedImage, Point3, Resolution, Scene};
//! use boxshot_gpu::{OffscreenRenderer, RenderConfig};
//!
//! fn example() -> boxshot_core::Result<()> {
//!     let image = FetchedImage::solid(2, 2, [255, 0, 0, 255])?;
//!     let scene = Scene::build(image, 1.0, 1.0, Point3::new(0.0, -3.0, 1.0));
//!
//!     let renderer = OffscreenRenderer::create(Resolution::new(1000, 1000), RenderConfig::default())?;
//!     renderer.render(&scene)?;
//!     let frame = renderer.read_frame()?;
//!     println!("{}x{}", frame.width(), frame.height());
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod precision;
pub mod readback;
pub mod renderer;
pub mod shadow;
pub mod target;
pub mod texture;

// Re-export commonly used items
pub use device::{ContextOptions, GpuContext};
pub use precision::ShaderPrecision;
pub use renderer::{OffscreenRenderer, RenderConfig, SceneUniform, WgpuRendererFactory};
pub use shadow::{ShadowMapType, ShadowSettings};
pub use target::{OffscreenTarget, TargetFilters};
