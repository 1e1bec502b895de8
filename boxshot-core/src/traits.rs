//! Seams between the pipeline and its rendering backend

use crate::frame::RenderedFrame;
use crate::request::Resolution;
use crate::scene::Scene;
use crate::Result;

/// Creates offscreen surfaces of a given size
pub trait RendererFactory: Send + Sync {
    /// Acquire a non-windowed context and a render target of `resolution`.
    ///
    /// Fails with [`crate::Error::ContextCreation`] when no context can be
    /// acquired.
    fn create(&self, resolution: Resolution) -> Result<Box<dyn OffscreenSurface>>;
}

/// A render target that keeps its contents after drawing
pub trait OffscreenSurface: Send {
    /// Draw the scene into the target
    fn render(&mut self, scene: &Scene) -> Result<()>;

    /// Read the drawing buffer back as a top-down frame
    fn read_frame(&self) -> Result<RenderedFrame>;

    /// Size of the drawing buffer
    fn resolution(&self) -> Resolution;
}
