//! Core data structures for boxshot
//!
//! This crate holds everything on the CPU side of the render pipeline:
//! request parsing, the fixed scene template, framebuffer row handling and
//! the P3 text encoding. GPU backends plug in through [`RendererFactory`].

pub mod camera;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod image;
pub mod ppm;
pub mod request;
pub mod scene;
pub mod traits;

pub use camera::*;
pub use error::*;
pub use frame::*;
pub use geometry::*;
pub use image::*;
pub use request::*;
pub use scene::*;
pub use traits::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector3};
