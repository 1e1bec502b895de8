//! # Boxshot Server
//!
//! HTTP service that textures a thin box with a remote image, renders it
//! offscreen and answers with the frame as plain-text P3.
//!
//! - `GET /test` answers `OK`
//! - `GET /generate?img=<url>&w=..&h=..&x=..&y=..&z=..` answers the frame,
//!   or `500 ERROR` on any failure

pub mod config;
pub mod fetch;
pub mod handler;
pub mod http;
pub mod logging;

pub use config::{Cli, Command, ConfigError, RenderArgs, ServerConfig};
pub use fetch::{FetchFuture, FetchGate, HttpImageSource, ImageSource};
pub use handler::{GenerateHandler, Reply, Stage, StageTrace};
pub use http::{Route, Service};
pub use logging::{init_logging, install_panic_hook, LoggingConfig};
