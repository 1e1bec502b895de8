//! Error types for boxshot

use thiserror::Error;

/// Main error type for boxshot operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Image fetch failed: {0}")]
    Fetch(String),

    #[error("Image fetch timed out after {0}ms")]
    Timeout(u64),

    #[error("Unable to create offscreen context: {0}")]
    ContextCreation(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("GPU error: {0}")]
    Gpu(String),
}

impl Error {
    /// Short, stable name of the error kind, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Validation(_) => "validation",
            Error::Fetch(_) => "fetch",
            Error::Timeout(_) => "timeout",
            Error::ContextCreation(_) => "context",
            Error::Render(_) => "render",
            Error::Gpu(_) => "gpu",
        }
    }
}

/// Result type alias for boxshot operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "gpu")]
impl From<wgpu::BufferAsyncError> for Error {
    fn from(e: wgpu::BufferAsyncError) -> Self {
        Error::Gpu(e.to_string())
    }
}
