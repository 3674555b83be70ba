//! Error types for the canvas runtime

use canvas_compositor::CompositorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The host could not hand out a drawing surface
    #[error("drawing surface unavailable")]
    SurfaceUnavailable,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("runtime has been disposed")]
    Disposed,

    #[error("component `{name}` failed")]
    Component {
        name: String,
        source: anyhow::Error,
    },

    #[error("update callback for `{key}` failed")]
    UpdateCallback {
        key: String,
        source: anyhow::Error,
    },

    #[error("frame callback failed")]
    FrameCallback(#[source] anyhow::Error),

    #[error(transparent)]
    Compositor(#[from] CompositorError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
