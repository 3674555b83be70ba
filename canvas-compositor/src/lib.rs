//! Canvas Scene Compositor
//!
//! Retained 2D scene graph painted onto an immediate-mode drawing surface.
//!
//! Key pieces:
//! - Arena-based node storage (generational handles, non-owning parent links)
//! - Affine transform propagation with per-node dirty flags
//! - Per-frame render pipeline with scroll clipping and scrollbar overlay
//! - Scroll/drag controller for overflow containers

pub mod error;
pub mod paint;
pub mod render;
pub mod scene;
pub mod scroll;
pub mod surface;
pub mod transform;
pub mod types;

pub use error::*;
pub use render::*;
pub use scene::*;
pub use scroll::*;
pub use surface::*;
pub use transform::*;
pub use types::*;

pub fn version() -> &'static str {
    "0.1.0"
}
