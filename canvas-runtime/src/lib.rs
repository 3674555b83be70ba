//! Canvas Scene Runtime
//!
//! Declarative front end and frame loop for the canvas compositor.
//!
//! Key pieces:
//! - Element trees built in code or parsed from JSON
//! - Keyed reconciliation onto retained scene nodes (one session per reconciler)
//! - Animation scheduler with per-object update callbacks
//! - Frame hosts: a virtual-clock headless host and a wall-clock pacer

pub mod config;
pub mod element;
pub mod error;
pub mod host;
pub mod object_manager;
mod props;
pub mod reconciler;
pub mod scheduler;

pub use config::*;
pub use element::*;
pub use error::*;
pub use host::*;
pub use object_manager::*;
pub use reconciler::*;
pub use scheduler::*;

pub use canvas_compositor as compositor;
