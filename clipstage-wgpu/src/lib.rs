//! Clipstage WebGPU backend.
//!
//! Owns the wgpu device, the canvas surface, and every GPU resource the web
//! runtime creates. Meshes and textures are addressed through opaque `u64`
//! handles; a frame is rendered from a flat list of [`DrawItem`]s.

mod backend;
mod handle;

pub use backend::{DrawItem, FrameDesc, RenderBackend};
pub use handle::{Handle, HandleStore};

/// Re-exported so callers can name surface targets without their own wgpu dependency.
pub use wgpu;
