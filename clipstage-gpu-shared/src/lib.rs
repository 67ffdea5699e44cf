//! Clipstage shared GPU types
//!
//! Uniform block layouts, embedded WGSL shaders, and the camera/frustum math
//! shared by the wgpu backend and the WASM web runtime.

pub mod math;
pub mod shaders;
pub mod uniforms;
