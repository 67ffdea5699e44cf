//! Embedded WGSL shader sources for the Clipstage render backend.

/// Forward lit pass: PBR-lite surface shading, ambient/point/spot/fill lights,
/// equirectangular environment term, ACES tone mapping.
pub const MESH: &str = include_str!("../shaders/mesh.wgsl");
/// Fullscreen background pass sampling the equirectangular HDR environment.
pub const SKYBOX: &str = include_str!("../shaders/skybox.wgsl");
