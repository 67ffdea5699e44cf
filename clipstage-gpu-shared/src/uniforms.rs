use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Dynamic-offset stride for per-object uniforms (WebGPU's minimum uniform
/// buffer offset alignment).
pub const OBJECT_UNIFORM_STRIDE: u64 = 256;

/// Per-frame camera and exposure data (group 0, binding 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PerFrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// x = exposure, y = environment intensity, z = 1.0 when an environment
    /// texture is bound.
    pub exposure: [f32; 4],
    pub clear_color: [f32; 4],
}

impl PerFrameUniforms {
    pub fn new(
        view_proj: Mat4,
        camera_position: Vec3,
        exposure: f32,
        environment_intensity: f32,
        has_environment: bool,
        clear_color: [f32; 3],
    ) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_position: camera_position.extend(1.0).to_array(),
            exposure: [
                exposure,
                environment_intensity,
                if has_environment { 1.0 } else { 0.0 },
                0.0,
            ],
            clear_color: [clear_color[0], clear_color[1], clear_color[2], 1.0],
        }
    }
}

/// Scene lights (group 0, binding 1). Colors are pre-multiplied by intensity.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct LightUniforms {
    pub ambient: [f32; 4],
    /// xyz = position
    pub point_position: [f32; 4],
    pub point_color: [f32; 4],
    /// xyz = position, w = cos(outer cone angle)
    pub spot_position: [f32; 4],
    /// xyz = direction the cone points, w = cos(inner cone angle)
    pub spot_direction: [f32; 4],
    pub spot_color: [f32; 4],
    /// xyz = direction the light travels
    pub fill_direction: [f32; 4],
    pub fill_color: [f32; 4],
}

/// Per-draw transform and material factors (group 1, dynamic offset).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PerObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    /// x = metallic, y = roughness, z = 1.0 when the base color texture is used
    pub material: [f32; 4],
}

impl PerObjectUniforms {
    pub fn new(model: Mat4, base_color: [f32; 4], metallic: f32, roughness: f32, textured: bool) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            base_color,
            material: [metallic, roughness, if textured { 1.0 } else { 0.0 }, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── layout ──

    #[test]
    fn test_uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<PerFrameUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<LightUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<PerObjectUniforms>() % 16, 0);
    }

    #[test]
    fn test_object_uniforms_fit_stride() {
        assert!(std::mem::size_of::<PerObjectUniforms>() as u64 <= OBJECT_UNIFORM_STRIDE);
    }

    // ── constructors ──

    #[test]
    fn test_normal_matrix_of_uniform_scale_is_inverse_scale() {
        let u = PerObjectUniforms::new(Mat4::from_scale(Vec3::splat(2.0)), [1.0; 4], 0.0, 1.0, false);
        assert!((u.normal_matrix[0][0] - 0.5).abs() < 1e-6);
        assert_eq!(u.material[2], 0.0);
    }

    #[test]
    fn test_per_frame_flags_environment() {
        let u = PerFrameUniforms::new(Mat4::IDENTITY, Vec3::ONE, 1.5, 1.0, true, [0.0; 3]);
        assert_eq!(u.exposure, [1.5, 1.0, 1.0, 0.0]);
        assert_eq!(u.camera_position, [1.0, 1.0, 1.0, 1.0]);
    }
}
