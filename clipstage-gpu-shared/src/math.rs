use glam::{Mat4, Vec3, Vec4};

/// Six clip planes of a view-projection matrix, used for CPU-side culling of
/// static mesh primitives.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [[f32; 4]; 6],
}

impl Frustum {
    pub fn from_view_proj(vp: &Mat4) -> Self {
        Self {
            planes: extract_frustum_planes(vp),
        }
    }

    /// A frustum that accepts everything.
    pub fn infinite() -> Self {
        Self {
            planes: [[0.0, 0.0, 0.0, f32::MAX]; 6],
        }
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        sphere_in_frustum(&self.planes, center, radius)
    }
}

/// Extract 6 frustum planes from a view-projection matrix (Gribb-Hartmann method).
/// Each plane is [a, b, c, d] where ax + by + cz + d = 0 (Hessian normal form).
/// Assumes a 0..1 depth range, as produced by `Mat4::perspective_rh`.
pub fn extract_frustum_planes(vp: &Mat4) -> [[f32; 4]; 6] {
    let row0 = Vec4::new(vp.col(0).x, vp.col(1).x, vp.col(2).x, vp.col(3).x);
    let row1 = Vec4::new(vp.col(0).y, vp.col(1).y, vp.col(2).y, vp.col(3).y);
    let row2 = Vec4::new(vp.col(0).z, vp.col(1).z, vp.col(2).z, vp.col(3).z);
    let row3 = Vec4::new(vp.col(0).w, vp.col(1).w, vp.col(2).w, vp.col(3).w);

    let mut planes = [
        (row3 + row0).to_array(), // left
        (row3 - row0).to_array(), // right
        (row3 + row1).to_array(), // bottom
        (row3 - row1).to_array(), // top
        row2.to_array(),          // near (z >= 0)
        (row3 - row2).to_array(), // far
    ];

    for plane in &mut planes {
        let len = (plane[0] * plane[0] + plane[1] * plane[1] + plane[2] * plane[2]).sqrt();
        if len > 1e-8 {
            plane[0] /= len;
            plane[1] /= len;
            plane[2] /= len;
            plane[3] /= len;
        }
    }

    planes
}

/// Test if a bounding sphere is inside or intersects the frustum.
pub fn sphere_in_frustum(planes: &[[f32; 4]; 6], center: Vec3, radius: f32) -> bool {
    for plane in planes {
        let dist = plane[0] * center.x + plane[1] * center.y + plane[2] * center.z + plane[3];
        if dist < -radius {
            return false;
        }
    }
    true
}

/// Transform a local-space bounding sphere into world space. The radius is
/// scaled by the largest axis scale of `model`.
pub fn transform_sphere(model: &Mat4, center: Vec3, radius: f32) -> (Vec3, f32) {
    let world_center = model.transform_point3(center);
    let sx = model.x_axis.truncate().length();
    let sy = model.y_axis.truncate().length();
    let sz = model.z_axis.truncate().length();
    (world_center, radius * sx.max(sy).max(sz))
}

/// Right-handed perspective projection with a 0..1 depth range.
pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect.max(1e-6), near, far)
}

/// Cartesian offset for spherical coordinates (radius, azimuth `theta`
/// around +Y measured from +Z, polar `phi` measured from +Y).
pub fn spherical_to_offset(radius: f32, theta: f32, phi: f32) -> Vec3 {
    let sin_phi = phi.sin();
    Vec3::new(
        radius * sin_phi * theta.sin(),
        radius * phi.cos(),
        radius * sin_phi * theta.cos(),
    )
}

/// Inverse of [`spherical_to_offset`]. Returns (radius, theta, phi).
pub fn offset_to_spherical(offset: Vec3) -> (f32, f32, f32) {
    let radius = offset.length();
    if radius < 1e-8 {
        return (0.0, 0.0, std::f32::consts::FRAC_PI_2);
    }
    let theta = offset.x.atan2(offset.z);
    let phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
    (radius, theta, phi)
}
