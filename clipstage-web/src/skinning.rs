use glam::{Mat4, Vec3};

use crate::scene::{Mesh, SceneNode, Skin};

const MAX_JOINTS: usize = 128;

/// Bind-pose vertex data kept on the CPU for a skinned primitive.
#[derive(Debug, Clone)]
pub struct SkinnedVertices {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

/// Update joint matrices for all skinned meshes.
///
/// For each mesh with a skin, computes:
///   joint_matrix[i] = inverse(mesh_world) * joint_world * inverse_bind_matrix
pub fn update_joint_matrices(nodes: &[SceneNode], skins: &[Skin], meshes: &mut [Mesh]) {
    for mesh in meshes.iter_mut() {
        let Some(skin) = mesh.skin.and_then(|s| skins.get(s)) else {
            continue;
        };
        let Some(mesh_node) = nodes.get(mesh.node) else {
            continue;
        };
        let inv_mesh_world = mesh_node.world.inverse();

        let joint_count = skin.joints.len().min(MAX_JOINTS);
        mesh.joint_matrices.resize(joint_count, Mat4::IDENTITY);

        for i in 0..joint_count {
            let joint_world = match nodes.get(skin.joints[i]) {
                Some(joint) => joint.world,
                None => {
                    mesh.joint_matrices[i] = Mat4::IDENTITY;
                    continue;
                }
            };
            let inv_bind = skin.inverse_bind.get(i).copied().unwrap_or(Mat4::IDENTITY);

            mesh.joint_matrices[i] = inv_mesh_world * joint_world * inv_bind;
        }
    }
}

/// Linear blend skinning on the CPU. Writes posed positions and normals into
/// `positions`/`normals`, reusing their allocations.
pub fn skin_vertices(
    skinned: &SkinnedVertices,
    joint_matrices: &[Mat4],
    positions: &mut Vec<[f32; 3]>,
    normals: &mut Vec<[f32; 3]>,
) {
    positions.clear();
    normals.clear();

    for (v, bind_position) in skinned.positions.iter().enumerate() {
        let joints = skinned.joints.get(v).copied().unwrap_or([0; 4]);
        let weights = skinned.weights.get(v).copied().unwrap_or([0.0; 4]);

        let mut skin = Mat4::ZERO;
        let mut total = 0.0;
        for k in 0..4 {
            let w = weights[k];
            if w <= 0.0 {
                continue;
            }
            if let Some(m) = joint_matrices.get(joints[k] as usize) {
                skin += *m * w;
                total += w;
            }
        }
        if total <= 0.0 {
            skin = Mat4::IDENTITY;
        } else if (total - 1.0).abs() > 1e-4 {
            skin *= 1.0 / total;
        }

        let p = skin.transform_point3(Vec3::from_array(*bind_position));
        let n = skinned
            .normals
            .get(v)
            .map(|n| skin.transform_vector3(Vec3::from_array(*n)).normalize_or_zero())
            .unwrap_or(Vec3::Z);

        positions.push(p.to_array());
        normals.push(n.to_array());
    }
}
