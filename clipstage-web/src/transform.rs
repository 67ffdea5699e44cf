use glam::{Mat4, Quat, Vec3};

use crate::scene::SceneNode;

/// Local translation/rotation/scale of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Uniform scale then translation, the placement applied to a model root.
    pub fn placement(scale: f32, position: [f32; 3]) -> Self {
        Self {
            translation: Vec3::from_array(position),
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(scale),
        }
    }

    pub fn from_gltf(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        Self {
            translation: Vec3::from_array(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from_array(scale),
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Compute world matrices for all nodes of one model.
/// Nodes are stored parents-first (DFS order), so one forward pass suffices.
/// Parentless nodes hang off `root`.
pub fn compute_world_transforms(nodes: &mut [SceneNode], root: Mat4) {
    let n = nodes.len();

    for i in 0..n {
        let local = nodes[i].local.to_matrix();

        let parent_world = match nodes[i].parent {
            Some(parent_idx) if parent_idx < i => nodes[parent_idx].world,
            Some(parent_idx) => {
                log::warn!("Node {i} has parent {parent_idx} stored after it; treating as root");
                root
            }
            None => root,
        };

        nodes[i].world = parent_world * local;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(parent: Option<usize>, local: Transform) -> SceneNode {
        SceneNode {
            name: None,
            parent,
            local,
            rest: local,
            world: Mat4::IDENTITY,
            mesh: None,
            skin: None,
        }
    }

    #[test]
    fn test_child_composes_parent() {
        let mut nodes = vec![
            node(None, Transform {
                translation: Vec3::new(1.0, 0.0, 0.0),
                ..Transform::IDENTITY
            }),
            node(Some(0), Transform {
                translation: Vec3::new(0.0, 2.0, 0.0),
                ..Transform::IDENTITY
            }),
        ];
        compute_world_transforms(&mut nodes, Mat4::IDENTITY);
        let p = nodes[1].world.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_root_placement_applies_to_every_root() {
        let mut nodes = vec![node(None, Transform::IDENTITY), node(None, Transform::IDENTITY)];
        let root = Transform::placement(2.0, [0.0, -0.2, 0.0]).to_matrix();
        compute_world_transforms(&mut nodes, root);
        for n in &nodes {
            let p = n.world.transform_point3(Vec3::new(0.0, 1.0, 0.0));
            assert!((p - Vec3::new(0.0, 1.8, 0.0)).length() < 1e-6);
        }
    }

    #[test]
    fn test_out_of_order_parent_falls_back_to_root() {
        let mut nodes = vec![
            node(Some(1), Transform::IDENTITY),
            node(None, Transform {
                translation: Vec3::X,
                ..Transform::IDENTITY
            }),
        ];
        compute_world_transforms(&mut nodes, Mat4::IDENTITY);
        assert_eq!(nodes[0].world, Mat4::IDENTITY);
    }

    #[test]
    fn test_gltf_rotation_is_xyzw() {
        let t = Transform::from_gltf([0.0; 3], [0.0, 0.0, 0.0, 1.0], [1.0; 3]);
        assert_eq!(t.rotation, Quat::IDENTITY);
    }
}
