use clipstage_gpu_shared::math::{transform_sphere, Frustum};
use clipstage_wgpu::{DrawItem, Handle, RenderBackend};
use glam::{Mat4, Vec3};

use crate::config::ModelPlacement;
use crate::gltf_import::{ModelAsset, PrimitiveAsset};
use crate::mixer::{AnimationAction, AnimationMixer, LoopMode};
use crate::registry::{AnimationRegistry, ModelId};
use crate::skinning::{self, SkinnedVertices};
use crate::transform::{compute_world_transforms, Transform};

/// The GPU operations a model needs. Implemented by the render backend and
/// by in-memory fakes in tests.
pub trait GpuUploader {
    fn upload_mesh(
        &mut self,
        positions: &[[f32; 3]],
        normals: &[[f32; 3]],
        uvs: &[[f32; 2]],
        indices: &[u32],
    ) -> Handle;

    fn update_mesh(&mut self, mesh: Handle, positions: &[[f32; 3]], normals: &[[f32; 3]]);

    fn upload_texture(&mut self, rgba: &[u8], width: u32, height: u32) -> Handle;
}

impl GpuUploader for RenderBackend {
    fn upload_mesh(
        &mut self,
        positions: &[[f32; 3]],
        normals: &[[f32; 3]],
        uvs: &[[f32; 2]],
        indices: &[u32],
    ) -> Handle {
        RenderBackend::upload_mesh(self, positions, normals, uvs, indices)
    }

    fn update_mesh(&mut self, mesh: Handle, positions: &[[f32; 3]], normals: &[[f32; 3]]) {
        RenderBackend::update_mesh(self, mesh, positions, normals)
    }

    fn upload_texture(&mut self, rgba: &[u8], width: u32, height: u32) -> Handle {
        RenderBackend::upload_texture(self, rgba, width, height)
    }
}

/// One node of a model's hierarchy. Stored parents-first.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: Option<String>,
    pub parent: Option<usize>,
    /// Current local transform, written by the mixer.
    pub local: Transform,
    /// Authored transform, restored when no clip drives the node.
    pub rest: Transform,
    pub world: Mat4,
    /// Index into `ModelInstance::meshes`.
    pub mesh: Option<usize>,
    /// Index into `ModelInstance::skins`.
    pub skin: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub texture: Option<Handle>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            metallic: 1.0,
            roughness: 1.0,
            texture: None,
        }
    }
}

pub struct Primitive {
    pub gpu_mesh: Handle,
    pub material: Material,
    /// Bounding sphere in mesh-local space.
    pub bounds_center: Vec3,
    pub bounds_radius: f32,
    /// Bind-pose data for CPU skinning, when the owning node has a skin.
    pub skinning: Option<SkinnedVertices>,
}

/// The mesh attached to one node.
pub struct Mesh {
    pub node: usize,
    pub skin: Option<usize>,
    /// `inverse(mesh_world) * joint_world * inverse_bind`, per joint.
    pub joint_matrices: Vec<Mat4>,
    pub primitives: Vec<Primitive>,
}

pub struct Skin {
    /// Node index per joint.
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
}

/// A loaded model placed in the scene, with its own mixer and clip registry.
pub struct ModelInstance {
    pub id: ModelId,
    pub root: Mat4,
    pub nodes: Vec<SceneNode>,
    pub meshes: Vec<Mesh>,
    pub skins: Vec<Skin>,
    pub mixer: AnimationMixer,
    pub registry: AnimationRegistry,
}

impl ModelInstance {
    /// Upload `asset` and set up one play-once, clamped action per clip.
    pub fn instantiate(
        id: ModelId,
        asset: ModelAsset,
        placement: &ModelPlacement,
        uploader: &mut impl GpuUploader,
    ) -> Self {
        let ModelAsset {
            nodes: node_assets,
            meshes: mesh_assets,
            materials: material_assets,
            textures,
            skins: skin_assets,
            clips,
        } = asset;

        let texture_handles: Vec<Handle> = textures
            .iter()
            .map(|t| uploader.upload_texture(&t.rgba, t.width, t.height))
            .collect();

        let materials: Vec<Material> = material_assets
            .iter()
            .map(|m| Material {
                base_color: m.base_color,
                metallic: m.metallic,
                roughness: m.roughness,
                texture: m.base_color_texture.and_then(|i| texture_handles.get(i).copied()),
            })
            .collect();

        let skins: Vec<Skin> = skin_assets
            .into_iter()
            .map(|s| Skin {
                joints: s.joints,
                inverse_bind: s.inverse_bind,
            })
            .collect();

        let mut nodes = Vec::with_capacity(node_assets.len());
        let mut meshes = Vec::new();

        for (index, node) in node_assets.into_iter().enumerate() {
            let skin = node.skin.filter(|&s| s < skins.len());

            let mesh = node.mesh.and_then(|mesh_index| {
                let Some(mesh_asset) = mesh_assets.get(mesh_index) else {
                    log::warn!("{id}: node {index} references missing mesh {mesh_index}");
                    return None;
                };
                let primitives = mesh_asset
                    .primitives
                    .iter()
                    .map(|p| upload_primitive(p, &materials, skin.is_some(), uploader))
                    .collect();
                meshes.push(Mesh {
                    node: index,
                    skin,
                    joint_matrices: Vec::new(),
                    primitives,
                });
                Some(meshes.len() - 1)
            });

            nodes.push(SceneNode {
                name: node.name,
                parent: node.parent,
                local: node.transform,
                rest: node.transform,
                world: Mat4::IDENTITY,
                mesh,
                skin,
            });
        }

        let mut mixer = AnimationMixer::new();
        for clip in clips {
            let mut action = AnimationAction::new(clip);
            action.loop_mode = LoopMode::Once;
            action.clamp_when_finished = true;
            mixer.add_action(action);
        }
        let registry = AnimationRegistry::build(id, &mixer);

        let mut model = Self {
            id,
            root: Transform::placement(placement.scale, placement.position).to_matrix(),
            nodes,
            meshes,
            skins,
            mixer,
            registry,
        };
        model.refresh_pose();
        model
    }

    /// Advance the mixer, then recompute world transforms and joint matrices.
    pub fn update(&mut self, dt: f32) {
        self.mixer.update(dt, &mut self.nodes);
        self.refresh_pose();
    }

    fn refresh_pose(&mut self) {
        compute_world_transforms(&mut self.nodes, self.root);
        skinning::update_joint_matrices(&self.nodes, &self.skins, &mut self.meshes);
    }

    /// Reset the action behind `action` to time zero and play it.
    pub fn restart_action(&mut self, action: usize) -> bool {
        match self.mixer.action_mut(action) {
            Some(action) => {
                action.reset().play();
                true
            }
            None => false,
        }
    }

    /// CPU-skin every skinned primitive and push the result to the GPU.
    pub fn upload_skinned(&self, uploader: &mut impl GpuUploader) {
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        for mesh in self.meshes.iter().filter(|m| m.skin.is_some()) {
            for primitive in &mesh.primitives {
                if let Some(skinned) = &primitive.skinning {
                    skinning::skin_vertices(skinned, &mesh.joint_matrices, &mut positions, &mut normals);
                    uploader.update_mesh(primitive.gpu_mesh, &positions, &normals);
                }
            }
        }
    }

    /// Append draw items for every visible primitive. Skinned primitives are
    /// never culled, their bind-pose bounds say little about the posed mesh.
    pub fn collect_draws(&self, frustum: &Frustum, out: &mut Vec<DrawItem>) {
        for mesh in &self.meshes {
            let Some(node) = self.nodes.get(mesh.node) else {
                continue;
            };
            let model = node.world;
            for primitive in &mesh.primitives {
                if primitive.skinning.is_none() {
                    let (center, radius) =
                        transform_sphere(&model, primitive.bounds_center, primitive.bounds_radius);
                    if !frustum.intersects_sphere(center, radius) {
                        continue;
                    }
                }
                out.push(DrawItem {
                    mesh: primitive.gpu_mesh,
                    texture: primitive.material.texture,
                    model,
                    base_color: primitive.material.base_color,
                    metallic: primitive.material.metallic,
                    roughness: primitive.material.roughness,
                });
            }
        }
    }

    pub fn clip_count(&self) -> usize {
        self.registry.len()
    }
}

fn upload_primitive(
    primitive: &PrimitiveAsset,
    materials: &[Material],
    skinned: bool,
    uploader: &mut impl GpuUploader,
) -> Primitive {
    let gpu_mesh = uploader.upload_mesh(
        &primitive.positions,
        &primitive.normals,
        &primitive.uvs,
        &primitive.indices,
    );
    let (bounds_center, bounds_radius) = bounding_sphere(&primitive.positions);

    let skinning = if skinned && !primitive.joints.is_empty() {
        Some(SkinnedVertices {
            positions: primitive.positions.clone(),
            normals: primitive.normals.clone(),
            joints: primitive.joints.clone(),
            weights: primitive.weights.clone(),
        })
    } else {
        None
    };

    Primitive {
        gpu_mesh,
        material: primitive
            .material
            .and_then(|i| materials.get(i).copied())
            .unwrap_or_default(),
        bounds_center,
        bounds_radius,
        skinning,
    }
}

/// Sphere around the axis-aligned bounds of `positions`.
pub fn bounding_sphere(positions: &[[f32; 3]]) -> (Vec3, f32) {
    if positions.is_empty() {
        return (Vec3::ZERO, 0.0);
    }
    let (min, max) = positions.iter().fold(
        (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
        |(min, max), p| {
            let p = Vec3::from_array(*p);
            (min.min(p), max.max(p))
        },
    );
    let center = (min + max) * 0.5;
    (center, (max - center).length())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::animation::{AnimationClip, InterpolationMode, KeyframeTrack, TargetProperty, Track, TrackData};
    use crate::gltf_import::{MaterialAsset, MeshAsset, NodeAsset, PrimitiveAsset, SkinAsset};
    use clipstage_gpu_shared::math::perspective;

    /// Records uploads instead of talking to a GPU.
    #[derive(Default)]
    pub(crate) struct FakeUploader {
        pub next: Handle,
        pub meshes: Vec<(Handle, usize)>,
        pub textures: Vec<(Handle, u32, u32)>,
        pub updates: Vec<(Handle, Vec<[f32; 3]>)>,
    }

    impl GpuUploader for FakeUploader {
        fn upload_mesh(
            &mut self,
            positions: &[[f32; 3]],
            _normals: &[[f32; 3]],
            _uvs: &[[f32; 2]],
            _indices: &[u32],
        ) -> Handle {
            self.next += 1;
            self.meshes.push((self.next, positions.len()));
            self.next
        }

        fn update_mesh(&mut self, mesh: Handle, positions: &[[f32; 3]], _normals: &[[f32; 3]]) {
            self.updates.push((mesh, positions.to_vec()));
        }

        fn upload_texture(&mut self, _rgba: &[u8], width: u32, height: u32) -> Handle {
            self.next += 1;
            self.textures.push((self.next, width, height));
            self.next
        }
    }

    fn triangle() -> PrimitiveAsset {
        PrimitiveAsset {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            uvs: vec![[0.0, 0.0]; 3],
            indices: vec![0, 1, 2],
            joints: Vec::new(),
            weights: Vec::new(),
            material: Some(0),
        }
    }

    fn node(parent: Option<usize>, mesh: Option<usize>) -> NodeAsset {
        NodeAsset {
            name: None,
            parent,
            transform: Transform::IDENTITY,
            mesh,
            skin: None,
        }
    }

    fn lift_clip(name: &str, node: usize) -> AnimationClip {
        AnimationClip::new(
            name,
            vec![Track {
                node,
                property: TargetProperty::Translation,
                data: TrackData::Vector3(
                    KeyframeTrack::new(
                        vec![0.0, 1.0],
                        vec![Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)],
                        InterpolationMode::Linear,
                    )
                    .unwrap(),
                ),
            }],
        )
    }

    /// Two nodes, a triangle on the child, and the given clips on node 0.
    pub(crate) fn asset_with_clips(names: &[&str]) -> ModelAsset {
        ModelAsset {
            nodes: vec![node(None, None), node(Some(0), Some(0))],
            meshes: vec![MeshAsset {
                name: Some("tri".into()),
                primitives: vec![triangle()],
            }],
            materials: vec![MaterialAsset {
                base_color: [1.0, 0.5, 0.25, 1.0],
                metallic: 0.0,
                roughness: 0.5,
                base_color_texture: None,
            }],
            textures: Vec::new(),
            skins: Vec::new(),
            clips: names.iter().map(|n| lift_clip(n, 0)).collect(),
        }
    }

    fn identity_placement() -> ModelPlacement {
        ModelPlacement {
            scale: 1.0,
            position: [0.0, 0.0, 0.0],
        }
    }

    // ── instantiate ──

    #[test]
    fn test_instantiate_uploads_and_registers() {
        let mut gpu = FakeUploader::default();
        let model = ModelInstance::instantiate(
            ModelId::Primary,
            asset_with_clips(&["Run", "Jump"]),
            &identity_placement(),
            &mut gpu,
        );
        assert_eq!(gpu.meshes.len(), 1);
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.nodes[1].mesh, Some(0));
        assert_eq!(model.clip_count(), 2);
        assert!(model.registry.get("run").is_some());

        let action = model.mixer.action(0).unwrap();
        assert_eq!(action.loop_mode, LoopMode::Once);
        assert!(action.clamp_when_finished);
        assert!(!action.is_active(), "clips wait for a command");
    }

    #[test]
    fn test_placement_applies_to_world() {
        let mut gpu = FakeUploader::default();
        let placement = ModelPlacement {
            scale: 2.0,
            position: [0.0, -0.2, 0.0],
        };
        let model = ModelInstance::instantiate(ModelId::Primary, asset_with_clips(&[]), &placement, &mut gpu);
        let p = model.nodes[1].world.transform_point3(Vec3::Y);
        assert!((p - Vec3::new(0.0, 1.8, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_restart_action_plays_from_zero() {
        let mut gpu = FakeUploader::default();
        let mut model =
            ModelInstance::instantiate(ModelId::Primary, asset_with_clips(&["lift"]), &identity_placement(), &mut gpu);
        assert!(model.restart_action(0));
        model.update(0.5);
        assert!((model.nodes[1].world.w_axis.y - 0.5).abs() < 1e-5);
        assert!(!model.restart_action(7));
    }

    #[test]
    fn test_material_texture_resolved_to_handle() {
        let mut gpu = FakeUploader::default();
        let mut asset = asset_with_clips(&[]);
        asset.textures.push(crate::gltf_import::TextureAsset {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        });
        asset.materials[0].base_color_texture = Some(0);
        let model = ModelInstance::instantiate(ModelId::Primary, asset, &identity_placement(), &mut gpu);
        let handle = gpu.textures[0].0;
        assert_eq!(model.meshes[0].primitives[0].material.texture, Some(handle));
    }

    // ── draws ──

    #[test]
    fn test_collect_draws_culls_outside_frustum() {
        let mut gpu = FakeUploader::default();
        let model = ModelInstance::instantiate(ModelId::Primary, asset_with_clips(&[]), &identity_placement(), &mut gpu);

        let mut draws = Vec::new();
        model.collect_draws(&Frustum::infinite(), &mut draws);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].base_color, [1.0, 0.5, 0.25, 1.0]);

        // Camera at z=5 looking away from the triangle
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 10.0), Vec3::Y);
        let frustum = Frustum::from_view_proj(&(perspective(60.0, 1.0, 0.1, 100.0) * view));
        draws.clear();
        model.collect_draws(&frustum, &mut draws);
        assert!(draws.is_empty());
    }

    // ── skinning ──

    #[test]
    fn test_skinned_mesh_is_reuploaded() {
        let mut gpu = FakeUploader::default();
        let mut asset = asset_with_clips(&["lift"]);
        // Joint node 2, child of the root, drives the triangle on node 1
        asset.nodes.push(node(Some(0), None));
        asset.nodes[1].skin = Some(0);
        asset.skins.push(SkinAsset {
            joints: vec![2],
            inverse_bind: vec![Mat4::IDENTITY],
        });
        let primitive = &mut asset.meshes[0].primitives[0];
        primitive.joints = vec![[0, 0, 0, 0]; 3];
        primitive.weights = vec![[1.0, 0.0, 0.0, 0.0]; 3];

        let mut model = ModelInstance::instantiate(ModelId::Primary, asset, &identity_placement(), &mut gpu);
        model.restart_action(0);
        model.update(1.0);
        model.upload_skinned(&mut gpu);

        assert_eq!(gpu.updates.len(), 1);
        let (_, positions) = &gpu.updates[0];
        // Root (and so the joint) lifted by 1, mesh node lifted too: net zero in mesh space
        assert!((positions[0][1] - 0.0).abs() < 1e-5);

        let mut draws = Vec::new();
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 10.0), Vec3::Y);
        let frustum = Frustum::from_view_proj(&(perspective(60.0, 1.0, 0.1, 100.0) * view));
        model.collect_draws(&frustum, &mut draws);
        assert_eq!(draws.len(), 1, "skinned primitives skip culling");
    }

    #[test]
    fn test_bounding_sphere() {
        let (center, radius) = bounding_sphere(&[[-1.0, 0.0, 0.0], [1.0, 2.0, 0.0]]);
        assert_eq!(center, Vec3::new(0.0, 1.0, 0.0));
        assert!((radius - 2f32.sqrt()).abs() < 1e-6);
        assert_eq!(bounding_sphere(&[]), (Vec3::ZERO, 0.0));
    }
}
