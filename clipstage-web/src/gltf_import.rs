//! glTF 2.0 import (`.gltf` with external or embedded buffers, and `.glb`).
//!
//! Produces a GPU-agnostic [`ModelAsset`]: nodes flattened parents-first,
//! triangle primitives, materials, decoded textures, skins and clips. Node
//! indices in skins and clip tracks refer to the flattened order.

use glam::{Mat4, Quat, Vec3};

use crate::animation::{AnimationClip, InterpolationMode, KeyframeTrack, TargetProperty, Track, TrackData};
use crate::error::{LoadError, Result};
use crate::io::{extension_of, read_asset, resolve_uri, AssetReader};
use crate::transform::Transform;

pub struct ModelAsset {
    pub nodes: Vec<NodeAsset>,
    pub meshes: Vec<MeshAsset>,
    pub materials: Vec<MaterialAsset>,
    pub textures: Vec<TextureAsset>,
    pub skins: Vec<SkinAsset>,
    pub clips: Vec<AnimationClip>,
}

pub struct NodeAsset {
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub transform: Transform,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
}

pub struct MeshAsset {
    pub name: Option<String>,
    pub primitives: Vec<PrimitiveAsset>,
}

pub struct PrimitiveAsset {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    /// Empty unless the primitive is skinned.
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
    pub material: Option<usize>,
}

pub struct MaterialAsset {
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub base_color_texture: Option<usize>,
}

/// RGBA8 pixels.
pub struct TextureAsset {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub struct SkinAsset {
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
}

/// Fetch and parse the model at `url`. Only glTF and GLB are understood;
/// other recognised model formats fail with `UnsupportedFormat`.
pub async fn import_model(reader: &impl AssetReader, url: &str) -> Result<ModelAsset> {
    match extension_of(url).as_deref() {
        Some("gltf") | Some("glb") | None => {}
        Some(extension) => {
            return Err(LoadError::UnsupportedFormat {
                url: url.to_string(),
                extension: extension.to_string(),
            })
        }
    }

    let bytes = read_asset(reader, url).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)?;
    let buffers = load_buffers(reader, url, &gltf).await?;

    let (nodes, node_map) = flatten_nodes(&gltf);
    let textures = load_textures(reader, url, &gltf, &buffers).await?;

    let asset = ModelAsset {
        meshes: gltf.meshes().map(|mesh| load_mesh(&mesh, &buffers)).collect(),
        materials: gltf.materials().map(|m| load_material(&m)).collect(),
        skins: gltf.skins().map(|skin| load_skin(&skin, &buffers, &node_map)).collect(),
        clips: load_clips(&gltf, &buffers, &node_map),
        nodes,
        textures,
    };

    log::debug!(
        "Imported {url}: {} nodes, {} meshes, {} textures, {} skins, {} clips",
        asset.nodes.len(),
        asset.meshes.len(),
        asset.textures.len(),
        asset.skins.len(),
        asset.clips.len()
    );
    Ok(asset)
}

async fn load_buffers(reader: &impl AssetReader, url: &str, gltf: &gltf::Gltf) -> Result<Vec<Vec<u8>>> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf
                .blob
                .as_deref()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| LoadError::MissingData(format!("{url}: missing GLB binary chunk")))?,
            gltf::buffer::Source::Uri(uri) => read_asset(reader, &resolve_uri(url, uri)?).await?,
        };
        if data.len() < buffer.length() {
            return Err(LoadError::MissingData(format!(
                "{url}: buffer {} holds {} bytes, expected {}",
                buffer.index(),
                data.len(),
                buffer.length()
            )));
        }
        buffer_data.push(data);
    }
    Ok(buffer_data)
}

/// Depth-first flattening of the default scene (or of every root node when
/// the file has no scenes). Returns the nodes and a glTF-index to flat-index
/// map; nodes outside the scene map to `None`.
fn flatten_nodes(gltf: &gltf::Gltf) -> (Vec<NodeAsset>, Vec<Option<usize>>) {
    let mut node_map = vec![None; gltf.nodes().len()];
    let mut nodes = Vec::new();

    let roots: Vec<gltf::Node> = match gltf.default_scene().or_else(|| gltf.scenes().next()) {
        Some(scene) => scene.nodes().collect(),
        None => {
            let mut is_child = vec![false; gltf.nodes().len()];
            for node in gltf.nodes() {
                for child in node.children() {
                    is_child[child.index()] = true;
                }
            }
            gltf.nodes().filter(|n| !is_child[n.index()]).collect()
        }
    };

    let mut stack: Vec<(gltf::Node, Option<usize>)> = roots.into_iter().rev().map(|n| (n, None)).collect();
    while let Some((node, parent)) = stack.pop() {
        if node_map[node.index()].is_some() {
            log::warn!("Node {} reached twice; keeping the first placement", node.index());
            continue;
        }
        let flat = nodes.len();
        node_map[node.index()] = Some(flat);

        let (translation, rotation, scale) = node.transform().decomposed();
        nodes.push(NodeAsset {
            name: node.name().map(str::to_string),
            parent,
            transform: Transform::from_gltf(translation, rotation, scale),
            mesh: node.mesh().map(|m| m.index()),
            skin: node.skin().map(|s| s.index()),
        });

        let children: Vec<gltf::Node> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push((child, Some(flat)));
        }
    }

    (nodes, node_map)
}

fn load_mesh(mesh: &gltf::Mesh, buffers: &[Vec<u8>]) -> MeshAsset {
    let mut primitives = Vec::new();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Mesh {}: skipping primitive {} with mode {:?}",
                mesh.index(),
                primitive.index(),
                primitive.mode()
            );
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

        let positions: Vec<[f32; 3]> = reader.read_positions().map(|iter| iter.collect()).unwrap_or_default();
        if positions.is_empty() {
            log::warn!("Mesh {}: primitive {} has no positions", mesh.index(), primitive.index());
            continue;
        }
        let vertex_count = positions.len();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(iter) => iter.into_u32().collect(),
            None => (0..vertex_count as u32).collect(),
        };
        if indices.iter().any(|&i| i as usize >= vertex_count) {
            log::warn!("Mesh {}: primitive {} has out-of-range indices", mesh.index(), primitive.index());
            continue;
        }

        let normals: Vec<[f32; 3]> = match reader.read_normals() {
            Some(iter) => iter.collect(),
            None => compute_normals(&positions, &indices),
        };
        let uvs: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|r| r.into_f32().collect())
            .unwrap_or_else(|| vec![[0.0, 0.0]; vertex_count]);

        let joints: Vec<[u16; 4]> = reader
            .read_joints(0)
            .map(|r| r.into_u16().collect())
            .unwrap_or_default();
        let weights: Vec<[f32; 4]> = reader
            .read_weights(0)
            .map(|r| r.into_f32().collect())
            .unwrap_or_default();
        let (joints, weights) = if joints.len() == vertex_count && weights.len() == vertex_count {
            (joints, weights)
        } else {
            (Vec::new(), Vec::new())
        };

        primitives.push(PrimitiveAsset {
            positions,
            normals,
            uvs,
            indices,
            joints,
            weights,
            material: primitive.material().index(),
        });
    }

    MeshAsset {
        name: mesh.name().map(str::to_string),
        primitives,
    }
}

/// Smooth vertex normals, area weighted.
fn compute_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let pa = Vec3::from_array(positions[a]);
        let face = (Vec3::from_array(positions[b]) - pa).cross(Vec3::from_array(positions[c]) - pa);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

fn load_material(material: &gltf::Material) -> MaterialAsset {
    let pbr = material.pbr_metallic_roughness();
    MaterialAsset {
        base_color: pbr.base_color_factor(),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        base_color_texture: pbr.base_color_texture().map(|info| info.texture().index()),
    }
}

/// Decode every texture's image. A texture that fails to decode is replaced
/// by a white pixel so the rest of the model still loads.
async fn load_textures(
    reader: &impl AssetReader,
    url: &str,
    gltf: &gltf::Gltf,
    buffers: &[Vec<u8>],
) -> Result<Vec<TextureAsset>> {
    let mut textures = Vec::new();

    for texture in gltf.textures() {
        let bytes = match texture.source().source() {
            gltf::image::Source::View { view, .. } => {
                let start = view.offset();
                let end = start + view.length();
                buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.get(start..end))
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| {
                        LoadError::MissingData(format!("{url}: image view {} out of range", view.index()))
                    })?
            }
            gltf::image::Source::Uri { uri, .. } => read_asset(reader, &resolve_uri(url, uri)?).await?,
        };

        let decoded = match image::load_from_memory(&bytes) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                TextureAsset {
                    width: rgba.width(),
                    height: rgba.height(),
                    rgba: rgba.into_raw(),
                }
            }
            Err(e) => {
                log::warn!("{url}: texture {} failed to decode ({e}); using white", texture.index());
                TextureAsset {
                    width: 1,
                    height: 1,
                    rgba: vec![255; 4],
                }
            }
        };
        textures.push(decoded);
    }

    Ok(textures)
}

fn load_skin(skin: &gltf::Skin, buffers: &[Vec<u8>], node_map: &[Option<usize>]) -> SkinAsset {
    let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let joint_count = skin.joints().count();

    let inverse_bind: Vec<Mat4> = match reader.read_inverse_bind_matrices() {
        Some(iter) => iter.map(|m| Mat4::from_cols_array_2d(&m)).collect(),
        None => vec![Mat4::IDENTITY; joint_count],
    };

    let joints = skin
        .joints()
        .map(|joint| {
            node_map[joint.index()].unwrap_or_else(|| {
                log::warn!("Skin {}: joint node {} is not in the scene", skin.index(), joint.index());
                usize::MAX
            })
        })
        .collect();

    SkinAsset { joints, inverse_bind }
}

fn load_clips(gltf: &gltf::Gltf, buffers: &[Vec<u8>], node_map: &[Option<usize>]) -> Vec<AnimationClip> {
    let mut clips = Vec::new();

    for anim in gltf.animations() {
        let mut tracks = Vec::new();

        for (channel_index, channel) in anim.channels().enumerate() {
            let target = channel.target();
            let Some(node) = node_map[target.node().index()] else {
                continue;
            };
            let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let Some(inputs) = reader.read_inputs() else {
                continue;
            };
            let times: Vec<f32> = inputs.collect();

            let interpolation = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Linear => InterpolationMode::Linear,
                gltf::animation::Interpolation::Step => InterpolationMode::Step,
                gltf::animation::Interpolation::CubicSpline => InterpolationMode::CubicSpline,
            };

            use gltf::animation::util::ReadOutputs;
            let (property, data) = match reader.read_outputs() {
                Some(ReadOutputs::Translations(iter)) => (
                    TargetProperty::Translation,
                    KeyframeTrack::new(times, iter.map(Vec3::from_array).collect(), interpolation)
                        .map(TrackData::Vector3),
                ),
                Some(ReadOutputs::Rotations(iter)) => (
                    TargetProperty::Rotation,
                    KeyframeTrack::new(times, iter.into_f32().map(Quat::from_array).collect(), interpolation)
                        .map(TrackData::Quaternion),
                ),
                Some(ReadOutputs::Scales(iter)) => (
                    TargetProperty::Scale,
                    KeyframeTrack::new(times, iter.map(Vec3::from_array).collect(), interpolation)
                        .map(TrackData::Vector3),
                ),
                // Morph target weights are not animated
                Some(ReadOutputs::MorphTargetWeights(_)) | None => continue,
            };

            match data {
                Some(data) => tracks.push(Track { node, property, data }),
                None => log::warn!(
                    "Animation {}: channel {} has mismatched keyframes; skipped",
                    anim.index(),
                    channel_index
                ),
            }
        }

        let name = anim
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{}", anim.index()));
        clips.push(AnimationClip::new(name, tracks));
    }

    clips
}
