use crate::handle::{Handle, HandleStore};
use clipstage_gpu_shared::shaders;
use clipstage_gpu_shared::uniforms::{
    LightUniforms, PerFrameUniforms, PerObjectUniforms, OBJECT_UNIFORM_STRIDE,
};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_OBJECT_CAPACITY: u64 = 64;

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const NORMAL_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];
const UV_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x2];

/// GPU mesh with one vertex buffer per attribute.
pub struct GPUMesh {
    pub position_buffer: wgpu::Buffer,
    pub normal_buffer: wgpu::Buffer,
    pub uv_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub vertex_count: u32,
}

/// Base color texture with its material bind group (group 2).
pub struct GPUTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

/// One mesh draw for the forward pass.
#[derive(Clone, Copy, Debug)]
pub struct DrawItem {
    pub mesh: Handle,
    pub texture: Option<Handle>,
    pub model: Mat4,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
}

/// Everything needed to render one frame.
pub struct FrameDesc<'a> {
    pub view_proj: Mat4,
    pub camera_position: Vec3,
    pub lights: LightUniforms,
    pub exposure: f32,
    pub environment_intensity: f32,
    pub clear_color: [f32; 3],
    pub draws: &'a [DrawItem],
}

/// Main backend state, owns all wgpu resources.
pub struct RenderBackend {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    view_format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,

    depth_view: wgpu::TextureView,

    mesh_pipeline: wgpu::RenderPipeline,
    skybox_pipeline: wgpu::RenderPipeline,

    frame_bind_group_layout: wgpu::BindGroupLayout,
    object_bind_group_layout: wgpu::BindGroupLayout,
    material_bind_group_layout: wgpu::BindGroupLayout,

    per_frame_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    object_buffer: wgpu::Buffer,
    object_capacity: u64,
    object_bind_group: wgpu::BindGroup,

    environment_view: wgpu::TextureView,
    environment_sampler: wgpu::Sampler,
    has_environment: bool,

    default_sampler: wgpu::Sampler,
    white_texture: GPUTexture,

    meshes: HandleStore<GPUMesh>,
    textures: HandleStore<GPUTexture>,
}

impl RenderBackend {
    /// Create the backend on a surface target (a canvas on the web).
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, String> {
        let width = width.max(1);
        let height = height.max(1);

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| format!("Failed to create surface: {e}"))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or("Failed to find suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Clipstage Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| format!("Failed to create device: {e}"))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or("Surface reports no supported formats")?;
        // Shaders write linear color; render through an sRGB view.
        let view_format = surface_format.add_srgb_suffix();

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: if view_format != surface_format {
                vec![view_format]
            } else {
                vec![]
            },
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, width, height);

        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame Bind Group Layout"),
                entries: &[
                    uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT, false),
                    uniform_entry(1, wgpu::ShaderStages::FRAGMENT, false),
                    texture_entry(2),
                    sampler_entry(3),
                ],
            });

        let object_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Object Bind Group Layout"),
                entries: &[uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    true,
                )],
            });

        let material_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Material Bind Group Layout"),
                entries: &[texture_entry(0), sampler_entry(1)],
            });

        let per_frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Per-Frame Uniforms"),
            size: std::mem::size_of::<PerFrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Uniforms"),
            size: std::mem::size_of::<LightUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let default_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Default Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let environment_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Placeholder environment until the HDR load completes
        let environment_view = create_environment_view(&device, &queue, 1, 1, &[0.0, 0.0, 0.0, 1.0]);

        let frame_bind_group = create_frame_bind_group(
            &device,
            &frame_bind_group_layout,
            &per_frame_buffer,
            &light_buffer,
            &environment_view,
            &environment_sampler,
        );

        let object_buffer = create_object_buffer(&device, INITIAL_OBJECT_CAPACITY);
        let object_bind_group =
            create_object_bind_group(&device, &object_bind_group_layout, &object_buffer);

        let white_texture = create_rgba8_texture(
            &device,
            &queue,
            &material_bind_group_layout,
            &default_sampler,
            &[255, 255, 255, 255],
            1,
            1,
        );

        let mesh_pipeline = create_mesh_pipeline(
            &device,
            view_format,
            &[
                &frame_bind_group_layout,
                &object_bind_group_layout,
                &material_bind_group_layout,
            ],
        );
        let skybox_pipeline = create_skybox_pipeline(&device, view_format, &frame_bind_group_layout);

        log::info!(
            "WebGPU backend initialized: {} ({}), surface {:?}",
            adapter.get_info().name,
            adapter.get_info().backend.to_str(),
            view_format,
        );

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            view_format,
            width,
            height,
            depth_view,
            mesh_pipeline,
            skybox_pipeline,
            frame_bind_group_layout,
            object_bind_group_layout,
            material_bind_group_layout,
            per_frame_buffer,
            light_buffer,
            frame_bind_group,
            object_buffer,
            object_capacity: INITIAL_OBJECT_CAPACITY,
            object_bind_group,
            environment_view,
            environment_sampler,
            has_environment: false,
            default_sampler,
            white_texture,
            meshes: HandleStore::new(),
            textures: HandleStore::new(),
        })
    }

    /// Resize the surface and recreate the depth buffer.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.surface.configure(&self.device, &self.surface_config);
            self.depth_view = create_depth_view(&self.device, width, height);
        }
    }

    /// Upload mesh data to GPU buffers. Position and normal buffers stay
    /// writable so skinned meshes can be refreshed with [`Self::update_mesh`].
    pub fn upload_mesh(
        &mut self,
        positions: &[[f32; 3]],
        normals: &[[f32; 3]],
        uvs: &[[f32; 2]],
        indices: &[u32],
    ) -> Handle {
        let position_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Position Buffer"),
                contents: bytemuck::cast_slice(positions),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        let normal_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Normal Buffer"),
                contents: bytemuck::cast_slice(normals),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        let uv_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex UV Buffer"),
                contents: bytemuck::cast_slice(uvs),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        self.meshes.insert(GPUMesh {
            position_buffer,
            normal_buffer,
            uv_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            vertex_count: positions.len() as u32,
        })
    }

    /// Overwrite the positions and normals of an uploaded mesh.
    pub fn update_mesh(&mut self, handle: Handle, positions: &[[f32; 3]], normals: &[[f32; 3]]) {
        let Some(mesh) = self.meshes.get(handle) else {
            log::warn!("update_mesh: unknown mesh handle {handle}");
            return;
        };
        if positions.len() != mesh.vertex_count as usize || normals.len() != mesh.vertex_count as usize {
            log::warn!(
                "update_mesh: vertex count mismatch for mesh {handle} ({} / {} vs {})",
                positions.len(),
                normals.len(),
                mesh.vertex_count
            );
            return;
        }
        self.queue
            .write_buffer(&mesh.position_buffer, 0, bytemuck::cast_slice(positions));
        self.queue
            .write_buffer(&mesh.normal_buffer, 0, bytemuck::cast_slice(normals));
    }

    /// Upload an RGBA8 sRGB base color texture.
    pub fn upload_texture(&mut self, pixels: &[u8], width: u32, height: u32) -> Handle {
        let texture = create_rgba8_texture(
            &self.device,
            &self.queue,
            &self.material_bind_group_layout,
            &self.default_sampler,
            pixels,
            width,
            height,
        );
        self.textures.insert(texture)
    }

    /// Install an equirectangular HDR environment (RGBA32F pixels, row 0 at
    /// the top). Used as background and ambient environment term.
    pub fn set_environment(&mut self, width: u32, height: u32, rgba: &[f32]) {
        if width == 0 || height == 0 || rgba.len() != (width * height * 4) as usize {
            log::error!("set_environment: invalid image {width}x{height} ({} floats)", rgba.len());
            return;
        }
        let max_dim = self.device.limits().max_texture_dimension_2d;
        if width > max_dim || height > max_dim {
            log::error!("set_environment: {width}x{height} exceeds the device limit of {max_dim}");
            return;
        }

        self.environment_view = create_environment_view(&self.device, &self.queue, width, height, rgba);
        self.frame_bind_group = create_frame_bind_group(
            &self.device,
            &self.frame_bind_group_layout,
            &self.per_frame_buffer,
            &self.light_buffer,
            &self.environment_view,
            &self.environment_sampler,
        );
        self.has_environment = true;
    }

    pub fn has_environment(&self) -> bool {
        self.has_environment
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Render one frame: environment background, then the lit draw list.
    pub fn render(&mut self, frame: &FrameDesc) -> Result<(), String> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(e) => return Err(format!("Surface texture error: {e}")),
        };

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(self.view_format),
            ..Default::default()
        });

        let per_frame = PerFrameUniforms::new(
            frame.view_proj,
            frame.camera_position,
            frame.exposure,
            frame.environment_intensity,
            self.has_environment,
            frame.clear_color,
        );
        self.queue
            .write_buffer(&self.per_frame_buffer, 0, bytemuck::bytes_of(&per_frame));
        self.queue
            .write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(&frame.lights));

        self.ensure_object_capacity(frame.draws.len() as u64);
        if !frame.draws.is_empty() {
            let mut staging = vec![0u8; frame.draws.len() * OBJECT_UNIFORM_STRIDE as usize];
            for (i, draw) in frame.draws.iter().enumerate() {
                let uniforms = PerObjectUniforms::new(
                    draw.model,
                    draw.base_color,
                    draw.metallic,
                    draw.roughness,
                    draw.texture.is_some(),
                );
                let bytes = bytemuck::bytes_of(&uniforms);
                let offset = i * OBJECT_UNIFORM_STRIDE as usize;
                staging[offset..offset + bytes.len()].copy_from_slice(bytes);
            }
            self.queue.write_buffer(&self.object_buffer, 0, &staging);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let [r, g, b] = frame.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Forward Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(&self.skybox_pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            pass.draw(0..3, 0..1);

            pass.set_pipeline(&self.mesh_pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for (i, draw) in frame.draws.iter().enumerate() {
                let Some(mesh) = self.meshes.get(draw.mesh) else {
                    continue;
                };
                let material = draw
                    .texture
                    .and_then(|handle| self.textures.get(handle))
                    .unwrap_or(&self.white_texture);

                let offset = (i as u64 * OBJECT_UNIFORM_STRIDE) as u32;
                pass.set_bind_group(1, &self.object_bind_group, &[offset]);
                pass.set_bind_group(2, &material.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.position_buffer.slice(..));
                pass.set_vertex_buffer(1, mesh.normal_buffer.slice(..));
                pass.set_vertex_buffer(2, mesh.uv_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn ensure_object_capacity(&mut self, count: u64) {
        if count <= self.object_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        log::debug!("Growing object uniform buffer to {capacity} slots");
        self.object_buffer = create_object_buffer(&self.device, capacity);
        self.object_bind_group =
            create_object_bind_group(&self.device, &self.object_bind_group_layout, &self.object_buffer);
        self.object_capacity = capacity;
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages, dynamic: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: if dynamic {
                wgpu::BufferSize::new(std::mem::size_of::<PerObjectUniforms>() as u64)
            } else {
                None
            },
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Buffer"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_environment_view(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    rgba: &[f32],
) -> wgpu::TextureView {
    let half_pixels: Vec<half::f16> = rgba.iter().map(|&v| half::f16::from_f32(v)).collect();
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Environment Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba16Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(&half_pixels),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(8 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_rgba8_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> GPUTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Base Color Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Material Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    GPUTexture {
        texture,
        view,
        bind_group,
        width,
        height,
    }
}

fn create_frame_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    per_frame_buffer: &wgpu::Buffer,
    light_buffer: &wgpu::Buffer,
    environment_view: &wgpu::TextureView,
    environment_sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Frame Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: per_frame_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: light_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(environment_view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(environment_sampler),
            },
        ],
    })
}

fn create_object_buffer(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Per-Object Uniforms"),
        size: capacity * OBJECT_UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_object_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Object Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<PerObjectUniforms>() as u64),
            }),
        }],
    })
}

fn create_mesh_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::RenderPipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Mesh Shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::MESH.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Mesh Pipeline Layout"),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Mesh Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: 12,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &POSITION_ATTRS,
                },
                wgpu::VertexBufferLayout {
                    array_stride: 12,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &NORMAL_ATTRS,
                },
                wgpu::VertexBufferLayout {
                    array_stride: 8,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &UV_ATTRS,
                },
            ],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

fn create_skybox_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    frame_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Skybox Shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::SKYBOX.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Skybox Pipeline Layout"),
        bind_group_layouts: &[frame_layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Skybox Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}
