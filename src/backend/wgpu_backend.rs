use std::{cell::Cell, collections::HashMap};

use cgmath::SquareMatrix;
use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::{
    backend::GpuBackend,
    data_structures::{
        material::MaterialUniform,
        mesh::{
            MeshGeometry, ModelVertex, RenderMesh, TextureKind, TextureSlots, Topology,
            MAX_TEXTURE_UNITS,
        },
        texture::{self, Texture},
    },
    error::GpuError,
    pipelines::model::{
        self as model_pipeline, FIRST_2D_BINDING, FIRST_CUBE_BINDING, MATERIAL_BINDING,
        SAMPLER_BINDING,
    },
};

const PLACEHOLDER_COLOR: [u8; 4] = [255; 4];

/// Camera and light shared by every mesh drawn through one backend.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view_position: [f32; 4],
    pub light_position: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    pub light_color: [f32; 3],
    _padding2: u32,
}

impl SceneUniform {
    pub fn new() -> Self {
        Self {
            view_proj: cgmath::Matrix4::identity().into(),
            view_position: [0.0, 0.0, 0.0, 1.0],
            light_position: [2.0, 2.0, 2.0],
            _padding: 0,
            light_color: [1.0, 1.0, 1.0],
            _padding2: 0,
        }
    }
}

impl Default for SceneUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct WgpuVertexArray {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<wgpu::Buffer>,
}

#[derive(Debug)]
pub struct WgpuMeshState {
    pub label: String,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// [`GpuBackend`] drawing into a `wgpu` render pass.
///
/// Owns clones of the device and queue, the scene uniform (group 0), the
/// per-mesh bind group layout (group 1) and one pipeline per drawable
/// topology.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    scene: Cell<SceneUniform>,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    mesh_layout: wgpu::BindGroupLayout,
    pipelines: HashMap<Topology, wgpu::RenderPipeline>,
    placeholder_2d: Texture,
    placeholder_cube: Texture,
    sampler: wgpu::Sampler,
}

impl WgpuBackend {
    /// `depth_format` must match the depth attachment of the passes the
    /// backend draws into, `None` when they have none.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let scene = SceneUniform::new();
        let scene_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Buffer"),
            contents: bytemuck::cast_slice(&[scene]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let scene_layout = model_pipeline::mk_scene_bind_group_layout(device);
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &scene_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
            label: Some("scene_bind_group"),
        });
        let mesh_layout = model_pipeline::mk_mesh_bind_group_layout(device);

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Model Pipeline Layout"),
            bind_group_layouts: &[&scene_layout, &mesh_layout],
            push_constant_ranges: &[],
        });
        let shader = model_pipeline::mk_model_shader(device);
        let pipelines = [
            Topology::PointList,
            Topology::LineList,
            Topology::LineStrip,
            Topology::TriangleList,
            Topology::TriangleStrip,
        ]
        .into_iter()
        .filter_map(|topology| {
            let primitive = model_pipeline::primitive_topology(topology)?;
            let pipeline = model_pipeline::mk_model_pipeline(
                device,
                &layout,
                &shader,
                color_format,
                depth_format,
                primitive,
            );
            Some((topology, pipeline))
        })
        .collect();

        Self {
            device: device.clone(),
            queue: queue.clone(),
            scene: Cell::new(scene),
            scene_buffer,
            scene_bind_group,
            mesh_layout,
            pipelines,
            placeholder_2d: Texture::solid(
                device,
                queue,
                PLACEHOLDER_COLOR,
                TextureKind::D2,
                "empty unit (2D)",
            ),
            placeholder_cube: Texture::solid(
                device,
                queue,
                PLACEHOLDER_COLOR,
                TextureKind::CubeMap,
                "empty unit (cube)",
            ),
            sampler: texture::create_default_sampler(device),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn scene(&self) -> SceneUniform {
        self.scene.get()
    }

    /// Updates the view-projection matrix and eye position used by every
    /// subsequent draw.
    pub fn set_camera(&self, view_proj: cgmath::Matrix4<f32>, eye: cgmath::Point3<f32>) {
        let mut scene = self.scene.get();
        scene.view_proj = view_proj.into();
        scene.view_position = eye.to_homogeneous().into();
        self.write_scene(scene);
    }

    pub fn set_light(&self, position: cgmath::Point3<f32>, color: [f32; 3]) {
        let mut scene = self.scene.get();
        scene.light_position = position.into();
        scene.light_color = color;
        self.write_scene(scene);
    }

    /// Depth texture matching the `DEPTH_FORMAT` pipelines are built with.
    pub fn create_depth_texture(&self, size: [u32; 2]) -> Texture {
        Texture::create_depth_texture(&self.device, size, "depth_texture")
    }

    fn write_scene(&self, scene: SceneUniform) {
        self.scene.set(scene);
        self.queue
            .write_buffer(&self.scene_buffer, 0, bytemuck::cast_slice(&[scene]));
    }

    fn check_buffer_size(&self, label: &str, size: u64) -> Result<(), GpuError> {
        let limit = self.device.limits().max_buffer_size;
        if size > limit {
            return Err(GpuError::TooLarge {
                label: label.to_string(),
                size,
                limit,
            });
        }
        Ok(())
    }

    fn mk_mesh_bind_group(
        &self,
        label: &str,
        uniform_buffer: &wgpu::Buffer,
        textures: &TextureSlots<Texture>,
    ) -> wgpu::BindGroup {
        let view = |unit: usize, kind: TextureKind| match textures.get(unit) {
            Some(binding) if binding.kind == kind => &binding.texture.view,
            _ => match kind {
                TextureKind::D2 => &self.placeholder_2d.view,
                TextureKind::CubeMap => &self.placeholder_cube.view,
            },
        };

        let mut entries = Vec::with_capacity(2 * MAX_TEXTURE_UNITS + 2);
        entries.push(wgpu::BindGroupEntry {
            binding: MATERIAL_BINDING,
            resource: uniform_buffer.as_entire_binding(),
        });
        for unit in 0..MAX_TEXTURE_UNITS {
            entries.push(wgpu::BindGroupEntry {
                binding: FIRST_2D_BINDING + unit as u32,
                resource: wgpu::BindingResource::TextureView(view(unit, TextureKind::D2)),
            });
        }
        for unit in 0..MAX_TEXTURE_UNITS {
            entries.push(wgpu::BindGroupEntry {
                binding: FIRST_CUBE_BINDING + unit as u32,
                resource: wgpu::BindingResource::TextureView(view(unit, TextureKind::CubeMap)),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: SAMPLER_BINDING,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.mesh_layout,
            entries: &entries,
            label: Some(&format!("{label} bind group")),
        })
    }
}

impl GpuBackend for WgpuBackend {
    type VertexArray = WgpuVertexArray;
    type Texture = Texture;
    type MeshState = WgpuMeshState;
    type Pass<'p> = wgpu::RenderPass<'p>;

    fn upload_mesh(&self, geometry: &MeshGeometry) -> Result<WgpuVertexArray, GpuError> {
        if geometry.vertices.is_empty() {
            return Err(GpuError::EmptyGeometry(geometry.label.clone()));
        }
        let vertex_bytes = (geometry.vertices.len() * std::mem::size_of::<ModelVertex>()) as u64;
        self.check_buffer_size(&geometry.label, vertex_bytes)?;
        if let Some(indices) = &geometry.indices {
            self.check_buffer_size(&geometry.label, (indices.len() * 4) as u64)?;
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", geometry.label)),
                contents: bytemuck::cast_slice(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = geometry.indices.as_ref().map(|indices| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Index Buffer", geometry.label)),
                    contents: bytemuck::cast_slice(indices),
                    usage: wgpu::BufferUsages::INDEX,
                })
        });
        log::debug!(
            "Uploaded '{}': {} vertices, {} indices",
            geometry.label,
            geometry.vertices.len(),
            geometry.indices.as_ref().map_or(0, Vec::len)
        );

        Ok(WgpuVertexArray {
            vertex_buffer,
            index_buffer,
        })
    }

    fn upload_texture(
        &self,
        image: &RgbaImage,
        label: &str,
        is_normal_map: bool,
    ) -> Result<Texture, GpuError> {
        Texture::from_image(&self.device, &self.queue, image, label, is_normal_map)
    }

    fn upload_cube_map(&self, faces: &[RgbaImage; 6], label: &str) -> Result<Texture, GpuError> {
        Texture::cube_from_images(&self.device, &self.queue, faces, label)
    }

    fn placeholder_texture(&self, kind: TextureKind) -> Texture {
        match kind {
            TextureKind::D2 => self.placeholder_2d.clone(),
            TextureKind::CubeMap => self.placeholder_cube.clone(),
        }
    }

    fn create_mesh_state(
        &self,
        label: &str,
        uniform: &MaterialUniform,
        textures: &TextureSlots<Texture>,
    ) -> WgpuMeshState {
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Material Buffer")),
                contents: bytemuck::cast_slice(&[*uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = self.mk_mesh_bind_group(label, &uniform_buffer, textures);
        WgpuMeshState {
            label: label.to_string(),
            uniform_buffer,
            bind_group,
        }
    }

    fn update_mesh_uniform(&self, state: &mut WgpuMeshState, uniform: &MaterialUniform) {
        self.queue
            .write_buffer(&state.uniform_buffer, 0, bytemuck::cast_slice(&[*uniform]));
    }

    fn update_mesh_textures(&self, state: &mut WgpuMeshState, textures: &TextureSlots<Texture>) {
        // Texture views are baked into the bind group.
        state.bind_group = self.mk_mesh_bind_group(&state.label, &state.uniform_buffer, textures);
    }

    fn supports(&self, topology: Topology) -> bool {
        self.pipelines.contains_key(&topology)
    }

    fn draw_mesh(&self, pass: &mut wgpu::RenderPass<'_>, mesh: &RenderMesh<Self>) {
        let Some(pipeline) = self.pipelines.get(&mesh.topology) else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.scene_bind_group, &[]);
        pass.set_bind_group(1, &mesh.state.bind_group, &[]);
        pass.set_vertex_buffer(0, mesh.vertex_array.vertex_buffer.slice(..));
        match &mesh.vertex_array.index_buffer {
            Some(index_buffer) => {
                pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.element_count, 0, 0..1);
            }
            None => pass.draw(0..mesh.element_count, 0..1),
        }
    }
}
