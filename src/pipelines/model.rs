use crate::data_structures::mesh::{ModelVertex, Topology, MAX_TEXTURE_UNITS};

/// Binding of the material uniform inside the mesh bind group.
pub const MATERIAL_BINDING: u32 = 0;
/// First 2D texture binding; unit `n` lives at `FIRST_2D_BINDING + n`.
pub const FIRST_2D_BINDING: u32 = 1;
/// First cube texture binding; unit `n` lives at `FIRST_CUBE_BINDING + n`.
pub const FIRST_CUBE_BINDING: u32 = FIRST_2D_BINDING + MAX_TEXTURE_UNITS as u32;
pub const SAMPLER_BINDING: u32 = FIRST_CUBE_BINDING + MAX_TEXTURE_UNITS as u32;

/// Maps a mesh topology to the `wgpu` primitive topology used to draw it.
/// Fans and adjacency lists have no `wgpu` counterpart.
pub fn primitive_topology(topology: Topology) -> Option<wgpu::PrimitiveTopology> {
    match topology {
        Topology::PointList => Some(wgpu::PrimitiveTopology::PointList),
        Topology::LineList => Some(wgpu::PrimitiveTopology::LineList),
        Topology::LineStrip => Some(wgpu::PrimitiveTopology::LineStrip),
        Topology::TriangleList => Some(wgpu::PrimitiveTopology::TriangleList),
        Topology::TriangleStrip => Some(wgpu::PrimitiveTopology::TriangleStrip),
        Topology::TriangleFan | Topology::TriangleListAdjacency => None,
    }
}

pub fn mk_scene_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("scene_bind_group_layout"),
    })
}

/// Material uniform, one 2D and one cube binding per texture unit and a
/// shared sampler.
pub fn mk_mesh_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture_entry = |binding, view_dimension| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };

    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: MATERIAL_BINDING,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }];
    for unit in 0..MAX_TEXTURE_UNITS as u32 {
        entries.push(texture_entry(
            FIRST_2D_BINDING + unit,
            wgpu::TextureViewDimension::D2,
        ));
    }
    for unit in 0..MAX_TEXTURE_UNITS as u32 {
        entries.push(texture_entry(
            FIRST_CUBE_BINDING + unit,
            wgpu::TextureViewDimension::Cube,
        ));
    }
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: SAMPLER_BINDING,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("mesh_bind_group_layout"),
    })
}

/// Pipeline drawing model meshes of one topology.
pub fn mk_model_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    let strip_index_format = topology
        .is_strip()
        .then_some(wgpu::IndexFormat::Uint32);

    mk_render_pipeline(
        device,
        layout,
        shader,
        color_format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        depth_format,
        &[ModelVertex::desc()],
        wgpu::PrimitiveState {
            topology,
            strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            // Imported models are not guaranteed to be closed.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
    )
}

#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    primitive: wgpu::PrimitiveState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(&format!("Model Pipeline ({:?})", primitive.topology)),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive,
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

/// Shader module shared by all model pipelines.
pub fn mk_model_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Model Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("model.wgsl").into()),
    })
}
