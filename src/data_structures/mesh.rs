//! Renderable meshes and the per-mesh state they carry.
//!
//! A [`RenderMesh`] is created for every sub-mesh of an imported scene. It
//! owns a shared handle to its vertex array, the textures bound to its
//! texture units, its material and the accumulated node transform.

use std::rc::Rc;

use crate::{
    backend::GpuBackend,
    data_structures::material::{Material, MaterialUniform},
    error::TextureError,
    importer::ImportedMesh,
};

/// Number of texture units every mesh can bind.
pub const MAX_TEXTURE_UNITS: usize = 8;

/// Unit the shader reads tangent space normals from.
pub const NORMAL_MAP_UNIT: usize = 1;

/// What kind of texture sits in a texture unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextureKind {
    #[default]
    D2,
    CubeMap,
}

impl TextureKind {
    /// Code written into the material uniform, `0` marks an empty unit.
    pub fn code(self) -> u32 {
        match self {
            TextureKind::D2 => 1,
            TextureKind::CubeMap => 2,
        }
    }
}

/// Primitive topology of a mesh.
///
/// Importers may report any of these; after triangulation only list
/// topologies remain. `TriangleListAdjacency` carries six indices per
/// triangle (`v0, a01, v1, a12, v2, a20`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Topology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    TriangleFan,
    TriangleListAdjacency,
}

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl ModelVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x3,
        3 => Float32x3,
        4 => Float32x3
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// CPU-side geometry handed to [`GpuBackend::upload_mesh`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshGeometry {
    pub label: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Option<Vec<u32>>,
    pub topology: Topology,
}

impl MeshGeometry {
    /// Interleaves the attribute streams of an imported mesh. Missing
    /// attributes are zero filled.
    pub fn from_imported(mesh: &ImportedMesh, label: &str) -> Self {
        let vertices = (0..mesh.positions.len())
            .map(|i| ModelVertex {
                position: mesh.positions[i],
                tex_coords: mesh.tex_coords.get(i).copied().unwrap_or_default(),
                normal: mesh.normals.get(i).copied().unwrap_or_default(),
                tangent: mesh.tangents.get(i).copied().unwrap_or_default(),
                bitangent: mesh.bitangents.get(i).copied().unwrap_or_default(),
            })
            .collect();

        Self {
            label: label.to_string(),
            vertices,
            indices: mesh.indices.clone(),
            topology: mesh.topology,
        }
    }

    /// Number of elements a draw call consumes: indices when present,
    /// vertices otherwise.
    pub fn element_count(&self) -> u32 {
        match &self.indices {
            Some(indices) => indices.len() as u32,
            None => self.vertices.len() as u32,
        }
    }
}

/// A texture bound to one texture unit.
#[derive(Debug)]
pub struct TextureBinding<T> {
    pub texture: Rc<T>,
    pub kind: TextureKind,
}

impl<T> Clone for TextureBinding<T> {
    fn clone(&self) -> Self {
        Self {
            texture: Rc::clone(&self.texture),
            kind: self.kind,
        }
    }
}

/// Returns an error when `unit` cannot address a texture slot.
pub fn check_unit(unit: usize) -> Result<(), TextureError> {
    if unit >= MAX_TEXTURE_UNITS {
        return Err(TextureError::UnitOutOfRange {
            unit,
            max: MAX_TEXTURE_UNITS - 1,
        });
    }
    Ok(())
}

/// Fixed-capacity texture units with an explicit in-use count.
///
/// Every change bumps a generation counter so GPU bindings are only rebuilt
/// when the slots actually changed.
#[derive(Debug)]
pub struct TextureSlots<T> {
    slots: [Option<TextureBinding<T>>; MAX_TEXTURE_UNITS],
    in_use: usize,
    generation: u64,
}

impl<T> TextureSlots<T> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            in_use: 0,
            generation: 0,
        }
    }

    /// Binding of `unit`, `None` for empty or out-of-range units.
    pub fn get(&self, unit: usize) -> Option<&TextureBinding<T>> {
        self.slots.get(unit).and_then(Option::as_ref)
    }

    /// Binds `binding` to `unit` and returns the binding it replaced.
    pub fn set(
        &mut self,
        unit: usize,
        binding: TextureBinding<T>,
    ) -> Result<Option<TextureBinding<T>>, TextureError> {
        check_unit(unit)?;
        let previous = self.slots[unit].replace(binding);
        if previous.is_none() {
            self.in_use += 1;
        }
        self.generation += 1;
        Ok(previous)
    }

    pub fn clear(&mut self, unit: usize) -> Option<TextureBinding<T>> {
        let previous = self.slots.get_mut(unit).and_then(Option::take);
        if previous.is_some() {
            self.in_use -= 1;
            self.generation += 1;
        }
        previous
    }

    /// Number of occupied units.
    pub fn len(&self) -> usize {
        self.in_use
    }

    pub fn is_empty(&self) -> bool {
        self.in_use == 0
    }

    /// Counter bumped by every `set` and every effective `clear`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &TextureBinding<T>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(unit, slot)| slot.as_ref().map(|binding| (unit, binding)))
    }

    /// Kind codes per unit as written into the material uniform.
    pub fn kinds(&self) -> [u32; MAX_TEXTURE_UNITS] {
        std::array::from_fn(|unit| self.get(unit).map_or(0, |binding| binding.kind.code()))
    }
}

impl<T> Default for TextureSlots<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TextureSlots<T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            in_use: self.in_use,
            generation: self.generation,
        }
    }
}

/// One drawable unit of a [`Model`](crate::model::Model).
pub struct RenderMesh<B: GpuBackend> {
    pub name: String,
    pub vertex_array: Rc<B::VertexArray>,
    pub state: B::MeshState,
    pub textures: TextureSlots<B::Texture>,
    pub has_indices: bool,
    pub element_count: u32,
    pub topology: Topology,
    pub transform: cgmath::Matrix4<f32>,
    pub material: Material,
    /// Slot generation the GPU state was last bound with.
    bound_generation: u64,
}

impl<B: GpuBackend> RenderMesh<B> {
    /// Uploads `geometry` and creates the per-mesh GPU state.
    pub fn new(
        backend: &B,
        geometry: &MeshGeometry,
        material: Material,
        textures: TextureSlots<B::Texture>,
        transform: cgmath::Matrix4<f32>,
    ) -> Result<Self, crate::error::GpuError> {
        let vertex_array = backend.upload_mesh(geometry)?;
        let mut material = material;
        material.tex_count = textures.len() as u32;
        let uniform = MaterialUniform::new(&material, &transform, textures.kinds());
        let state = backend.create_mesh_state(&geometry.label, &uniform, &textures);
        let textures_generation = textures.generation();

        Ok(Self {
            name: geometry.label.clone(),
            vertex_array: Rc::new(vertex_array),
            state,
            textures,
            has_indices: geometry.indices.is_some(),
            element_count: geometry.element_count(),
            topology: geometry.topology,
            transform,
            material,
            bound_generation: textures_generation,
        })
    }

    pub fn uniform(&self) -> MaterialUniform {
        MaterialUniform::new(&self.material, &self.transform, self.textures.kinds())
    }

    /// Pushes material and transform to the GPU state, and the texture
    /// bindings when they changed since the last push.
    pub fn sync(&mut self, backend: &B) {
        self.material.tex_count = self.textures.len() as u32;
        let uniform = self.uniform();
        backend.update_mesh_uniform(&mut self.state, &uniform);
        if self.textures.generation() != self.bound_generation {
            backend.update_mesh_textures(&mut self.state, &self.textures);
            self.bound_generation = self.textures.generation();
        }
    }

    /// Copy sharing the vertex array and textures but owning fresh GPU state.
    pub fn share(&self, backend: &B) -> Self {
        let uniform = self.uniform();
        Self {
            name: self.name.clone(),
            vertex_array: Rc::clone(&self.vertex_array),
            state: backend.create_mesh_state(&self.name, &uniform, &self.textures),
            textures: self.textures.clone(),
            has_indices: self.has_indices,
            element_count: self.element_count,
            topology: self.topology,
            transform: self.transform,
            material: self.material,
            bound_generation: self.textures.generation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_track_in_use_count() {
        let mut slots: TextureSlots<u32> = TextureSlots::new();
        assert!(slots.is_empty());

        let binding = TextureBinding {
            texture: Rc::new(7),
            kind: TextureKind::D2,
        };
        assert!(slots.set(3, binding.clone()).unwrap().is_none());
        assert!(slots.set(3, binding).unwrap().is_some());
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.kinds()[3], 1);
        assert_eq!(slots.kinds()[0], 0);

        assert!(slots.clear(3).is_some());
        assert!(slots.clear(3).is_none());
        assert!(slots.is_empty());
    }

    #[test]
    fn generation_only_moves_on_changes() {
        let mut slots: TextureSlots<u32> = TextureSlots::new();
        assert_eq!(slots.generation(), 0);
        assert!(slots.clear(0).is_none());
        assert_eq!(slots.generation(), 0);

        let binding = TextureBinding {
            texture: Rc::new(2),
            kind: TextureKind::D2,
        };
        slots.set(0, binding).unwrap();
        assert_eq!(slots.generation(), 1);
        assert_eq!(slots.clone().generation(), 1);
        assert!(slots.clear(0).is_some());
        assert_eq!(slots.generation(), 2);
    }

    #[test]
    fn out_of_range_unit_is_rejected() {
        let mut slots: TextureSlots<u32> = TextureSlots::new();
        let result = slots.set(
            MAX_TEXTURE_UNITS,
            TextureBinding {
                texture: Rc::new(1),
                kind: TextureKind::CubeMap,
            },
        );
        assert!(matches!(
            result,
            Err(TextureError::UnitOutOfRange { unit, .. }) if unit == MAX_TEXTURE_UNITS
        ));
        assert!(slots.get(MAX_TEXTURE_UNITS).is_none());
        assert!(slots.is_empty());
    }

    #[test]
    fn geometry_counts_vertices_without_indices() {
        let mesh = ImportedMesh {
            positions: vec![[0.0; 3]; 4],
            ..Default::default()
        };
        let geometry = MeshGeometry::from_imported(&mesh, "quad");
        assert_eq!(geometry.element_count(), 4);
        assert_eq!(geometry.vertices[2].tex_coords, [0.0, 0.0]);
    }
}
