//! The GPU seam of the crate.
//!
//! [`Model`](crate::model::Model) never talks to `wgpu` directly. Every GPU
//! object it needs is created through a [`GpuBackend`], which keeps the
//! loading, caching and material logic independent of a live device.
//! [`WgpuBackend`] is the production implementation.

use image::RgbaImage;

use crate::{
    data_structures::{
        material::MaterialUniform,
        mesh::{MeshGeometry, RenderMesh, TextureKind, TextureSlots, Topology},
    },
    error::GpuError,
};

mod wgpu_backend;

pub use wgpu_backend::{SceneUniform, WgpuBackend, WgpuMeshState, WgpuVertexArray};

/// Creates, updates and draws the GPU objects of a model.
///
/// Handles returned by the backend are released when dropped. Vertex
/// arrays and textures are shared between meshes through `Rc`, mesh state
/// is owned by exactly one mesh.
pub trait GpuBackend: Sized {
    /// Vertex buffer plus optional index buffer of one mesh.
    type VertexArray;
    type Texture;
    /// Per-mesh uniform and binding state.
    type MeshState;
    /// What [`draw_mesh`](GpuBackend::draw_mesh) records into.
    type Pass<'p>;

    fn upload_mesh(&self, geometry: &MeshGeometry) -> Result<Self::VertexArray, GpuError>;

    /// Normal maps are uploaded without sRGB decoding.
    fn upload_texture(
        &self,
        image: &RgbaImage,
        label: &str,
        is_normal_map: bool,
    ) -> Result<Self::Texture, GpuError>;

    /// Faces are ordered +X, -X, +Y, -Y, +Z, -Z and share one square size.
    fn upload_cube_map(&self, faces: &[RgbaImage; 6], label: &str)
    -> Result<Self::Texture, GpuError>;

    /// A 1x1 opaque white texture of the given kind.
    fn placeholder_texture(&self, kind: TextureKind) -> Self::Texture;

    fn create_mesh_state(
        &self,
        label: &str,
        uniform: &MaterialUniform,
        textures: &TextureSlots<Self::Texture>,
    ) -> Self::MeshState;

    /// Writes a new material and transform uniform.
    fn update_mesh_uniform(&self, state: &mut Self::MeshState, uniform: &MaterialUniform);

    /// Rebinds the texture units. Only called when the slots changed.
    fn update_mesh_textures(
        &self,
        state: &mut Self::MeshState,
        textures: &TextureSlots<Self::Texture>,
    );

    /// Whether meshes of `topology` can be drawn at all.
    fn supports(&self, topology: Topology) -> bool;

    /// Records the draw of one mesh. Only called for supported topologies.
    fn draw_mesh(&self, pass: &mut Self::Pass<'_>, mesh: &RenderMesh<Self>);
}
