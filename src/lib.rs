//! resmodel
//!
//! Loads 3D model files (Wavefront OBJ, glTF 2.0) into GPU-resident meshes
//! and draws them with a fixed Phong material model and up to
//! `MAX_TEXTURE_UNITS` texture units per mesh. GPU work goes through the
//! `GpuBackend` trait; `WgpuBackend` implements it on top of `wgpu`.
//!
//! High-level modules
//! - `model`: the `Model` resource, loading, material and texture setters
//! - `importer`: scene importers for OBJ and glTF plus mesh post-processing
//! - `backend`: the GPU seam and its `wgpu` implementation
//! - `cache`: path keyed store of shared texture handles
//! - `config`: model configuration and texture failure policy
//! - `data_structures`: meshes, materials, textures and bounds
//! - `pipelines`: bind group layouts, shader and render pipelines
//! - `resources`: helpers to read texture images from disk
//! - `error`: error types returned by the crate
//!

pub mod backend;
pub mod cache;
pub mod config;
pub mod data_structures;
pub mod error;
pub mod importer;
pub mod model;
pub mod pipelines;
pub mod resources;

pub use backend::{GpuBackend, WgpuBackend};
pub use cache::TextureCache;
pub use config::{ModelConfig, TextureFailurePolicy, DEFAULT_SHININESS, MAX_TEXTURE_UNITS};
pub use data_structures::{
    bounds::BoundingBox,
    material::{Material, MaterialColor, MaterialSemantic},
    mesh::{RenderMesh, TextureKind, Topology},
};
pub use error::{GpuError, ImportError, ModelError, TextureError};
pub use importer::{FormatImporter, GltfImporter, ImportOptions, ObjImporter, SceneImporter};
pub use model::Model;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
