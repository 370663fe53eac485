//! Scene importers.
//!
//! An importer turns a model file into an [`ImportedScene`]: a flat list of
//! meshes and materials plus a node tree stored as an arena. Parsing is
//! left to `tobj` and `gltf`; [`postprocess`] then brings every mesh into
//! the shape the renderer expects (triangle lists, normals, tangent space
//! and optionally adjacency).
//!
//! Importers are passed to a [`Model`](crate::model::Model) explicitly so
//! callers decide which formats are understood and how long the importer
//! lives.

use std::path::{Path, PathBuf};

use crate::{
    data_structures::mesh::{Topology, NORMAL_MAP_UNIT},
    error::ImportError,
};

mod gltf_loader;
mod obj_loader;
pub mod postprocess;

pub use gltf_loader::GltfImporter;
pub use obj_loader::ObjImporter;

/// Post-processing requested from an importer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    /// Convert strips, fans and polygons into triangle lists.
    pub triangulate: bool,
    /// Generate smooth normals for meshes that have none.
    pub generate_normals: bool,
    /// Generate tangents and bitangents for meshes that have none.
    pub tangent_space: bool,
    /// Replace triangle indices with adjacency indices.
    pub adjacency: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            triangulate: true,
            generate_normals: true,
            tangent_space: true,
            adjacency: false,
        }
    }
}

/// Where the pixels of a material texture come from.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureSource {
    /// An image file, already resolved against the model's directory.
    File(PathBuf),
    /// An image stored inside the model file. `key` identifies it in the
    /// texture cache.
    Embedded {
        key: String,
        image: image::RgbaImage,
    },
}

impl TextureSource {
    /// Texture cache key. An image used as a normal map is uploaded in a
    /// different format and gets its own entry.
    pub fn cache_key(&self, is_normal_map: bool) -> String {
        let key = match self {
            TextureSource::File(path) => path.to_string_lossy().into_owned(),
            TextureSource::Embedded { key, .. } => key.clone(),
        };
        if is_normal_map {
            format!("{key}#normal")
        } else {
            key
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    pub ambient: Option<[f32; 4]>,
    pub diffuse: Option<[f32; 4]>,
    pub specular: Option<[f32; 4]>,
    pub emissive: Option<[f32; 4]>,
    pub shininess: Option<f32>,
    pub opacity: Option<f32>,
    pub diffuse_texture: Option<TextureSource>,
    pub normal_texture: Option<TextureSource>,
    pub specular_texture: Option<TextureSource>,
}

impl ImportedMaterial {
    /// Texture references paired with the unit they are bound to.
    pub fn textures(&self) -> [(usize, Option<&TextureSource>); 3] {
        [
            (0, self.diffuse_texture.as_ref()),
            (NORMAL_MAP_UNIT, self.normal_texture.as_ref()),
            (2, self.specular_texture.as_ref()),
        ]
    }
}

/// Attribute streams of one sub-mesh. All streams except `positions` may be
/// empty; non-empty streams have one entry per position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub tangents: Vec<[f32; 3]>,
    pub bitangents: Vec<[f32; 3]>,
    pub indices: Option<Vec<u32>>,
    pub topology: Topology,
    pub material: Option<usize>,
}

impl ImportedMesh {
    /// Number of triangles of a triangle list, `0` for other topologies.
    pub fn triangle_count(&self) -> usize {
        let elements = self
            .indices
            .as_ref()
            .map_or(self.positions.len(), Vec::len);
        match self.topology {
            Topology::TriangleList => elements / 3,
            Topology::TriangleListAdjacency => elements / 6,
            _ => 0,
        }
    }
}

/// A node of the scene tree. `transform` is column-major and relative to
/// the parent node.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedNode {
    pub name: String,
    pub transform: [[f32; 4]; 4],
    pub children: Vec<usize>,
    pub meshes: Vec<usize>,
}

impl ImportedNode {
    pub const IDENTITY: [[f32; 4]; 4] = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    pub fn new(name: impl Into<String>, transform: [[f32; 4]; 4]) -> Self {
        Self {
            name: name.into(),
            transform,
            children: Vec::new(),
            meshes: Vec::new(),
        }
    }
}

/// Everything an importer extracted from a model file. Node `0` is the
/// root of the scene tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedScene {
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
    pub nodes: Vec<ImportedNode>,
}

impl ImportedScene {
    /// A scene whose meshes all hang off one identity root.
    pub fn with_single_root(meshes: Vec<ImportedMesh>, materials: Vec<ImportedMaterial>) -> Self {
        let mut root = ImportedNode::new("root", ImportedNode::IDENTITY);
        root.meshes = (0..meshes.len()).collect();
        Self {
            meshes,
            materials,
            nodes: vec![root],
        }
    }

    pub fn root(&self) -> Option<&ImportedNode> {
        self.nodes.first()
    }

    pub fn material_of(&self, mesh: &ImportedMesh) -> Option<&ImportedMaterial> {
        mesh.material.and_then(|index| self.materials.get(index))
    }
}

/// Turns a model file into an [`ImportedScene`].
pub trait SceneImporter {
    fn import(&self, path: &Path, options: &ImportOptions) -> Result<ImportedScene, ImportError>;
}

/// Picks an importer from the file extension: `obj`, `gltf` and `glb`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormatImporter;

impl SceneImporter for FormatImporter {
    fn import(&self, path: &Path, options: &ImportOptions) -> Result<ImportedScene, ImportError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("obj") => ObjImporter.import(path, options),
            Some("gltf") | Some("glb") => GltfImporter.import(path, options),
            _ => Err(ImportError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_unsupported() {
        let result = FormatImporter.import(Path::new("scene.xyz"), &ImportOptions::default());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn extension_match_ignores_case() {
        let result = FormatImporter.import(Path::new("missing/Scene.OBJ"), &ImportOptions::default());
        assert!(matches!(result, Err(ImportError::NotFound(_))));
    }

    #[test]
    fn triangle_count_uses_indices_when_present() {
        let mesh = ImportedMesh {
            positions: vec![[0.0; 3]; 4],
            indices: Some(vec![0, 1, 2, 0, 2, 3]),
            ..Default::default()
        };
        assert_eq!(mesh.triangle_count(), 2);
    }
}
