//! Error types returned at the crate boundary.
//!
//! Import failures abort a [`Model::load`](crate::model::Model::load),
//! texture failures never do: they surface from the explicit texture
//! setters and are only logged while a model is being loaded.

use std::path::PathBuf;

/// Errors raised while turning a model file into an [`ImportedScene`](crate::importer::ImportedScene).
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported model format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to parse OBJ file '{path}': {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("failed to parse glTF file '{path}': {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("'{0}' contains no drawable meshes")]
    EmptyScene(PathBuf),

    #[error("mesh {mesh} is invalid: {reason}")]
    InvalidMesh { mesh: usize, reason: String },
}

/// Errors raised by a [`GpuBackend`](crate::backend::GpuBackend) while creating GPU objects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GpuError {
    #[error("mesh '{0}' has no vertices")]
    EmptyGeometry(String),

    #[error("texture '{0}' has a zero extent")]
    EmptyTexture(String),

    #[error("'{label}' needs {size} bytes but the device allows {limit}")]
    TooLarge { label: String, size: u64, limit: u64 },
}

/// Recoverable texture failures.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to read image '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture unit {unit} is out of range, the maximum is {max}")]
    UnitOutOfRange { unit: usize, max: usize },

    #[error("cube map face '{path}' is {width}x{height}, faces must be square and equally sized")]
    CubeFaceMismatch {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Failure of a whole [`Model::load`](crate::model::Model::load).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("failed to upload mesh {mesh}: {source}")]
    Gpu {
        mesh: usize,
        #[source]
        source: GpuError,
    },
}
