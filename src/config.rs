//! Model configuration.

use std::path::{Path, PathBuf};

use crate::importer::ImportOptions;

pub use crate::data_structures::{material::DEFAULT_SHININESS, mesh::MAX_TEXTURE_UNITS};

/// What `load` does with a texture that cannot be read or uploaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureFailurePolicy {
    /// Log the failure and leave the texture unit empty.
    #[default]
    Skip,
    /// Log the failure and bind a 1x1 white texture instead.
    Placeholder,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// Directory relative model and texture paths are resolved against.
    pub asset_root: Option<PathBuf>,
    pub import: ImportOptions,
    pub texture_failure: TextureFailurePolicy,
    /// Prefix of GPU debug labels.
    pub label: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            asset_root: None,
            import: ImportOptions::default(),
            texture_failure: TextureFailurePolicy::default(),
            label: "model".to_string(),
        }
    }
}

impl ModelConfig {
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    pub fn with_import_options(mut self, import: ImportOptions) -> Self {
        self.import = import;
        self
    }

    pub fn with_adjacency(mut self, adjacency: bool) -> Self {
        self.import.adjacency = adjacency;
        self
    }

    pub fn with_texture_failure(mut self, policy: TextureFailurePolicy) -> Self {
        self.texture_failure = policy;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Joins relative paths onto the asset root. Absolute paths, and every
    /// path when no root is set, are returned unchanged.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.asset_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
