//! Engine data structures: meshes, materials, textures and bounds.
//!
//! - `mesh` contains renderable meshes, texture units and vertex layout
//! - `material` holds material colors, presets and the per-mesh uniform
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `bounds` is an axis-aligned bounding box used to frame loaded models

pub mod bounds;
pub mod material;
pub mod mesh;
pub mod texture;
