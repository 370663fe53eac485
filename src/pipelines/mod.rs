//! Render pipelines.
//!
//! - `model` builds the bind group layouts, shader and per-topology
//!   pipelines used to draw model meshes

pub mod model;
