//! glTF 2.0 import (`.gltf` and `.glb`).

use std::{collections::HashMap, ops::Range, path::Path};

use cgmath::Vector3;

use crate::{
    data_structures::mesh::Topology,
    error::ImportError,
    importer::{
        postprocess, ImportOptions, ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene,
        SceneImporter, TextureSource,
    },
};

/// Imports glTF documents with their node hierarchy.
///
/// Every primitive becomes its own mesh. Buffers and embedded images are
/// loaded eagerly; image files are left to the texture cache so a missing
/// texture never fails the whole import. Relative image URIs are
/// percent-decoded before they are joined to the model's directory.
#[derive(Clone, Copy, Debug, Default)]
pub struct GltfImporter;

impl SceneImporter for GltfImporter {
    fn import(&self, path: &Path, options: &ImportOptions) -> Result<ImportedScene, ImportError> {
        if !path.is_file() {
            return Err(ImportError::NotFound(path.to_path_buf()));
        }
        let gltf_error = |source| ImportError::Gltf {
            path: path.to_path_buf(),
            source,
        };
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let gltf::Gltf { document, blob } = gltf::Gltf::open(path).map_err(gltf_error)?;
        let buffers = gltf::import_buffers(&document, Some(base), blob).map_err(gltf_error)?;

        let mut images = ImageResolver::new(path, base, &buffers);
        let materials = document
            .materials()
            .map(|material| convert_material(&material, &mut images))
            .collect();

        let mut meshes = Vec::new();
        let mut primitive_ranges = Vec::with_capacity(document.meshes().len());
        for mesh in document.meshes() {
            let start = meshes.len();
            for primitive in mesh.primitives() {
                match read_primitive(&mesh, &primitive, &buffers) {
                    Some(imported) => meshes.push(imported),
                    None => log::warn!(
                        "Skipping primitive {} of mesh {} in {:?}: no positions",
                        primitive.index(),
                        mesh.index(),
                        path
                    ),
                }
            }
            primitive_ranges.push(start..meshes.len());
        }
        if meshes.is_empty() {
            return Err(ImportError::EmptyScene(path.to_path_buf()));
        }

        let scene = document.default_scene().or_else(|| document.scenes().next());
        let mut scene = match scene {
            Some(scene) => {
                let nodes = build_nodes(scene, document.nodes().len(), &primitive_ranges);
                ImportedScene {
                    meshes,
                    materials,
                    nodes,
                }
            }
            None => ImportedScene::with_single_root(meshes, materials),
        };

        postprocess::run(&mut scene, options)?;
        log::info!(
            "Imported {:?}: {} meshes, {} materials, {} nodes",
            path,
            scene.meshes.len(),
            scene.materials.len(),
            scene.nodes.len()
        );
        Ok(scene)
    }
}

fn read_primitive(
    mesh: &gltf::Mesh,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Option<ImportedMesh> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    if positions.is_empty() {
        return None;
    }
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|iter| iter.collect())
        .unwrap_or_default();
    let tex_coords: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|tc| tc.into_f32().collect())
        .unwrap_or_default();
    let mut indices: Option<Vec<u32>> = reader.read_indices().map(|idx| idx.into_u32().collect());

    // Bitangents follow from normal, tangent and handedness, so tangents
    // without normals are left for post-processing.
    let (tangents, bitangents) = match reader.read_tangents() {
        Some(iter) if normals.len() == positions.len() => iter
            .zip(&normals)
            .map(|(t, n)| -> ([f32; 3], [f32; 3]) {
                let tangent = Vector3::new(t[0], t[1], t[2]);
                let bitangent = Vector3::from(*n).cross(tangent) * t[3];
                (tangent.into(), bitangent.into())
            })
            .unzip(),
        _ => (Vec::new(), Vec::new()),
    };

    let topology = match primitive.mode() {
        gltf::mesh::Mode::Points => Topology::PointList,
        gltf::mesh::Mode::Lines => Topology::LineList,
        gltf::mesh::Mode::LineStrip => Topology::LineStrip,
        gltf::mesh::Mode::LineLoop => {
            let mut strip = indices.unwrap_or_else(|| (0..positions.len() as u32).collect());
            if let Some(&first) = strip.first() {
                strip.push(first);
            }
            indices = Some(strip);
            Topology::LineStrip
        }
        gltf::mesh::Mode::Triangles => Topology::TriangleList,
        gltf::mesh::Mode::TriangleStrip => Topology::TriangleStrip,
        gltf::mesh::Mode::TriangleFan => Topology::TriangleFan,
    };

    let name = match mesh.name() {
        Some(name) if mesh.primitives().len() > 1 => format!("{name}.{}", primitive.index()),
        Some(name) => name.to_string(),
        None => format!("mesh{}.{}", mesh.index(), primitive.index()),
    };

    Some(ImportedMesh {
        name,
        positions,
        normals,
        tex_coords,
        tangents,
        bitangents,
        indices,
        topology,
        material: primitive.material().index(),
    })
}

/// Flattens the node tree of `scene` into an arena with the root at `0`.
/// Scenes with several root nodes get a synthetic identity root.
fn build_nodes(
    scene: gltf::Scene,
    node_count: usize,
    primitive_ranges: &[Range<usize>],
) -> Vec<ImportedNode> {
    let mut nodes = Vec::with_capacity(node_count + 1);
    let mut visited = vec![false; node_count];
    let roots: Vec<gltf::Node> = scene.nodes().collect();

    if let [root] = roots.as_slice() {
        push_node(root.clone(), primitive_ranges, &mut visited, &mut nodes);
    } else {
        nodes.push(ImportedNode::new(
            scene.name().unwrap_or("root"),
            ImportedNode::IDENTITY,
        ));
        for root in roots {
            if let Some(child) = push_node(root, primitive_ranges, &mut visited, &mut nodes) {
                nodes[0].children.push(child);
            }
        }
    }
    nodes
}

fn push_node(
    node: gltf::Node,
    primitive_ranges: &[Range<usize>],
    visited: &mut [bool],
    nodes: &mut Vec<ImportedNode>,
) -> Option<usize> {
    if std::mem::replace(&mut visited[node.index()], true) {
        log::warn!("Node {} is referenced more than once, ignoring the repeat", node.index());
        return None;
    }
    let index = nodes.len();
    let mut imported = ImportedNode::new(node.name().unwrap_or_default(), node.transform().matrix());
    if let Some(range) = node.mesh().and_then(|mesh| primitive_ranges.get(mesh.index())) {
        imported.meshes = range.clone().collect();
    }
    nodes.push(imported);

    for child in node.children() {
        if let Some(child) = push_node(child, primitive_ranges, visited, nodes) {
            nodes[index].children.push(child);
        }
    }
    Some(index)
}

fn convert_material(material: &gltf::Material, images: &mut ImageResolver) -> ImportedMaterial {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b] = material.emissive_factor();

    ImportedMaterial {
        name: material.name().unwrap_or_default().to_string(),
        diffuse: Some(pbr.base_color_factor()),
        emissive: Some([r, g, b, 1.0]),
        diffuse_texture: pbr
            .base_color_texture()
            .and_then(|info| images.resolve(info.texture().source())),
        normal_texture: material
            .normal_texture()
            .and_then(|normal| images.resolve(normal.texture().source())),
        ..Default::default()
    }
}

/// Maps glTF images to texture sources, decoding embedded images once.
struct ImageResolver<'a> {
    path: &'a Path,
    base: &'a Path,
    buffers: &'a [gltf::buffer::Data],
    resolved: HashMap<usize, Option<TextureSource>>,
}

impl<'a> ImageResolver<'a> {
    fn new(path: &'a Path, base: &'a Path, buffers: &'a [gltf::buffer::Data]) -> Self {
        Self {
            path,
            base,
            buffers,
            resolved: HashMap::new(),
        }
    }

    fn resolve(&mut self, image: gltf::Image) -> Option<TextureSource> {
        if let Some(source) = self.resolved.get(&image.index()) {
            return source.clone();
        }
        let source = self.load(&image);
        self.resolved.insert(image.index(), source.clone());
        source
    }

    fn load(&self, image: &gltf::Image) -> Option<TextureSource> {
        if let gltf::image::Source::Uri { uri, .. } = image.source() {
            if !uri.starts_with("data:") {
                return match urlencoding::decode(uri) {
                    Ok(relative) => Some(TextureSource::File(self.base.join(relative.as_ref()))),
                    Err(e) => {
                        log::warn!("Image {} of {:?} has an invalid URI: {}", image.index(), self.path, e);
                        None
                    }
                };
            }
        }

        // Buffer views and data URIs are decoded right away.
        let data = match gltf::image::Data::from_source(image.source(), Some(self.base), self.buffers) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Failed to decode image {} of {:?}: {}", image.index(), self.path, e);
                return None;
            }
        };
        match to_rgba(data) {
            Some(image_data) => Some(TextureSource::Embedded {
                key: format!("{}#{}", self.path.display(), image.index()),
                image: image_data,
            }),
            None => {
                log::warn!(
                    "Image {} of {:?} has an unsupported pixel format",
                    image.index(),
                    self.path
                );
                None
            }
        }
    }
}

/// Converts decoded glTF pixels to RGBA8. Only 8 bit formats are handled.
fn to_rgba(data: gltf::image::Data) -> Option<image::RgbaImage> {
    use gltf::image::Format;
    use image::{DynamicImage, ImageBuffer};

    let (width, height, pixels) = (data.width, data.height, data.pixels);
    let decoded = match data.format {
        Format::R8 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        Format::R8G8 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA8),
        Format::R8G8B8 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        Format::R8G8B8A8 => return ImageBuffer::from_raw(width, height, pixels),
        _ => None,
    };
    decoded.map(|image| image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let result = GltfImporter.import(Path::new("does/not/exist.glb"), &ImportOptions::default());
        assert!(matches!(result, Err(ImportError::NotFound(_))));
    }

    #[test]
    fn rgb_pixels_gain_an_opaque_alpha() {
        let data = gltf::image::Data {
            pixels: vec![10, 20, 30, 40, 50, 60],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };
        let rgba = to_rgba(data).unwrap();
        assert_eq!(rgba.as_raw(), &vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn truncated_pixels_are_rejected() {
        let data = gltf::image::Data {
            pixels: vec![1, 2, 3],
            format: gltf::image::Format::R8G8B8A8,
            width: 1,
            height: 1,
        };
        assert!(to_rgba(data).is_none());
    }
}
