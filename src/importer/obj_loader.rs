//! Wavefront OBJ import through `tobj`.

use std::path::Path;

use crate::{
    data_structures::mesh::Topology,
    error::ImportError,
    importer::{
        postprocess, ImportOptions, ImportedMaterial, ImportedMesh, ImportedScene, SceneImporter,
        TextureSource,
    },
};

/// Imports `.obj` files together with the `.mtl` libraries they reference.
///
/// OBJ has no node hierarchy, every object ends up under one identity root.
/// Texture coordinates are flipped vertically to match wgpu's texture
/// origin.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObjImporter;

impl SceneImporter for ObjImporter {
    fn import(&self, path: &Path, options: &ImportOptions) -> Result<ImportedScene, ImportError> {
        if !path.is_file() {
            return Err(ImportError::NotFound(path.to_path_buf()));
        }
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let (models, obj_materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                // Polygons are only representable as triangles.
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|source| ImportError::Obj {
            path: path.to_path_buf(),
            source,
        })?;

        let materials = match obj_materials {
            Ok(materials) => materials
                .iter()
                .map(|material| convert_material(material, base))
                .collect(),
            Err(e) => {
                log::warn!("Materials of {:?} could not be loaded: {}", path, e);
                Vec::new()
            }
        };

        let meshes: Vec<ImportedMesh> = models
            .into_iter()
            .filter_map(|model| {
                let mesh = convert_mesh(model, materials.len());
                if mesh.is_none() {
                    log::debug!("Skipping empty object in {:?}", path);
                }
                mesh
            })
            .collect();
        if meshes.is_empty() {
            return Err(ImportError::EmptyScene(path.to_path_buf()));
        }

        let mut scene = ImportedScene::with_single_root(meshes, materials);
        postprocess::run(&mut scene, options)?;
        log::info!(
            "Imported {:?}: {} meshes, {} materials",
            path,
            scene.meshes.len(),
            scene.materials.len()
        );
        Ok(scene)
    }
}

fn convert_mesh(model: tobj::Model, material_count: usize) -> Option<ImportedMesh> {
    let mesh = model.mesh;
    if mesh.positions.len() < 3 || mesh.indices.is_empty() {
        return None;
    }
    let vertex_count = mesh.positions.len() / 3;

    let positions = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let normals = if mesh.normals.len() == vertex_count * 3 {
        mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect()
    } else {
        Vec::new()
    };
    let tex_coords = if mesh.texcoords.len() == vertex_count * 2 {
        mesh.texcoords
            .chunks_exact(2)
            .map(|t| [t[0], 1.0 - t[1]])
            .collect()
    } else {
        Vec::new()
    };

    Some(ImportedMesh {
        name: model.name,
        positions,
        normals,
        tex_coords,
        tangents: Vec::new(),
        bitangents: Vec::new(),
        indices: Some(mesh.indices),
        topology: Topology::TriangleList,
        material: mesh.material_id.filter(|&id| id < material_count),
    })
}

fn convert_material(material: &tobj::Material, base: &Path) -> ImportedMaterial {
    let rgba = |rgb: [f32; 3]| [rgb[0], rgb[1], rgb[2], 1.0];
    let texture = |name: &Option<String>| {
        name.as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| TextureSource::File(base.join(name)))
    };

    ImportedMaterial {
        name: material.name.clone(),
        ambient: material.ambient.map(rgba),
        diffuse: material.diffuse.map(rgba),
        specular: material.specular.map(rgba),
        emissive: material
            .unknown_param
            .get("Ke")
            .and_then(|value| parse_rgb(value))
            .map(rgba),
        shininess: material.shininess,
        opacity: material.dissolve,
        diffuse_texture: texture(&material.diffuse_texture),
        normal_texture: texture(&material.normal_texture),
        specular_texture: texture(&material.specular_texture),
    }
}

/// Parses the `r g b` triple of an MTL statement tobj does not know.
fn parse_rgb(value: &str) -> Option<[f32; 3]> {
    let mut channels = value.split_whitespace().map(str::parse::<f32>);
    let rgb = [
        channels.next()?.ok()?,
        channels.next()?.ok()?,
        channels.next()?.ok()?,
    ];
    Some(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emissive_triple_is_parsed() {
        assert_eq!(parse_rgb("0.5 0.25 1"), Some([0.5, 0.25, 1.0]));
        assert_eq!(parse_rgb("0.5 x 1"), None);
        assert_eq!(parse_rgb("0.5"), None);
    }

    #[test]
    fn material_textures_resolve_against_the_model_directory() {
        let material = tobj::Material {
            name: "checker".to_string(),
            diffuse: Some([1.0, 0.5, 0.0]),
            dissolve: Some(0.5),
            diffuse_texture: Some("checker.png".to_string()),
            ..Default::default()
        };
        let imported = convert_material(&material, Path::new("assets/models"));
        assert_eq!(imported.diffuse, Some([1.0, 0.5, 0.0, 1.0]));
        assert_eq!(imported.opacity, Some(0.5));
        assert_eq!(
            imported.diffuse_texture,
            Some(TextureSource::File(Path::new("assets/models").join("checker.png")))
        );
        assert!(imported.normal_texture.is_none());
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = ObjImporter.import(Path::new("does/not/exist.obj"), &ImportOptions::default());
        assert!(matches!(result, Err(ImportError::NotFound(_))));
    }
}
