use std::rc::Rc;

use resmodel::{
    backend::GpuBackend,
    data_structures::mesh::{TextureKind, MAX_TEXTURE_UNITS, NORMAL_MAP_UNIT},
    error::TextureError,
    ModelConfig, TextureFailurePolicy,
};

use crate::common::test_utils::{file_model, fixture, loaded};

mod common;

#[test]
fn material_textures_are_uploaded_once() {
    let (backend, model) = loaded("textured.obj");

    // checker.png backs the diffuse map of both materials and the
    // specular map of one.
    assert_eq!(backend.texture_upload_count(), 1);
    assert_eq!(model.texture_cache().len(), 1);

    let left = model.mesh(0).unwrap();
    let right = model.mesh(1).unwrap();
    assert_eq!(left.textures.len(), 1);
    assert_eq!(right.textures.len(), 2);
    assert_eq!(right.material.tex_count, 2);

    let left_diffuse = &left.textures.get(0).unwrap().texture;
    let right_diffuse = &right.textures.get(0).unwrap().texture;
    let right_specular = &right.textures.get(2).unwrap().texture;
    assert!(Rc::ptr_eq(left_diffuse, right_diffuse));
    assert!(Rc::ptr_eq(right_diffuse, right_specular));
    assert_eq!(left_diffuse.size, (2, 2));
}

#[test]
fn same_path_twice_shares_one_cache_entry() {
    let (backend, mut model) = loaded("triangle.obj");
    model.add_texture(3, fixture("checker.png")).unwrap();
    model.add_texture(4, fixture("checker.png")).unwrap();

    assert_eq!(model.texture_cache().len(), 1);
    assert_eq!(backend.texture_upload_count(), 1);
    let mesh = model.mesh(0).unwrap();
    assert!(Rc::ptr_eq(
        &mesh.textures.get(3).unwrap().texture,
        &mesh.textures.get(4).unwrap().texture
    ));
    assert_eq!(mesh.material.tex_count, 2);
    assert_eq!(mesh.state.bound[3], mesh.state.bound[4]);
    assert!(mesh.state.bound[3].is_some());
}

#[test]
fn out_of_range_unit_is_rejected_and_slots_stay() {
    let (backend, mut model) = loaded("triangle.obj");
    let result = model.add_texture(MAX_TEXTURE_UNITS, fixture("checker.png"));

    assert!(matches!(
        result,
        Err(TextureError::UnitOutOfRange { unit, .. }) if unit == MAX_TEXTURE_UNITS
    ));
    assert!(model.mesh(0).unwrap().textures.is_empty());
    assert_eq!(backend.texture_upload_count(), 0);
}

#[test]
fn failed_texture_keeps_the_previous_binding() {
    let (_, mut model) = loaded("triangle.obj");
    model.add_texture(0, fixture("checker.png")).unwrap();
    let before = Rc::clone(&model.mesh(0).unwrap().textures.get(0).unwrap().texture);

    let missing = model.add_texture(0, fixture("nope.png"));
    assert!(matches!(missing, Err(TextureError::Io { .. })));
    let corrupt = model.add_texture(0, fixture("triangle.obj"));
    assert!(matches!(corrupt, Err(TextureError::Decode { .. })));

    let after = &model.mesh(0).unwrap().textures.get(0).unwrap().texture;
    assert!(Rc::ptr_eq(&before, after));
    assert_eq!(model.texture_cache().len(), 1);
}

#[test]
fn missing_material_texture_is_skipped_by_default() {
    let (_, mut model) = file_model(ModelConfig::default());
    model.load(fixture("missing_texture.obj")).unwrap();

    let mesh = model.mesh(0).unwrap();
    assert!(mesh.textures.is_empty());
    assert_eq!(mesh.material.tex_count, 0);
    assert_eq!(mesh.material.diffuse, [0.8, 0.8, 0.8, 1.0]);
    assert!(model.texture_cache().is_empty());
}

#[test]
fn missing_material_texture_can_use_a_placeholder() {
    let config = ModelConfig::default().with_texture_failure(TextureFailurePolicy::Placeholder);
    let (_, mut model) = file_model(config);
    model.load(fixture("missing_texture.obj")).unwrap();

    let mesh = model.mesh(0).unwrap();
    let binding = mesh.textures.get(0).unwrap();
    assert_eq!(binding.texture.label, "placeholder");
    assert_eq!(binding.texture.size, (1, 1));
    assert_eq!(mesh.material.tex_count, 1);
}

#[test]
fn cube_map_is_cached_by_its_faces() {
    let (backend, mut model) = loaded("textured.obj");
    let faces: [_; 6] = std::array::from_fn(|_| fixture("checker.png"));
    model.add_cube_map_texture(5, faces.clone()).unwrap();
    model.add_cube_map_texture(6, faces).unwrap();

    // checker.png as 2D texture plus one cube map.
    assert_eq!(model.texture_cache().len(), 2);
    assert_eq!(backend.texture_upload_count(), 2);
    for mesh in model.meshes() {
        let binding = mesh.textures.get(5).unwrap();
        assert_eq!(binding.kind, TextureKind::CubeMap);
        assert_eq!(binding.texture.kind, TextureKind::CubeMap);
        assert!(Rc::ptr_eq(&binding.texture, &mesh.textures.get(6).unwrap().texture));
        assert_eq!(mesh.state.uniform.tex_kinds[1][1], TextureKind::CubeMap.code());
    }
}

#[test]
fn mismatched_cube_faces_are_rejected() {
    let (_, mut model) = loaded("triangle.obj");
    let mut faces: [_; 6] = std::array::from_fn(|_| fixture("checker.png"));
    faces[4] = fixture("wide.png");

    let result = model.add_cube_map_texture(0, faces);
    assert!(matches!(result, Err(TextureError::CubeFaceMismatch { width: 2, height: 1, .. })));
    assert!(model.mesh(0).unwrap().textures.is_empty());
    assert!(model.texture_cache().is_empty());
}

#[test]
fn set_texture_bypasses_the_cache() {
    let (backend, mut model) = loaded("textured.obj");
    let handle = Rc::new(backend.placeholder_texture(TextureKind::D2));
    model.set_texture(7, Rc::clone(&handle), TextureKind::D2).unwrap();

    assert_eq!(model.texture_cache().len(), 1);
    for mesh in model.meshes() {
        assert!(Rc::ptr_eq(&mesh.textures.get(7).unwrap().texture, &handle));
    }
    assert!(model.set_texture(8, handle, TextureKind::D2).is_err());
}

#[test]
fn clear_texture_empties_the_unit() {
    let (_, mut model) = loaded("textured.obj");
    model.clear_texture(0).unwrap();
    for mesh in model.meshes() {
        assert!(mesh.textures.get(0).is_none());
        assert_eq!(mesh.material.tex_count as usize, mesh.textures.len());
        assert_eq!(mesh.state.bound[0], None);
    }
}

#[test]
fn embedded_images_get_their_own_cache_entries() {
    let path = fixture("embedded.gltf");
    let (backend, model) = loaded("embedded.gltf");

    let mut keys: Vec<String> = model.texture_cache().keys().map(String::from).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![format!("{}#0", path.display()), format!("{}#1#normal", path.display())]
    );
    assert_eq!(backend.texture_upload_count(), 2);

    let mesh = model.mesh(0).unwrap();
    let diffuse = &mesh.textures.get(0).unwrap().texture;
    let normal = &mesh.textures.get(NORMAL_MAP_UNIT).unwrap().texture;
    assert_eq!(diffuse.size, (2, 1));
    assert!(!diffuse.is_normal_map);
    assert!(normal.is_normal_map);
}

#[test]
fn normal_maps_are_uploaded_apart_from_color_textures() {
    let (backend, model) = loaded("normal_mapped.obj");

    // checker.png backs both the diffuse and the bump map.
    assert_eq!(model.texture_cache().len(), 2);
    assert_eq!(backend.texture_upload_count(), 2);
    let mesh = model.mesh(0).unwrap();
    let diffuse = &mesh.textures.get(0).unwrap().texture;
    let normal = &mesh.textures.get(NORMAL_MAP_UNIT).unwrap().texture;
    assert!(!Rc::ptr_eq(diffuse, normal));
    assert!(!diffuse.is_normal_map);
    assert!(normal.is_normal_map);
}

#[test]
fn add_texture_on_the_normal_unit_uploads_a_normal_map() {
    let (backend, mut model) = loaded("triangle.obj");
    model.add_texture(0, fixture("checker.png")).unwrap();
    model.add_texture(NORMAL_MAP_UNIT, fixture("checker.png")).unwrap();

    assert_eq!(backend.texture_upload_count(), 2);
    let mesh = model.mesh(0).unwrap();
    assert!(!mesh.textures.get(0).unwrap().texture.is_normal_map);
    assert!(mesh.textures.get(NORMAL_MAP_UNIT).unwrap().texture.is_normal_map);
}

#[test]
fn percent_encoded_image_uri_is_loaded() {
    let (_, model) = loaded("spaced_uri.gltf");
    let key = fixture("checker tex.png").to_string_lossy().into_owned();
    assert!(model.texture_cache().contains(&key));

    let mesh = model.mesh(0).unwrap();
    assert_eq!(mesh.textures.get(0).unwrap().texture.size, (2, 2));
    assert!(mesh.state.bound[0].is_some());
}
