use resmodel::{
    data_structures::material::{MaterialColor, MaterialSemantic},
    importer::{ImportedMaterial, ImportedMesh, ImportedScene},
    DEFAULT_SHININESS,
};

use crate::common::test_utils::{fixture, loaded, scene_model, StaticImporter};

mod common;

#[test]
fn should_import_mtl_properties() {
    let (_, model) = loaded("textured.obj");

    let checker = model.mesh(0).unwrap().material;
    assert_eq!(checker.ambient, [0.1, 0.1, 0.1, 1.0]);
    // `d 0.5` becomes the diffuse alpha.
    assert_eq!(checker.diffuse, [1.0, 1.0, 1.0, 0.5]);
    assert_eq!(checker.specular, [0.5, 0.5, 0.5, 1.0]);
    assert_eq!(checker.shininess, 32.0);

    let glossy = model.mesh(1).unwrap().material;
    assert_eq!(glossy.diffuse, [0.2, 0.4, 0.6, 1.0]);
    // No Ka in the MTL, the default stays.
    assert_eq!(glossy.ambient, [0.0, 0.0, 0.0, 1.0]);
    assert_eq!(glossy.shininess, 96.0);
}

#[test]
fn set_color_applies_to_every_mesh() {
    let (_, mut model) = loaded("textured.obj");
    let red = [1.0, 0.0, 0.0, 1.0];
    model.set_color(MaterialSemantic::Diffuse, red);

    for mesh in model.meshes() {
        assert_eq!(mesh.material.diffuse, red);
        assert_eq!(mesh.state.uniform.diffuse, red);
        assert_eq!(mesh.state.updates, 1);
    }
}

#[test]
fn color_changes_keep_texture_bindings() {
    let (_, mut model) = loaded("textured.obj");
    model.set_color(MaterialSemantic::Specular, [0.3, 0.3, 0.3, 1.0]);
    model.set_shininess(12.0);
    for mesh in model.meshes() {
        assert_eq!(mesh.state.updates, 2);
        assert_eq!(mesh.state.rebinds, 0);
    }

    model.add_texture(3, fixture("checker.png")).unwrap();
    for mesh in model.meshes() {
        assert_eq!(mesh.state.updates, 3);
        assert_eq!(mesh.state.rebinds, 1);
    }
}

#[test]
fn set_mesh_color_only_touches_one_mesh() {
    let (_, mut model) = loaded("textured.obj");
    let before = model.mesh(0).unwrap().material;
    let green = [0.0, 1.0, 0.0, 1.0];
    model.set_mesh_color(1, MaterialSemantic::Emissive, green);

    assert_eq!(model.mesh(1).unwrap().material.emissive, green);
    assert_eq!(model.mesh(1).unwrap().state.uniform.emissive, green);
    assert_eq!(model.mesh(0).unwrap().material, before);
    assert_eq!(model.mesh(0).unwrap().state.updates, 0);
}

#[test]
#[should_panic(expected = "out of range")]
fn set_mesh_color_panics_on_bad_index() {
    let (_, mut model) = loaded("triangle.obj");
    model.set_mesh_color(5, MaterialSemantic::Ambient, [1.0; 4]);
}

#[test]
fn preset_overwrites_colors_and_shininess() {
    let (_, mut model) = loaded("textured.obj");
    model.set_material_color(MaterialColor::Ruby);

    for mesh in model.meshes() {
        assert_eq!(mesh.material.ambient, [0.1745, 0.01175, 0.01175, 1.0]);
        assert_eq!(mesh.material.diffuse, [0.61424, 0.04136, 0.04136, 1.0]);
        assert_eq!(mesh.material.specular, [0.727811, 0.626959, 0.626959, 1.0]);
        assert_eq!(mesh.material.emissive, [0.0, 0.0, 0.0, 1.0]);
        assert!((mesh.material.shininess - 76.8).abs() < 1e-4);
        // Texture bindings survive a preset.
        assert_eq!(mesh.material.tex_count as usize, mesh.textures.len());
        assert_eq!(mesh.state.uniform.shininess, mesh.material.shininess);
    }
}

#[test]
fn every_preset_is_opaque() {
    let (_, mut model) = loaded("triangle.obj");
    for preset in MaterialColor::ALL {
        model.set_material_color(preset);
        let material = model.mesh(0).unwrap().material;
        assert_eq!(material.diffuse[3], 1.0, "{preset:?}");
        assert!(material.shininess > 0.0 && material.shininess <= 128.0, "{preset:?}");
    }
}

#[test]
fn set_shininess_applies_to_every_mesh() {
    let (_, mut model) = loaded("textured.obj");
    model.set_shininess(4.0);
    assert!(model.meshes().iter().all(|mesh| mesh.material.shininess == 4.0));
}

#[test]
fn meshes_without_material_use_defaults() {
    let mut materials = vec![ImportedMaterial {
        name: "half".to_string(),
        specular: Some([0.3, 0.3, 0.3, 1.0]),
        ..Default::default()
    }];
    materials[0].shininess = Some(12.0);
    let with_material = ImportedMesh {
        positions: vec![[0.0; 3]; 3],
        material: Some(0),
        ..Default::default()
    };
    let dangling = ImportedMesh {
        positions: vec![[0.0; 3]; 3],
        material: Some(9),
        ..Default::default()
    };
    let scene = ImportedScene::with_single_root(vec![with_material, dangling], materials);
    let (_, mut model) = scene_model(StaticImporter::new(scene));
    model.load("scene").unwrap();

    let first = model.mesh(0).unwrap().material;
    assert_eq!(first.specular, [0.3, 0.3, 0.3, 1.0]);
    assert_eq!(first.shininess, 12.0);
    assert_eq!(first.diffuse, [0.0, 0.0, 0.0, 1.0]);

    let second = model.mesh(1).unwrap().material;
    assert_eq!(second.shininess, DEFAULT_SHININESS);
    assert_eq!(second.specular, [0.0, 0.0, 0.0, 1.0]);
}
