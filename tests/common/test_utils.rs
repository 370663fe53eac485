use std::{
    cell::{Cell, RefCell},
    path::{Path, PathBuf},
    rc::Rc,
};

use image::RgbaImage;
use resmodel::{
    backend::GpuBackend,
    data_structures::{
        material::MaterialUniform,
        mesh::{MeshGeometry, RenderMesh, TextureKind, TextureSlots, Topology, MAX_TEXTURE_UNITS},
    },
    error::{GpuError, ImportError},
    importer::{FormatImporter, ImportOptions, ImportedScene, SceneImporter},
    Model, ModelConfig,
};

/// Ids of GPU objects in the order they were dropped.
pub type Released = Rc<RefCell<Vec<u32>>>;

#[derive(Debug)]
pub struct FakeVertexArray {
    pub id: u32,
    pub geometry: MeshGeometry,
    released: Released,
}

impl Drop for FakeVertexArray {
    fn drop(&mut self) {
        self.released.borrow_mut().push(self.id);
    }
}

#[derive(Debug)]
pub struct FakeTexture {
    pub id: u32,
    pub label: String,
    pub size: (u32, u32),
    pub kind: TextureKind,
    pub is_normal_map: bool,
    released: Released,
}

impl Drop for FakeTexture {
    fn drop(&mut self) {
        self.released.borrow_mut().push(self.id);
    }
}

#[derive(Debug)]
pub struct FakeMeshState {
    pub id: u32,
    pub uniform: MaterialUniform,
    /// Texture ids per unit as last pushed to the state.
    pub bound: [Option<u32>; MAX_TEXTURE_UNITS],
    /// Uniform writes since creation.
    pub updates: u32,
    /// Texture rebinds since creation.
    pub rebinds: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub mesh: String,
    pub topology: Topology,
    pub element_count: u32,
    pub indexed: bool,
    pub state: u32,
}

/// A `GpuBackend` that keeps CPU copies of everything it is asked to
/// create and records draws into a `Vec`.
pub struct RecordingBackend {
    next_id: Cell<u32>,
    released: Released,
    pub mesh_uploads: RefCell<Vec<String>>,
    pub texture_uploads: RefCell<Vec<String>>,
    unsupported: Vec<Topology>,
}

impl RecordingBackend {
    /// Supports the same topologies as the `wgpu` backend.
    pub fn new() -> Self {
        Self::with_unsupported(vec![Topology::TriangleFan, Topology::TriangleListAdjacency])
    }

    pub fn with_unsupported(unsupported: Vec<Topology>) -> Self {
        Self {
            next_id: Cell::new(1),
            released: Rc::new(RefCell::new(Vec::new())),
            mesh_uploads: RefCell::new(Vec::new()),
            texture_uploads: RefCell::new(Vec::new()),
            unsupported,
        }
    }

    pub fn released(&self) -> Vec<u32> {
        self.released.borrow().clone()
    }

    pub fn texture_upload_count(&self) -> usize {
        self.texture_uploads.borrow().len()
    }

    fn next_id(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn fake_texture(&self, label: &str, size: (u32, u32), kind: TextureKind) -> FakeTexture {
        FakeTexture {
            id: self.next_id(),
            label: label.to_string(),
            size,
            kind,
            is_normal_map: false,
            released: Rc::clone(&self.released),
        }
    }

    fn bound(textures: &TextureSlots<FakeTexture>) -> [Option<u32>; MAX_TEXTURE_UNITS] {
        std::array::from_fn(|unit| textures.get(unit).map(|binding| binding.texture.id))
    }
}

impl GpuBackend for RecordingBackend {
    type VertexArray = FakeVertexArray;
    type Texture = FakeTexture;
    type MeshState = FakeMeshState;
    type Pass<'p> = Vec<DrawRecord>;

    fn upload_mesh(&self, geometry: &MeshGeometry) -> Result<FakeVertexArray, GpuError> {
        if geometry.vertices.is_empty() {
            return Err(GpuError::EmptyGeometry(geometry.label.clone()));
        }
        self.mesh_uploads.borrow_mut().push(geometry.label.clone());
        Ok(FakeVertexArray {
            id: self.next_id(),
            geometry: geometry.clone(),
            released: Rc::clone(&self.released),
        })
    }

    fn upload_texture(
        &self,
        image: &RgbaImage,
        label: &str,
        is_normal_map: bool,
    ) -> Result<FakeTexture, GpuError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(GpuError::EmptyTexture(label.to_string()));
        }
        self.texture_uploads.borrow_mut().push(label.to_string());
        let mut texture = self.fake_texture(label, image.dimensions(), TextureKind::D2);
        texture.is_normal_map = is_normal_map;
        Ok(texture)
    }

    fn upload_cube_map(&self, faces: &[RgbaImage; 6], label: &str) -> Result<FakeTexture, GpuError> {
        self.texture_uploads.borrow_mut().push(label.to_string());
        Ok(self.fake_texture(label, faces[0].dimensions(), TextureKind::CubeMap))
    }

    fn placeholder_texture(&self, kind: TextureKind) -> FakeTexture {
        self.fake_texture("placeholder", (1, 1), kind)
    }

    fn create_mesh_state(
        &self,
        _label: &str,
        uniform: &MaterialUniform,
        textures: &TextureSlots<FakeTexture>,
    ) -> FakeMeshState {
        FakeMeshState {
            id: self.next_id(),
            uniform: *uniform,
            bound: Self::bound(textures),
            updates: 0,
            rebinds: 0,
        }
    }

    fn update_mesh_uniform(&self, state: &mut FakeMeshState, uniform: &MaterialUniform) {
        state.uniform = *uniform;
        state.updates += 1;
    }

    fn update_mesh_textures(&self, state: &mut FakeMeshState, textures: &TextureSlots<FakeTexture>) {
        state.bound = Self::bound(textures);
        state.rebinds += 1;
    }

    fn supports(&self, topology: Topology) -> bool {
        !self.unsupported.contains(&topology)
    }

    fn draw_mesh(&self, pass: &mut Vec<DrawRecord>, mesh: &RenderMesh<Self>) {
        pass.push(DrawRecord {
            mesh: mesh.name.clone(),
            topology: mesh.topology,
            element_count: mesh.element_count,
            indexed: mesh.has_indices,
            state: mesh.state.id,
        });
    }
}

/// Hands out a prepared scene, or `NotFound` when it has none.
pub struct StaticImporter {
    scene: Option<ImportedScene>,
    pub calls: Cell<u32>,
}

impl StaticImporter {
    pub fn new(scene: ImportedScene) -> Self {
        Self {
            scene: Some(scene),
            calls: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            scene: None,
            calls: Cell::new(0),
        }
    }
}

impl SceneImporter for StaticImporter {
    fn import(&self, path: &Path, options: &ImportOptions) -> Result<ImportedScene, ImportError> {
        self.calls.set(self.calls.get() + 1);
        let mut scene = self
            .scene
            .clone()
            .ok_or_else(|| ImportError::NotFound(path.to_path_buf()))?;
        resmodel::importer::postprocess::run(&mut scene, options)?;
        Ok(scene)
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

pub fn fixture(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// A model reading files through `FormatImporter`.
pub fn file_model(config: ModelConfig) -> (Rc<RecordingBackend>, Model<RecordingBackend>) {
    init_logger();
    let backend = Rc::new(RecordingBackend::new());
    let model = Model::new(Rc::clone(&backend), Rc::new(FormatImporter), config);
    (backend, model)
}

/// A model backed by `importer` instead of real files.
pub fn scene_model(importer: StaticImporter) -> (Rc<RecordingBackend>, Model<RecordingBackend>) {
    init_logger();
    let backend = Rc::new(RecordingBackend::new());
    let model = Model::new(Rc::clone(&backend), Rc::new(importer), ModelConfig::default());
    (backend, model)
}

/// Loads a fixture through `FormatImporter`, panicking on failure.
pub fn loaded(name: &str) -> (Rc<RecordingBackend>, Model<RecordingBackend>) {
    let (backend, mut model) = file_model(ModelConfig::default());
    model.load(fixture(name)).unwrap();
    (backend, model)
}
