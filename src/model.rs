//! The model resource: a loaded scene ready to draw.
//!
//! A [`Model`] asks its importer for an [`ImportedScene`], uploads every
//! mesh through its [`GpuBackend`], resolves material textures through a
//! [`TextureCache`] and flattens the node tree into one transform per
//! mesh. Afterwards materials and texture units can be changed for the
//! whole model or for single meshes.

use std::{
    cell::{Ref, RefCell},
    collections::HashSet,
    path::{Path, PathBuf},
    rc::Rc,
};

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    backend::GpuBackend,
    cache::TextureCache,
    config::{ModelConfig, TextureFailurePolicy},
    data_structures::{
        bounds::BoundingBox,
        material::{Material, MaterialColor, MaterialSemantic},
        mesh::{
            check_unit, MeshGeometry, RenderMesh, TextureBinding, TextureKind, TextureSlots,
            NORMAL_MAP_UNIT,
        },
    },
    error::{ModelError, TextureError},
    importer::{ImportedMaterial, ImportedScene, SceneImporter, TextureSource},
    resources::texture::{cube_map_key, load_cube_faces, load_image},
};

/// A model file loaded onto the GPU.
///
/// Cloning is cheap: clones share vertex arrays, textures and the texture
/// cache, but own their materials, transforms and texture unit
/// assignments. A clone that loads another file starts a cache of its own.
/// GPU objects are released when the last clone holding them is dropped.
pub struct Model<B: GpuBackend> {
    backend: Rc<B>,
    importer: Rc<dyn SceneImporter>,
    config: ModelConfig,
    meshes: Vec<RenderMesh<B>>,
    textures: Rc<RefCell<TextureCache<B::Texture>>>,
    bounding_box: Option<BoundingBox>,
    source: Option<PathBuf>,
}

impl<B: GpuBackend> Model<B> {
    /// An empty model. Nothing is imported until [`load`](Self::load).
    pub fn new(backend: Rc<B>, importer: Rc<dyn SceneImporter>, config: ModelConfig) -> Self {
        Self {
            backend,
            importer,
            config,
            meshes: Vec::new(),
            textures: Rc::default(),
            bounding_box: None,
            source: None,
        }
    }

    /// Imports `path` and replaces the current contents with it.
    ///
    /// Previous meshes and cached textures are dropped first, so after a
    /// failed load the model is empty. Texture failures do not fail the
    /// load; they are handled according to
    /// [`ModelConfig::texture_failure`].
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        self.clear();
        let path = self.config.resolve(path.as_ref());
        log::debug!("Loading model {:?}", path);

        if let Err(e) = self.try_load(&path) {
            log::error!("Failed to load model {:?}: {}", path, e);
            self.clear();
            return Err(e);
        }
        log::info!(
            "Loaded model {:?}: {} meshes, {} textures",
            path,
            self.meshes.len(),
            self.textures.borrow().len()
        );
        self.source = Some(path);
        Ok(())
    }

    fn try_load(&mut self, path: &Path) -> Result<(), ModelError> {
        let scene = self.importer.import(path, &self.config.import)?;
        let transforms = mesh_transforms(&scene);

        let mut unsupported = HashSet::new();
        let mut meshes = Vec::with_capacity(scene.meshes.len());
        for (index, imported) in scene.meshes.iter().enumerate() {
            let imported_material = scene.material_of(imported);
            let material = imported_material
                .map(Material::from_imported)
                .unwrap_or_default();
            let textures = match imported_material {
                Some(imported_material) => self.material_textures(imported_material),
                None => TextureSlots::new(),
            };

            let label = if imported.name.is_empty() {
                format!("{} mesh {}", self.config.label, index)
            } else {
                format!("{} {}", self.config.label, imported.name)
            };
            let geometry = MeshGeometry::from_imported(imported, &label);
            if !self.backend.supports(geometry.topology) && unsupported.insert(geometry.topology) {
                log::warn!(
                    "{:?} meshes in {:?} cannot be drawn by this backend and will be skipped",
                    geometry.topology,
                    path
                );
            }

            let mesh = RenderMesh::new(
                &*self.backend,
                &geometry,
                material,
                textures,
                transforms[index],
            )
            .map_err(|source| ModelError::Gpu {
                mesh: index,
                source,
            })?;
            log::debug!(
                "Mesh '{}': {} elements, {:?}, {} textures",
                mesh.name,
                mesh.element_count,
                mesh.topology,
                mesh.textures.len()
            );
            meshes.push(mesh);
        }

        self.bounding_box = scene
            .meshes
            .iter()
            .zip(&transforms)
            .filter_map(|(mesh, transform)| BoundingBox::from_points(&mesh.positions, transform))
            .reduce(|bounds, other| bounds.union(&other));
        self.meshes = meshes;
        Ok(())
    }

    /// Drops all meshes and detaches from the texture cache shared with
    /// clones.
    fn clear(&mut self) {
        self.meshes.clear();
        self.textures = Rc::default();
        self.bounding_box = None;
        self.source = None;
    }

    fn material_textures(&self, material: &ImportedMaterial) -> TextureSlots<B::Texture> {
        let mut slots = TextureSlots::new();
        for (unit, source) in material.textures() {
            let Some(source) = source else {
                continue;
            };
            let texture = match self.texture_from_source(source, unit == NORMAL_MAP_UNIT) {
                Ok(texture) => texture,
                Err(e) => match self.config.texture_failure {
                    TextureFailurePolicy::Skip => {
                        log::warn!(
                            "Skipping texture unit {} of material '{}': {}",
                            unit,
                            material.name,
                            e
                        );
                        continue;
                    }
                    TextureFailurePolicy::Placeholder => {
                        log::warn!(
                            "Using a placeholder for texture unit {} of material '{}': {}",
                            unit,
                            material.name,
                            e
                        );
                        self.placeholder(TextureKind::D2)
                    }
                },
            };
            let binding = TextureBinding {
                texture,
                kind: TextureKind::D2,
            };
            if let Err(e) = slots.set(unit, binding) {
                log::warn!("Ignoring texture of material '{}': {}", material.name, e);
            }
        }
        slots
    }

    fn texture_from_source(
        &self,
        source: &TextureSource,
        is_normal_map: bool,
    ) -> Result<Rc<B::Texture>, TextureError> {
        let key = source.cache_key(is_normal_map);
        self.textures
            .borrow_mut()
            .get_or_try_insert_with(&key, || -> Result<B::Texture, TextureError> {
                match source {
                    TextureSource::File(path) => {
                        let image = load_image(path)?;
                        Ok(self.backend.upload_texture(&image, &key, is_normal_map)?)
                    }
                    TextureSource::Embedded { image, .. } => {
                        Ok(self.backend.upload_texture(image, &key, is_normal_map)?)
                    }
                }
            })
    }

    fn placeholder(&self, kind: TextureKind) -> Rc<B::Texture> {
        let key = match kind {
            TextureKind::D2 => "#placeholder",
            TextureKind::CubeMap => "#placeholder-cube",
        };
        let mut textures = self.textures.borrow_mut();
        match textures.get(key) {
            Some(texture) => texture,
            None => textures.insert(key, self.backend.placeholder_texture(kind)),
        }
    }

    /// Draws every mesh whose topology the backend supports.
    pub fn render(&self, pass: &mut B::Pass<'_>) {
        for mesh in &self.meshes {
            if self.backend.supports(mesh.topology) {
                self.backend.draw_mesh(pass, mesh);
            } else {
                log::trace!("Skipping '{}', {:?} is not drawable", mesh.name, mesh.topology);
            }
        }
    }

    /// Applies a material preset to every mesh.
    pub fn set_material_color(&mut self, preset: MaterialColor) {
        for mesh in &mut self.meshes {
            mesh.material.apply_preset(preset);
            mesh.sync(&self.backend);
        }
    }

    /// Sets one color channel on every mesh.
    pub fn set_color(&mut self, semantic: MaterialSemantic, values: [f32; 4]) {
        for mesh in &mut self.meshes {
            mesh.material.set_color(semantic, values);
            mesh.sync(&self.backend);
        }
    }

    /// Sets one color channel on a single mesh.
    ///
    /// # Panics
    ///
    /// Panics if `mesh` is not a valid mesh index.
    pub fn set_mesh_color(&mut self, mesh: usize, semantic: MaterialSemantic, values: [f32; 4]) {
        let count = self.meshes.len();
        let Some(target) = self.meshes.get_mut(mesh) else {
            panic!("mesh index {mesh} is out of range for a model with {count} meshes");
        };
        target.material.set_color(semantic, values);
        target.sync(&self.backend);
    }

    /// Sets the specular exponent of every mesh.
    pub fn set_shininess(&mut self, shininess: f32) {
        for mesh in &mut self.meshes {
            mesh.material.shininess = shininess;
            mesh.sync(&self.backend);
        }
    }

    /// Loads (or reuses) a 2D texture and binds it to `unit` on every mesh.
    /// Images bound to the normal map unit are uploaded without sRGB
    /// decoding. On error every unit keeps its previous binding.
    pub fn add_texture(&mut self, unit: usize, path: impl AsRef<Path>) -> Result<(), TextureError> {
        check_unit(unit)?;
        let path = self.config.resolve(path.as_ref());
        let texture = self.texture_from_source(&TextureSource::File(path), unit == NORMAL_MAP_UNIT)?;
        self.bind(unit, texture, TextureKind::D2)
    }

    /// Loads (or reuses) a cube map from six faces ordered +X, -X, +Y, -Y,
    /// +Z, -Z and binds it to `unit` on every mesh.
    pub fn add_cube_map_texture<P: AsRef<Path>>(
        &mut self,
        unit: usize,
        faces: [P; 6],
    ) -> Result<(), TextureError> {
        check_unit(unit)?;
        let paths = faces.map(|face| self.config.resolve(face.as_ref()));
        let key = cube_map_key(&paths);
        let texture = self
            .textures
            .borrow_mut()
            .get_or_try_insert_with(&key, || -> Result<B::Texture, TextureError> {
                let faces = load_cube_faces(&paths)?;
                Ok(self.backend.upload_cube_map(&faces, &key)?)
            })?;
        self.bind(unit, texture, TextureKind::CubeMap)
    }

    /// Binds a caller-owned texture to `unit` on every mesh. The texture
    /// does not enter the cache.
    pub fn set_texture(
        &mut self,
        unit: usize,
        texture: Rc<B::Texture>,
        kind: TextureKind,
    ) -> Result<(), TextureError> {
        check_unit(unit)?;
        self.bind(unit, texture, kind)
    }

    /// Empties `unit` on every mesh.
    pub fn clear_texture(&mut self, unit: usize) -> Result<(), TextureError> {
        check_unit(unit)?;
        for mesh in &mut self.meshes {
            if mesh.textures.clear(unit).is_some() {
                mesh.sync(&self.backend);
            }
        }
        Ok(())
    }

    fn bind(
        &mut self,
        unit: usize,
        texture: Rc<B::Texture>,
        kind: TextureKind,
    ) -> Result<(), TextureError> {
        let binding = TextureBinding { texture, kind };
        for mesh in &mut self.meshes {
            mesh.textures.set(unit, binding.clone())?;
            mesh.sync(&self.backend);
        }
        Ok(())
    }

    /// Pushes the state of every mesh to the GPU, needed after editing
    /// meshes through [`meshes_mut`](Self::meshes_mut).
    pub fn sync(&mut self) {
        for mesh in &mut self.meshes {
            mesh.sync(&self.backend);
        }
    }

    /// Meshes in import order, empty until a load succeeds.
    pub fn meshes(&self) -> &[RenderMesh<B>] {
        &self.meshes
    }

    /// Direct access to the meshes. Call [`sync`](Self::sync) afterwards
    /// so the GPU sees the changes.
    pub fn meshes_mut(&mut self) -> &mut [RenderMesh<B>] {
        &mut self.meshes
    }

    /// The mesh at `index`, `None` when out of range.
    pub fn mesh(&self, index: usize) -> Option<&RenderMesh<B>> {
        self.meshes.get(index)
    }

    /// The texture cache, shared with clones of this model.
    pub fn texture_cache(&self) -> Ref<'_, TextureCache<B::Texture>> {
        self.textures.borrow()
    }

    /// Bounds of all vertices in model space, `None` before a successful
    /// load.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    /// Uniform scale that fits the model into a unit cube.
    pub fn scale_factor(&self) -> f32 {
        match self.bounding_box.map(|bounds| bounds.largest_extent()) {
            Some(extent) if extent > f32::EPSILON => 1.0 / extent,
            _ => 1.0,
        }
    }

    /// Whether the last load succeeded and produced meshes.
    pub fn is_loaded(&self) -> bool {
        !self.meshes.is_empty()
    }

    /// The resolved path of the loaded file.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Configuration the model was created with.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The backend that owns this model's GPU objects.
    pub fn backend(&self) -> &Rc<B> {
        &self.backend
    }
}

impl<B: GpuBackend> Clone for Model<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Rc::clone(&self.backend),
            importer: Rc::clone(&self.importer),
            config: self.config.clone(),
            meshes: self
                .meshes
                .iter()
                .map(|mesh| mesh.share(&self.backend))
                .collect(),
            textures: Rc::clone(&self.textures),
            bounding_box: self.bounding_box,
            source: self.source.clone(),
        }
    }
}

/// Accumulated `parent * local` transform of every mesh.
///
/// A mesh referenced by several nodes keeps the transform of the last one
/// visited, meshes no node references keep the identity.
fn mesh_transforms(scene: &ImportedScene) -> Vec<Matrix4<f32>> {
    let mut transforms = vec![Matrix4::identity(); scene.meshes.len()];
    let mut visited = vec![false; scene.nodes.len()];
    let mut stack = vec![(0, Matrix4::identity())];

    while let Some((index, parent)) = stack.pop() {
        let Some(node) = scene.nodes.get(index) else {
            log::warn!("Scene references missing node {}", index);
            continue;
        };
        if std::mem::replace(&mut visited[index], true) {
            log::warn!("Node '{}' is reachable twice, ignoring the repeat", node.name);
            continue;
        }
        let world = parent * Matrix4::from(node.transform);
        for &mesh in &node.meshes {
            match transforms.get_mut(mesh) {
                Some(transform) => *transform = world,
                None => log::warn!("Node '{}' references missing mesh {}", node.name, mesh),
            }
        }
        // Reversed so children are visited in declaration order.
        for &child in node.children.iter().rev() {
            stack.push((child, world));
        }
    }
    transforms
}
