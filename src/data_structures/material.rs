//! Material colors, presets and their GPU uniform layout.

use cgmath::{Matrix, SquareMatrix};

use crate::{data_structures::mesh::MAX_TEXTURE_UNITS, importer::ImportedMaterial};

/// Shininess used when a model does not specify one.
pub const DEFAULT_SHININESS: f32 = 128.0;

const OPAQUE_BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// A color channel of a [`Material`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialSemantic {
    Ambient,
    Diffuse,
    Specular,
    Emissive,
}

/// Phong style material of one mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emissive: [f32; 4],
    pub shininess: f32,
    pub tex_count: u32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: OPAQUE_BLACK,
            diffuse: OPAQUE_BLACK,
            specular: OPAQUE_BLACK,
            emissive: OPAQUE_BLACK,
            shininess: DEFAULT_SHININESS,
            tex_count: 0,
        }
    }
}

impl Material {
    /// Copies the properties an imported material defines, everything
    /// else keeps its default. An opacity becomes the diffuse alpha.
    pub fn from_imported(imported: &ImportedMaterial) -> Self {
        let mut material = Self::default();
        if let Some(ambient) = imported.ambient {
            material.ambient = ambient;
        }
        if let Some(diffuse) = imported.diffuse {
            material.diffuse = diffuse;
        }
        if let Some(specular) = imported.specular {
            material.specular = specular;
        }
        if let Some(emissive) = imported.emissive {
            material.emissive = emissive;
        }
        if let Some(shininess) = imported.shininess {
            material.shininess = shininess;
        }
        if let Some(opacity) = imported.opacity {
            material.diffuse[3] = opacity;
        }
        material
    }

    pub fn color(&self, semantic: MaterialSemantic) -> [f32; 4] {
        match semantic {
            MaterialSemantic::Ambient => self.ambient,
            MaterialSemantic::Diffuse => self.diffuse,
            MaterialSemantic::Specular => self.specular,
            MaterialSemantic::Emissive => self.emissive,
        }
    }

    pub fn set_color(&mut self, semantic: MaterialSemantic, values: [f32; 4]) {
        match semantic {
            MaterialSemantic::Ambient => self.ambient = values,
            MaterialSemantic::Diffuse => self.diffuse = values,
            MaterialSemantic::Specular => self.specular = values,
            MaterialSemantic::Emissive => self.emissive = values,
        }
    }

    /// Overwrites all colors and the shininess with a preset. The texture
    /// count is left alone.
    pub fn apply_preset(&mut self, preset: MaterialColor) {
        let (ambient, diffuse, specular, shine) = preset.properties();
        self.ambient = [ambient[0], ambient[1], ambient[2], 1.0];
        self.diffuse = [diffuse[0], diffuse[1], diffuse[2], 1.0];
        self.specular = [specular[0], specular[1], specular[2], 1.0];
        self.emissive = OPAQUE_BLACK;
        self.shininess = shine * 128.0;
    }
}

/// Named material presets (the classic "teapots" table).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialColor {
    Emerald,
    Jade,
    Obsidian,
    Pearl,
    Ruby,
    Turquoise,
    Brass,
    Bronze,
    Chrome,
    Copper,
    Gold,
    Silver,
    BlackPlastic,
    CyanPlastic,
    GreenPlastic,
    RedPlastic,
    WhitePlastic,
    YellowPlastic,
    BlackRubber,
    CyanRubber,
    GreenRubber,
    RedRubber,
    WhiteRubber,
    YellowRubber,
}

type Rgb = [f32; 3];

impl MaterialColor {
    pub const ALL: [MaterialColor; 24] = [
        MaterialColor::Emerald,
        MaterialColor::Jade,
        MaterialColor::Obsidian,
        MaterialColor::Pearl,
        MaterialColor::Ruby,
        MaterialColor::Turquoise,
        MaterialColor::Brass,
        MaterialColor::Bronze,
        MaterialColor::Chrome,
        MaterialColor::Copper,
        MaterialColor::Gold,
        MaterialColor::Silver,
        MaterialColor::BlackPlastic,
        MaterialColor::CyanPlastic,
        MaterialColor::GreenPlastic,
        MaterialColor::RedPlastic,
        MaterialColor::WhitePlastic,
        MaterialColor::YellowPlastic,
        MaterialColor::BlackRubber,
        MaterialColor::CyanRubber,
        MaterialColor::GreenRubber,
        MaterialColor::RedRubber,
        MaterialColor::WhiteRubber,
        MaterialColor::YellowRubber,
    ];

    /// Ambient, diffuse and specular RGB plus shininess in `0..=1`.
    fn properties(self) -> (Rgb, Rgb, Rgb, f32) {
        use MaterialColor::*;
        match self {
            Emerald => ([0.0215, 0.1745, 0.0215], [0.07568, 0.61424, 0.07568], [0.633, 0.727811, 0.633], 0.6),
            Jade => ([0.135, 0.2225, 0.1575], [0.54, 0.89, 0.63], [0.316228, 0.316228, 0.316228], 0.1),
            Obsidian => ([0.05375, 0.05, 0.06625], [0.18275, 0.17, 0.22525], [0.332741, 0.328634, 0.346435], 0.3),
            Pearl => ([0.25, 0.20725, 0.20725], [1.0, 0.829, 0.829], [0.296648, 0.296648, 0.296648], 0.088),
            Ruby => ([0.1745, 0.01175, 0.01175], [0.61424, 0.04136, 0.04136], [0.727811, 0.626959, 0.626959], 0.6),
            Turquoise => ([0.1, 0.18725, 0.1745], [0.396, 0.74151, 0.69102], [0.297254, 0.30829, 0.306678], 0.1),
            Brass => ([0.329412, 0.223529, 0.027451], [0.780392, 0.568627, 0.113725], [0.992157, 0.941176, 0.807843], 0.21794872),
            Bronze => ([0.2125, 0.1275, 0.054], [0.714, 0.4284, 0.18144], [0.393548, 0.271906, 0.166721], 0.2),
            Chrome => ([0.25, 0.25, 0.25], [0.4, 0.4, 0.4], [0.774597, 0.774597, 0.774597], 0.6),
            Copper => ([0.19125, 0.0735, 0.0225], [0.7038, 0.27048, 0.0828], [0.256777, 0.137622, 0.086014], 0.1),
            Gold => ([0.24725, 0.1995, 0.0745], [0.75164, 0.60648, 0.22648], [0.628281, 0.555802, 0.366065], 0.4),
            Silver => ([0.19225, 0.19225, 0.19225], [0.50754, 0.50754, 0.50754], [0.508273, 0.508273, 0.508273], 0.4),
            BlackPlastic => ([0.0, 0.0, 0.0], [0.01, 0.01, 0.01], [0.5, 0.5, 0.5], 0.25),
            CyanPlastic => ([0.0, 0.1, 0.06], [0.0, 0.50980392, 0.50980392], [0.50196078, 0.50196078, 0.50196078], 0.25),
            GreenPlastic => ([0.0, 0.0, 0.0], [0.1, 0.35, 0.1], [0.45, 0.55, 0.45], 0.25),
            RedPlastic => ([0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [0.7, 0.6, 0.6], 0.25),
            WhitePlastic => ([0.0, 0.0, 0.0], [0.55, 0.55, 0.55], [0.7, 0.7, 0.7], 0.25),
            YellowPlastic => ([0.0, 0.0, 0.0], [0.5, 0.5, 0.0], [0.6, 0.6, 0.5], 0.25),
            BlackRubber => ([0.02, 0.02, 0.02], [0.01, 0.01, 0.01], [0.4, 0.4, 0.4], 0.078125),
            CyanRubber => ([0.0, 0.05, 0.05], [0.4, 0.5, 0.5], [0.04, 0.7, 0.7], 0.078125),
            GreenRubber => ([0.0, 0.05, 0.0], [0.4, 0.5, 0.4], [0.04, 0.7, 0.04], 0.078125),
            RedRubber => ([0.05, 0.0, 0.0], [0.5, 0.4, 0.4], [0.7, 0.04, 0.04], 0.078125),
            WhiteRubber => ([0.05, 0.05, 0.05], [0.5, 0.5, 0.5], [0.7, 0.7, 0.7], 0.078125),
            YellowRubber => ([0.05, 0.05, 0.0], [0.5, 0.5, 0.4], [0.7, 0.7, 0.04], 0.078125),
        }
    }
}

/// Per-mesh uniform block: transforms, material and texture unit kinds.
///
/// Laid out for WGSL uniform rules, see `pipelines/model.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emissive: [f32; 4],
    pub shininess: f32,
    pub tex_count: u32,
    pub _padding: [u32; 2],
    pub tex_kinds: [[u32; 4]; MAX_TEXTURE_UNITS / 4],
}

impl MaterialUniform {
    pub fn new(
        material: &Material,
        transform: &cgmath::Matrix4<f32>,
        kinds: [u32; MAX_TEXTURE_UNITS],
    ) -> Self {
        // Falls back to the model matrix for singular transforms.
        let normal = transform
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or(*transform);
        let mut tex_kinds = [[0; 4]; MAX_TEXTURE_UNITS / 4];
        for (unit, kind) in kinds.into_iter().enumerate() {
            tex_kinds[unit / 4][unit % 4] = kind;
        }

        Self {
            model: (*transform).into(),
            normal: normal.into(),
            ambient: material.ambient,
            diffuse: material.diffuse,
            specular: material.specular,
            emissive: material.emissive,
            shininess: material.shininess,
            tex_count: material.tex_count,
            _padding: [0; 2],
            tex_kinds,
        }
    }
}
