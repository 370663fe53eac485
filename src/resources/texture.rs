use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::TextureError;

pub fn load_binary(path: &Path) -> Result<Vec<u8>, TextureError> {
    std::fs::read(path).map_err(|source| TextureError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads and decodes an image file into RGBA8. The format is guessed from
/// the file contents, not the extension.
pub fn load_image(path: &Path) -> Result<RgbaImage, TextureError> {
    let data = load_binary(path)?;
    let img = image::load_from_memory(&data).map_err(|source| TextureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgba8())
}

/// Loads the six faces of a cube map, ordered +X, -X, +Y, -Y, +Z, -Z.
///
/// Faces must be square and share the size of the first face.
pub fn load_cube_faces(paths: &[PathBuf; 6]) -> Result<[RgbaImage; 6], TextureError> {
    let [px, nx, py, ny, pz, nz] = paths;
    let faces = [
        load_image(px)?,
        load_image(nx)?,
        load_image(py)?,
        load_image(ny)?,
        load_image(pz)?,
        load_image(nz)?,
    ];

    let (size, _) = faces[0].dimensions();
    for (face, path) in faces.iter().zip(paths) {
        let (width, height) = face.dimensions();
        if width != height || width != size {
            return Err(TextureError::CubeFaceMismatch {
                path: path.clone(),
                width,
                height,
            });
        }
    }
    Ok(faces)
}

/// Cache key of a cube map built from `paths`.
pub fn cube_map_key(paths: &[PathBuf; 6]) -> String {
    paths
        .iter()
        .map(|path| path.to_string_lossy())
        .collect::<Vec<_>>()
        .join("|")
}
