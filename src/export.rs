//! PNG encoding of tile layers and all-or-nothing writing of a tile's files.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, ImageFormat, RgbImage, RgbaImage};
use log::{debug, warn};

use crate::addressing::TileAddress;
use crate::color::Color;
use crate::error::MapError;
use crate::rasterize::TileBuffer;
use crate::settings::{Layer, RenderSettings};
use crate::tilemap::Tilemap;

/// Encode a layer buffer as PNG.
///
/// Buffers keep their southern row at `y = 0`; PNG rows run top down, so the
/// image is written bottom-up to keep north at the top.
pub fn encode_png(buffer: &Tilemap<Color>, alpha: bool) -> Result<Vec<u8>, image::ImageError> {
    let (w, h) = (buffer.width as u32, buffer.height as u32);
    let source_row = |y: u32| (h - 1 - y) as usize;
    let mut bytes = Cursor::new(Vec::new());

    if alpha {
        let img: RgbaImage = ImageBuffer::from_fn(w, h, |x, y| buffer.get(x as usize, source_row(y)).to_rgba8());
        img.write_to(&mut bytes, ImageFormat::Png)?;
    } else {
        let img: RgbImage = ImageBuffer::from_fn(w, h, |x, y| buffer.get(x as usize, source_row(y)).to_rgb8());
        img.write_to(&mut bytes, ImageFormat::Png)?;
    }

    Ok(bytes.into_inner())
}

/// Files produced for one tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenTile {
    pub index: usize,
    pub position: usize,
    pub files: Vec<PathBuf>,
    /// Layers left alone because their file exists and may not be replaced.
    pub skipped: Vec<Layer>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MapError + '_ {
    move |source| MapError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.partial", name))
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        if let Err(e) = fs::remove_file(temp) {
            warn!("could not remove {}: {}", temp.display(), e);
        }
    }
}

/// Write every requested layer of a tile.
///
/// All layers are first encoded into hidden files next to their targets and
/// only renamed into place once every one of them was written. On failure
/// the hidden files are removed and no file of the tile is replaced.
pub fn write_tile(tile: &TileBuffer, address: &TileAddress, settings: &RenderSettings) -> Result<WrittenTile, MapError> {
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut skipped = Vec::new();

    let result = stage_layers(tile, address, settings, &mut staged, &mut skipped);
    if let Err(e) = result {
        discard(&staged);
        return Err(e);
    }

    let mut files = Vec::with_capacity(staged.len());
    for (i, (temp, target)) in staged.iter().enumerate() {
        if let Err(source) = fs::rename(temp, target) {
            discard(&staged[i..]);
            return Err(MapError::Io {
                path: target.clone(),
                source,
            });
        }
        files.push(target.clone());
    }

    Ok(WrittenTile {
        index: address.index,
        position: address.position,
        files,
        skipped,
    })
}

fn stage_layers(
    tile: &TileBuffer,
    address: &TileAddress,
    settings: &RenderSettings,
    staged: &mut Vec<(PathBuf, PathBuf)>,
    skipped: &mut Vec<Layer>,
) -> Result<(), MapError> {
    for layer in settings.layers.iter() {
        let target = settings.layer_folder(layer).join(&address.path);
        if !settings.overwrite.contains(layer) && target.exists() {
            debug!("Keeping existing {}", target.display());
            skipped.push(layer);
            continue;
        }

        let Some(buffer) = tile.layer(layer) else {
            warn!("tile {} has no {} buffer", address.index, layer.folder());
            continue;
        };

        let bytes = encode_png(buffer, layer.has_alpha()).map_err(|source| MapError::Encode {
            layer: layer.folder(),
            tile: address.index,
            source,
        })?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        let temp = staging_path(&target);
        fs::write(&temp, bytes).map_err(io_error(&temp))?;
        staged.push((temp, target));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::TileGrid;
    use crate::oracle::FunctionBody;
    use crate::rasterize::rasterize;
    use tempfile::tempdir;

    fn ramp() -> FunctionBody<fn(f64, f64) -> f64> {
        // Rises towards the north.
        FunctionBody::new("Ramp", 1000.0, 180.0, (|lat: f64, _| lat) as fn(f64, f64) -> f64).with_radius_min(910.0)
    }

    fn settings(root: &Path, layers: &[Layer]) -> RenderSettings {
        let mut settings = RenderSettings::new("Ramp", 8, 4).with_layers(layers.iter().copied());
        settings.export_folder = root.to_path_buf();
        settings
    }

    #[test]
    fn test_png_keeps_north_on_top() {
        let mut buffer = Tilemap::new_with(2, 2, Color::BLACK);
        buffer.set(0, 1, Color::WHITE);
        let bytes = encode_png(&buffer, false).unwrap();
        let img = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 0]);
    }

    #[test]
    fn test_alpha_channel_by_layer() {
        let buffer = Tilemap::new_with(1, 1, Color::rgba(1.0, 0.0, 0.0, 0.5));
        let rgba = image::load_from_memory(&encode_png(&buffer, true).unwrap()).unwrap();
        assert_eq!(rgba.color(), image::ColorType::Rgba8);
        let rgb = image::load_from_memory(&encode_png(&buffer, false).unwrap()).unwrap();
        assert_eq!(rgb.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_write_tile_layers() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path(), &[Layer::Height, Layer::Slope]);
        let address = settings.grid.address(1, false, false, false);
        let tile = rasterize(&ramp(), 1, &settings).unwrap();

        let written = write_tile(&tile, &address, &settings).unwrap();
        assert_eq!(written.files.len(), 2);
        assert!(dir.path().join("HeightMap").join("Tile0001.png").exists());
        assert!(dir.path().join("SlopeMap").join("Tile0001.png").exists());

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("HeightMap"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_leaflet_layout() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path(), &[Layer::Color]);
        settings.grid = TileGrid::new(16, 4);
        settings.leaflet = true;
        let address = settings.grid.address(6, false, false, true);
        let tile = rasterize(&ramp(), 6, &settings).unwrap();

        write_tile(&tile, &address, &settings).unwrap();
        assert!(dir.path().join("ColorMap").join("2").join("1.png").exists());
    }

    #[test]
    fn test_existing_file_kept_without_overwrite() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path(), &[Layer::Height, Layer::Color]);
        settings.overwrite.remove(Layer::Height);
        let existing = dir.path().join("HeightMap").join("Tile0000.png");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, b"keep").unwrap();

        let address = settings.grid.address(0, false, false, false);
        let tile = rasterize(&ramp(), 0, &settings).unwrap();
        let written = write_tile(&tile, &address, &settings).unwrap();

        assert_eq!(written.skipped, vec![Layer::Height]);
        assert_eq!(fs::read(&existing).unwrap(), b"keep");
        assert!(dir.path().join("ColorMap").join("Tile0000.png").exists());
    }

    #[test]
    fn test_failed_tile_leaves_no_files() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path(), &[Layer::Height, Layer::Color]);
        // A plain file where the color map folder should be.
        fs::write(dir.path().join("ColorMap"), b"").unwrap();

        let address = settings.grid.address(0, false, false, false);
        let tile = rasterize(&ramp(), 0, &settings).unwrap();
        let err = write_tile(&tile, &address, &settings).unwrap_err();

        assert!(matches!(err, MapError::Io { .. }));
        assert!(!err.aborts_body());
        let height_dir = dir.path().join("HeightMap");
        assert_eq!(fs::read_dir(&height_dir).unwrap().count(), 0);
    }
}
