//! Plain-text reports written next to the maps.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MapError;
use crate::extremum::ExtremumResult;
use crate::oracle::TerrainOracle;
use crate::settings::{Layer, RenderSettings};

pub const INFO_FILE: &str = "Info.txt";

/// Write `lines`, one per line, creating parent directories as needed.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<(), MapError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| MapError::Io { path, source }
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let mut text = lines.join("\n");
    text.push('\n');
    fs::write(path, text).map_err(io_error(path))
}

/// Normalization constants of the height map.
pub fn height_map_info<O: TerrainOracle + ?Sized>(oracle: &O) -> Vec<String> {
    vec![
        "HeightMap info".to_string(),
        String::new(),
        format!("Body = {}", oracle.name()),
        format!("deformity = {}", oracle.radius_delta()),
        format!("offset = {}", oracle.radius_min() - oracle.radius()),
    ]
}

/// Legend of the biome map.
pub fn biome_map_info<O: TerrainOracle + ?Sized>(oracle: &O) -> Vec<String> {
    let mut lines = vec![
        "BiomeMap info".to_string(),
        String::new(),
        format!("Body = {}", oracle.name()),
    ];
    lines.extend(
        oracle
            .biomes()
            .iter()
            .map(|biome| format!("Biome =\t{}\t{}", biome.name, biome.color)),
    );
    lines
}

/// Write the sidecars of the height and biome maps if those layers are
/// exported. Returns the files written.
pub fn write_map_info<O: TerrainOracle + ?Sized>(
    oracle: &O,
    settings: &RenderSettings,
) -> Result<Vec<PathBuf>, MapError> {
    let mut written = Vec::new();

    if settings.layers.contains(Layer::Height) {
        let path = settings.layer_folder(Layer::Height).join(INFO_FILE);
        write_lines(&path, &height_map_info(oracle))?;
        written.push(path);
    }

    if settings.layers.contains(Layer::Biome) {
        let path = settings.layer_folder(Layer::Biome).join(INFO_FILE);
        write_lines(&path, &biome_map_info(oracle))?;
        written.push(path);
    }

    Ok(written)
}

/// Lowest point block, a blank line, then the highest point block.
pub fn extremum_report(lowest: &ExtremumResult, highest: &ExtremumResult) -> Vec<String> {
    let mut lines = lowest.report_lines();
    lines.push(String::new());
    lines.extend(highest.report_lines());
    lines
}

/// `<output_root>/<body>/Info.txt`
pub fn extremum_report_path(output_root: &Path, body: &str) -> PathBuf {
    output_root.join(body).join(INFO_FILE)
}
