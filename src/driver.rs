//! Map passes over whole bodies, and the batch runner behind the CLI.

use std::path::PathBuf;

use log::{error, info, warn};
use rayon::prelude::*;

use crate::error::{error_chain, MapError};
use crate::export::{write_tile, WrittenTile};
use crate::extremum::{self, ExtremumKind, SearchParams};
use crate::oracle::TerrainOracle;
use crate::procedural::ProceduralBody;
use crate::rasterize::{rasterize, TileBuffer};
use crate::report;
use crate::settings::{CartographerConfig, InfoConfig, MapsConfig, RenderSettings};

/// Outcome of one map pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapSummary {
    pub body: String,
    pub tiles: Vec<WrittenTile>,
    /// Tiles whose file set could not be written.
    pub failed: Vec<usize>,
    pub info_files: Vec<PathBuf>,
}

/// Render and write every selected tile of a body.
///
/// Tiles are processed in index order. An allocation or oracle failure ends
/// the pass with an error; a tile that cannot be encoded or written is
/// logged and skipped. With `threads > 1` and a reentrant oracle, tiles are
/// rasterized in parallel batches and still written in index order.
pub fn run<O: TerrainOracle + ?Sized>(oracle: &O, settings: &RenderSettings) -> Result<MapSummary, MapError> {
    let mut summary = MapSummary {
        body: settings.body.clone(),
        ..MapSummary::default()
    };

    if settings.layers.is_empty() {
        info!("No map layers requested for {}", settings.body);
        return Ok(summary);
    }

    let grid = settings.grid;
    let selected: Vec<usize> = (0..grid.tile_count())
        .filter(|&index| settings.filter.selects(index))
        .collect();
    info!(
        "Exporting {} of {} tiles of {} ({}x{}, tile {})",
        selected.len(),
        grid.tile_count(),
        settings.body,
        grid.grid_width,
        grid.grid_width / 2,
        grid.tile_size
    );

    let pool = if settings.threads > 1 {
        if oracle.is_reentrant() {
            match rayon::ThreadPoolBuilder::new().num_threads(settings.threads).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!("Could not start {} worker threads, rendering sequentially: {}", settings.threads, e);
                    None
                }
            }
        } else {
            warn!("{} does not allow concurrent queries, rendering sequentially", oracle.name());
            None
        }
    } else {
        None
    };

    let total = selected.len();
    let mut done = 0;
    let batch = pool.as_ref().map_or(1, |_| settings.threads);

    for indices in selected.chunks(batch) {
        let tiles: Vec<Result<TileBuffer, MapError>> = match &pool {
            Some(pool) => pool.install(|| {
                indices
                    .par_iter()
                    .map(|&index| rasterize(oracle, index, settings))
                    .collect()
            }),
            None => indices.iter().map(|&index| rasterize(oracle, index, settings)).collect(),
        };

        for tile in tiles {
            let tile = tile?;
            let address = grid.address(tile.index, settings.flip_h, settings.flip_v, settings.leaflet);
            match write_tile(&tile, &address, settings) {
                Ok(written) => summary.tiles.push(written),
                Err(e) => {
                    error!("Tile {} of {} not written: {}", tile.index, settings.body, error_chain(&e));
                    summary.failed.push(tile.index);
                }
            }
            done += 1;
            info!("Exported {}/{} tiles of {}", done, total, settings.body);
        }
    }

    if !summary.tiles.is_empty() {
        match report::write_map_info(oracle, settings) {
            Ok(files) => summary.info_files = files,
            Err(e) => error!("Map info for {} not written: {}", settings.body, error_chain(&e)),
        }
    }

    Ok(summary)
}

/// Locate both extremes of a body and write its `Info.txt`.
pub fn run_info<O: TerrainOracle + ?Sized>(
    oracle: &O,
    output_root: &std::path::Path,
    lowest: &SearchParams,
    highest: &SearchParams,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    info!("Searching extremes of {}", oracle.name());
    let low = extremum::find(oracle, ExtremumKind::Lowest, lowest)?;
    let high = extremum::find(oracle, ExtremumKind::Highest, highest)?;

    let path = report::extremum_report_path(output_root, oracle.name());
    report::write_lines(&path, &report::extremum_report(&low, &high))?;
    info!(
        "{}: lowest {:.1} m at ({:.4}, {:.4}), highest {:.1} m at ({:.4}, {:.4})",
        oracle.name(),
        low.altitude,
        low.latitude,
        low.longitude,
        high.altitude,
        high.latitude,
        high.longitude
    );
    Ok(path)
}

/// Counts of a batch run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub maps: Vec<MapSummary>,
    pub reports: Vec<PathBuf>,
    /// Bodies whose pass was aborted.
    pub failures: usize,
}

/// All bodies of a configuration file, ready to be mapped.
pub struct Batch {
    pub config: CartographerConfig,
    bodies: Vec<Box<dyn TerrainOracle>>,
}

impl Batch {
    pub fn new(config: CartographerConfig) -> Self {
        let bodies = config
            .bodies
            .iter()
            .map(|body| Box::new(ProceduralBody::new(body.clone())) as Box<dyn TerrainOracle>)
            .collect();
        Self { config, bodies }
    }

    /// Use custom oracles instead of the configured procedural bodies.
    pub fn with_bodies(config: CartographerConfig, bodies: Vec<Box<dyn TerrainOracle>>) -> Self {
        Self { config, bodies }
    }

    pub fn find_body(&self, name: &str) -> Option<&dyn TerrainOracle> {
        self.bodies.iter().find(|b| b.name() == name).map(|b| &**b)
    }

    /// The named body, or the first (home) body when the name is missing or
    /// unknown.
    pub fn body_or_home(&self, name: Option<&str>) -> Option<&dyn TerrainOracle> {
        if let Some(name) = name {
            if let Some(body) = self.find_body(name) {
                return Some(body);
            }
            warn!("Unknown body {}, using {}", name, self.bodies.first().map_or("none", |b| b.name()));
        }
        self.bodies.first().map(|b| &**b)
    }

    pub fn run_maps(&self, summary: &mut BatchSummary) {
        for maps in &self.config.maps {
            self.run_map_entry(maps, summary);
        }
    }

    fn run_map_entry(&self, maps: &MapsConfig, summary: &mut BatchSummary) {
        let Some(body) = self.body_or_home(maps.body.as_deref()) else {
            error!("No bodies configured");
            summary.failures += 1;
            return;
        };

        let settings = maps.resolve(body, &self.config.output_root);
        match run(body, &settings) {
            Ok(map) => {
                info!(
                    "{}: {} tiles written, {} failed, in {}",
                    map.body,
                    map.tiles.len(),
                    map.failed.len(),
                    settings.export_folder.display()
                );
                summary.maps.push(map);
            }
            Err(e) => {
                error!("Map export of {} aborted: {}", body.name(), error_chain(&e));
                summary.failures += 1;
            }
        }
    }

    pub fn run_info(&self, summary: &mut BatchSummary) {
        for entry in &self.config.info {
            self.run_info_entry(entry, summary);
        }
    }

    fn run_info_entry(&self, entry: &InfoConfig, summary: &mut BatchSummary) {
        let lowest = entry.lowest.unwrap_or_else(|| SearchParams::for_kind(ExtremumKind::Lowest));
        let highest = entry.highest.unwrap_or_else(|| SearchParams::for_kind(ExtremumKind::Highest));

        for name in entry.bodies() {
            let Some(body) = self.find_body(&name) else {
                warn!("Skipping info for unknown body {}", name);
                continue;
            };
            match run_info(body, &self.config.output_root, &lowest, &highest) {
                Ok(path) => summary.reports.push(path),
                Err(e) => {
                    error!("Info for {} aborted: {}", name, error_chain(e.as_ref()));
                    summary.failures += 1;
                }
            }
        }
    }

    /// Every map pass, then every info pass.
    pub fn run_all(&self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        self.run_maps(&mut summary);
        self.run_info(&mut summary);
        summary
    }
}
