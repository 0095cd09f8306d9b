//! Per-tile sampling of a body and the layers derived from it.
//!
//! A tile of `w × h` pixels is sampled on a `(w + 2) × (h + 2)` grid: the
//! extra ring of pixels (the halo) lies in the neighbouring tiles and is only
//! used for the finite differences of the normal and slope maps, so no tile
//! ever needs data from another.

use std::collections::{BTreeMap, BTreeSet};

use crate::color::Color;
use crate::error::MapError;
use crate::oracle::TerrainOracle;
use crate::settings::{Layer, RenderSettings};
use crate::tilemap::Tilemap;

/// Normal map value of rows where the grid folds over a pole.
const FLAT_NORMAL: Color = Color::rgba(0.5, 0.5, 0.5, 0.5);

/// Everything computed for one tile.
///
/// Pixel buffers are addressed with `y = 0` at the southern edge of the tile.
#[derive(Debug)]
pub struct TileBuffer {
    pub index: usize,
    pub width: usize,
    pub height: usize,
    /// Halo-padded terrain heights in meters above the body's lowest point.
    /// Only filled when a derivative layer is needed.
    terrain: Option<Tilemap<f64>>,
    /// Interior rows adjacent to a pole seam.
    polar_rows: BTreeSet<usize>,
    layers: BTreeMap<Layer, Tilemap<Color>>,
}

impl TileBuffer {
    pub fn layer(&self, layer: Layer) -> Option<&Tilemap<Color>> {
        self.layers.get(&layer)
    }

    pub fn terrain(&self) -> Option<&Tilemap<f64>> {
        self.terrain.as_ref()
    }

    pub fn is_polar_row(&self, y: usize) -> bool {
        self.polar_rows.contains(&y)
    }

    /// Mirror every pixel buffer. The terrain halo stays in sampling order.
    pub fn mirror(&mut self, flip_h: bool, flip_v: bool) {
        for buffer in self.layers.values_mut() {
            if flip_h {
                buffer.flip_horizontal();
            }
            if flip_v {
                buffer.flip_vertical();
            }
        }
    }
}

fn allocate<T: Clone>(what: &'static str, width: usize, height: usize, value: T) -> Result<Tilemap<T>, MapError> {
    Tilemap::try_new_with(width, height, value).map_err(|_| MapError::Allocation { what, width, height })
}

fn allocate_if(
    wanted: bool,
    what: &'static str,
    width: usize,
    height: usize,
) -> Result<Option<Tilemap<Color>>, MapError> {
    if wanted {
        allocate(what, width, height, Color::CLEAR).map(Some)
    } else {
        Ok(None)
    }
}

/// Sample one tile and derive every layer the settings ask for.
///
/// Layers that nothing asks for are never computed; in particular the halo
/// and the derivative pass are skipped unless a normal, slope or satellite
/// layer is requested.
pub fn rasterize<O: TerrainOracle + ?Sized>(
    oracle: &O,
    index: usize,
    settings: &RenderSettings,
) -> Result<TileBuffer, MapError> {
    let grid = settings.grid;
    let (w, h) = (grid.tile_size, grid.tile_height());
    let (origin_x, origin_y) = grid.origin(index);
    let projection = settings.projection();
    let layers = &settings.layers;

    let radius = oracle.radius();
    let radius_min = oracle.radius_min();
    let radius_delta = oracle.radius_delta();
    let normalize = |alt: f64| {
        if radius_delta > 0.0 {
            ((radius + alt - radius_min) / radius_delta).clamp(0.0, 1.0)
        } else {
            0.0
        }
    };
    let sea_level = normalize(0.0);

    let mut terrain = if layers.needs_derivatives() {
        Some(allocate("terrain", w + 2, h + 2, 0.0)?)
    } else {
        None
    };
    let mut height_color = allocate_if(layers.needs_height_color(), "height map", w, h)?;
    let mut base_color = allocate_if(layers.needs_color(), "color map", w, h)?;
    let mut ocean = allocate_if(layers.needs_ocean(), "ocean map", w, h)?;
    let mut biome = allocate_if(layers.needs_biome(), "biome map", w, h)?;

    let polar_rows: BTreeSet<usize> = if terrain.is_some() {
        (0..h)
            .filter(|&y| projection.is_polar_edge((origin_y + y) as i64))
            .collect()
    } else {
        BTreeSet::new()
    };

    for y in -1..=h as i64 {
        for x in -1..=w as i64 {
            let interior = x >= 0 && y >= 0 && x < w as i64 && y < h as i64;
            if !interior && terrain.is_none() {
                continue;
            }

            let (lat, lon) = projection.lat_lon(origin_x as i64 + x, origin_y as i64 + y);
            let oracle_err = |source| MapError::Oracle { tile: index, x, y, source };

            if layers.needs_altitude() {
                let alt = oracle.altitude(lat, lon, true).map_err(oracle_err)?;
                let submerged = alt < 0.0;
                let height = if !settings.include_ocean_floor && submerged {
                    sea_level
                } else {
                    normalize(alt)
                };

                if let Some(terrain) = terrain.as_mut() {
                    terrain.set((x + 1) as usize, (y + 1) as usize, height * radius_delta);
                }

                if interior {
                    let (px, py) = (x as usize, y as usize);
                    if let Some(buffer) = height_color.as_mut() {
                        buffer.set(px, py, settings.gradient.evaluate(height));
                    }
                    if let Some(buffer) = base_color.as_mut() {
                        let color = if !settings.include_ocean_floor && submerged {
                            settings.ocean_color
                        } else {
                            oracle.surface_color(lat, lon).map_err(oracle_err)?.with_alpha(1.0)
                        };
                        buffer.set(px, py, color);
                    }
                    if let Some(buffer) = ocean.as_mut() {
                        buffer.set(px, py, if submerged { settings.ocean_color } else { Color::CLEAR });
                    }
                }
            }

            if interior {
                if let Some(buffer) = biome.as_mut() {
                    let color = oracle.biome_at(lat, lon).map_err(oracle_err)?.color;
                    buffer.set(x as usize, y as usize, color);
                }
            }
        }
    }

    let mut tile = TileBuffer {
        index,
        width: w,
        height: h,
        terrain: None,
        polar_rows,
        layers: BTreeMap::new(),
    };

    if let Some(terrain) = terrain {
        let pixel_size = radius * std::f64::consts::TAU / grid.grid_width as f64;
        let (normal, slope) = derive_normal_and_slope(&terrain, &tile.polar_rows, pixel_size, settings)?;
        if let Some(normal) = normal {
            tile.layers.insert(Layer::Normal, normal);
        }
        if let Some(slope) = slope {
            tile.layers.insert(Layer::Slope, slope);
        }
        tile.terrain = Some(terrain);
    }

    for (layer, buffer) in [
        (Layer::Height, height_color),
        (Layer::Color, base_color),
        (Layer::Ocean, ocean),
        (Layer::Biome, biome),
    ] {
        if let Some(buffer) = buffer {
            tile.layers.insert(layer, buffer);
        }
    }

    for satellite in [
        Layer::SatelliteHeight,
        Layer::SatelliteSlope,
        Layer::SatelliteMap,
        Layer::SatelliteBiome,
    ] {
        if !layers.contains(satellite) {
            continue;
        }
        let base = satellite.satellite_base().and_then(|base| tile.layers.get(&base));
        if let (Some(base), Some(normal)) = (base, tile.layers.get(&Layer::Normal)) {
            let composite = composite_satellite(base, normal)?;
            tile.layers.insert(satellite, composite);
        }
    }

    tile.mirror(settings.flip_h, settings.flip_v);
    Ok(tile)
}

/// Central differences of the halo buffer at interior pixel `(x, y)`.
fn central_difference(terrain: &Tilemap<f64>, x: usize, y: usize) -> (f64, f64) {
    let (hx, hy) = (x + 1, y + 1);
    let dx = terrain.get(hx + 1, hy) - terrain.get(hx - 1, hy);
    let dy = terrain.get(hx, hy + 1) - terrain.get(hx, hy - 1);
    (dx, dy)
}

/// Normal map pixel: tangent slopes packed as `(sy, sy, sy, sx)`.
fn normal_color(dx: f64, dy: f64, pixel_size: f64, strength: f64) -> Color {
    let slope_x = (1.0 + dx / (dx * dx + pixel_size * pixel_size).sqrt() * strength) / 2.0;
    let slope_y = (1.0 - dy / (dy * dy + pixel_size * pixel_size).sqrt() * strength) / 2.0;
    let sy = slope_y as f32;
    Color::rgba(sy, sy, sy, slope_x as f32)
}

/// Angle between the surface normal and straight up, as a fraction of 90°,
/// folded back into `0..=1`.
fn slope_fraction(dx: f64, dy: f64, pixel_size: f64) -> f64 {
    // cross((ds, 0, dx), (0, ds, dy))
    let n = [-dx * pixel_size, -pixel_size * dy, pixel_size * pixel_size];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len == 0.0 {
        return 0.0;
    }
    let slope = (n[2] / len).clamp(-1.0, 1.0).acos().to_degrees() / 90.0;
    if slope > 1.0 {
        2.0 - slope
    } else {
        slope
    }
}

/// Derive the normal and slope maps from the halo buffer. Rows in
/// `polar_rows` get a flat normal and the minimum slope color.
pub fn derive_normal_and_slope(
    terrain: &Tilemap<f64>,
    polar_rows: &BTreeSet<usize>,
    pixel_size: f64,
    settings: &RenderSettings,
) -> Result<(Option<Tilemap<Color>>, Option<Tilemap<Color>>), MapError> {
    let (w, h) = (terrain.width.saturating_sub(2), terrain.height.saturating_sub(2));
    let mut normal = allocate_if(settings.layers.needs_normal(), "normal map", w, h)?;
    let mut slope = allocate_if(settings.layers.needs_slope(), "slope map", w, h)?;

    for y in 0..h {
        let polar = polar_rows.contains(&y);
        for x in 0..w {
            if polar {
                if let Some(normal) = normal.as_mut() {
                    normal.set(x, y, FLAT_NORMAL);
                }
                if let Some(slope) = slope.as_mut() {
                    slope.set(x, y, settings.slope_min);
                }
                continue;
            }

            let (dx, dy) = central_difference(terrain, x, y);
            if let Some(normal) = normal.as_mut() {
                normal.set(x, y, normal_color(dx, dy, pixel_size, settings.normal_strength));
            }
            if let Some(slope) = slope.as_mut() {
                let t = slope_fraction(dx, dy, pixel_size) as f32;
                slope.set(x, y, Color::lerp(settings.slope_min, settings.slope_max, t));
            }
        }
    }

    Ok((normal, slope))
}

/// Shade `base` with the normal map's alpha: above one half darkens towards
/// black, below lightens towards white, by the distance from one half.
///
/// This is a cosmetic stand-in for lighting and is kept bit-for-bit stable.
pub fn composite_satellite(base: &Tilemap<Color>, normal: &Tilemap<Color>) -> Result<Tilemap<Color>, MapError> {
    let mut out = allocate("satellite map", base.width, base.height, Color::CLEAR)?;
    for (x, y, color) in base.iter() {
        let shadow = normal.get(x, y).a - 0.5;
        let target = if shadow > 0.0 { Color::BLACK } else { Color::WHITE };
        out.set(x, y, Color::lerp(*color, target, shadow.abs()));
    }
    Ok(out)
}
