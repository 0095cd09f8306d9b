//! Render settings and the JSON configuration they are built from.
//!
//! Every map pass works from one immutable [`RenderSettings`] value. The
//! configuration layer is forgiving: a value that does not parse is reported
//! and replaced by its documented default, it never aborts a run.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::addressing::{TileFilter, TileGrid};
use crate::color::Color;
use crate::error::ConfigError;
use crate::extremum::SearchParams;
use crate::geo::Projection;
use crate::gradient::ColorGradient;
use crate::oracle::TerrainOracle;
use crate::procedural::BodyConfig;

pub const DEFAULT_WIDTH: usize = 2048;
pub const DEFAULT_TILE: usize = 1024;
pub const DEFAULT_SLOPE_MIN: Color = Color::rgb(0.2, 0.3, 0.4);
pub const DEFAULT_SLOPE_MAX: Color = Color::rgb(0.9, 0.6, 0.5);
pub const DEFAULT_OUTPUT_ROOT: &str = "PluginData";

/// Output layers, each written to its own folder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Height,
    Normal,
    Slope,
    Color,
    Ocean,
    Biome,
    SatelliteHeight,
    SatelliteSlope,
    SatelliteMap,
    SatelliteBiome,
}

impl Layer {
    pub const ALL: [Layer; 10] = [
        Layer::Height,
        Layer::Normal,
        Layer::Slope,
        Layer::Color,
        Layer::Ocean,
        Layer::Biome,
        Layer::SatelliteHeight,
        Layer::SatelliteSlope,
        Layer::SatelliteMap,
        Layer::SatelliteBiome,
    ];

    pub fn folder(self) -> &'static str {
        match self {
            Layer::Height => "HeightMap",
            Layer::Normal => "NormalMap",
            Layer::Slope => "SlopeMap",
            Layer::Color => "ColorMap",
            Layer::Ocean => "OceanMap",
            Layer::Biome => "BiomeMap",
            Layer::SatelliteHeight => "SatelliteHeight",
            Layer::SatelliteSlope => "SatelliteSlope",
            Layer::SatelliteMap => "SatelliteMap",
            Layer::SatelliteBiome => "SatelliteBiome",
        }
    }

    /// Height, normal, color and ocean maps keep their alpha channel; the
    /// others are written as plain RGB.
    pub fn has_alpha(self) -> bool {
        matches!(self, Layer::Height | Layer::Normal | Layer::Color | Layer::Ocean)
    }

    /// Configuration key enabling the layer.
    fn key(self) -> &'static str {
        match self {
            Layer::Height => "heightMap",
            Layer::Normal => "normalMap",
            Layer::Slope => "slopeMap",
            Layer::Color => "colorMap",
            Layer::Ocean => "oceanMap",
            Layer::Biome => "biomeMap",
            Layer::SatelliteHeight => "satelliteHeight",
            Layer::SatelliteSlope => "satelliteSlope",
            Layer::SatelliteMap => "satelliteMap",
            Layer::SatelliteBiome => "satelliteBiome",
        }
    }

    /// Base layer a satellite composite shades.
    pub fn satellite_base(self) -> Option<Layer> {
        match self {
            Layer::SatelliteHeight => Some(Layer::Height),
            Layer::SatelliteSlope => Some(Layer::Slope),
            Layer::SatelliteMap => Some(Layer::Color),
            Layer::SatelliteBiome => Some(Layer::Biome),
            _ => None,
        }
    }
}

/// The set of layers a pass writes, and the buffers it must compute for them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerSet(BTreeSet<Layer>);

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Layer::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, layer: Layer) {
        self.0.insert(layer);
    }

    pub fn remove(&mut self, layer: Layer) {
        self.0.remove(&layer);
    }

    pub fn contains(&self, layer: Layer) -> bool {
        self.0.contains(&layer)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Layer> + '_ {
        self.0.iter().copied()
    }

    fn any(&self, layers: &[Layer]) -> bool {
        layers.iter().any(|l| self.contains(*l))
    }

    pub fn any_satellite(&self) -> bool {
        self.any(&[
            Layer::SatelliteHeight,
            Layer::SatelliteSlope,
            Layer::SatelliteMap,
            Layer::SatelliteBiome,
        ])
    }

    pub fn needs_height_color(&self) -> bool {
        self.any(&[Layer::Height, Layer::SatelliteHeight])
    }

    pub fn needs_normal(&self) -> bool {
        self.contains(Layer::Normal) || self.any_satellite()
    }

    pub fn needs_slope(&self) -> bool {
        self.any(&[Layer::Slope, Layer::SatelliteSlope])
    }

    /// Whether the halo buffer and the finite difference pass are needed.
    pub fn needs_derivatives(&self) -> bool {
        self.needs_normal() || self.needs_slope()
    }

    pub fn needs_color(&self) -> bool {
        self.any(&[Layer::Color, Layer::SatelliteMap])
    }

    pub fn needs_ocean(&self) -> bool {
        self.contains(Layer::Ocean)
    }

    pub fn needs_biome(&self) -> bool {
        self.any(&[Layer::Biome, Layer::SatelliteBiome])
    }

    /// Whether terrain altitude has to be queried at all.
    pub fn needs_altitude(&self) -> bool {
        self.needs_height_color() || self.needs_derivatives() || self.needs_color() || self.needs_ocean()
    }
}

impl FromIterator<Layer> for LayerSet {
    fn from_iter<I: IntoIterator<Item = Layer>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Immutable snapshot of everything one map pass needs.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    pub body: String,
    pub grid: TileGrid,
    pub lat_offset: f64,
    pub lon_offset: f64,
    pub include_ocean_floor: bool,
    pub ocean_color: Color,
    pub flip_h: bool,
    pub flip_v: bool,
    pub leaflet: bool,
    pub filter: TileFilter,
    pub gradient: ColorGradient,
    pub slope_min: Color,
    pub slope_max: Color,
    pub normal_strength: f64,
    pub layers: LayerSet,
    /// Layers whose existing tile files may be replaced.
    pub overwrite: LayerSet,
    pub export_folder: PathBuf,
    pub threads: usize,
}

impl RenderSettings {
    /// Defaults for a body, writing only the color map.
    pub fn new(body: impl Into<String>, grid_width: usize, tile_size: usize) -> Self {
        Self {
            body: body.into(),
            grid: TileGrid::new(grid_width, tile_size),
            lat_offset: 0.0,
            lon_offset: 0.0,
            include_ocean_floor: true,
            ocean_color: Color::rgba(0.1, 0.1, 0.2, 1.0),
            flip_h: false,
            flip_v: false,
            leaflet: false,
            filter: TileFilter::all(),
            gradient: ColorGradient::default(),
            slope_min: DEFAULT_SLOPE_MIN,
            slope_max: DEFAULT_SLOPE_MAX,
            normal_strength: 1.0,
            layers: [Layer::Color].into_iter().collect(),
            overwrite: LayerSet::all(),
            export_folder: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            threads: 1,
        }
    }

    pub fn with_layers(mut self, layers: impl IntoIterator<Item = Layer>) -> Self {
        self.layers = layers.into_iter().collect();
        self
    }

    pub fn projection(&self) -> Projection {
        Projection::new(self.grid.grid_width, self.lat_offset, self.lon_offset)
    }

    pub fn layer_folder(&self, layer: Layer) -> PathBuf {
        self.export_folder.join(layer.folder())
    }
}

/// One `maps` entry of the configuration file.
///
/// Values may be given as JSON scalars or as strings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flip_v: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flip_h: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaflet: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocean_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biome_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellite_height: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellite_slope: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellite_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellite_biome: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_height_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_normal_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_slope_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_color_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_ocean_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_biome_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_satellite_height: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_satellite_slope: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_satellite_map: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_satellite_biome: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocean_floor: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocean_color: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_strength: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope_min: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope_max: Option<Value>,
    #[serde(rename = "LAToffset", skip_serializing_if = "Option::is_none")]
    pub lat_offset: Option<Value>,
    #[serde(rename = "LONoffset", skip_serializing_if = "Option::is_none")]
    pub lon_offset: Option<Value>,
    #[serde(rename = "AltitudeColor", skip_serializing_if = "Option::is_none")]
    pub altitude_color: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_tile: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_from: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_to: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<Value>,
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn invalid<T: std::fmt::Debug>(key: &'static str, value: &Value, default: &T) {
    let err = ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        default: format!("{:?}", default),
    };
    warn!("{}", err);
}

fn read_bool(key: &'static str, value: Option<&Value>, default: bool) -> bool {
    let Some(value) = value else { return default };
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        other => match scalar_text(other).to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
    };
    parsed.unwrap_or_else(|| {
        invalid(key, value, &default);
        default
    })
}

fn read_usize(key: &'static str, value: Option<&Value>) -> Option<usize> {
    let value = value?;
    let parsed = match value {
        // `2048.0` is accepted, `2048.5` is not.
        Value::Number(n) => n.as_u64().map(|n| n as usize).or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= usize::MAX as f64)
                .map(|f| f as usize)
        }),
        other => scalar_text(other).parse::<usize>().ok(),
    };
    if parsed.is_none() {
        invalid(key, value, &"none");
    }
    parsed
}

fn read_f64(key: &'static str, value: Option<&Value>, default: f64) -> f64 {
    let Some(value) = value else { return default };
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        other => scalar_text(other).parse::<f64>().ok(),
    }
    .filter(|v| v.is_finite());
    parsed.unwrap_or_else(|| {
        invalid(key, value, &default);
        default
    })
}

fn read_color(key: &'static str, value: Option<&Value>, default: Color) -> Color {
    let Some(value) = value else { return default };
    Color::parse(&scalar_text(value)).unwrap_or_else(|| {
        invalid(key, value, &default);
        default
    })
}

/// `printTile` accepts a single index or a list; unparsable entries are
/// skipped.
fn read_tile_list(value: Option<&Value>) -> BTreeSet<usize> {
    let values: Vec<&Value> = match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    };
    values
        .into_iter()
        .filter_map(|v| read_usize("printTile", Some(v)))
        .collect()
}

/// Tile sizes must split the map into whole tiles horizontally and, unless
/// one tile spans the full height, vertically as well.
fn tile_fits(width: usize, tile: usize) -> bool {
    tile > 0 && tile <= width && width % tile == 0 && (tile >= width / 2 || (width / 2) % tile == 0)
}

/// Join a user supplied relative folder onto `base`, refusing anything that
/// would leave it.
fn contained_folder(base: &Path, requested: &str) -> Option<PathBuf> {
    let requested = Path::new(requested);
    let inside = requested
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    inside.then(|| base.join(requested))
}

impl MapsConfig {
    fn enabled(&self, layer: Layer) -> Option<&Value> {
        match layer {
            Layer::Height => self.height_map.as_ref(),
            Layer::Normal => self.normal_map.as_ref(),
            Layer::Slope => self.slope_map.as_ref(),
            Layer::Color => self.color_map.as_ref(),
            Layer::Ocean => self.ocean_map.as_ref(),
            Layer::Biome => self.biome_map.as_ref(),
            Layer::SatelliteHeight => self.satellite_height.as_ref(),
            Layer::SatelliteSlope => self.satellite_slope.as_ref(),
            Layer::SatelliteMap => self.satellite_map.as_ref(),
            Layer::SatelliteBiome => self.satellite_biome.as_ref(),
        }
    }

    fn overwrite(&self, layer: Layer) -> Option<&Value> {
        match layer {
            Layer::Height => self.overwrite_height_map.as_ref(),
            Layer::Normal => self.overwrite_normal_map.as_ref(),
            Layer::Slope => self.overwrite_slope_map.as_ref(),
            Layer::Color => self.overwrite_color_map.as_ref(),
            Layer::Ocean => self.overwrite_ocean_map.as_ref(),
            Layer::Biome => self.overwrite_biome_map.as_ref(),
            Layer::SatelliteHeight => self.overwrite_satellite_height.as_ref(),
            Layer::SatelliteSlope => self.overwrite_satellite_slope.as_ref(),
            Layer::SatelliteMap => self.overwrite_satellite_map.as_ref(),
            Layer::SatelliteBiome => self.overwrite_satellite_biome.as_ref(),
        }
    }

    /// Layers switched on in the configuration, before any body-dependent
    /// adjustment. The color map is on unless disabled.
    pub fn requested_layers(&self) -> LayerSet {
        Layer::ALL
            .into_iter()
            .filter(|&layer| read_bool(layer.key(), self.enabled(layer), layer == Layer::Color))
            .collect()
    }

    /// Build the render settings for `oracle`.
    pub fn resolve(&self, oracle: &dyn TerrainOracle, output_root: &Path) -> RenderSettings {
        let body = oracle.name().to_string();
        let mut settings = RenderSettings::new(body.clone(), DEFAULT_WIDTH, DEFAULT_TILE);

        let width = read_usize("width", self.width.as_ref())
            .filter(|w| {
                let ok = *w >= 2 && w % 2 == 0;
                if !ok {
                    warn!("width {} must be an even number of at least 2, using {}", w, DEFAULT_WIDTH);
                }
                ok
            })
            .unwrap_or(DEFAULT_WIDTH);

        let tile = read_usize("tile", self.tile.as_ref()).unwrap_or(DEFAULT_TILE.min(width));
        let tile = if tile > width {
            warn!("tile {} is larger than width {}, using {}", tile, width, width);
            width
        } else {
            tile
        };
        let tile = if tile_fits(width, tile) {
            tile
        } else {
            let fallback = if tile_fits(width, DEFAULT_TILE) { DEFAULT_TILE } else { width };
            warn!("tile {} does not divide width {}, using {}", tile, width, fallback);
            fallback
        };
        settings.grid = TileGrid::new(width, tile);

        let base = output_root.join(&body);
        settings.export_folder = match self.export_folder.as_deref().filter(|s| !s.is_empty()) {
            None => base,
            Some(requested) => contained_folder(&base, requested).unwrap_or_else(|| {
                warn!("exportFolder {} leaves {}, using it instead", requested, base.display());
                base.clone()
            }),
        };

        settings.leaflet = read_bool("leaflet", self.leaflet.as_ref(), false);
        settings.flip_v = read_bool("flipV", self.flip_v.as_ref(), false);
        settings.flip_h = read_bool("flipH", self.flip_h.as_ref(), false);
        settings.include_ocean_floor = read_bool("oceanFloor", self.ocean_floor.as_ref(), true);
        settings.ocean_color = read_color("oceanColor", self.ocean_color.as_ref(), oracle.ocean_color());
        settings.lat_offset = read_f64("LAToffset", self.lat_offset.as_ref(), 0.0);
        settings.lon_offset = read_f64("LONoffset", self.lon_offset.as_ref(), 0.0);
        settings.normal_strength = read_f64("normalStrength", self.normal_strength.as_ref(), 1.0);
        settings.slope_min = read_color("slopeMin", self.slope_min.as_ref(), DEFAULT_SLOPE_MIN);
        settings.slope_max = read_color("slopeMax", self.slope_max.as_ref(), DEFAULT_SLOPE_MAX);
        settings.threads = read_usize("threads", self.threads.as_ref()).unwrap_or(1).max(1);

        if let Some(stops) = &self.altitude_color {
            let pairs: Option<Vec<(String, String)>> = stops
                .iter()
                .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect();
            settings.gradient = match pairs {
                Some(pairs) => ColorGradient::parse_or_default(pairs),
                None => {
                    warn!("AltitudeColor values must be \"r,g,b[,a]\" strings, using default gradient");
                    ColorGradient::default()
                }
            };
        }

        settings.filter = TileFilter {
            tiles: read_tile_list(self.print_tile.as_ref()),
            from: read_usize("printFrom", self.print_from.as_ref()),
            to: read_usize("printTo", self.print_to.as_ref()),
        };

        settings.layers = self.requested_layers();
        settings.overwrite = Layer::ALL
            .into_iter()
            .filter(|&layer| read_bool("overwrite", self.overwrite(layer), true))
            .collect();

        if !oracle.has_ocean() {
            settings.include_ocean_floor = true;
            settings.layers.remove(Layer::Ocean);
        }

        if !oracle.has_biome_map() {
            settings.layers.remove(Layer::Biome);
            settings.layers.remove(Layer::SatelliteBiome);
        }

        settings
    }
}

/// One `info` entry: bodies whose lowest and highest points are reported.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    /// A single body name or a list of names.
    pub body: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest: Option<SearchParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest: Option<SearchParams>,
}

impl InfoConfig {
    pub fn bodies(&self) -> Vec<String> {
        match &self.body {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
            _ => Vec::new(),
        }
    }
}

/// Top level configuration file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CartographerConfig {
    /// Root of every body's output directory.
    pub output_root: PathBuf,
    pub bodies: Vec<BodyConfig>,
    pub maps: Vec<MapsConfig>,
    pub info: Vec<InfoConfig>,
}

impl Default for CartographerConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            bodies: vec![BodyConfig::default()],
            maps: Vec::new(),
            info: Vec::new(),
        }
    }
}

impl CartographerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let mut config: CartographerConfig = serde_json::from_str(text)?;
        if config.bodies.is_empty() {
            config.bodies.push(BodyConfig::default());
        }
        Ok(config)
    }

    /// A small documented example covering every map layer and an info
    /// request.
    pub fn sample() -> Self {
        let body = BodyConfig::default();
        let mut gradient = Map::new();
        gradient.insert("0".into(), Value::from("0,0,0"));
        gradient.insert("1".into(), Value::from("1,1,1"));

        let maps = MapsConfig {
            body: Some(body.name.clone()),
            width: Some(Value::from(DEFAULT_WIDTH)),
            tile: Some(Value::from(DEFAULT_TILE)),
            flip_v: Some(Value::from(false)),
            flip_h: Some(Value::from(false)),
            export_folder: Some("Maps".into()),
            leaflet: Some(Value::from(false)),
            height_map: Some(Value::from(true)),
            normal_map: Some(Value::from(false)),
            slope_map: Some(Value::from(true)),
            color_map: Some(Value::from(true)),
            ocean_map: Some(Value::from(false)),
            biome_map: Some(Value::from(false)),
            satellite_map: Some(Value::from(true)),
            ocean_floor: Some(Value::from(true)),
            normal_strength: Some(Value::from(1.0)),
            slope_min: Some(Value::from("0.2,0.3,0.4")),
            slope_max: Some(Value::from("0.9,0.6,0.5")),
            lat_offset: Some(Value::from(0.0)),
            lon_offset: Some(Value::from(0.0)),
            altitude_color: Some(gradient),
            print_tile: Some(Value::Array(Vec::new())),
            ..MapsConfig::default()
        };

        let info = InfoConfig {
            body: Value::Array(vec![Value::from(body.name.clone())]),
            lowest: Some(SearchParams::for_kind(crate::extremum::ExtremumKind::Lowest)),
            highest: Some(SearchParams::for_kind(crate::extremum::ExtremumKind::Highest)),
        };

        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            bodies: vec![body],
            maps: vec![maps],
            info: vec![info],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Biome, FunctionBody};

    fn dry_body() -> FunctionBody<fn(f64, f64) -> f64> {
        FunctionBody::new("Dry", 1000.0, 10.0, (|_, _| 0.0) as fn(f64, f64) -> f64)
    }

    fn wet_body() -> FunctionBody<fn(f64, f64) -> f64> {
        dry_body()
            .with_ocean(Color::rgb(0.0, 0.0, 0.5))
            .with_biomes(vec![Biome::new("Plains", Color::rgb(0.0, 1.0, 0.0))])
    }

    fn parse(json: &str) -> MapsConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = MapsConfig::default().resolve(&wet_body(), Path::new("out"));
        assert_eq!(settings.grid, TileGrid::new(2048, 1024));
        assert_eq!(settings.layers, [Layer::Color].into_iter().collect());
        assert!(settings.include_ocean_floor);
        assert_eq!(settings.ocean_color, Color::rgb(0.0, 0.0, 0.5));
        assert_eq!(settings.slope_min, DEFAULT_SLOPE_MIN);
        assert_eq!(settings.gradient, ColorGradient::default());
        assert_eq!(settings.filter, TileFilter::all());
        assert_eq!(settings.export_folder, Path::new("out").join("Dry"));
        assert_eq!(settings.overwrite, LayerSet::all());
    }

    #[test]
    fn test_strings_and_scalars() {
        let config = parse(
            r#"{
                "width": "4096", "tile": 512, "flipV": "True", "leaflet": true,
                "heightMap": "true", "colorMap": false, "LAToffset": "12.5",
                "slopeMin": "0,0,0", "printTile": [1, "3", "x"], "printFrom": 9,
                "overwriteSlopeMap": false, "exportFolder": "Maps/Tiles"
            }"#,
        );
        let settings = config.resolve(&wet_body(), Path::new("out"));

        assert_eq!(settings.grid, TileGrid::new(4096, 512));
        assert!(settings.flip_v && settings.leaflet && !settings.flip_h);
        assert_eq!(settings.layers, [Layer::Height].into_iter().collect());
        assert_eq!(settings.lat_offset, 12.5);
        assert_eq!(settings.slope_min, Color::BLACK);
        assert_eq!(settings.filter.tiles, [1, 3].into_iter().collect());
        assert_eq!(settings.filter.from, Some(9));
        assert!(!settings.overwrite.contains(Layer::Slope));
        assert!(settings.overwrite.contains(Layer::Height));
        assert_eq!(settings.export_folder, Path::new("out").join("Dry").join("Maps/Tiles"));
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let config = parse(
            r#"{
                "width": "wide", "tile": 300, "normalStrength": "strong",
                "slopeMax": "1,2", "oceanFloor": "maybe",
                "AltitudeColor": { "0": "0,0,0", "half": "1,1,1" }
            }"#,
        );
        let settings = config.resolve(&wet_body(), Path::new("out"));

        assert_eq!(settings.grid, TileGrid::new(2048, 1024));
        assert_eq!(settings.normal_strength, 1.0);
        assert_eq!(settings.slope_max, DEFAULT_SLOPE_MAX);
        assert!(settings.include_ocean_floor);
        assert_eq!(settings.gradient, ColorGradient::default());
    }

    #[test]
    fn test_gradient_parsed() {
        let config = parse(r#"{ "AltitudeColor": { "1": "1,0,0", "0": "0,0,1", "0.5": "0,1,0" } }"#);
        let settings = config.resolve(&wet_body(), Path::new("out"));
        assert_eq!(settings.gradient.stops().len(), 3);
        assert_eq!(settings.gradient.evaluate(0.5), Color::rgb(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_body_without_ocean_or_biomes() {
        let config = parse(
            r#"{ "oceanMap": true, "oceanFloor": false, "biomeMap": true, "satelliteBiome": true }"#,
        );
        let settings = config.resolve(&dry_body(), Path::new("out"));
        assert!(settings.include_ocean_floor);
        assert!(!settings.layers.contains(Layer::Ocean));
        assert!(!settings.layers.contains(Layer::Biome));
        assert!(!settings.layers.contains(Layer::SatelliteBiome));

        let settings = config.resolve(&wet_body(), Path::new("out"));
        assert!(!settings.include_ocean_floor);
        assert!(settings.layers.contains(Layer::Ocean));
        assert!(settings.layers.contains(Layer::SatelliteBiome));
    }

    #[test]
    fn test_export_folder_cannot_escape() {
        let config = parse(r#"{ "exportFolder": "../../etc" }"#);
        let settings = config.resolve(&dry_body(), Path::new("out"));
        assert_eq!(settings.export_folder, Path::new("out").join("Dry"));
    }

    #[test]
    fn test_tile_fits() {
        assert!(tile_fits(2048, 1024));
        assert!(tile_fits(2048, 2048));
        assert!(tile_fits(8, 4));
        assert!(!tile_fits(2048, 0));
        assert!(!tile_fits(2048, 300));
        assert!(!tile_fits(24, 8));
    }

    #[test]
    fn test_oversized_tile_clamped_to_width() {
        let settings = parse(r#"{ "width": 4096, "tile": 8192 }"#).resolve(&wet_body(), Path::new("out"));
        assert_eq!(settings.grid, TileGrid::new(4096, 4096));

        let settings = parse(r#"{ "width": 8, "tile": 64 }"#).resolve(&wet_body(), Path::new("out"));
        assert_eq!(settings.grid, TileGrid::new(8, 8));
    }

    #[test]
    fn test_integral_floats_accepted() {
        let settings =
            parse(r#"{ "width": 2048.0, "tile": 512.0, "printFrom": 2.5 }"#).resolve(&wet_body(), Path::new("out"));
        assert_eq!(settings.grid, TileGrid::new(2048, 512));
        assert_eq!(settings.filter.from, None);
    }

    #[test]
    fn test_layer_needs() {
        let layers: LayerSet = [Layer::SatelliteSlope].into_iter().collect();
        assert!(layers.needs_slope());
        assert!(layers.needs_normal());
        assert!(layers.needs_derivatives());
        assert!(!layers.needs_color());
        assert!(layers.needs_altitude());

        let biome_only: LayerSet = [Layer::Biome].into_iter().collect();
        assert!(!biome_only.needs_altitude());
        assert!(biome_only.needs_biome());
    }

    #[test]
    fn test_config_file_round_trip_of_sample() {
        let text = serde_json::to_string_pretty(&CartographerConfig::sample()).unwrap();
        let config = CartographerConfig::from_json(&text).unwrap();
        assert_eq!(config.maps.len(), 1);
        assert_eq!(config.info[0].bodies(), vec![BodyConfig::default().name]);
        assert!(config.maps[0].requested_layers().contains(Layer::SatelliteMap));
    }

    #[test]
    fn test_info_body_forms() {
        let single: InfoConfig = serde_json::from_str(r#"{ "body": "Mun" }"#).unwrap();
        assert_eq!(single.bodies(), vec!["Mun".to_string()]);
        let list: InfoConfig = serde_json::from_str(r#"{ "body": ["Mun", "Minmus"] }"#).unwrap();
        assert_eq!(list.bodies().len(), 2);
    }
}
