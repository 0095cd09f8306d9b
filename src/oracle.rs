//! The terrain oracle: the height/color function the cartographer samples.
//!
//! Implementations are treated as pure and deterministic for a fixed input,
//! and possibly expensive. Nothing in this crate depends on how a body
//! computes its terrain.

use crate::color::Color;
use crate::error::OracleError;

/// Named biome with the color it is drawn with on the biome map.
#[derive(Clone, Debug, PartialEq)]
pub struct Biome {
    pub name: String,
    pub color: Color,
}

impl Biome {
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// A body that can be queried for terrain altitude, surface color and biome.
///
/// Latitudes and longitudes are in degrees. Altitudes are in meters above the
/// reference `radius`, so anything below zero is under sea level.
pub trait TerrainOracle: Send + Sync {
    fn name(&self) -> &str;

    /// Sea level radius.
    fn radius(&self) -> f64;

    /// Lowest possible terrain radius; normalization offset.
    fn radius_min(&self) -> f64;

    /// Range of terrain radii; normalization scale.
    fn radius_delta(&self) -> f64;

    fn has_ocean(&self) -> bool;

    /// Fallback color for submerged terrain.
    fn ocean_color(&self) -> Color;

    /// Terrain altitude. With `include_ocean_floor == false` a submerged point
    /// reports sea level instead of the seabed.
    fn altitude(&self, lat: f64, lon: f64, include_ocean_floor: bool) -> Result<f64, OracleError>;

    fn surface_color(&self, lat: f64, lon: f64) -> Result<Color, OracleError>;

    fn biome_at(&self, lat: f64, lon: f64) -> Result<&Biome, OracleError>;

    /// Full biome legend. Empty when the body has no biome map.
    fn biomes(&self) -> &[Biome];

    fn has_biome_map(&self) -> bool {
        !self.biomes().is_empty()
    }

    /// Whether concurrent queries from several threads are allowed.
    fn is_reentrant(&self) -> bool {
        false
    }
}

/// Oracle backed by a plain height function. Used by tests and demos.
///
/// Surface color is a gray ramp of the normalized altitude; biomes split the
/// body into a northern and southern half when a legend is supplied.
pub struct FunctionBody<F> {
    pub name: String,
    pub radius: f64,
    pub radius_min: f64,
    pub radius_delta: f64,
    pub ocean: bool,
    pub ocean_color: Color,
    pub biomes: Vec<Biome>,
    height: F,
}

impl<F> FunctionBody<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    pub fn new(name: impl Into<String>, radius: f64, radius_delta: f64, height: F) -> Self {
        Self {
            name: name.into(),
            radius,
            radius_min: radius,
            radius_delta,
            ocean: false,
            ocean_color: Color::rgba(0.1, 0.1, 0.2, 1.0),
            biomes: Vec::new(),
            height,
        }
    }

    pub fn with_radius_min(mut self, radius_min: f64) -> Self {
        self.radius_min = radius_min;
        self
    }

    pub fn with_ocean(mut self, ocean_color: Color) -> Self {
        self.ocean = true;
        self.ocean_color = ocean_color;
        self
    }

    pub fn with_biomes(mut self, biomes: Vec<Biome>) -> Self {
        self.biomes = biomes;
        self
    }
}

impl<F> TerrainOracle for FunctionBody<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn radius(&self) -> f64 {
        self.radius
    }

    fn radius_min(&self) -> f64 {
        self.radius_min
    }

    fn radius_delta(&self) -> f64 {
        self.radius_delta
    }

    fn has_ocean(&self) -> bool {
        self.ocean
    }

    fn ocean_color(&self) -> Color {
        self.ocean_color
    }

    fn altitude(&self, lat: f64, lon: f64, include_ocean_floor: bool) -> Result<f64, OracleError> {
        let alt = (self.height)(lat, lon);
        if !include_ocean_floor && self.ocean && alt < 0.0 {
            return Ok(0.0);
        }
        Ok(alt)
    }

    fn surface_color(&self, lat: f64, lon: f64) -> Result<Color, OracleError> {
        let alt = (self.height)(lat, lon);
        let h = (self.radius + alt - self.radius_min) / self.radius_delta;
        Ok(Color::gray(h.clamp(0.0, 1.0) as f32))
    }

    fn biome_at(&self, lat: f64, lon: f64) -> Result<&Biome, OracleError> {
        let index = if lat >= 0.0 || self.biomes.len() < 2 { 0 } else { 1 };
        self.biomes.get(index).ok_or_else(|| OracleError::Query {
            lat,
            lon,
            message: format!("{} has no biome map", self.name),
        })
    }

    fn biomes(&self) -> &[Biome] {
        &self.biomes
    }

    fn is_reentrant(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_body_ocean_floor() {
        let body = FunctionBody::new("Wet", 1000.0, 100.0, |_, _| -25.0)
            .with_radius_min(950.0)
            .with_ocean(Color::rgb(0.0, 0.0, 1.0));

        assert_eq!(body.altitude(0.0, 0.0, true).unwrap(), -25.0);
        assert_eq!(body.altitude(0.0, 0.0, false).unwrap(), 0.0);
    }

    #[test]
    fn test_function_body_biomes() {
        let body = FunctionBody::new("Split", 1000.0, 1.0, |_, _| 0.0).with_biomes(vec![
            Biome::new("North", Color::WHITE),
            Biome::new("South", Color::BLACK),
        ]);

        assert!(body.has_biome_map());
        assert_eq!(body.biome_at(10.0, 0.0).unwrap().name, "North");
        assert_eq!(body.biome_at(-10.0, 0.0).unwrap().name, "South");
    }

    #[test]
    fn test_function_body_without_biomes_errors() {
        let body = FunctionBody::new("Bare", 1000.0, 1.0, |_, _| 0.0);
        assert!(!body.has_biome_map());
        assert!(body.biome_at(0.0, 0.0).is_err());
    }
}
