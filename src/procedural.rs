//! Procedural bodies: a self-contained terrain oracle for the command line tool.
//!
//! Height is multi-octave Perlin noise sampled on the unit sphere, so the
//! field is seamless across the date line and at the poles, with seeded
//! impact craters pressed into it. Colors and biomes are banded by altitude
//! and latitude.

use noise::{NoiseFn, Perlin, Seedable};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::OracleError;
use crate::oracle::{Biome, TerrainOracle};
use crate::seeds::BodySeeds;

/// Serialized description of a procedural body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    pub name: String,
    pub seed: u64,
    /// Sea level radius in meters.
    pub radius: f64,
    /// Height difference between the deepest and highest possible terrain.
    pub relief: f64,
    /// Fraction of `relief` lying below sea level.
    pub sea_level: f64,
    pub ocean: bool,
    pub ocean_color: String,
    pub craters: usize,
    /// Base noise frequency on the unit sphere (lower = larger continents).
    pub frequency: f64,
    pub octaves: u32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            name: "Terra".to_string(),
            seed: 42,
            radius: 600_000.0,
            relief: 12_000.0,
            sea_level: 0.45,
            ocean: true,
            ocean_color: "0.1,0.1,0.2,1".to_string(),
            craters: 24,
            frequency: 1.6,
            octaves: 6,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Crater {
    center: [f64; 3],
    /// Angular radius in radians.
    radius: f64,
    /// Depth as a fraction of relief.
    depth: f64,
}

// Biome legend indices
const WATER: usize = 0;
const SHORES: usize = 1;
const LOWLANDS: usize = 2;
const HIGHLANDS: usize = 3;
const MOUNTAINS: usize = 4;
const ICE_CAPS: usize = 5;

pub struct ProceduralBody {
    config: BodyConfig,
    ocean_color: Color,
    terrain_noise: Perlin,
    surface_noise: Perlin,
    craters: Vec<Crater>,
    biomes: Vec<Biome>,
}

fn unit_vector(lat: f64, lon: f64) -> [f64; 3] {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn angle_between(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
    dot.clamp(-1.0, 1.0).acos()
}

impl ProceduralBody {
    pub fn new(config: BodyConfig) -> Self {
        let seeds = BodySeeds::from_master(config.seed);
        let terrain_noise = Perlin::new(1).set_seed(BodySeeds::noise_seed(seeds.terrain));
        let surface_noise = Perlin::new(1).set_seed(BodySeeds::noise_seed(seeds.surface));

        let mut rng = ChaCha8Rng::seed_from_u64(seeds.craters);
        let craters = (0..config.craters)
            .map(|_| {
                // Uniform on the sphere
                let z: f64 = rng.gen_range(-1.0..1.0);
                let theta: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
                let r = (1.0 - z * z).sqrt();
                Crater {
                    center: [r * theta.cos(), r * theta.sin(), z],
                    radius: rng.gen_range(0.02..0.15),
                    depth: rng.gen_range(0.04..0.15),
                }
            })
            .collect();

        let mut biomes = vec![
            Biome::new("Water", Color::rgb(0.1, 0.2, 0.6)),
            Biome::new("Shores", Color::rgb(0.9, 0.85, 0.6)),
            Biome::new("Lowlands", Color::rgb(0.3, 0.6, 0.2)),
            Biome::new("Highlands", Color::rgb(0.5, 0.45, 0.3)),
            Biome::new("Mountains", Color::rgb(0.55, 0.5, 0.5)),
            Biome::new("Ice Caps", Color::rgb(0.95, 0.95, 1.0)),
        ];
        if !config.ocean {
            biomes[WATER] = Biome::new("Basins", Color::rgb(0.35, 0.3, 0.3));
        }

        let ocean_color = Color::parse(&config.ocean_color).unwrap_or(Color::rgba(0.1, 0.1, 0.2, 1.0));

        Self {
            config,
            ocean_color,
            terrain_noise,
            surface_noise,
            craters,
            biomes,
        }
    }

    pub fn config(&self) -> &BodyConfig {
        &self.config
    }

    /// Normalized terrain height in 0..1 at a direction from the center.
    fn height_fraction(&self, dir: [f64; 3]) -> f64 {
        let mut amplitude = 1.0;
        let mut frequency = self.config.frequency;
        let mut total = 0.0;
        let mut norm = 0.0;
        for _ in 0..self.config.octaves.max(1) {
            total += amplitude
                * self
                    .terrain_noise
                    .get([dir[0] * frequency, dir[1] * frequency, dir[2] * frequency]);
            norm += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }
        let mut h = 0.5 + 0.5 * total / norm;

        for crater in &self.craters {
            let d = angle_between(dir, crater.center);
            if d < crater.radius * 1.2 {
                let t = d / crater.radius;
                h += if t < 1.0 {
                    -crater.depth * (1.0 - t * t)
                } else {
                    // Raised rim just outside the bowl
                    crater.depth * 0.3 * (1.0 - (t - 1.0) / 0.2)
                };
            }
        }

        h.clamp(0.0, 1.0)
    }

    /// Height fraction of sea level.
    fn sea_fraction(&self) -> f64 {
        if self.config.ocean {
            self.config.sea_level
        } else {
            0.0
        }
    }
}

impl TerrainOracle for ProceduralBody {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn radius(&self) -> f64 {
        self.config.radius
    }

    fn radius_min(&self) -> f64 {
        self.config.radius - self.sea_fraction() * self.config.relief
    }

    fn radius_delta(&self) -> f64 {
        self.config.relief
    }

    fn has_ocean(&self) -> bool {
        self.config.ocean
    }

    fn ocean_color(&self) -> Color {
        self.ocean_color
    }

    fn altitude(&self, lat: f64, lon: f64, include_ocean_floor: bool) -> Result<f64, OracleError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(OracleError::Query {
                lat,
                lon,
                message: "non-finite coordinate".to_string(),
            });
        }
        let h = self.height_fraction(unit_vector(lat, lon));
        let alt = (h - self.sea_fraction()) * self.config.relief;
        if !include_ocean_floor && self.config.ocean && alt < 0.0 {
            return Ok(0.0);
        }
        Ok(alt)
    }

    fn surface_color(&self, lat: f64, lon: f64) -> Result<Color, OracleError> {
        let dir = unit_vector(lat, lon);
        let h = self.height_fraction(dir);
        let sea = self.sea_fraction();
        let jitter = 0.06 * self.surface_noise.get([dir[0] * 8.0, dir[1] * 8.0, dir[2] * 8.0]) as f32;

        let base = if h < sea {
            let depth = ((sea - h) / sea.max(1e-6)) as f32;
            Color::lerp(Color::rgb(0.25, 0.35, 0.4), Color::rgb(0.05, 0.08, 0.2), depth)
        } else if lat.abs() > 75.0 || h > 0.9 {
            Color::rgb(0.93, 0.94, 0.97)
        } else {
            let land = ((h - sea) / (1.0 - sea).max(1e-6)) as f32;
            if land < 0.5 {
                Color::lerp(Color::rgb(0.35, 0.55, 0.25), Color::rgb(0.5, 0.45, 0.3), land * 2.0)
            } else {
                Color::lerp(Color::rgb(0.5, 0.45, 0.3), Color::rgb(0.6, 0.58, 0.55), (land - 0.5) * 2.0)
            }
        };

        Ok(Color::rgb(
            (base.r + jitter).clamp(0.0, 1.0),
            (base.g + jitter).clamp(0.0, 1.0),
            (base.b + jitter).clamp(0.0, 1.0),
        ))
    }

    fn biome_at(&self, lat: f64, lon: f64) -> Result<&Biome, OracleError> {
        let h = self.height_fraction(unit_vector(lat, lon));
        let sea = self.sea_fraction();
        let land = (h - sea) / (1.0 - sea).max(1e-6);

        let index = if lat.abs() > 75.0 {
            ICE_CAPS
        } else if h < sea || (!self.config.ocean && land < 0.15) {
            WATER
        } else if land < 0.05 {
            SHORES
        } else if land < 0.4 {
            LOWLANDS
        } else if land < 0.75 {
            HIGHLANDS
        } else {
            MOUNTAINS
        };

        Ok(&self.biomes[index])
    }

    fn biomes(&self) -> &[Biome] {
        &self.biomes
    }

    fn is_reentrant(&self) -> bool {
        true
    }
}
