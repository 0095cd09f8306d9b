//! Planetary map tiler
//!
//! Samples a body's terrain through a [`oracle::TerrainOracle`] and writes
//! tiled height, normal, slope, color, ocean, biome and satellite maps, plus
//! reports of the lowest and highest point of each body.

pub mod addressing;
pub mod color;
pub mod driver;
pub mod error;
pub mod export;
pub mod extremum;
pub mod geo;
pub mod gradient;
pub mod oracle;
pub mod procedural;
pub mod rasterize;
pub mod report;
pub mod seeds;
pub mod settings;
pub mod tilemap;
