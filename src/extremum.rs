//! Coarse-to-fine search for the lowest and highest terrain point of a body.
//!
//! A full lat/lon scan at `delta` picks the best grid sample. The search then
//! repeatedly resamples a `delta`-wide window around each retained candidate
//! at `delta / 10`, keeps the `top_k` best samples of all windows, and shrinks
//! `delta` by ten until it drops below `threshold`.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, OracleError};
use crate::geo::GeoSample;
use crate::oracle::TerrainOracle;

/// Samples per window edge during refinement (window / step + 1).
const WINDOW_SAMPLES: usize = 11;

/// Relative slack when comparing `delta` with the threshold, so that
/// `0.1 / 10 / 10 / 10` still counts as `1e-4`.
const DELTA_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtremumKind {
    Lowest,
    Highest,
}

impl ExtremumKind {
    /// Whether `candidate` strictly beats `current`.
    fn beats(self, candidate: f64, current: f64) -> bool {
        match self {
            ExtremumKind::Lowest => candidate < current,
            ExtremumKind::Highest => candidate > current,
        }
    }

    fn rank(self, a: &GeoSample, b: &GeoSample) -> std::cmp::Ordering {
        match self {
            ExtremumKind::Lowest => a.altitude.total_cmp(&b.altitude),
            ExtremumKind::Highest => b.altitude.total_cmp(&a.altitude),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExtremumKind::Lowest => "Lowest Point",
            ExtremumKind::Highest => "Highest Point",
        }
    }
}

/// Tuning of one search.
///
/// The lowest point is traditionally refined one decade further than the
/// highest point (`1e-4` against `1e-3`); see [`SearchParams::for_kind`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Step of the coarse scan, in degrees.
    pub delta: f64,
    /// Candidates kept between refinement levels.
    pub top_k: usize,
    /// Refinement stops once the window size falls below this.
    pub threshold: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            delta: 0.1,
            top_k: 100,
            threshold: 1e-3,
        }
    }
}

impl SearchParams {
    pub fn for_kind(kind: ExtremumKind) -> Self {
        match kind {
            ExtremumKind::Lowest => Self {
                threshold: 1e-4,
                ..Self::default()
            },
            ExtremumKind::Highest => Self::default(),
        }
    }

    /// Replace a step or threshold that is not a finite positive number with
    /// the default for `kind`, and raise `top_k` to at least one.
    pub fn validated(&self, kind: ExtremumKind) -> Self {
        let defaults = Self::for_kind(kind);
        let positive = |key: &'static str, value: f64, default: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                let err = ConfigError::InvalidValue {
                    key,
                    value: value.to_string(),
                    default: default.to_string(),
                };
                warn!("{}", err);
                default
            }
        };
        Self {
            delta: positive("delta", self.delta, defaults.delta),
            top_k: self.top_k.max(1),
            threshold: positive("threshold", self.threshold, defaults.threshold),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtremumResult {
    pub kind: ExtremumKind,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl ExtremumResult {
    fn from_sample(kind: ExtremumKind, sample: GeoSample) -> Self {
        Self {
            kind,
            latitude: sample.latitude,
            longitude: sample.longitude,
            altitude: sample.altitude,
        }
    }

    /// Report block: label, then `LAT =`, `LON =`, `ALT =` lines.
    pub fn report_lines(&self) -> Vec<String> {
        vec![
            self.kind.label().to_string(),
            format!("LAT = {}", self.latitude),
            format!("LON = {}", self.longitude),
            format!("ALT = {}", self.altitude),
        ]
    }
}

fn sample<O: TerrainOracle + ?Sized>(oracle: &O, lat: f64, lon: f64) -> Result<GeoSample, OracleError> {
    let altitude = oracle.altitude(lat, lon, true)?;
    Ok(GeoSample {
        latitude: lat,
        longitude: lon,
        altitude,
    })
}

fn wrap_longitude(lon: f64) -> f64 {
    let lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if lon >= 180.0 {
        -180.0
    } else {
        lon
    }
}

/// Scan the whole body at `delta`, longitude-major, and return the single
/// best sample. Ties keep the first sample visited.
fn coarse_pass<O: TerrainOracle + ?Sized>(
    oracle: &O,
    kind: ExtremumKind,
    delta: f64,
) -> Result<GeoSample, OracleError> {
    let lon_steps = (360.0 / delta - DELTA_EPSILON).ceil() as usize;
    let lat_steps = (180.0 / delta + DELTA_EPSILON).floor() as usize + 1;

    // The first grid point is (-90, -180).
    let mut best = sample(oracle, -90.0, -180.0)?;
    let points = (0..lon_steps).flat_map(|i| (0..lat_steps).map(move |j| (i, j)));
    for (i, j) in points.skip(1) {
        let lon = -180.0 + i as f64 * delta;
        let lat = (-90.0 + j as f64 * delta).min(90.0);
        let s = sample(oracle, lat, lon)?;
        if kind.beats(s.altitude, best.altitude) {
            best = s;
        }
    }

    Ok(best)
}

/// Resample a `delta`-wide window around every candidate at `delta / 10` and
/// return the pooled samples ranked best first.
fn refine<O: TerrainOracle + ?Sized>(
    oracle: &O,
    kind: ExtremumKind,
    candidates: &[GeoSample],
    delta: f64,
) -> Result<Vec<GeoSample>, OracleError> {
    let step = delta / 10.0;
    let mut pool = Vec::with_capacity(candidates.len() * WINDOW_SAMPLES * WINDOW_SAMPLES);

    for c in candidates {
        for i in 0..WINDOW_SAMPLES {
            let lon = wrap_longitude(c.longitude - delta / 2.0 + i as f64 * step);
            for j in 0..WINDOW_SAMPLES {
                let lat = (c.latitude - delta / 2.0 + j as f64 * step).clamp(-90.0, 90.0);
                pool.push(sample(oracle, lat, lon)?);
            }
        }
    }

    // Stable sort: among equal altitudes the first sample visited stays first.
    pool.sort_by(|a, b| kind.rank(a, b));
    Ok(pool)
}

/// Locate the lowest or highest point of a body.
pub fn find<O: TerrainOracle + ?Sized>(
    oracle: &O,
    kind: ExtremumKind,
    params: &SearchParams,
) -> Result<ExtremumResult, OracleError> {
    let params = params.validated(kind);
    let top_k = params.top_k;

    let best = coarse_pass(oracle, kind, params.delta)?;
    debug!(
        "{} coarse pass on {}: lat {:.4} lon {:.4} alt {:.2}",
        kind.label(),
        oracle.name(),
        best.latitude,
        best.longitude,
        best.altitude
    );

    let mut candidates = vec![best];
    let mut delta = params.delta;
    while delta >= params.threshold * (1.0 - DELTA_EPSILON) {
        let mut pool = refine(oracle, kind, &candidates, delta)?;
        pool.truncate(top_k);
        candidates = pool;
        delta /= 10.0;
        debug!(
            "{} refined to step {:e}: alt {:.4}",
            kind.label(),
            delta,
            candidates[0].altitude
        );
    }

    Ok(ExtremumResult::from_sample(kind, candidates[0]))
}
