//! Equirectangular pixel grid to latitude/longitude mapping.

/// One oracle query result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoSample {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// Maps absolute pixel coordinates of the full map to geographic degrees.
///
/// `grid_width` pixels span 360° of longitude; the same pixel pitch is used
/// for latitude, so the full map is `grid_width / 2` pixels tall. Pixel rows
/// grow northwards from the south pole.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub grid_width: usize,
    pub lat_offset: f64,
    pub lon_offset: f64,
}

impl Projection {
    pub fn new(grid_width: usize, lat_offset: f64, lon_offset: f64) -> Self {
        Self {
            grid_width,
            lat_offset,
            lon_offset,
        }
    }

    fn degrees_per_pixel(&self) -> f64 {
        360.0 / self.grid_width as f64
    }

    /// Longitude in `[-180, 180)` of pixel column `px`. Negative columns and
    /// columns past the grid width wrap around.
    pub fn longitude(&self, px: i64) -> f64 {
        let mut lon = (px as f64 * self.degrees_per_pixel() + self.lon_offset).rem_euclid(360.0);
        if lon >= 360.0 {
            lon = 0.0;
        }
        lon - 180.0
    }

    /// Latitude of pixel row `py`.
    ///
    /// The raw value is taken modulo 180 (sign following the dividend); a
    /// result below -90 is shifted up by 180, which folds rows past the
    /// south pole back onto the opposite end of the grid.
    pub fn latitude(&self, py: i64) -> f64 {
        let lat = (py as f64 * self.degrees_per_pixel() - self.lat_offset) % 180.0 - 90.0;
        if lat < -90.0 {
            lat + 180.0
        } else {
            lat
        }
    }

    pub fn lat_lon(&self, px: i64, py: i64) -> (f64, f64) {
        (self.latitude(py), self.longitude(px))
    }

    /// Whether the grid wraps across a pole between row `py` and one of its
    /// vertical neighbours, i.e. adjacent rows are more than 90° apart.
    ///
    /// Finite differences taken across such a seam are meaningless, so these
    /// rows get a flat slope instead.
    pub fn is_polar_edge(&self, py: i64) -> bool {
        let lat = self.latitude(py);
        let below = self.latitude(py - 1);
        let above = self.latitude(py + 1);

        below - lat > 90.0 || lat - above > 90.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longitude_range_and_origin() {
        let proj = Projection::new(8, 0.0, 0.0);
        assert_eq!(proj.longitude(0), -180.0);
        assert_eq!(proj.longitude(4), 0.0);
        assert_eq!(proj.longitude(7), 135.0);
        assert_eq!(proj.longitude(-1), 135.0);
        for px in -20..20 {
            let lon = proj.longitude(px);
            assert!((-180.0..180.0).contains(&lon), "lon {lon} for px {px}");
        }
    }

    #[test]
    fn test_longitude_is_periodic() {
        for &(lat_offset, lon_offset) in &[(0.0, 0.0), (12.5, -77.25), (-3.0, 400.0)] {
            let proj = Projection::new(1000, lat_offset, lon_offset);
            for px in [-1001i64, -1, 0, 1, 17, 999] {
                let a = proj.longitude(px);
                let b = proj.longitude(px + 1000);
                let diff = (a - b).rem_euclid(360.0);
                assert!(diff < 1e-9 || 360.0 - diff < 1e-9, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_latitude_rows() {
        let proj = Projection::new(8, 0.0, 0.0);
        assert_eq!(proj.latitude(0), -90.0);
        assert_eq!(proj.latitude(1), -45.0);
        assert_eq!(proj.latitude(2), 0.0);
        assert_eq!(proj.latitude(3), 45.0);
        // Rows past either pole wrap onto the opposite end.
        assert_eq!(proj.latitude(4), -90.0);
        assert_eq!(proj.latitude(-1), 45.0);
    }

    #[test]
    fn test_polar_edge_rows() {
        let proj = Projection::new(8, 0.0, 0.0);
        assert!(proj.is_polar_edge(0));
        assert!(!proj.is_polar_edge(1));
        assert!(!proj.is_polar_edge(2));
        assert!(proj.is_polar_edge(3));
    }

    #[test]
    fn test_no_polar_edge_in_mid_latitudes() {
        let proj = Projection::new(2048, 0.0, 0.0);
        for py in 10..1014 {
            assert!(!proj.is_polar_edge(py), "row {py}");
        }
    }
}
