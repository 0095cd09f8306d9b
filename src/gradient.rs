//! Piecewise-linear altitude color ramp.

use log::warn;

use crate::color::Color;

/// Ordered `(height fraction, color)` breakpoints, ascending by height.
///
/// A gradient always holds at least two stops. The canonical layout starts at
/// 0.0 and ends at 1.0; heights outside the covered range take the color of
/// the nearest end.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorGradient {
    stops: Vec<(f64, Color)>,
}

impl Default for ColorGradient {
    /// Black at sea floor, white at the highest peak.
    fn default() -> Self {
        Self {
            stops: vec![(0.0, Color::BLACK), (1.0, Color::WHITE)],
        }
    }
}

impl ColorGradient {
    /// Build a gradient from already-parsed stops. Returns `None` for fewer
    /// than two stops or a non-finite key.
    pub fn from_stops(mut stops: Vec<(f64, Color)>) -> Option<Self> {
        if stops.len() < 2 || stops.iter().any(|(k, _)| !k.is_finite()) {
            return None;
        }
        // Stable: equal keys keep their input order.
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Some(Self { stops })
    }

    /// Parse `height → "r,g,b[,a]"` pairs.
    ///
    /// All-or-nothing: a single key that is not a number or a single value
    /// that is not a color rejects the whole gradient.
    pub fn parse<I, K, V>(breakpoints: I) -> Option<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut stops = Vec::new();
        for (key, value) in breakpoints {
            let height = key.as_ref().trim().parse::<f64>().ok()?;
            let color = Color::parse(value.as_ref())?;
            stops.push((height, color));
        }
        Self::from_stops(stops)
    }

    /// Like [`ColorGradient::parse`], substituting the default black→white
    /// ramp when the input is rejected.
    pub fn parse_or_default<I, K, V>(breakpoints: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::parse(breakpoints).unwrap_or_else(|| {
            warn!("Invalid AltitudeColor gradient, using default black to white");
            Self::default()
        })
    }

    pub fn stops(&self) -> &[(f64, Color)] {
        &self.stops
    }

    /// Color for a normalized height.
    pub fn evaluate(&self, height: f64) -> Color {
        let last = self.stops.len() - 1;

        for (k, &(key, color)) in self.stops.iter().enumerate() {
            if k == last {
                return color;
            }

            let (next_key, next_color) = self.stops[k + 1];
            if next_key > height {
                let span = next_key - key;
                let t = if span > 0.0 { (height - key) / span } else { 1.0 };
                return Color::lerp(color, next_color, t as f32);
            }
        }

        self.stops[last].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_grayscale_identity() {
        let gradient = ColorGradient::default();
        for i in 0..=20 {
            let h = i as f64 / 20.0;
            let c = gradient.evaluate(h);
            assert!((c.r as f64 - h).abs() < 1e-6);
            assert!((c.g as f64 - h).abs() < 1e-6);
            assert!((c.b as f64 - h).abs() < 1e-6);
        }
    }

    #[test]
    fn test_parse_sorts_stops() {
        let gradient = ColorGradient::parse([
            ("1", "1,1,1"),
            ("0", "0,0,0"),
            ("0.5", "1,0,0"),
        ])
        .unwrap();

        let keys: Vec<f64> = gradient.stops().iter().map(|s| s.0).collect();
        assert_eq!(keys, vec![0.0, 0.5, 1.0]);

        let c = gradient.evaluate(0.25);
        assert!((c.r - 0.5).abs() < 1e-6);
        assert!(c.g.abs() < 1e-6);

        let c = gradient.evaluate(0.75);
        assert!((c.r - 1.0).abs() < 1e-6);
        assert!((c.g - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_parse_all_or_nothing() {
        assert!(ColorGradient::parse([("0", "0,0,0"), ("oops", "1,1,1")]).is_none());
        assert!(ColorGradient::parse([("0", "0,0,0"), ("1", "1,1")]).is_none());
        assert!(ColorGradient::parse([("0", "0,0,0")]).is_none());
        assert!(ColorGradient::parse(Vec::<(&str, &str)>::new()).is_none());
    }

    #[test]
    fn test_parse_or_default_substitutes() {
        let gradient = ColorGradient::parse_or_default([("0", "0,0,0"), ("1", "bad")]);
        assert_eq!(gradient, ColorGradient::default());
    }

    #[test]
    fn test_last_stop_and_out_of_range() {
        let gradient = ColorGradient::parse([("0", "0,0,1"), ("1", "1,0,0")]).unwrap();
        assert_eq!(gradient.evaluate(1.0), Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(gradient.evaluate(5.0), Color::rgb(1.0, 0.0, 0.0));

        let shifted = ColorGradient::parse([("0.2", "0,0,1"), ("1", "1,0,0")]).unwrap();
        assert_eq!(shifted.evaluate(0.0), Color::rgb(0.0, 0.0, 1.0));
    }
}
