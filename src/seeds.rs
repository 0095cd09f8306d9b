//! Seed management for procedural bodies
//!
//! Each feature of a body gets its own seed derived from the body's master
//! seed, so changing how craters are placed never reshuffles the continents.

/// Seeds for every procedural feature of one body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodySeeds {
    pub master: u64,
    /// Continental fBm and ridges
    pub terrain: u64,
    /// Impact crater placement
    pub craters: u64,
    /// Surface color variation
    pub surface: u64,
}

impl BodySeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            terrain: derive_seed(master, "terrain"),
            craters: derive_seed(master, "craters"),
            surface: derive_seed(master, "surface"),
        }
    }

    /// `noise` generators take 32-bit seeds.
    pub fn noise_seed(seed: u64) -> u32 {
        (seed ^ (seed >> 32)) as u32
    }
}

/// SplitMix64 finalizer.
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derive a sub-seed from a master seed and a feature name. Stable across
/// toolchains and platforms.
fn derive_seed(master: u64, feature: &str) -> u64 {
    feature
        .bytes()
        .fold(splitmix64(master), |acc, b| splitmix64(acc ^ u64::from(b)))
}

impl std::fmt::Display for BodySeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BodySeeds {{ master: {}, terrain: {}, craters: {}, surface: {} }}",
            self.master, self.terrain, self.craters, self.surface,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_derivation() {
        let seeds1 = BodySeeds::from_master(12345);
        let seeds2 = BodySeeds::from_master(12345);
        assert_eq!(seeds1, seeds2);
    }

    #[test]
    fn test_derived_seeds_are_pinned() {
        // Terrain of existing configurations must not move.
        assert_eq!(derive_seed(12345, "terrain"), 2371355931230365613);
        assert_eq!(derive_seed(0, "craters"), 17960422751066747452);
    }

    #[test]
    fn test_different_features_get_different_seeds() {
        let seeds = BodySeeds::from_master(12345);
        assert_ne!(seeds.terrain, seeds.craters);
        assert_ne!(seeds.craters, seeds.surface);
        assert_ne!(seeds.terrain, BodySeeds::from_master(12346).terrain);
    }
}
