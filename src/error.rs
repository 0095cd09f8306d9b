//! Error taxonomy for map synthesis and body reports.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single terrain query.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("terrain query failed at lat {lat:.5}, lon {lon:.5}: {message}")]
    Query { lat: f64, lon: f64, message: String },
}

/// Failures of a map synthesis pass.
///
/// `Allocation` and `Oracle` abort the pass for the whole body; `Encode` and
/// `Io` only abort the tile being written.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to allocate {what} buffer of {width}x{height}")]
    Allocation {
        what: &'static str,
        width: usize,
        height: usize,
    },

    #[error("terrain query failed for tile {tile} at pixel ({x}, {y})")]
    Oracle {
        tile: usize,
        x: i64,
        y: i64,
        #[source]
        source: OracleError,
    },

    #[error("failed to encode {layer} for tile {tile}")]
    Encode {
        layer: &'static str,
        tile: usize,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MapError {
    /// Whether the error invalidates the rest of the body's pass rather than
    /// just the current tile.
    pub fn aborts_body(&self) -> bool {
        matches!(self, MapError::Allocation { .. } | MapError::Oracle { .. })
    }
}

/// Configuration problems.
///
/// `Read` and `Parse` are fatal for the file being loaded. `InvalidValue` is
/// reported and the documented default is used instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for `{key}`: {value}, using default {default}")]
    InvalidValue {
        key: &'static str,
        value: String,
        default: String,
    },
}

/// `err` followed by each of its sources, separated by `: `.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_classification() {
        let alloc = MapError::Allocation { what: "height", width: 4, height: 4 };
        assert!(alloc.aborts_body());

        let io = MapError::Io {
            path: PathBuf::from("x.png"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(!io.aborts_body());
    }

    #[test]
    fn test_oracle_message_has_context() {
        let err = MapError::Oracle {
            tile: 7,
            x: 3,
            y: -1,
            source: OracleError::Query { lat: 1.0, lon: 2.0, message: "boom".into() },
        };
        assert_eq!(err.to_string(), "terrain query failed for tile 7 at pixel (3, -1)");
    }

    #[test]
    fn test_error_chain_includes_source() {
        let err = MapError::Oracle {
            tile: 2,
            x: 0,
            y: 0,
            source: OracleError::Query { lat: 0.0, lon: 0.0, message: "no terrain".into() },
        };
        let chain = error_chain(&err);
        assert!(chain.starts_with("terrain query failed for tile 2"));
        assert!(chain.ends_with("no terrain"));
    }
}
