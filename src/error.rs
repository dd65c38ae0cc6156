//! Configuration errors
//!
//! The simulation itself never fails at runtime: out-of-bounds probes, double
//! detonations and stale network events are all handled in place. What can
//! fail is building a round from bad configuration, and that is fatal.

/// Errors raised while building a round from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A wall type tag that no factory knows how to build.
    #[error("unknown wall type '{0}'")]
    UnknownWallType(String),

    /// A theme name that does not match any wall factory.
    #[error("unknown theme '{0}'")]
    UnknownTheme(String),

    /// A power-up tag that does not match any pickup kind.
    #[error("unknown power-up '{0}'")]
    UnknownPowerUp(String),

    /// Map dimensions that cannot hold a border, pillars and two safe zones.
    #[error("invalid map dimensions {width}x{height} (need odd sizes >= {min})")]
    InvalidDimensions { width: i32, height: i32, min: i32 },

    /// A layout row whose length differs from the first row.
    #[error("layout row {row} has width {found}, expected {expected}")]
    RaggedLayout {
        row: usize,
        found: usize,
        expected: usize,
    },

    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for [`crate::GameConfig`].
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}
