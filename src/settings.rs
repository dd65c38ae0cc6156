//! Round configuration
//!
//! Everything that used to be global state (seed, balance values, map size)
//! lives in one [`GameConfig`] value handed to the map builder and the world,
//! so both peers can rebuild the exact same round from the same config.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Wall art theme. Only the renderer cares; the simulation carries it opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Theme {
    #[default]
    Desert,
    Forest,
    City,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Desert => "Desert",
            Theme::Forest => "Forest",
            Theme::City => "City",
        }
    }
}

impl FromStr for Theme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "desert" => Ok(Theme::Desert),
            "forest" => Ok(Theme::Forest),
            "city" => Ok(Theme::City),
            _ => Err(ConfigError::UnknownTheme(s.to_string())),
        }
    }
}

/// Round configuration shared by both peers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Map generation seed (exchanged at round start)
    pub seed: u64,
    /// Map size in tiles
    pub width: i32,
    pub height: i32,
    /// Wall art theme
    pub theme: Theme,

    // === Walls & bombs ===
    /// Blasts a hard wall absorbs before breaking
    pub hard_wall_hits: u8,
    /// Bomb fuse (seconds)
    pub bomb_lifetime: f32,

    // === Power-ups ===
    /// Chance a destroyed breakable wall drops a pickup (0.0 - 1.0)
    pub power_up_drop_rate: f32,
    /// Lifetime of timed pickups (seconds)
    pub speed_boost_duration: f32,

    // === Movement ===
    pub player_speed: f32,
    pub hitbox_size: f32,
    pub slide_margin: f32,
    pub enemy_speed: f32,

    // === Roster ===
    /// Human players in the round (one chaser is spawned per player)
    pub player_count: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            width: DEFAULT_MAP_WIDTH,
            height: DEFAULT_MAP_HEIGHT,
            theme: Theme::Desert,

            hard_wall_hits: HARD_WALL_HITS,
            bomb_lifetime: BOMB_LIFETIME,

            power_up_drop_rate: POWER_UP_DROP_RATE,
            speed_boost_duration: SPEED_BOOST_DURATION,

            player_speed: PLAYER_SPEED,
            hitbox_size: HITBOX_SIZE,
            slide_margin: SLIDE_MARGIN,
            enemy_speed: ENEMY_SPEED,

            player_count: 2,
        }
    }
}

impl GameConfig {
    /// Default config with the given seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Parse a config from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!(
            "Loaded config from {} (seed {}, {}x{})",
            path.as_ref().display(),
            config.seed,
            config.width,
            config.height
        );
        Ok(config)
    }

    /// Reject sizes that break the border/pillar pattern or the safe zones
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = |n: i32| n >= MIN_MAP_SIZE && n % 2 == 1;
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
                min: MIN_MAP_SIZE,
            })
        }
    }

    /// Half edge length of the collision box
    #[inline]
    pub fn hitbox_half_extent(&self) -> f32 {
        self.hitbox_size / 2.0
    }
}
