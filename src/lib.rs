//! Blast Arena - a two-player grid arena simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (walls, blasts, bombs, movement, power-ups)
//! - `net`: Inbound/outbound event boundary and the per-tick inbound queue
//! - `settings`: Round configuration (seed, map size, balance values)
//! - `error`: Configuration errors

pub mod error;
pub mod net;
pub mod settings;
pub mod sim;

pub use error::ConfigError;
pub use settings::{GameConfig, Theme};

use glam::{IVec2, Vec2};

/// Integer grid coordinate of a single tile
pub type Cell = IVec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default arena size in tiles (odd so the pillar pattern closes at the border)
    pub const DEFAULT_MAP_WIDTH: i32 = 15;
    pub const DEFAULT_MAP_HEIGHT: i32 = 13;
    /// Smallest map that still fits two 3x3 safe zones inside the border
    pub const MIN_MAP_SIZE: i32 = 7;

    /// Bomb fuse in seconds
    pub const BOMB_LIFETIME: f32 = 3.0;
    /// Blasts a hard wall absorbs before it breaks
    pub const HARD_WALL_HITS: u8 = 2;

    /// Procedural generation rolls (percent)
    pub const HARD_WALL_CHANCE: u32 = 10;
    pub const BREAKABLE_WALL_CHANCE: u32 = 40;
    /// Side length of the cleared square at each spawn corner
    pub const SAFE_ZONE_SIZE: i32 = 3;

    /// Player defaults
    pub const PLAYER_SPEED: f32 = 3.5;
    pub const PLAYER_BOMB_POWER: u32 = 1;
    pub const PLAYER_MAX_BOMBS: u32 = 1;

    /// Collision box edge length in tiles
    pub const HITBOX_SIZE: f32 = 0.55;
    /// Perpendicular probe distance for corner sliding
    pub const SLIDE_MARGIN: f32 = 0.15;

    /// Power-up balance
    pub const POWER_UP_DROP_RATE: f32 = 0.25;
    pub const SPEED_BOOST_MULTIPLIER: f32 = 1.5;
    pub const SPEED_BOOST_DURATION: f32 = 8.0;

    /// Enemy walking speed (tiles/s)
    pub const ENEMY_SPEED: f32 = 1.2;
}

/// Tile occupied by a continuous position.
///
/// Positions are tile-aligned at integer values, so an entity standing at
/// (1.0, 1.0) occupies cell (1, 1) and crosses into (2, 1) at x = 1.5.
#[inline]
pub fn tile_of(pos: Vec2) -> Cell {
    IVec2::new((pos.x + 0.5).floor() as i32, (pos.y + 0.5).floor() as i32)
}

/// Continuous position of a cell (inverse of [`tile_of`] at tile centres)
#[inline]
pub fn cell_to_pos(cell: Cell) -> Vec2 {
    cell.as_vec2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_of_rounds_half_up() {
        assert_eq!(tile_of(Vec2::new(1.0, 1.0)), IVec2::new(1, 1));
        assert_eq!(tile_of(Vec2::new(1.49, 0.51)), IVec2::new(1, 1));
        assert_eq!(tile_of(Vec2::new(1.5, 2.5)), IVec2::new(2, 3));
        // Negative side must floor, not truncate
        assert_eq!(tile_of(Vec2::new(-0.6, 0.0)), IVec2::new(-1, 0));
    }

    #[test]
    fn test_cell_round_trip_at_centres() {
        let cell = IVec2::new(7, 4);
        assert_eq!(tile_of(cell_to_pos(cell)), cell);
    }
}
