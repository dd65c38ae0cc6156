//! Seeded map generation
//!
//! Rounds are built in fixed stages (walls, safe zones, enemies) from one
//! RNG stream, so two peers holding the same config produce the same map.

use glam::IVec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::enemy::{Enemy, EnemyId};
use super::grid::GameMap;
use super::player::PlayerId;
use super::state::{MAP_STREAM, RngState};
use super::wall::{WallFactory, WallKind};
use crate::consts::*;
use crate::error::ConfigError;
use crate::settings::GameConfig;
use crate::{Cell, cell_to_pos};

/// Spawn cells for player 0 (top-left) and player 1 (bottom-right)
pub fn spawn_points(width: i32, height: i32) -> [Cell; 2] {
    [IVec2::new(1, 1), IVec2::new(width - 2, height - 2)]
}

/// Whether `cell` lies in one of the cleared squares around the spawns
pub fn in_safe_zone(width: i32, height: i32, cell: Cell) -> bool {
    let [top_left, bottom_right] = spawn_points(width, height);
    let within = |lo: Cell| {
        cell.x >= lo.x
            && cell.y >= lo.y
            && cell.x < lo.x + SAFE_ZONE_SIZE
            && cell.y < lo.y + SAFE_ZONE_SIZE
    };
    within(top_left) || within(bottom_right - IVec2::splat(SAFE_ZONE_SIZE - 1))
}

/// Staged map generator
pub struct MapBuilder<'a> {
    config: &'a GameConfig,
    factory: &'a dyn WallFactory,
    rng: Pcg32,
    map: GameMap,
    next_enemy_id: u32,
}

impl<'a> MapBuilder<'a> {
    pub fn new(config: &'a GameConfig, factory: &'a dyn WallFactory) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            factory,
            rng: RngState::with_stream(config.seed, MAP_STREAM).to_rng(),
            map: GameMap::new(config.width, config.height),
            next_enemy_id: 0,
        })
    }

    /// Border and pillar grid, then random hard/breakable fill
    pub fn build_walls(&mut self) -> &mut Self {
        let (w, h) = (self.map.width, self.map.height);
        for y in 0..h {
            for x in 0..w {
                let cell = IVec2::new(x, y);
                let border = x == 0 || y == 0 || x == w - 1 || y == h - 1;
                let kind = if border || (x % 2 == 0 && y % 2 == 0) {
                    Some(WallKind::Unbreakable)
                } else if self.rng.random_range(0..100) < HARD_WALL_CHANCE {
                    Some(WallKind::Hard)
                } else if self.rng.random_range(0..100) < BREAKABLE_WALL_CHANCE {
                    Some(WallKind::Breakable)
                } else {
                    None
                };
                self.map
                    .set_wall(cell, kind.map(|k| self.factory.create_wall(k, cell)));
            }
        }
        self
    }

    /// Clear both spawn corners of everything except the pillar grid
    pub fn clear_safe_zones(&mut self) -> &mut Self {
        let (w, h) = (self.map.width, self.map.height);
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let cell = IVec2::new(x, y);
                if !in_safe_zone(w, h, cell) {
                    continue;
                }
                let keep = self
                    .map
                    .wall_at(cell)
                    .is_some_and(|wall| wall.kind() == WallKind::Unbreakable);
                if !keep {
                    self.map.set_wall(cell, None);
                }
            }
        }
        self
    }

    /// One chaser per player, one wanderer, one patrol
    pub fn spawn_enemies(&mut self) -> &mut Self {
        let players = self.config.player_count.clamp(1, 2);
        let speed = self.config.enemy_speed;

        for i in 0..players {
            if let Some(pos) = self.random_free_cell() {
                let id = self.next_id();
                self.map
                    .enemies
                    .push(Enemy::chaser(id, cell_to_pos(pos), speed, PlayerId(i)));
            }
        }
        if let Some(pos) = self.random_free_cell() {
            let id = self.next_id();
            self.map
                .enemies
                .push(Enemy::wanderer(id, cell_to_pos(pos), speed));
        }
        if let Some(pos) = self.random_free_cell() {
            let id = self.next_id();
            self.map.enemies.push(Enemy::patrol(id, cell_to_pos(pos), speed));
        }
        self
    }

    pub fn finish(self) -> GameMap {
        self.map
    }

    /// All stages in order
    pub fn build(config: &GameConfig, factory: &dyn WallFactory) -> Result<GameMap, ConfigError> {
        let mut builder = MapBuilder::new(config, factory)?;
        builder.build_walls().clear_safe_zones().spawn_enemies();
        let map = builder.finish();
        log::info!(
            "Built {}x{} {} map from seed {} ({} breakable, {} hard, {} enemies)",
            map.width,
            map.height,
            factory.theme().as_str(),
            config.seed,
            map.count_walls(WallKind::Breakable),
            map.count_walls(WallKind::Hard),
            map.enemies.len()
        );
        Ok(map)
    }

    /// Build a fixed map from ASCII rows: `#` unbreakable, `B` breakable,
    /// `H` hard, `.` empty. No enemies are placed.
    pub fn from_layout(rows: &[&str], factory: &dyn WallFactory) -> Result<GameMap, ConfigError> {
        let expected = rows.first().map_or(0, |r| r.chars().count());
        if expected == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: expected as i32,
                height: rows.len() as i32,
                min: 1,
            });
        }

        let mut map = GameMap::new(expected as i32, rows.len() as i32);
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != expected {
                return Err(ConfigError::RaggedLayout {
                    row: y,
                    found,
                    expected,
                });
            }
            for (x, ch) in row.chars().enumerate() {
                let cell = IVec2::new(x as i32, y as i32);
                let tag = match ch {
                    '.' => continue,
                    '#' => "unbreakable",
                    'B' => "breakable",
                    'H' => "hard",
                    other => return Err(ConfigError::UnknownWallType(other.to_string())),
                };
                map.set_wall(cell, Some(factory.create_from_tag(tag, cell)?));
            }
        }
        Ok(map)
    }

    fn next_id(&mut self) -> EnemyId {
        let id = EnemyId(self.next_enemy_id);
        self.next_enemy_id += 1;
        id
    }

    /// Rejection-sample an interior cell with no wall, outside the spawn
    /// safe zones. Cramped maps with no such cell fall back to any free cell
    /// other than a spawn point.
    fn random_free_cell(&mut self) -> Option<Cell> {
        let (w, h) = (self.map.width, self.map.height);
        let spawns = spawn_points(w, h);
        let map = &self.map;
        let free = |c: Cell| map.wall_at(c).is_none() && !spawns.contains(&c);
        let away_from_spawns = |c: Cell| free(c) && !in_safe_zone(w, h, c);

        let mut interior = (1..h - 1).flat_map(|y| (1..w - 1).map(move |x| IVec2::new(x, y)));
        let strict = interior.clone().any(&away_from_spawns);
        if !strict && !interior.any(&free) {
            log::warn!("No free interior cell left for an enemy");
            return None;
        }
        if !strict {
            log::warn!("No free cell outside the safe zones, placing enemy inside one");
        }

        loop {
            let cell = IVec2::new(
                self.rng.random_range(1..w - 1),
                self.rng.random_range(1..h - 1),
            );
            let ok = if strict { away_from_spawns(cell) } else { free(cell) };
            if ok {
                return Some(cell);
            }
        }
    }
}
