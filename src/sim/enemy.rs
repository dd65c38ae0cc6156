//! Enemies and their movement strategies
//!
//! Strategies are plain data on the enemy so the whole roster stays
//! serializable and the authority peer can step it deterministically from a
//! seeded RNG.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::box_blocked;
use super::grid::GameMap;
use super::player::PlayerId;
use crate::{Cell, tile_of};

/// Stable enemy id, shared by both peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

/// Roster slot, used when spawning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyKind {
    Chaser,
    Wanderer,
    Patrol,
}

/// Grid heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn vector(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::NEG_Y,
            Direction::Down => Vec2::Y,
            Direction::Left => Vec2::NEG_X,
            Direction::Right => Vec2::X,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    fn random(rng: &mut Pcg32) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// Ticks a wanderer keeps its heading
const WANDER_STEPS: std::ops::Range<u32> = 15..45;
/// Ticks after bumping into something
const WANDER_BLOCKED_STEPS: std::ops::Range<u32> = 10..40;

/// Movement strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Movement {
    /// Home in on one player
    Chase { target: PlayerId },
    /// Random heading, re-rolled periodically
    Wander {
        direction: Direction,
        steps_remaining: u32,
    },
    /// Walk left and right, turning at walls
    Patrol { direction: Direction },
}

impl Movement {
    pub fn kind(&self) -> EnemyKind {
        match self {
            Movement::Chase { .. } => EnemyKind::Chaser,
            Movement::Wander { .. } => EnemyKind::Wanderer,
            Movement::Patrol { .. } => EnemyKind::Patrol,
        }
    }
}

/// An enemy on the map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EnemyId,
    pub pos: Vec2,
    /// Tiles per second
    pub speed: f32,
    pub movement: Movement,
    alive: bool,
}

impl Enemy {
    pub fn new(id: EnemyId, pos: Vec2, speed: f32, movement: Movement) -> Self {
        Self {
            id,
            pos,
            speed,
            movement,
            alive: true,
        }
    }

    pub fn chaser(id: EnemyId, pos: Vec2, speed: f32, target: PlayerId) -> Self {
        Self::new(id, pos, speed, Movement::Chase { target })
    }

    pub fn wanderer(id: EnemyId, pos: Vec2, speed: f32) -> Self {
        Self::new(
            id,
            pos,
            speed,
            Movement::Wander {
                direction: Direction::Right,
                steps_remaining: 0,
            },
        )
    }

    pub fn patrol(id: EnemyId, pos: Vec2, speed: f32) -> Self {
        Self::new(
            id,
            pos,
            speed,
            Movement::Patrol {
                direction: Direction::Right,
            },
        )
    }

    pub fn kind(&self) -> EnemyKind {
        self.movement.kind()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Returns true on the Alive -> Dead transition
    pub fn kill(&mut self) -> bool {
        std::mem::replace(&mut self.alive, false)
    }

    pub fn cell(&self) -> Cell {
        tile_of(self.pos)
    }

    /// React to one blast cell. Returns true if this killed the enemy.
    pub fn on_explosion_cell(&mut self, cell: Cell) -> bool {
        self.alive && self.cell() == cell && self.kill()
    }

    /// Run one AI step. `targets` lists live player positions.
    /// Returns true if the enemy moved.
    pub fn think(
        &mut self,
        map: &GameMap,
        targets: &[(PlayerId, Vec2)],
        rng: &mut Pcg32,
        dt: f32,
        half_extent: f32,
    ) -> bool {
        if !self.alive {
            return false;
        }

        let step = self.speed * dt;
        let free = |pos: Vec2| !box_blocked(map, pos, half_extent);

        let next = match &mut self.movement {
            Movement::Chase { target } => {
                let Some(&(_, goal)) = targets.iter().find(|(id, _)| *id == *target) else {
                    return false;
                };
                let delta = (goal - self.pos).clamp(Vec2::splat(-step), Vec2::splat(step));
                [
                    delta,
                    Vec2::new(delta.x, 0.0),
                    Vec2::new(0.0, delta.y),
                ]
                .into_iter()
                .filter(|d| *d != Vec2::ZERO)
                .map(|d| self.pos + d)
                .find(|p| free(*p))
            }
            Movement::Wander {
                direction,
                steps_remaining,
            } => {
                if *steps_remaining == 0 {
                    *direction = Direction::random(rng);
                    *steps_remaining = rng.random_range(WANDER_STEPS);
                }
                let target = self.pos + direction.vector() * step;
                if free(target) {
                    *steps_remaining -= 1;
                    Some(target)
                } else {
                    *direction = Direction::random(rng);
                    *steps_remaining = rng.random_range(WANDER_BLOCKED_STEPS);
                    None
                }
            }
            Movement::Patrol { direction } => {
                let target = self.pos + direction.vector() * step;
                if free(target) {
                    Some(target)
                } else {
                    *direction = direction.reversed();
                    None
                }
            }
        };

        match next {
            Some(pos) => {
                self.pos = pos;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::builder::MapBuilder;
    use crate::sim::collision::Body;
    use crate::sim::wall::ThemedWallFactory;
    use glam::IVec2;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    fn hall() -> GameMap {
        MapBuilder::from_layout(
            &[
                "#########", //
                "#.......#", //
                "#.#.#.#.#", //
                "#.......#", //
                "#########",
            ],
            &ThemedWallFactory::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_chaser_closes_distance() {
        let map = hall();
        let mut rng = Pcg32::seed_from_u64(0);
        let half = Body::default().half_extent;
        let mut enemy = Enemy::chaser(EnemyId(0), Vec2::new(7.0, 1.0), 1.2, PlayerId(1));
        let targets = [(PlayerId(1), Vec2::new(1.0, 1.0))];

        let before = enemy.pos.distance(targets[0].1);
        for _ in 0..60 {
            enemy.think(&map, &targets, &mut rng, DT, half);
        }
        let after = enemy.pos.distance(targets[0].1);
        assert!((before - after - 1.2).abs() < 1e-3);
        assert!(!box_blocked(&map, enemy.pos, half));
    }

    #[test]
    fn test_chaser_without_target_holds() {
        let map = hall();
        let mut rng = Pcg32::seed_from_u64(0);
        let mut enemy = Enemy::chaser(EnemyId(0), Vec2::new(7.0, 1.0), 1.2, PlayerId(1));
        let targets = [(PlayerId(0), Vec2::new(1.0, 1.0))];
        assert!(!enemy.think(&map, &targets, &mut rng, DT, 0.275));
        assert_eq!(enemy.pos, Vec2::new(7.0, 1.0));
    }

    #[test]
    fn test_chaser_falls_back_to_single_axis() {
        let map = hall();
        let mut rng = Pcg32::seed_from_u64(0);
        // Target is down-left, but the pillar at (2,2) blocks the diagonal
        let mut enemy = Enemy::chaser(EnemyId(0), Vec2::new(3.0, 1.0), 1.2, PlayerId(0));
        let targets = [(PlayerId(0), Vec2::new(1.0, 3.0))];
        for _ in 0..30 {
            enemy.think(&map, &targets, &mut rng, DT, 0.275);
            assert!(!box_blocked(&map, enemy.pos, 0.275));
        }
        assert!(enemy.pos.x < 3.0);
    }

    #[test]
    fn test_patrol_turns_at_wall() {
        let map = hall();
        let mut rng = Pcg32::seed_from_u64(0);
        let mut enemy = Enemy::patrol(EnemyId(2), Vec2::new(6.5, 1.0), 1.2);
        let mut turned = false;
        for _ in 0..120 {
            enemy.think(&map, &[], &mut rng, DT, 0.275);
            if matches!(
                enemy.movement,
                Movement::Patrol {
                    direction: Direction::Left
                }
            ) {
                turned = true;
            }
        }
        assert!(turned);
        assert_eq!(enemy.pos.y, 1.0);
        assert!(!box_blocked(&map, enemy.pos, 0.275));
    }

    #[test]
    fn test_wander_is_seeded() {
        let map = hall();
        let run = |seed| {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut enemy = Enemy::wanderer(EnemyId(1), Vec2::new(3.0, 3.0), 1.2);
            for _ in 0..300 {
                enemy.think(&map, &[], &mut rng, DT, 0.275);
                assert!(!box_blocked(&map, enemy.pos, 0.275));
            }
            enemy.pos
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn test_dead_enemy_is_inert() {
        let map = hall();
        let mut rng = Pcg32::seed_from_u64(0);
        let mut enemy = Enemy::patrol(EnemyId(2), Vec2::new(3.0, 1.0), 1.2);
        assert!(!enemy.on_explosion_cell(IVec2::new(4, 1)));
        assert!(enemy.on_explosion_cell(IVec2::new(3, 1)));
        assert!(!enemy.is_alive());
        assert!(!enemy.kill());
        assert!(!enemy.think(&map, &[], &mut rng, DT, 0.275));
    }
}
