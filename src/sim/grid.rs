//! Tile grid, blast propagation and tile queries
//!
//! The map owns every wall plus the live enemy, bomb and power-up lists.
//! All cell lookups go through [`GameMap::index`], so an out-of-bounds probe
//! reads as "no wall" for blasts and "solid" for movement instead of failing.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::bomb::Bomb;
use super::enemy::{Enemy, EnemyId};
use super::powerup::{DropRoller, PowerUp};
use super::wall::{HitOutcome, Wall, WallKind};
use crate::Cell;

/// Blast directions, walked in this order
pub const DIRECTIONS: [IVec2; 4] = [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y];

/// Whether a blast keeps travelling past a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Everything one blast did to the map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlastReport {
    /// Every notified cell, origin first, then +x, -x, +y, -y arms
    pub cells: Vec<Cell>,
    /// Hard walls that survived a hit, with hits left
    pub damaged: Vec<(Cell, u8)>,
    /// Walls removed by this blast
    pub destroyed: Vec<(Cell, WallKind)>,
    /// Power-ups dropped by destroyed walls
    pub spawned: Vec<PowerUp>,
}

impl BlastReport {
    pub fn touches(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }
}

/// The arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMap {
    pub width: i32,
    pub height: i32,
    /// Row-major wall slots
    walls: Vec<Option<Wall>>,
    pub enemies: Vec<Enemy>,
    pub bombs: Vec<Bomb>,
    pub power_ups: Vec<PowerUp>,
    /// Present only on the peer that decides drops
    #[serde(skip)]
    drops: Option<DropRoller>,
}

impl GameMap {
    /// Empty map with no walls
    pub fn new(width: i32, height: i32) -> Self {
        let len = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            walls: vec![None; len],
            enemies: Vec::new(),
            bombs: Vec::new(),
            power_ups: Vec::new(),
            drops: None,
        }
    }

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    #[inline]
    fn index(&self, cell: Cell) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.y * self.width + cell.x) as usize)
    }

    pub fn wall_at(&self, cell: Cell) -> Option<&Wall> {
        self.index(cell).and_then(|i| self.walls[i].as_ref())
    }

    /// Place or clear a wall. Out-of-bounds writes are ignored.
    pub fn set_wall(&mut self, cell: Cell, wall: Option<Wall>) {
        if let Some(i) = self.index(cell) {
            self.walls[i] = wall;
        }
    }

    pub fn remove_wall(&mut self, cell: Cell) -> Option<Wall> {
        let i = self.index(cell)?;
        self.walls[i].take()
    }

    /// Whether movement into this cell is blocked
    pub fn is_solid(&self, cell: Cell) -> bool {
        match self.index(cell) {
            None => true,
            Some(i) => self.walls[i].as_ref().is_some_and(|w| !w.is_destroyed()),
        }
    }

    /// All standing walls with their cells, row-major
    pub fn walls(&self) -> impl Iterator<Item = (Cell, &Wall)> + '_ {
        let width = self.width;
        self.walls.iter().enumerate().filter_map(move |(i, w)| {
            w.as_ref()
                .map(|w| (IVec2::new(i as i32 % width, i as i32 / width), w))
        })
    }

    pub fn count_walls(&self, kind: WallKind) -> usize {
        self.walls().filter(|(_, w)| w.kind() == kind).count()
    }

    /// Install (or remove) the power-up drop roller
    pub fn set_drop_roller(&mut self, drops: Option<DropRoller>) {
        self.drops = drops;
    }

    pub fn drops_enabled(&self) -> bool {
        self.drops.is_some()
    }

    pub fn bomb_at(&self, cell: Cell) -> Option<&Bomb> {
        self.bombs
            .iter()
            .find(|b| b.cell == cell && !b.is_exploded())
    }

    pub fn power_up_at(&self, cell: Cell) -> Option<&PowerUp> {
        self.power_ups
            .iter()
            .find(|p| p.cell == cell && !p.is_collected())
    }

    pub fn power_up_at_mut(&mut self, cell: Cell) -> Option<&mut PowerUp> {
        self.power_ups
            .iter_mut()
            .find(|p| p.cell == cell && !p.is_collected())
    }

    pub fn enemy(&self, id: EnemyId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn enemy_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    /// Add a power-up unless an uncollected one already sits on the cell
    pub fn add_power_up(&mut self, power_up: PowerUp) -> bool {
        if !self.in_bounds(power_up.cell) || self.power_up_at(power_up.cell).is_some() {
            return false;
        }
        self.power_ups.push(power_up);
        true
    }

    /// Run a blast from `origin` with radius `power`.
    ///
    /// The origin is always hit. Each arm then walks up to `power` cells and
    /// stops at the map edge or at the first wall of any kind.
    pub fn apply_blast(&mut self, origin: Cell, power: u32) -> BlastReport {
        let mut report = BlastReport::default();

        self.blast_cell(origin, &mut report);

        for dir in DIRECTIONS {
            for step in 1..=power as i32 {
                let cell = origin + dir * step;
                if !self.in_bounds(cell) {
                    break;
                }
                if self.blast_cell(cell, &mut report) == Propagation::Stop {
                    break;
                }
            }
        }

        report
    }

    /// Per-cell blast effect
    fn blast_cell(&mut self, cell: Cell, report: &mut BlastReport) -> Propagation {
        report.cells.push(cell);

        let Some(i) = self.index(cell) else {
            return Propagation::Stop;
        };
        let Some(wall) = self.walls[i].as_mut() else {
            return Propagation::Continue;
        };

        let kind = wall.kind();
        match wall.take_hit() {
            HitOutcome::Absorbed => {}
            HitOutcome::Damaged { hits_remaining } => {
                report.damaged.push((cell, hits_remaining));
            }
            HitOutcome::Destroyed => {
                self.walls[i] = None;
                report.destroyed.push((cell, kind));
                if kind == WallKind::Breakable {
                    self.roll_drop(cell, report);
                }
            }
        }
        Propagation::Stop
    }

    fn roll_drop(&mut self, cell: Cell, report: &mut BlastReport) {
        let Some(drops) = self.drops.as_mut() else {
            return;
        };
        if let Some(power_up) = drops.roll(cell) {
            if self.add_power_up(power_up.clone()) {
                report.spawned.push(power_up);
            }
        }
    }
}
