//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (one stream per concern)
//! - Stable iteration order (players by id, bombs by placement)
//! - No rendering, transport or platform dependencies

pub mod bomb;
pub mod builder;
pub mod collision;
pub mod enemy;
pub mod grid;
pub mod player;
pub mod powerup;
pub mod state;
pub mod tick;
pub mod wall;

pub use bomb::{Bomb, BombId, Detonation, Origin, Subscriber, Subscribers};
pub use builder::{MapBuilder, in_safe_zone, spawn_points};
pub use collision::{Body, box_blocked, boxes_overlap, resolve_move};
pub use enemy::{Direction, Enemy, EnemyId, EnemyKind, Movement};
pub use grid::{BlastReport, DIRECTIONS, GameMap, Propagation};
pub use player::{BasePlayer, LifeState, Player, PlayerId, rewrap};
pub use powerup::{Decorated, DropRoller, Modifier, PowerUp, PowerUpKind};
pub use state::{Control, GameEvent, GamePhase, PlayerSlot, RngState, Role, World};
pub use tick::{FixedStep, TickInput, apply_inbound, tick};
pub use wall::{HitOutcome, ThemedWallFactory, Wall, WallBody, WallFactory, WallKind, WallVisual};
