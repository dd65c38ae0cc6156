//! Players: capability surface, base implementation and life state
//!
//! Everything the loop needs from a player goes through the [`Player`]
//! trait so power-up layers (see `powerup`) can wrap a player and override a
//! single stat while delegating the rest.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{Body, resolve_move};
use super::grid::GameMap;
use crate::consts::*;
use crate::{Cell, tile_of};

/// Stable player id (0 = top-left spawn, 1 = bottom-right spawn)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

/// Player capability surface
pub trait Player: fmt::Debug {
    fn id(&self) -> PlayerId;

    /// Tiles per second
    fn speed(&self) -> f32;
    /// Blast radius of bombs this player places
    fn bomb_power(&self) -> u32;
    /// Bombs this player may have ticking at once
    fn max_bomb_count(&self) -> u32;

    fn position(&self) -> Vec2;
    fn is_alive(&self) -> bool;

    /// Move by an already speed-scaled delta, resolving collisions
    fn move_by(&mut self, delta: Vec2, map: &GameMap, body: &Body);
    /// Snap to an authoritative position (remote players)
    fn warp_to(&mut self, pos: Vec2);

    /// Advance timers by `dt` seconds
    fn update(&mut self, dt: f32);

    /// React to one blast cell. Returns true if this killed the player.
    fn on_explosion_cell(&mut self, cell: Cell) -> bool;
    /// Kill outright (enemy contact, remote elimination). Returns true on transition.
    fn kill(&mut self) -> bool;

    /// True if any wrapping layer has run out
    fn has_expired_layer(&self) -> bool {
        false
    }

    /// Drop every expired layer, keeping all others in order
    fn strip_expired(self: Box<Self>) -> Box<dyn Player>;

    /// Number of power-up layers around the base player
    fn layer_count(&self) -> usize {
        0
    }

    fn cell(&self) -> Cell {
        tile_of(self.position())
    }
}

/// Alive/Dead lifecycle. Dead is terminal for the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LifeState {
    #[default]
    Alive,
    Dead,
}

impl LifeState {
    fn handle_move(self, pos: Vec2, delta: Vec2, map: &GameMap, body: &Body) -> Vec2 {
        match self {
            LifeState::Alive => resolve_move(map, pos, delta, body),
            LifeState::Dead => pos,
        }
    }

    fn handle_explosion(self, pos: Vec2, cell: Cell) -> LifeState {
        match self {
            LifeState::Alive if tile_of(pos) == cell => LifeState::Dead,
            state => state,
        }
    }
}

/// Undecorated player with base stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasePlayer {
    pub id: PlayerId,
    pos: Vec2,
    pub life: LifeState,
    pub base_speed: f32,
    pub base_bomb_power: u32,
    pub base_max_bombs: u32,
}

impl BasePlayer {
    pub fn new(id: PlayerId, pos: Vec2) -> Self {
        Self {
            id,
            pos,
            life: LifeState::Alive,
            base_speed: PLAYER_SPEED,
            base_bomb_power: PLAYER_BOMB_POWER,
            base_max_bombs: PLAYER_MAX_BOMBS,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.base_speed = speed;
        self
    }
}

impl Player for BasePlayer {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn speed(&self) -> f32 {
        self.base_speed
    }

    fn bomb_power(&self) -> u32 {
        self.base_bomb_power
    }

    fn max_bomb_count(&self) -> u32 {
        self.base_max_bombs
    }

    fn position(&self) -> Vec2 {
        self.pos
    }

    fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    fn move_by(&mut self, delta: Vec2, map: &GameMap, body: &Body) {
        self.pos = self.life.handle_move(self.pos, delta, map, body);
    }

    fn warp_to(&mut self, pos: Vec2) {
        if self.is_alive() {
            self.pos = pos;
        }
    }

    fn update(&mut self, _dt: f32) {}

    fn on_explosion_cell(&mut self, cell: Cell) -> bool {
        let before = self.life;
        self.life = self.life.handle_explosion(self.pos, cell);
        before != self.life
    }

    fn kill(&mut self) -> bool {
        let was_alive = self.is_alive();
        self.life = LifeState::Dead;
        was_alive
    }

    fn strip_expired(self: Box<Self>) -> Box<dyn Player> {
        self
    }
}

/// Replace the outward handle with whatever `f` builds from it.
///
/// Used for pickups (wrap) and expiry (unwrap). The placeholder only lives
/// for the duration of the call.
pub fn rewrap(handle: &mut Box<dyn Player>, f: impl FnOnce(Box<dyn Player>) -> Box<dyn Player>) {
    let placeholder: Box<dyn Player> = Box::new(BasePlayer::new(handle.id(), handle.position()));
    let current = std::mem::replace(handle, placeholder);
    *handle = f(current);
}
