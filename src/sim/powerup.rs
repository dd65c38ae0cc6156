//! Power-up pickups and the stat decorator chain
//!
//! Collecting a pickup wraps the player's current handle in a [`Decorated`]
//! layer that overrides exactly one stat. Layers nest freely; each one owns
//! the handle it wraps, so an expired timed layer can be cut out without
//! touching the layers above or below it.

use std::str::FromStr;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Body;
use super::grid::GameMap;
use super::player::{Player, PlayerId};
use crate::Cell;
use crate::consts::SPEED_BOOST_MULTIPLIER;
use crate::error::ConfigError;

/// Pickup types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Timed speed multiplier
    Speed,
    /// Permanent +1 blast radius
    BombPower,
    /// Permanent +1 bomb capacity
    ExtraBomb,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::Speed,
        PowerUpKind::BombPower,
        PowerUpKind::ExtraBomb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerUpKind::Speed => "speed",
            PowerUpKind::BombPower => "bomb_power",
            PowerUpKind::ExtraBomb => "extra_bomb",
        }
    }

    pub fn is_timed(&self) -> bool {
        matches!(self, PowerUpKind::Speed)
    }

    /// Stat change this pickup applies
    pub fn modifier(&self) -> Modifier {
        match self {
            PowerUpKind::Speed => Modifier::SpeedMultiplier(SPEED_BOOST_MULTIPLIER),
            PowerUpKind::BombPower => Modifier::BombPowerBonus(1),
            PowerUpKind::ExtraBomb => Modifier::MaxBombBonus(1),
        }
    }
}

impl FromStr for PowerUpKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "speed" => Ok(PowerUpKind::Speed),
            "bomb_power" | "bombpower" => Ok(PowerUpKind::BombPower),
            "extra_bomb" | "extrabomb" => Ok(PowerUpKind::ExtraBomb),
            _ => Err(ConfigError::UnknownPowerUp(s.to_string())),
        }
    }
}

/// A pickup lying on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub cell: Cell,
    pub kind: PowerUpKind,
    /// Lifetime of the effect once collected (None = permanent)
    pub duration: Option<f32>,
    collected: bool,
}

impl PowerUp {
    /// `timed_duration` applies only to timed kinds
    pub fn new(cell: Cell, kind: PowerUpKind, timed_duration: f32) -> Self {
        Self {
            cell,
            kind,
            duration: kind.is_timed().then_some(timed_duration),
            collected: false,
        }
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    /// Wrap `player` in this pickup's layer. A second collect hands the
    /// player back untouched.
    pub fn collect(&mut self, player: Box<dyn Player>) -> Box<dyn Player> {
        if self.collected {
            return player;
        }
        self.collected = true;
        let modifier = self.kind.modifier();
        match self.duration {
            Some(duration) => Box::new(Decorated::timed(player, modifier, duration)),
            None => Box::new(Decorated::permanent(player, modifier)),
        }
    }
}

/// Rolls drops for destroyed breakable walls (authority peer only)
#[derive(Debug, Clone)]
pub struct DropRoller {
    rng: Pcg32,
    rate: f32,
    timed_duration: f32,
}

impl DropRoller {
    pub fn new(rng: Pcg32, rate: f32, timed_duration: f32) -> Self {
        Self {
            rng,
            rate: rate.clamp(0.0, 1.0),
            timed_duration,
        }
    }

    pub fn roll(&mut self, cell: Cell) -> Option<PowerUp> {
        if self.rng.random::<f32>() >= self.rate {
            return None;
        }
        let kind = PowerUpKind::ALL[self.rng.random_range(0..PowerUpKind::ALL.len())];
        Some(PowerUp::new(cell, kind, self.timed_duration))
    }
}

/// The single stat a layer overrides
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Modifier {
    SpeedMultiplier(f32),
    BombPowerBonus(u32),
    MaxBombBonus(u32),
}

/// One power-up layer around a player
#[derive(Debug)]
pub struct Decorated {
    inner: Box<dyn Player>,
    modifier: Modifier,
    /// Seconds left for timed layers
    remaining: Option<f32>,
}

impl Decorated {
    pub fn permanent(inner: Box<dyn Player>, modifier: Modifier) -> Self {
        Self {
            inner,
            modifier,
            remaining: None,
        }
    }

    pub fn timed(inner: Box<dyn Player>, modifier: Modifier, duration: f32) -> Self {
        Self {
            inner,
            modifier,
            remaining: Some(duration),
        }
    }

    pub fn modifier(&self) -> Modifier {
        self.modifier
    }

    pub fn remaining(&self) -> Option<f32> {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.remaining.is_some_and(|t| t <= 0.0)
    }

    pub fn inner(&self) -> &dyn Player {
        self.inner.as_ref()
    }

    /// Unwrap this layer
    pub fn into_inner(self) -> Box<dyn Player> {
        self.inner
    }
}

impl Player for Decorated {
    fn id(&self) -> PlayerId {
        self.inner.id()
    }

    fn speed(&self) -> f32 {
        match self.modifier {
            Modifier::SpeedMultiplier(m) => self.inner.speed() * m,
            _ => self.inner.speed(),
        }
    }

    fn bomb_power(&self) -> u32 {
        match self.modifier {
            Modifier::BombPowerBonus(n) => self.inner.bomb_power() + n,
            _ => self.inner.bomb_power(),
        }
    }

    fn max_bomb_count(&self) -> u32 {
        match self.modifier {
            Modifier::MaxBombBonus(n) => self.inner.max_bomb_count() + n,
            _ => self.inner.max_bomb_count(),
        }
    }

    fn position(&self) -> Vec2 {
        self.inner.position()
    }

    fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    fn move_by(&mut self, delta: Vec2, map: &GameMap, body: &Body) {
        self.inner.move_by(delta, map, body);
    }

    fn warp_to(&mut self, pos: Vec2) {
        self.inner.warp_to(pos);
    }

    fn update(&mut self, dt: f32) {
        self.inner.update(dt);
        if let Some(t) = self.remaining.as_mut() {
            *t -= dt;
        }
    }

    fn on_explosion_cell(&mut self, cell: Cell) -> bool {
        self.inner.on_explosion_cell(cell)
    }

    fn kill(&mut self) -> bool {
        self.inner.kill()
    }

    fn has_expired_layer(&self) -> bool {
        self.is_expired() || self.inner.has_expired_layer()
    }

    fn strip_expired(self: Box<Self>) -> Box<dyn Player> {
        let Decorated {
            inner,
            modifier,
            remaining,
        } = *self;
        let layer = Decorated {
            inner: inner.strip_expired(),
            modifier,
            remaining,
        };
        if layer.is_expired() {
            layer.into_inner()
        } else {
            Box::new(layer)
        }
    }

    fn layer_count(&self) -> usize {
        1 + self.inner.layer_count()
    }
}
