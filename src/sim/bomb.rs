//! Bomb countdown and one-shot detonation
//!
//! A bomb knows nothing about walls or blast shapes. When it goes off it just
//! tells every attached subscriber where it was and how strong it was; the
//! map subscriber runs the propagation and everyone else reacts to the cells
//! that come back.

use serde::{Deserialize, Serialize};

use super::enemy::EnemyId;
use super::player::PlayerId;
use crate::Cell;

/// Stable bomb id (unique per world)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BombId(pub u32);

/// Which peer's timer decides when the bomb goes off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Placed on this peer; the local timer triggers it
    Local,
    /// Mirrored from the other peer; waits for its explosion signal
    Remote,
}

/// Handle of something that reacts to a detonation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subscriber {
    Map,
    Player(PlayerId),
    Enemy(EnemyId),
}

/// Subscriber list scoped to one bomb. Attach and detach are idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscribers(Vec<Subscriber>);

impl Subscribers {
    pub fn attach(&mut self, subscriber: Subscriber) {
        if !self.contains(subscriber) {
            self.0.push(subscriber);
        }
    }

    pub fn detach(&mut self, subscriber: Subscriber) {
        self.0.retain(|s| *s != subscriber);
    }

    pub fn contains(&self, subscriber: Subscriber) -> bool {
        self.0.contains(&subscriber)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Attachment order
    pub fn iter(&self) -> impl Iterator<Item = Subscriber> + '_ {
        self.0.iter().copied()
    }
}

/// Payload delivered to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detonation {
    pub bomb: BombId,
    pub cell: Cell,
    pub power: u32,
}

/// A placed bomb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bomb {
    pub id: BombId,
    pub cell: Cell,
    pub power: u32,
    pub owner: PlayerId,
    pub origin: Origin,
    lifetime: f32,
    elapsed: f32,
    exploded: bool,
    subscribers: Subscribers,
}

impl Bomb {
    pub fn new(
        id: BombId,
        cell: Cell,
        power: u32,
        owner: PlayerId,
        origin: Origin,
        lifetime: f32,
    ) -> Self {
        Self {
            id,
            cell,
            power,
            owner,
            origin,
            lifetime,
            elapsed: 0.0,
            exploded: false,
            subscribers: Subscribers::default(),
        }
    }

    /// Advance the fuse. Frozen once exploded.
    pub fn update(&mut self, dt: f32) {
        if !self.exploded {
            self.elapsed += dt;
        }
    }

    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }

    pub fn time_remaining(&self) -> f32 {
        (self.lifetime - self.elapsed).max(0.0)
    }

    pub fn is_exploded(&self) -> bool {
        self.exploded
    }

    /// Local fuse has run out and the bomb has not gone off yet
    pub fn is_due(&self) -> bool {
        self.origin == Origin::Local && !self.exploded && self.time_remaining() <= 0.0
    }

    pub fn attach(&mut self, subscriber: Subscriber) {
        self.subscribers.attach(subscriber);
    }

    pub fn detach(&mut self, subscriber: Subscriber) {
        self.subscribers.detach(subscriber);
    }

    pub fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }

    /// Go off once. Every attached subscriber receives the detonation exactly
    /// once, in attachment order. Returns false if the bomb had already
    /// exploded (nothing is delivered).
    pub fn explode(&mut self, mut deliver: impl FnMut(Subscriber, Detonation)) -> bool {
        if self.exploded {
            return false;
        }
        self.exploded = true;

        let detonation = Detonation {
            bomb: self.id,
            cell: self.cell,
            power: self.power,
        };
        for subscriber in self.subscribers.iter() {
            deliver(subscriber, detonation);
        }
        true
    }

    /// Drop all subscriptions once the bomb leaves the active list
    pub fn retire(&mut self) {
        self.subscribers.clear();
    }
}
