//! Network event boundary
//!
//! The transport itself lives outside this crate. The simulation only sees
//! two event vocabularies: what arrives from the other peer (drained once per
//! tick from an [`InboundQueue`]) and what it wants sent (buffered on the
//! world and drained by the caller).

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::Cell;
use crate::sim::enemy::EnemyId;
use crate::sim::player::PlayerId;
use crate::sim::powerup::PowerUpKind;

/// Events received from the other peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundEvent {
    PlayerMoved {
        id: PlayerId,
        pos: Vec2,
    },
    BombPlaced {
        x: i32,
        y: i32,
        power: u32,
        placer: PlayerId,
    },
    /// Authoritative detonation of a bomb placed by the sender
    ExplosionReceived {
        x: i32,
        y: i32,
        power: u32,
    },
    EnemyMoved {
        id: EnemyId,
        x: f32,
        y: f32,
    },
    PowerUpSpawned {
        x: i32,
        y: i32,
        kind: PowerUpKind,
    },
    PowerUpCollected {
        x: i32,
        y: i32,
        kind: PowerUpKind,
        collector: PlayerId,
    },
    PlayerEliminated {
        id: PlayerId,
    },
}

/// Events this peer wants delivered to the other one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    SendMovement {
        id: PlayerId,
        pos: Vec2,
    },
    PlaceBomb {
        x: i32,
        y: i32,
        power: u32,
        placer: PlayerId,
    },
    ReportDeath {
        id: PlayerId,
    },
    /// Authority only
    MoveEnemy {
        id: EnemyId,
        x: f32,
        y: f32,
    },
    /// Authority only
    SpawnPowerUp {
        x: i32,
        y: i32,
        kind: PowerUpKind,
    },
    CollectPowerUp {
        x: i32,
        y: i32,
        kind: PowerUpKind,
        collector: PlayerId,
    },
    Explosion {
        x: i32,
        y: i32,
        power: u32,
    },
}

impl OutboundEvent {
    /// What the other peer sees when a relay forwards this event unchanged
    pub fn into_inbound(self) -> InboundEvent {
        match self {
            OutboundEvent::SendMovement { id, pos } => InboundEvent::PlayerMoved { id, pos },
            OutboundEvent::PlaceBomb {
                x,
                y,
                power,
                placer,
            } => InboundEvent::BombPlaced {
                x,
                y,
                power,
                placer,
            },
            OutboundEvent::ReportDeath { id } => InboundEvent::PlayerEliminated { id },
            OutboundEvent::MoveEnemy { id, x, y } => InboundEvent::EnemyMoved { id, x, y },
            OutboundEvent::SpawnPowerUp { x, y, kind } => {
                InboundEvent::PowerUpSpawned { x, y, kind }
            }
            OutboundEvent::CollectPowerUp {
                x,
                y,
                kind,
                collector,
            } => InboundEvent::PowerUpCollected {
                x,
                y,
                kind,
                collector,
            },
            OutboundEvent::Explosion { x, y, power } => {
                InboundEvent::ExplosionReceived { x, y, power }
            }
        }
    }
}

/// Cell carried by a wire event
#[inline]
pub fn wire_cell(x: i32, y: i32) -> Cell {
    IVec2::new(x, y)
}

/// Producer side of the inbound queue. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct InboundSender(mpsc::UnboundedSender<InboundEvent>);

impl InboundSender {
    /// Queue one event. Returns false if the world side is gone.
    pub fn send(&self, event: InboundEvent) -> bool {
        self.0.send(event).is_ok()
    }

    /// Forward another peer's outbound batch, in order
    pub fn relay(&self, events: impl IntoIterator<Item = OutboundEvent>) -> usize {
        events
            .into_iter()
            .take_while(|event| self.send(event.clone().into_inbound()))
            .count()
    }
}

/// Consumer side, owned by the world and drained once per tick
#[derive(Debug)]
pub struct InboundQueue(mpsc::UnboundedReceiver<InboundEvent>);

impl InboundQueue {
    /// Everything queued so far, in arrival order. Never blocks.
    pub fn drain(&mut self) -> Vec<InboundEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.0.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn inbound_channel() -> (InboundSender, InboundQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboundSender(tx), InboundQueue(rx))
}
