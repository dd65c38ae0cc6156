//! World state and core round types
//!
//! The world owns the map, the player handles and the event buffers. Each
//! peer runs its own world from the same config; `Role` only decides which
//! events a peer originates and which it waits for.

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bomb::{Bomb, BombId, Origin, Subscriber};
use super::builder::{MapBuilder, spawn_points};
use super::collision::Body;
use super::enemy::EnemyId;
use super::grid::GameMap;
use super::player::{BasePlayer, Player, PlayerId};
use super::powerup::{DropRoller, PowerUpKind};
use super::wall::{ThemedWallFactory, WallFactory, WallKind};
use crate::error::ConfigError;
use crate::net::{InboundQueue, OutboundEvent};
use crate::settings::GameConfig;
use crate::{Cell, cell_to_pos};

/// RNG stream for map generation
pub const MAP_STREAM: u64 = 0;
/// RNG stream for enemy AI (authority)
pub const AI_STREAM: u64 = 1;
/// RNG stream for power-up drops (authority)
pub const DROP_STREAM: u64 = 2;

/// Seed plus stream selector. Each concern draws from its own stream so
/// adding rolls to one never shifts another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn with_stream(seed: u64, stream: u64) -> Self {
        Self { seed, stream }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::new(self.seed, self.stream)
    }
}

/// Which side of the session this world runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Runs enemy AI and decides power-up drops
    Authority,
    /// Mirrors the authority's enemies and drops
    Follower,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Authority => "authority",
            Role::Follower => "follower",
        }
    }

    pub fn is_authority(&self) -> bool {
        matches!(self, Role::Authority)
    }

    /// Player driven by this peer's input
    pub fn local_player(&self) -> PlayerId {
        match self {
            Role::Authority => PlayerId(0),
            Role::Follower => PlayerId(1),
        }
    }
}

/// Who drives a player slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Control {
    Local,
    Remote,
}

/// Current phase of the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Every local player is dead
    GameOver,
}

/// One player and the handle to its outermost decorator layer
#[derive(Debug)]
pub struct PlayerSlot {
    pub control: Control,
    pub handle: Box<dyn Player>,
}

impl PlayerSlot {
    pub fn id(&self) -> PlayerId {
        self.handle.id()
    }

    pub fn is_local(&self) -> bool {
        self.control == Control::Local
    }
}

/// Events for the renderer/UI (drained each frame)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// One notified blast cell
    ExplosionCell { cell: Cell },
    WallDamaged { cell: Cell, hits_remaining: u8 },
    WallDestroyed { cell: Cell, kind: WallKind },
    BombPlaced { id: BombId, cell: Cell, owner: PlayerId },
    BombExploded { id: BombId, cell: Cell, power: u32 },
    PowerUpSpawned { cell: Cell, kind: PowerUpKind },
    PowerUpCollected { cell: Cell, kind: PowerUpKind, player: PlayerId },
    PlayerDied { id: PlayerId },
    EnemyKilled { id: EnemyId },
    GameOver,
}

/// Complete state of one peer's round
pub struct World {
    pub config: GameConfig,
    pub role: Role,
    pub map: GameMap,
    /// Sorted by id
    pub players: Vec<PlayerSlot>,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub body: Body,
    factory: Box<dyn WallFactory>,
    pub(crate) ai_rng: Pcg32,
    next_bomb_id: u32,
    events: Vec<GameEvent>,
    outbound: Vec<OutboundEvent>,
    inbound: Option<InboundQueue>,
}

impl World {
    /// Build a round with the config's themed wall factory
    pub fn new(config: GameConfig, role: Role) -> Result<Self, ConfigError> {
        let factory = ThemedWallFactory::new(config.theme, config.hard_wall_hits);
        Self::with_factory(config, role, Box::new(factory))
    }

    pub fn with_factory(
        config: GameConfig,
        role: Role,
        factory: Box<dyn WallFactory>,
    ) -> Result<Self, ConfigError> {
        let map = MapBuilder::build(&config, factory.as_ref())?;
        let mut world = Self {
            body: Body::from_config(&config),
            ai_rng: RngState::with_stream(config.seed, AI_STREAM).to_rng(),
            players: Vec::new(),
            config,
            role,
            map,
            phase: GamePhase::Playing,
            time_ticks: 0,
            factory,
            next_bomb_id: 0,
            events: Vec::new(),
            outbound: Vec::new(),
            inbound: None,
        };
        world.reset_round();
        log::info!(
            "World ready as {} (seed {}, {} players)",
            world.role.as_str(),
            world.config.seed,
            world.players.len()
        );
        Ok(world)
    }

    /// Rebuild the round from the current config with a new seed.
    /// Buffered events are discarded; the inbound queue stays connected.
    pub fn restart(&mut self, seed: u64) -> Result<(), ConfigError> {
        self.config.seed = seed;
        self.map = MapBuilder::build(&self.config, self.factory.as_ref())?;
        self.ai_rng = RngState::with_stream(seed, AI_STREAM).to_rng();
        self.reset_round();
        log::info!("Round restarted with seed {}", seed);
        Ok(())
    }

    /// Start a fresh round on a prebuilt map (fixed layouts, replays)
    pub fn load_map(&mut self, map: GameMap) {
        self.map = map;
        self.reset_round();
    }

    fn reset_round(&mut self) {
        if self.role.is_authority() {
            let rng = RngState::with_stream(self.config.seed, DROP_STREAM).to_rng();
            self.map.set_drop_roller(Some(DropRoller::new(
                rng,
                self.config.power_up_drop_rate,
                self.config.speed_boost_duration,
            )));
        } else {
            self.map.set_drop_roller(None);
        }

        let local = self.role.local_player();
        let count = self.config.player_count.clamp(1, 2) as usize;
        self.players = spawn_points(self.map.width, self.map.height)
            .into_iter()
            .take(count)
            .enumerate()
            .map(|(i, cell)| {
                let id = PlayerId(i as u8);
                PlayerSlot {
                    control: if id == local {
                        Control::Local
                    } else {
                        Control::Remote
                    },
                    handle: Box::new(
                        BasePlayer::new(id, cell_to_pos(cell)).with_speed(self.config.player_speed),
                    ),
                }
            })
            .collect();

        self.phase = GamePhase::Playing;
        self.time_ticks = 0;
        self.next_bomb_id = 0;
        self.events.clear();
        self.outbound.clear();
    }

    /// Attach the queue inbound events are drained from
    pub fn connect_inbound(&mut self, queue: InboundQueue) {
        self.inbound = Some(queue);
    }

    pub(crate) fn take_inbound(&mut self) -> Vec<crate::net::InboundEvent> {
        self.inbound
            .as_mut()
            .map(InboundQueue::drain)
            .unwrap_or_default()
    }

    /// Renderer events since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events to send to the other peer since the last drain
    pub fn drain_outbound(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.outbound)
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub(crate) fn send(&mut self, event: OutboundEvent) {
        self.outbound.push(event);
    }

    pub fn player(&self, id: PlayerId) -> Option<&dyn Player> {
        self.slot(id).map(|s| s.handle.as_ref())
    }

    pub fn slot(&self, id: PlayerId) -> Option<&PlayerSlot> {
        self.players.iter().find(|s| s.id() == id)
    }

    pub fn slot_mut(&mut self, id: PlayerId) -> Option<&mut PlayerSlot> {
        self.players.iter_mut().find(|s| s.id() == id)
    }

    pub fn local_players(&self) -> impl Iterator<Item = &PlayerSlot> + '_ {
        self.players.iter().filter(|s| s.is_local())
    }

    /// Unexploded bombs owned by `owner`
    pub fn active_bombs(&self, owner: PlayerId) -> usize {
        self.map
            .bombs
            .iter()
            .filter(|b| b.owner == owner && !b.is_exploded())
            .count()
    }

    /// Place a bomb for a local player at its occupied cell.
    ///
    /// Refused when the player is dead, already has `max_bomb_count` bombs
    /// ticking, or the cell already holds a bomb.
    pub fn place_bomb(&mut self, owner: PlayerId) -> Option<BombId> {
        let slot = self.slot(owner)?;
        let player = slot.handle.as_ref();
        if !slot.is_local() || !player.is_alive() {
            return None;
        }
        if self.active_bombs(owner) >= player.max_bomb_count() as usize {
            return None;
        }
        let cell = player.cell();
        let power = player.bomb_power();
        if self.map.bomb_at(cell).is_some() {
            return None;
        }

        let id = self.add_bomb(cell, power, owner, Origin::Local);
        self.send(OutboundEvent::PlaceBomb {
            x: cell.x,
            y: cell.y,
            power,
            placer: owner,
        });
        Some(id)
    }

    /// Mirror a bomb placed on the other peer. It only explodes on that
    /// peer's signal.
    pub fn place_remote_bomb(&mut self, cell: Cell, power: u32, owner: PlayerId) -> Option<BombId> {
        // A local bomb may share the cell: both peers can drop on it in the same frame
        let pending = self
            .map
            .bombs
            .iter()
            .any(|b| b.cell == cell && b.origin == Origin::Remote && !b.is_exploded());
        if !self.map.in_bounds(cell) || pending {
            log::warn!("Dropping remote bomb at {} (out of bounds or occupied)", cell);
            return None;
        }
        Some(self.add_bomb(cell, power, owner, Origin::Remote))
    }

    fn add_bomb(&mut self, cell: Cell, power: u32, owner: PlayerId, origin: Origin) -> BombId {
        let id = BombId(self.next_bomb_id);
        self.next_bomb_id += 1;

        let mut bomb = Bomb::new(id, cell, power, owner, origin, self.config.bomb_lifetime);
        bomb.attach(Subscriber::Map);
        // Remote players die on their owner's peer and arrive as `PlayerEliminated`
        for slot in self.players.iter().filter(|s| s.is_local()) {
            bomb.attach(Subscriber::Player(slot.id()));
        }
        for enemy in self.map.enemies.iter().filter(|e| e.is_alive()) {
            bomb.attach(Subscriber::Enemy(enemy.id));
        }
        self.map.bombs.push(bomb);

        log::debug!("Bomb {:?} placed at {} (power {}, {:?})", id, cell, power, origin);
        self.emit(GameEvent::BombPlaced { id, cell, owner });
        id
    }

    /// Detonate the bomb at `index` in the active list. Returns false if it
    /// had already gone off.
    pub fn detonate(&mut self, index: usize) -> bool {
        let Some(bomb) = self.map.bombs.get_mut(index) else {
            return false;
        };
        let mut deliveries = Vec::new();
        if !bomb.explode(|subscriber, detonation| deliveries.push((subscriber, detonation))) {
            return false;
        }
        let (id, cell, power, origin) = (bomb.id, bomb.cell, bomb.power, bomb.origin);

        log::debug!("Bomb {:?} exploded at {} (power {})", id, cell, power);
        self.emit(GameEvent::BombExploded { id, cell, power });
        if origin == Origin::Local {
            self.send(OutboundEvent::Explosion {
                x: cell.x,
                y: cell.y,
                power,
            });
        }

        // Map goes first: everyone else reacts to the cells it reports
        let mut cells = Vec::new();
        for (subscriber, detonation) in deliveries {
            match subscriber {
                Subscriber::Map => cells = self.blast(detonation.cell, detonation.power),
                Subscriber::Player(player) => self.hit_player(player, &cells),
                Subscriber::Enemy(enemy) => self.hit_enemy(enemy, &cells),
            }
        }
        true
    }

    /// Map reaction: propagate and report
    fn blast(&mut self, origin: Cell, power: u32) -> Vec<Cell> {
        let report = self.map.apply_blast(origin, power);

        for &cell in &report.cells {
            self.emit(GameEvent::ExplosionCell { cell });
        }
        for &(cell, hits_remaining) in &report.damaged {
            self.emit(GameEvent::WallDamaged {
                cell,
                hits_remaining,
            });
        }
        for &(cell, kind) in &report.destroyed {
            self.emit(GameEvent::WallDestroyed { cell, kind });
        }
        for power_up in &report.spawned {
            let (cell, kind) = (power_up.cell, power_up.kind);
            log::debug!("Dropped {} at {}", kind.as_str(), cell);
            self.emit(GameEvent::PowerUpSpawned { cell, kind });
            self.send(OutboundEvent::SpawnPowerUp {
                x: cell.x,
                y: cell.y,
                kind,
            });
        }
        report.cells
    }

    fn hit_player(&mut self, id: PlayerId, cells: &[Cell]) {
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        let killed = cells
            .iter()
            .fold(false, |killed, &cell| slot.handle.on_explosion_cell(cell) || killed);
        if killed {
            self.player_died(id);
        }
    }

    fn hit_enemy(&mut self, id: EnemyId, cells: &[Cell]) {
        let Some(enemy) = self.map.enemy_mut(id) else {
            return;
        };
        let killed = cells
            .iter()
            .fold(false, |killed, &cell| enemy.on_explosion_cell(cell) || killed);
        if killed {
            log::debug!("Enemy {:?} killed", id);
            self.emit(GameEvent::EnemyKilled { id });
        }
    }

    /// Bookkeeping after a player's Alive -> Dead transition
    pub(crate) fn player_died(&mut self, id: PlayerId) {
        log::info!("Player {} died", id.0);
        self.emit(GameEvent::PlayerDied { id });
        if self.slot(id).is_some_and(PlayerSlot::is_local) {
            self.send(OutboundEvent::ReportDeath { id });
        }
    }

    /// Live player positions, used as chase targets
    pub fn player_positions(&self) -> Vec<(PlayerId, Vec2)> {
        self.players
            .iter()
            .filter(|s| s.handle.is_alive())
            .map(|s| (s.id(), s.handle.position()))
            .collect()
    }

    /// Drop exploded bombs and dead enemies from the map
    pub fn retire(&mut self) {
        for bomb in self.map.bombs.iter_mut().filter(|b| b.is_exploded()) {
            bomb.retire();
        }
        self.map.bombs.retain(|b| !b.is_exploded());

        let dead: Vec<EnemyId> = self
            .map
            .enemies
            .iter()
            .filter(|e| !e.is_alive())
            .map(|e| e.id)
            .collect();
        if dead.is_empty() {
            return;
        }
        for bomb in &mut self.map.bombs {
            for &id in &dead {
                bomb.detach(Subscriber::Enemy(id));
            }
        }
        self.map.enemies.retain(|e| e.is_alive());
    }
}
