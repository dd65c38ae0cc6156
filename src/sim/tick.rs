//! Simulation tick - advances the world by one fixed timestep

use glam::Vec2;

use super::bomb::Origin;
use super::collision::boxes_overlap;
use super::player::{PlayerId, rewrap};
use super::powerup::PowerUp;
use super::state::{GameEvent, GamePhase, World};
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::net::{InboundEvent, OutboundEvent, wire_cell};

/// Input for a single tick (local player only)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Desired movement direction, clamped to unit length
    pub direction: Vec2,
    /// Drop a bomb at the occupied cell
    pub place_bomb: bool,
}

/// Frame-time accumulator for running `tick` at `SIM_DT`
#[derive(Debug, Clone, Default)]
pub struct FixedStep {
    accumulator: f32,
}

impl FixedStep {
    /// Number of fixed steps to run for a frame of `frame_dt` seconds.
    /// Frames longer than 0.1 s are clamped.
    pub fn steps(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.min(0.1);
        let mut steps = 0;
        while self.accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT;
            steps += 1;
        }
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Advance the world by one fixed timestep
pub fn tick(world: &mut World, input: &TickInput, dt: f32) {
    // Network events land between ticks, never mid-tick
    for event in world.take_inbound() {
        apply_inbound(world, event);
    }

    if world.phase == GamePhase::GameOver {
        return;
    }
    world.time_ticks += 1;

    move_local_players(world, input, dt);
    check_enemy_contact(world);
    collect_power_ups(world);

    if input.place_bomb {
        let local: Vec<PlayerId> = world.local_players().map(|s| s.id()).collect();
        for id in local {
            world.place_bomb(id);
        }
    }

    update_bombs(world, dt);

    if world.role.is_authority() {
        run_enemy_ai(world, dt);
    }

    update_players(world, dt);
    world.retire();
    update_phase(world);
}

fn move_local_players(world: &mut World, input: &TickInput, dt: f32) {
    let direction = if input.direction.length_squared() > 1.0 {
        input.direction.normalize()
    } else {
        input.direction
    };
    if direction == Vec2::ZERO {
        return;
    }

    let mut moved = Vec::new();
    for slot in world.players.iter_mut() {
        if !slot.is_local() || !slot.handle.is_alive() {
            continue;
        }
        let before = slot.handle.position();
        let delta = direction * slot.handle.speed() * dt;
        slot.handle.move_by(delta, &world.map, &world.body);

        let pos = slot.handle.position();
        if pos != before {
            moved.push((slot.id(), pos));
        }
    }
    for (id, pos) in moved {
        world.send(OutboundEvent::SendMovement { id, pos });
    }
}

fn check_enemy_contact(world: &mut World) {
    let half = world.body.half_extent;
    let mut died = Vec::new();
    for slot in world.players.iter_mut() {
        if !slot.is_local() || !slot.handle.is_alive() {
            continue;
        }
        let pos = slot.handle.position();
        let touching = world
            .map
            .enemies
            .iter()
            .any(|e| e.is_alive() && boxes_overlap(pos, e.pos, half));
        if touching && slot.handle.kill() {
            died.push(slot.id());
        }
    }
    for id in died {
        world.player_died(id);
    }
}

fn collect_power_ups(world: &mut World) {
    let mut collected = Vec::new();
    for slot in world.players.iter_mut() {
        if !slot.is_local() || !slot.handle.is_alive() {
            continue;
        }
        let cell = slot.handle.cell();
        let Some(power_up) = world.map.power_up_at_mut(cell) else {
            continue;
        };
        let kind = power_up.kind;
        rewrap(&mut slot.handle, |p| power_up.collect(p));
        collected.push((slot.id(), cell, kind));
    }

    for (player, cell, kind) in collected {
        log::debug!("Player {} collected {} at {}", player.0, kind.as_str(), cell);
        world.emit(GameEvent::PowerUpCollected { cell, kind, player });
        world.send(OutboundEvent::CollectPowerUp {
            x: cell.x,
            y: cell.y,
            kind,
            collector: player,
        });
    }
}

fn update_bombs(world: &mut World, dt: f32) {
    for bomb in world.map.bombs.iter_mut() {
        bomb.update(dt);
    }
    // Indices stay valid: exploded bombs are only removed in `retire`
    let due: Vec<usize> = world
        .map
        .bombs
        .iter()
        .enumerate()
        .filter(|(_, b)| b.is_due())
        .map(|(i, _)| i)
        .collect();
    for index in due {
        world.detonate(index);
    }
}

fn run_enemy_ai(world: &mut World, dt: f32) {
    let targets = world.player_positions();
    let half = world.body.half_extent;

    // Enemies never collide with each other, so stepping them off-map is safe
    let mut enemies = std::mem::take(&mut world.map.enemies);
    for enemy in enemies.iter_mut() {
        if enemy.think(&world.map, &targets, &mut world.ai_rng, dt, half) {
            world.send(OutboundEvent::MoveEnemy {
                id: enemy.id,
                x: enemy.pos.x,
                y: enemy.pos.y,
            });
        }
    }
    world.map.enemies = enemies;
}

fn update_players(world: &mut World, dt: f32) {
    for slot in world.players.iter_mut() {
        slot.handle.update(dt);
        if slot.handle.has_expired_layer() {
            log::debug!("Player {} power-up expired", slot.id().0);
            rewrap(&mut slot.handle, |p| p.strip_expired());
        }
    }
}

fn update_phase(world: &mut World) {
    let any_local = world.local_players().next().is_some();
    let all_dead = world.local_players().all(|s| !s.handle.is_alive());
    if any_local && all_dead {
        log::info!(
            "Game over after {} ticks (seed {})",
            world.time_ticks,
            world.config.seed
        );
        world.phase = GamePhase::GameOver;
        world.emit(GameEvent::GameOver);
    }
}

/// Apply one event from the other peer.
///
/// Events that reference unknown ids, local players or impossible cells are
/// logged and dropped.
pub fn apply_inbound(world: &mut World, event: InboundEvent) {
    match event {
        InboundEvent::PlayerMoved { id, pos } => match world.slot_mut(id) {
            Some(slot) if !slot.is_local() => slot.handle.warp_to(pos),
            _ => log::warn!("Ignoring movement for player {}", id.0),
        },

        InboundEvent::BombPlaced {
            x,
            y,
            power,
            placer,
        } => {
            if world.slot(placer).is_none_or(|s| s.is_local()) {
                log::warn!("Ignoring bomb from player {}", placer.0);
                return;
            }
            world.place_remote_bomb(wire_cell(x, y), power, placer);
        }

        InboundEvent::ExplosionReceived { x, y, power } => {
            let cell = wire_cell(x, y);
            let pending = world
                .map
                .bombs
                .iter()
                .position(|b| b.cell == cell && b.origin == Origin::Remote && !b.is_exploded());
            match pending {
                Some(index) => {
                    world.map.bombs[index].power = power;
                    world.detonate(index);
                }
                None => log::warn!("No pending remote bomb at {} for explosion", cell),
            }
        }

        InboundEvent::EnemyMoved { id, x, y } => {
            if world.role.is_authority() {
                log::warn!("Authority ignoring enemy move for {:?}", id);
                return;
            }
            match world.map.enemy_mut(id) {
                Some(enemy) if enemy.is_alive() => enemy.pos = Vec2::new(x, y),
                Some(_) => {}
                None => log::warn!("Unknown enemy {:?}", id),
            }
        }

        InboundEvent::PowerUpSpawned { x, y, kind } => {
            let cell = wire_cell(x, y);
            let power_up = PowerUp::new(cell, kind, world.config.speed_boost_duration);
            if world.map.add_power_up(power_up) {
                world.emit(GameEvent::PowerUpSpawned { cell, kind });
            } else {
                log::warn!("Dropping {} at {}", kind.as_str(), cell);
            }
        }

        InboundEvent::PowerUpCollected {
            x,
            y,
            kind,
            collector,
        } => {
            let cell = wire_cell(x, y);
            let Some(slot) = world.players.iter_mut().find(|s| s.id() == collector) else {
                log::warn!("Unknown collector {}", collector.0);
                return;
            };
            if slot.is_local() {
                log::warn!("Ignoring remote pickup claim for local player {}", collector.0);
                return;
            }
            let Some(power_up) = world.map.power_up_at_mut(cell) else {
                log::warn!("No power-up at {} to collect", cell);
                return;
            };
            if power_up.kind != kind {
                log::warn!(
                    "Pickup kind mismatch at {}: have {}, told {}",
                    cell,
                    power_up.kind.as_str(),
                    kind.as_str()
                );
            }
            let kind = power_up.kind;
            rewrap(&mut slot.handle, |p| power_up.collect(p));
            world.emit(GameEvent::PowerUpCollected {
                cell,
                kind,
                player: collector,
            });
        }

        InboundEvent::PlayerEliminated { id } => {
            let killed = match world.slot_mut(id) {
                Some(slot) if !slot.is_local() => slot.handle.kill(),
                _ => {
                    log::warn!("Ignoring elimination of player {}", id.0);
                    false
                }
            };
            if killed {
                world.player_died(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::net::inbound_channel;
    use crate::settings::GameConfig;
    use crate::sim::builder::MapBuilder;
    use crate::sim::enemy::{Enemy, EnemyId};
    use crate::sim::powerup::PowerUpKind;
    use crate::sim::state::Role;
    use crate::sim::wall::ThemedWallFactory;
    use glam::IVec2;

    const LAYOUT: [&str; 7] = [
        "#########",
        "#.B.....#",
        "#.#.#.#.#",
        "#.......#",
        "#.#.#.#.#",
        "#.....B.#",
        "#########",
    ];

    fn world(role: Role) -> World {
        let config = GameConfig {
            width: 9,
            height: 7,
            ..GameConfig::with_seed(21)
        };
        let mut world = World::new(config, role).unwrap();
        let map = MapBuilder::from_layout(&LAYOUT, &ThemedWallFactory::default()).unwrap();
        world.load_map(map);
        world
    }

    fn idle() -> TickInput {
        TickInput::default()
    }

    fn walk(direction: Vec2) -> TickInput {
        TickInput {
            direction,
            place_bomb: false,
        }
    }

    fn run(world: &mut World, input: &TickInput, ticks: u32) {
        for _ in 0..ticks {
            tick(world, input, SIM_DT);
        }
    }

    #[test]
    fn test_movement_reports_position() {
        let mut w = world(Role::Authority);
        tick(&mut w, &walk(Vec2::Y), SIM_DT);
        let pos = w.players[0].handle.position();
        assert!(pos.y > 1.0);
        assert_eq!(
            w.drain_outbound(),
            vec![OutboundEvent::SendMovement {
                id: PlayerId(0),
                pos
            }]
        );

        // Flush against the border: no movement, nothing sent
        run(&mut w, &walk(Vec2::NEG_X), 10);
        w.drain_outbound();
        let flush = w.players[0].handle.position();
        tick(&mut w, &walk(Vec2::NEG_X), SIM_DT);
        assert_eq!(w.players[0].handle.position(), flush);
        assert!(w.drain_outbound().is_empty());
    }

    #[test]
    fn test_diagonal_input_is_normalized() {
        let mut w = world(Role::Authority);
        let start = w.players[0].handle.position();
        tick(&mut w, &walk(Vec2::new(3.0, 0.0)), SIM_DT);
        let moved = w.players[0].handle.position() - start;
        assert!((moved.length() - 3.5 * SIM_DT).abs() < 1e-5);
    }

    #[test]
    fn test_bomb_lifecycle_and_escape() {
        let mut w = world(Role::Authority);
        tick(
            &mut w,
            &TickInput {
                place_bomb: true,
                ..idle()
            },
            SIM_DT,
        );
        assert_eq!(w.map.bombs.len(), 1);

        // Two tiles down, out of a power-1 blast
        run(&mut w, &walk(Vec2::Y), 34);
        assert_eq!(w.players[0].handle.cell(), IVec2::new(1, 3));

        run(&mut w, &idle(), 100);
        assert_eq!(w.map.bombs.len(), 1);

        run(&mut w, &idle(), 60);
        assert!(w.map.bombs.is_empty());
        assert!(w.map.wall_at(IVec2::new(2, 1)).is_none());
        assert!(w.players[0].handle.is_alive());
        assert!(
            w.drain_outbound()
                .contains(&OutboundEvent::Explosion { x: 1, y: 1, power: 1 })
        );
    }

    #[test]
    fn test_enemy_contact_ends_round() {
        let mut w = world(Role::Authority);
        w.map
            .enemies
            .push(Enemy::patrol(EnemyId(0), Vec2::new(1.3, 1.0), 1.2));
        tick(&mut w, &idle(), SIM_DT);

        assert!(!w.players[0].handle.is_alive());
        assert_eq!(w.phase, GamePhase::GameOver);
        let events = w.drain_events();
        assert!(events.contains(&GameEvent::PlayerDied { id: PlayerId(0) }));
        assert_eq!(events.last(), Some(&GameEvent::GameOver));
        assert!(
            w.drain_outbound()
                .contains(&OutboundEvent::ReportDeath { id: PlayerId(0) })
        );

        // Frozen afterwards
        let ticks = w.time_ticks;
        tick(&mut w, &walk(Vec2::X), SIM_DT);
        assert_eq!(w.time_ticks, ticks);
    }

    #[test]
    fn test_speed_pickup_expires() {
        let mut w = world(Role::Authority);
        let duration = w.config.speed_boost_duration;
        assert!(w.map.add_power_up(PowerUp::new(
            IVec2::new(1, 2),
            PowerUpKind::Speed,
            duration
        )));

        // Cross into (1, 2) at y >= 1.5
        run(&mut w, &walk(Vec2::Y), 9);
        assert_eq!(w.players[0].handle.cell(), IVec2::new(1, 2));
        assert!((w.players[0].handle.speed() - 5.25).abs() < 1e-5);
        assert!(w.map.power_up_at(IVec2::new(1, 2)).is_none());
        assert!(w.drain_outbound().contains(&OutboundEvent::CollectPowerUp {
            x: 1,
            y: 2,
            kind: PowerUpKind::Speed,
            collector: PlayerId(0)
        }));

        run(&mut w, &idle(), 420);
        assert_eq!(w.players[0].handle.layer_count(), 1);

        run(&mut w, &idle(), 70);
        assert_eq!(w.players[0].handle.layer_count(), 0);
        assert_eq!(w.players[0].handle.speed(), 3.5);
    }

    #[test]
    fn test_remote_bomb_waits_for_signal() {
        let mut w = world(Role::Follower);
        let (tx, rx) = inbound_channel();
        w.connect_inbound(rx);

        tx.send(InboundEvent::BombPlaced {
            x: 3,
            y: 3,
            power: 1,
            placer: PlayerId(0),
        });
        run(&mut w, &idle(), 400);
        assert_eq!(w.map.bombs.len(), 1);
        assert!(!w.map.bombs[0].is_exploded());

        tx.send(InboundEvent::ExplosionReceived { x: 3, y: 3, power: 1 });
        tick(&mut w, &idle(), SIM_DT);
        assert!(w.map.bombs.is_empty());
        assert!(
            w.drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::BombExploded { .. }))
        );
        // Follower never announces someone else's bomb
        assert!(
            !w.drain_outbound()
                .iter()
                .any(|e| matches!(e, OutboundEvent::Explosion { .. }))
        );
    }

    #[test]
    fn test_bombs_share_a_cell_across_peers() {
        let mut w = world(Role::Authority);
        let mine = w.place_bomb(PlayerId(0)).unwrap();
        apply_inbound(
            &mut w,
            InboundEvent::BombPlaced {
                x: 1,
                y: 1,
                power: 2,
                placer: PlayerId(1),
            },
        );
        assert_eq!(w.map.bombs.len(), 2);
        w.drain_events();

        apply_inbound(&mut w, InboundEvent::ExplosionReceived { x: 1, y: 1, power: 2 });
        for bomb in &w.map.bombs {
            assert_eq!(bomb.is_exploded(), bomb.origin == Origin::Remote);
        }
        assert!(!w.map.bombs.iter().find(|b| b.id == mine).unwrap().is_exploded());
        assert!(w.drain_events().iter().any(|e| matches!(
            e,
            GameEvent::BombExploded { power: 2, .. }
        )));
    }

    /// Authority detonates a power-2 bomb from (1, 3) toward player 1 at
    /// (3, 3); the follower walks player 1 down for `steps` ticks before the
    /// signal lands. Events are relayed both ways afterwards.
    fn blast_near_follower(steps: u32) -> (World, World) {
        use crate::sim::player::BasePlayer;
        use crate::sim::powerup::{Decorated, Modifier};

        let mut authority = world(Role::Authority);
        let mut follower = world(Role::Follower);
        authority.players[0].handle = Box::new(Decorated::permanent(
            Box::new(BasePlayer::new(PlayerId(0), Vec2::new(1.0, 3.0))),
            Modifier::BombPowerBonus(1),
        ));
        authority.players[1].handle.warp_to(Vec2::new(3.0, 3.0));
        follower.players[0].handle.warp_to(Vec2::new(1.0, 3.0));
        follower.players[1].handle.warp_to(Vec2::new(3.0, 3.0));

        authority.place_bomb(PlayerId(0)).unwrap();
        for event in authority.drain_outbound() {
            apply_inbound(&mut follower, event.into_inbound());
        }
        assert!(authority.detonate(0));

        run(&mut follower, &walk(Vec2::Y), steps);
        for event in authority.drain_outbound() {
            apply_inbound(&mut follower, event.into_inbound());
        }
        for event in follower.drain_outbound() {
            apply_inbound(&mut authority, event.into_inbound());
        }
        (authority, follower)
    }

    #[test]
    fn test_peers_agree_when_player_escapes_blast() {
        let (authority, follower) = blast_near_follower(10);
        let (a, f) = (&authority.players[1].handle, &follower.players[1].handle);
        assert_eq!(f.cell(), IVec2::new(3, 4));
        assert!(f.is_alive());
        assert_eq!(a.is_alive(), f.is_alive());
        assert_eq!(a.position(), f.position());

        // The bomber stood on the origin and died on both sides
        assert!(!authority.players[0].handle.is_alive());
        assert!(!follower.players[0].handle.is_alive());
    }

    #[test]
    fn test_peers_agree_when_player_is_caught() {
        let (authority, follower) = blast_near_follower(0);
        assert!(!follower.players[1].handle.is_alive());
        assert!(!authority.players[1].handle.is_alive());
    }

    #[test]
    fn test_stray_inbound_events_are_dropped() {
        let mut w = world(Role::Follower);
        let walls = w.map.walls().count();

        apply_inbound(&mut w, InboundEvent::ExplosionReceived { x: 1, y: 1, power: 3 });
        // Follower's own player cannot be driven remotely
        apply_inbound(
            &mut w,
            InboundEvent::BombPlaced {
                x: 3,
                y: 3,
                power: 1,
                placer: PlayerId(1),
            },
        );
        apply_inbound(&mut w, InboundEvent::PlayerEliminated { id: PlayerId(1) });
        apply_inbound(&mut w, InboundEvent::PlayerEliminated { id: PlayerId(9) });
        apply_inbound(
            &mut w,
            InboundEvent::EnemyMoved {
                id: EnemyId(42),
                x: 1.0,
                y: 1.0,
            },
        );

        assert_eq!(w.map.walls().count(), walls);
        assert!(w.map.bombs.is_empty());
        assert!(w.players.iter().all(|s| s.handle.is_alive()));
    }

    #[test]
    fn test_remote_player_events() {
        let mut w = world(Role::Follower);
        let remote = PlayerId(0);

        apply_inbound(
            &mut w,
            InboundEvent::PlayerMoved {
                id: remote,
                pos: Vec2::new(1.0, 2.0),
            },
        );
        assert_eq!(w.players[0].handle.position(), Vec2::new(1.0, 2.0));

        apply_inbound(
            &mut w,
            InboundEvent::PowerUpSpawned {
                x: 1,
                y: 3,
                kind: PowerUpKind::BombPower,
            },
        );
        apply_inbound(
            &mut w,
            InboundEvent::PowerUpCollected {
                x: 1,
                y: 3,
                kind: PowerUpKind::BombPower,
                collector: remote,
            },
        );
        assert_eq!(w.players[0].handle.bomb_power(), 2);

        apply_inbound(&mut w, InboundEvent::PlayerEliminated { id: remote });
        assert!(!w.players[0].handle.is_alive());
        // Remote death is not ours to report
        assert!(w.drain_outbound().is_empty());
        assert!(w.drain_events().contains(&GameEvent::PlayerDied { id: remote }));
        // Our own player is still in the round
        assert_eq!(w.phase, GamePhase::Playing);
    }

    #[test]
    fn test_follower_mirrors_enemy_moves() {
        let mut w = world(Role::Follower);
        w.map
            .enemies
            .push(Enemy::wanderer(EnemyId(3), Vec2::new(5.0, 3.0), 1.2));
        run(&mut w, &idle(), 30);
        // Follower runs no AI
        assert_eq!(w.map.enemy(EnemyId(3)).unwrap().pos, Vec2::new(5.0, 3.0));

        apply_inbound(
            &mut w,
            InboundEvent::EnemyMoved {
                id: EnemyId(3),
                x: 5.5,
                y: 3.0,
            },
        );
        assert_eq!(w.map.enemy(EnemyId(3)).unwrap().pos, Vec2::new(5.5, 3.0));
    }

    #[test]
    fn test_fixed_step_clamps_long_frames() {
        let mut step = FixedStep::default();
        assert_eq!(step.steps(SIM_DT * 0.5), 0);
        assert_eq!(step.steps(SIM_DT * 0.6), 1);
        // A one-second hitch only runs 0.1 s worth of steps
        assert_eq!(step.steps(1.0), 6);
        assert_eq!(step.steps(0.0), 0);
        step.reset();
        assert_eq!(step.steps(SIM_DT * 0.9), 0);
    }

    /// Run both peers side by side, relaying outbound batches after every tick
    fn run_session(
        authority: &mut World,
        follower: &mut World,
        script: impl Fn(u32) -> (TickInput, TickInput),
        ticks: u32,
    ) {
        let (to_authority, authority_rx) = inbound_channel();
        let (to_follower, follower_rx) = inbound_channel();
        authority.connect_inbound(authority_rx);
        follower.connect_inbound(follower_rx);

        for t in 0..ticks {
            let (a, f) = script(t);
            tick(authority, &a, SIM_DT);
            tick(follower, &f, SIM_DT);
            to_follower.relay(authority.drain_outbound());
            to_authority.relay(follower.drain_outbound());
        }
        // Let the last relayed batch land
        tick(authority, &idle(), SIM_DT);
        tick(follower, &idle(), SIM_DT);
    }

    #[test]
    fn test_two_peers_agree_on_blasts() {
        let mut authority = world(Role::Authority);
        let mut follower = world(Role::Follower);

        run_session(
            &mut authority,
            &mut follower,
            |t| {
                let bomb = TickInput {
                    place_bomb: true,
                    ..idle()
                };
                match t {
                    0 => (bomb.clone(), bomb),
                    1..=34 => (walk(Vec2::Y), walk(Vec2::NEG_Y)),
                    _ => (idle(), idle()),
                }
            },
            240,
        );

        let walls = |w: &World| -> Vec<_> {
            w.map
                .walls()
                .map(|(cell, wall)| (cell, wall.clone()))
                .collect()
        };
        assert_eq!(walls(&authority), walls(&follower));
        assert!(authority.map.wall_at(IVec2::new(2, 1)).is_none());
        assert!(authority.map.wall_at(IVec2::new(6, 5)).is_none());

        let drops = |w: &World| -> Vec<_> {
            w.map
                .power_ups
                .iter()
                .filter(|p| !p.is_collected())
                .map(|p| (p.cell, p.kind))
                .collect()
        };
        assert_eq!(drops(&authority), drops(&follower));

        for w in [&authority, &follower] {
            assert!(w.map.bombs.is_empty());
            assert!(w.players.iter().all(|s| s.handle.is_alive()));
            assert_eq!(w.phase, GamePhase::Playing);
        }
        // Remote positions follow the owner's reports
        assert_eq!(
            authority.players[1].handle.position(),
            follower.players[1].handle.position()
        );
    }
}
