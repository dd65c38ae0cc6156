//! Blast Arena headless session
//!
//! Runs an authority and a follower world side by side, relaying each peer's
//! outbound events into the other's inbound queue after every frame. Both
//! local players are driven by a small seeded bot.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Blast Arena (headless) starting...");

    if let Err(err) = session::run(std::env::args().nth(1)) {
        log::error!("Session failed: {}", err);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No web front end; the library is the deliverable on wasm
}

#[cfg(not(target_arch = "wasm32"))]
mod session {
    use blast_arena::consts::SIM_DT;
    use blast_arena::net::inbound_channel;
    use blast_arena::sim::{FixedStep, GamePhase, Role, TickInput, World, tick};
    use blast_arena::{ConfigError, GameConfig};
    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    /// Simulated frame time (30 fps host)
    const FRAME_DT: f32 = 1.0 / 30.0;
    /// Give up after this many simulated seconds
    const MAX_SECONDS: f32 = 120.0;

    /// Random-walk bot that drops a bomb now and then
    struct Bot {
        rng: Pcg32,
        direction: Vec2,
        hold: u32,
    }

    impl Bot {
        fn new(seed: u64) -> Self {
            Self {
                rng: Pcg32::seed_from_u64(seed),
                direction: Vec2::ZERO,
                hold: 0,
            }
        }

        fn input(&mut self) -> TickInput {
            if self.hold == 0 {
                self.direction = match self.rng.random_range(0..5) {
                    0 => Vec2::X,
                    1 => Vec2::NEG_X,
                    2 => Vec2::Y,
                    3 => Vec2::NEG_Y,
                    _ => Vec2::ZERO,
                };
                self.hold = self.rng.random_range(10..40);
            }
            self.hold -= 1;
            TickInput {
                direction: self.direction,
                place_bomb: self.rng.random_range(0..90) == 0,
            }
        }
    }

    pub fn run(config_path: Option<String>) -> Result<(), ConfigError> {
        let config = match config_path {
            Some(path) => GameConfig::load(path)?,
            None => GameConfig::with_seed(rand::random()),
        };

        let mut authority = World::new(config.clone(), Role::Authority)?;
        let mut follower = World::new(config.clone(), Role::Follower)?;

        let (to_authority, authority_rx) = inbound_channel();
        let (to_follower, follower_rx) = inbound_channel();
        authority.connect_inbound(authority_rx);
        follower.connect_inbound(follower_rx);

        let mut bots = [Bot::new(config.seed ^ 0xA5A5), Bot::new(config.seed ^ 0x5A5A)];
        let mut step = FixedStep::default();
        let mut elapsed = 0.0;
        let mut explosions = 0usize;

        while elapsed < MAX_SECONDS {
            elapsed += FRAME_DT;
            for _ in 0..step.steps(FRAME_DT) {
                tick(&mut authority, &bots[0].input(), SIM_DT);
                tick(&mut follower, &bots[1].input(), SIM_DT);
            }

            for world in [&mut authority, &mut follower] {
                explosions += world
                    .drain_events()
                    .iter()
                    .filter(|e| matches!(e, blast_arena::sim::GameEvent::BombExploded { .. }))
                    .count();
            }
            to_follower.relay(authority.drain_outbound());
            to_authority.relay(follower.drain_outbound());

            if authority.phase == GamePhase::GameOver || follower.phase == GamePhase::GameOver {
                break;
            }
        }

        let walls_agree = authority
            .map
            .walls()
            .map(|(cell, wall)| (cell, wall.clone()))
            .eq(follower.map.walls().map(|(cell, wall)| (cell, wall.clone())));

        log::info!(
            "Session ended after {:.1}s: {} detonations seen, walls agree: {}",
            elapsed,
            explosions,
            walls_agree
        );
        for world in [&authority, &follower] {
            for slot in world.local_players() {
                log::info!(
                    "{} player {}: {} at {} (power {}, bombs {}, speed {:.2})",
                    world.role.as_str(),
                    slot.id().0,
                    if slot.handle.is_alive() { "alive" } else { "dead" },
                    slot.handle.cell(),
                    slot.handle.bomb_power(),
                    slot.handle.max_bomb_count(),
                    slot.handle.speed()
                );
            }
        }
        Ok(())
    }
}
