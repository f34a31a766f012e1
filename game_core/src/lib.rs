pub mod ai;
pub mod components;
pub mod config;
pub mod params;
pub mod prediction;
pub mod resources;
pub mod simulation;
pub mod systems;

pub use components::*;
pub use config::*;
pub use params::*;
pub use resources::*;
pub use simulation::*;

use hecs::World;
use systems::*;

/// Run one deterministic Pong tick
#[allow(clippy::too_many_arguments)]
pub fn step(
    world: &mut World,
    time: &mut Time,
    config: &Config,
    score: &mut Score,
    rally: &mut Rally,
    events: &mut Events,
    intents: &mut IntentQueue,
    rng: &mut GameRng,
) {
    // Clear events at start of tick
    events.clear();

    // 1. Ingest commands (apply to paddle intents, arm shots)
    ingest_intents(world, intents, config);

    // 2. Move paddles based on intents
    move_paddles(world, config);

    // 3. Move ball
    move_ball(world);

    // 4. Check collisions (walls, then paddles)
    check_collisions(world, config, rally, events);

    // 5. Check scoring (ball left through a goal line)
    check_scoring(world, config, score, rally, events, rng);

    time.advance();
}

/// Helper to create a paddle entity
pub fn create_paddle(world: &mut World, side: Side, config: &Config) -> hecs::Entity {
    world.spawn((
        Paddle::new(side, config),
        PaddleIntent::new(),
        ShotEffect::default(),
    ))
}

/// Helper to create the ball entity
pub fn create_ball(
    world: &mut World,
    pos: glam::Vec2,
    vel: glam::Vec2,
    config: &Config,
) -> hecs::Entity {
    world.spawn((Ball::new(pos, vel, config),))
}
