use hecs::World;

use crate::{Config, IntentQueue, Paddle, PaddleIntent, ShotEffect};

/// Apply queued commands to paddle intents, arming any requested shot
pub fn ingest_intents(world: &mut World, queue: &mut IntentQueue, config: &Config) {
    for (_entity, (paddle, intent, shot)) in
        world.query_mut::<(&Paddle, &mut PaddleIntent, &mut ShotEffect)>()
    {
        let mut next = PaddleIntent::new();
        for (side, command) in &queue.commands {
            if *side != paddle.side {
                continue;
            }
            // Non-finite moves are dropped, finite ones capped at paddle speed
            next.dx = if command.dx.is_finite() {
                command.dx.clamp(-config.paddle_speed, config.paddle_speed)
            } else {
                0.0
            };
            if command.shot.is_some() {
                shot.armed = command.shot;
            }
        }
        *intent = next;
    }

    queue.clear();
}
