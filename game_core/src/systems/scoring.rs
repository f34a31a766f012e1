use crate::{Ball, Config, Events, GameRng, Rally, Score, ShotEffect, Side};
use hecs::World;

/// Award a point when the ball's leading edge crosses a goal line
pub fn check_scoring(
    world: &mut World,
    config: &Config,
    score: &mut Score,
    rally: &mut Rally,
    events: &mut Events,
    rng: &mut GameRng,
) {
    let mut scorer = None;

    for (_entity, ball) in world.query_mut::<&mut Ball>() {
        let scored = if ball.pos.y - ball.radius <= 0.0 {
            Some(Side::Bottom) // got past the top paddle
        } else if ball.pos.y + ball.radius >= config.field_height {
            Some(Side::Top)
        } else {
            None
        };

        if let Some(side) = scored {
            score.increment(side);
            events.scored = Some(side);
            ball.reset(config, rng);
            scorer = Some(side);
        }
    }

    if let Some(side) = scorer {
        rally.next();
        for (_entity, shot) in world.query_mut::<&mut ShotEffect>() {
            shot.armed = None;
        }
        tracing::debug!(
            scorer = %side,
            top = score.top,
            bottom = score.bottom,
            "point scored"
        );
    }
}
