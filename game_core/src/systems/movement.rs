use crate::{Ball, Config, Paddle, PaddleIntent};
use hecs::World;

/// Apply paddle movement based on intents
pub fn move_paddles(world: &mut World, config: &Config) {
    for (_entity, (paddle, intent)) in world.query_mut::<(&mut Paddle, &PaddleIntent)>() {
        if intent.dx != 0.0 {
            paddle.x = config.clamp_paddle_x(paddle.x + intent.dx);
        }
    }
}

/// Rescale ball velocity to its target speed, then advance it one tick
pub fn move_ball(world: &mut World) {
    for (_entity, ball) in world.query_mut::<&mut Ball>() {
        // A zero-length velocity has no direction to keep
        if let Some(dir) = ball.vel.try_normalize() {
            ball.vel = dir * ball.target_speed();
        }
        ball.pos += ball.vel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_ball, create_paddle, Side};
    use glam::Vec2;

    #[test]
    fn test_paddle_clamped_to_field() {
        let mut world = World::new();
        let config = Config::new();
        let entity = create_paddle(&mut world, Side::Top, &config);

        for _ in 0..100 {
            world.get::<&mut PaddleIntent>(entity).unwrap().dx = config.paddle_speed;
            move_paddles(&mut world, &config);
        }
        let paddle = *world.get::<&Paddle>(entity).unwrap();
        assert_eq!(paddle.x, config.field_width - config.paddle_width);

        for _ in 0..200 {
            world.get::<&mut PaddleIntent>(entity).unwrap().dx = -config.paddle_speed;
            move_paddles(&mut world, &config);
        }
        assert_eq!(world.get::<&Paddle>(entity).unwrap().x, 0.0);
    }

    #[test]
    fn test_ball_speed_normalized_to_target() {
        let mut world = World::new();
        let config = Config::new();
        let entity = create_ball(&mut world, Vec2::new(400.0, 200.0), Vec2::new(3.0, 9.0), &config);
        world.get::<&mut Ball>(entity).unwrap().multiplier = 1.3;

        move_ball(&mut world);

        let ball = *world.get::<&Ball>(entity).unwrap();
        let expected = config.ball_base_speed * 1.3;
        assert!((ball.vel.length() - expected).abs() < 1e-4);
        // Direction preserved
        assert!((ball.vel.x / ball.vel.y - 3.0 / 9.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_velocity_does_not_produce_nan() {
        let mut world = World::new();
        let config = Config::new();
        let entity = create_ball(&mut world, Vec2::new(400.0, 200.0), Vec2::ZERO, &config);

        move_ball(&mut world);

        let ball = *world.get::<&Ball>(entity).unwrap();
        assert!(ball.pos.is_finite() && ball.vel.is_finite());
        assert_eq!(ball.pos, Vec2::new(400.0, 200.0));
    }
}
