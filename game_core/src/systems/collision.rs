use crate::{Ball, Config, Events, Paddle, Rally, ShotEffect, Side};
use glam::Vec2;
use hecs::World;

/// Steepest reflection any configuration may ask for, keeps the ball moving vertically
const MAX_REFLECTION_DEG: f32 = 80.0;

/// Speed multiplier after `hits` paddle contacts in a rally
pub fn speed_multiplier(hits: u32, config: &Config) -> f32 {
    (1.0 + hits as f32 * config.speed_step_per_hit).min(config.max_speed_multiplier)
}

/// Contact offset from paddle centre in [-1, 1], or None when it can't be computed
pub fn hit_position(ball_x: f32, paddle: &Paddle) -> Option<f32> {
    let half_width = paddle.half_width();
    if half_width <= 0.0 || !half_width.is_finite() {
        return None;
    }
    let position = ((ball_x - paddle.center_x()) / half_width).clamp(-1.0, 1.0);
    position.is_finite().then_some(position)
}

/// Velocity leaving `side`'s paddle at `angle_deg` off vertical
pub fn bounce_velocity(speed: f32, angle_deg: f32, side: Side) -> Vec2 {
    let angle = angle_deg.to_radians();
    Vec2::new(
        speed * angle.sin(),
        side.outgoing_sign() * speed * angle.cos(),
    )
}

fn overlaps(ball: &Ball, paddle: &Paddle) -> bool {
    let r = ball.radius;
    ball.pos.x + r >= paddle.x
        && ball.pos.x - r <= paddle.x + paddle.width
        && ball.pos.y + r >= paddle.y
        && ball.pos.y - r <= paddle.y + paddle.height
}

/// Check ball collisions with side walls, then paddles
pub fn check_collisions(world: &mut World, config: &Config, rally: &mut Rally, events: &mut Events) {
    let ball_data = {
        let mut ball_query = world.query::<&Ball>();
        ball_query.iter().next().map(|(e, ball)| (e, *ball))
    };

    let (ball_entity, mut ball) = match ball_data {
        Some(data) => data,
        None => return, // No ball in world
    };

    // Walls first so a paddle contact in the same tick sees the corrected position
    let r = ball.radius;
    if ball.pos.x - r < 0.0 {
        ball.pos.x = r;
        if ball.vel.x < 0.0 {
            ball.vel.x = -ball.vel.x;
            events.wall_hit = true;
        }
    } else if ball.pos.x + r > config.field_width {
        ball.pos.x = config.field_width - r;
        if ball.vel.x > 0.0 {
            ball.vel.x = -ball.vel.x;
            events.wall_hit = true;
        }
    }

    let paddles: Vec<(hecs::Entity, Paddle, ShotEffect)> = world
        .query::<(&Paddle, &ShotEffect)>()
        .iter()
        .map(|(e, (p, s))| (e, *p, *s))
        .collect();

    for (paddle_entity, paddle, shot) in paddles {
        // Only a ball heading at the paddle can bounce off it
        if !paddle.side.is_incoming(ball.vel.y) || !overlaps(&ball, &paddle) {
            continue;
        }
        let Some(position) = hit_position(ball.pos.x, &paddle) else {
            continue;
        };

        let max_angle = config.max_bounce_angle_deg.min(MAX_REFLECTION_DEG);
        let mut angle = position * max_angle;
        if let Some(cap) = shot.armed.and_then(|t| t.max_angle_deg()) {
            angle = angle.clamp(-cap, cap);
        }

        rally.hits += 1;
        ball.multiplier = speed_multiplier(rally.hits, config);
        ball.vel = bounce_velocity(ball.target_speed(), angle, paddle.side);
        ball.pos.y = paddle.contact_line(r);
        events.paddle_hit = Some(paddle.side);

        if let Ok(mut effect) = world.get::<&mut ShotEffect>(paddle_entity) {
            effect.armed = None;
        }
        break;
    }

    if let Ok(mut stored) = world.get::<&mut Ball>(ball_entity) {
        *stored = ball;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_ball, create_paddle, Technique};
    use proptest::prelude::*;

    fn setup_world() -> (World, Config, Rally, Events) {
        (World::new(), Config::new(), Rally::new(), Events::new())
    }

    fn only_ball(world: &World) -> Ball {
        let mut query = world.query::<&Ball>();
        let (_e, ball) = query.iter().next().expect("ball exists");
        *ball
    }

    /// Ball centre just inside the face of `side`'s paddle, offset from its centre
    fn ball_at_paddle(config: &Config, side: Side, offset: f32) -> Vec2 {
        let paddle = Paddle::new(side, config);
        Vec2::new(
            paddle.center_x() + offset,
            paddle.contact_line(config.ball_radius) - side.outgoing_sign() * 2.0,
        )
    }

    #[test]
    fn test_ball_bounces_off_left_wall() {
        let (mut world, config, mut rally, mut events) = setup_world();
        let ball_vel = Vec2::new(-3.0, 2.0);
        create_ball(&mut world, Vec2::new(config.ball_radius - 1.0, 200.0), ball_vel, &config);

        check_collisions(&mut world, &config, &mut rally, &mut events);

        let ball = only_ball(&world);
        assert!(ball.vel.x > 0.0, "Ball should bounce right off the left wall");
        assert_eq!(ball.vel.y, ball_vel.y, "Vertical velocity should be unchanged");
        assert!(ball.pos.x >= config.ball_radius, "Ball should be pushed out of wall");
        assert!(events.wall_hit);
    }

    #[test]
    fn test_ball_bounces_off_right_wall() {
        let (mut world, config, mut rally, mut events) = setup_world();
        create_ball(
            &mut world,
            Vec2::new(config.field_width - config.ball_radius + 1.0, 200.0),
            Vec2::new(3.0, -2.0),
            &config,
        );

        check_collisions(&mut world, &config, &mut rally, &mut events);

        let ball = only_ball(&world);
        assert!(ball.vel.x < 0.0, "Ball should bounce left off the right wall");
        assert!(ball.pos.x <= config.field_width - config.ball_radius);
        assert!(events.wall_hit);
    }

    #[test]
    fn test_ball_collides_with_top_paddle() {
        let (mut world, config, mut rally, mut events) = setup_world();
        create_paddle(&mut world, Side::Top, &config);
        let pos = ball_at_paddle(&config, Side::Top, 0.0);
        create_ball(&mut world, pos, Vec2::new(0.0, -4.0), &config);

        check_collisions(&mut world, &config, &mut rally, &mut events);

        let ball = only_ball(&world);
        let paddle = Paddle::new(Side::Top, &config);
        assert!(ball.vel.y > 0.0, "Ball should head down after the top paddle");
        assert_eq!(ball.pos.y, paddle.contact_line(config.ball_radius));
        assert_eq!(events.paddle_hit, Some(Side::Top));
        assert_eq!(rally.hits, 1);
    }

    #[test]
    fn test_ball_collides_with_bottom_paddle() {
        let (mut world, config, mut rally, mut events) = setup_world();
        create_paddle(&mut world, Side::Bottom, &config);
        let pos = ball_at_paddle(&config, Side::Bottom, 10.0);
        create_ball(&mut world, pos, Vec2::new(1.0, 4.0), &config);

        check_collisions(&mut world, &config, &mut rally, &mut events);

        let ball = only_ball(&world);
        assert!(ball.vel.y < 0.0, "Ball should head up after the bottom paddle");
        assert!(ball.pos.y < config.paddle_y(Side::Bottom));
        assert_eq!(events.paddle_hit, Some(Side::Bottom));
    }

    #[test]
    fn test_ball_speed_increases_on_paddle_hit() {
        let (mut world, config, mut rally, mut events) = setup_world();
        create_paddle(&mut world, Side::Top, &config);
        rally.hits = 2;
        let pos = ball_at_paddle(&config, Side::Top, 0.0);
        create_ball(&mut world, pos, Vec2::new(0.0, -4.0), &config);

        check_collisions(&mut world, &config, &mut rally, &mut events);

        let ball = only_ball(&world);
        let expected = config.ball_base_speed * (1.0 + 3.0 * 0.15);
        assert!((ball.multiplier - 1.45).abs() < 1e-5);
        assert!(
            (ball.vel.length() - expected).abs() < 1e-4,
            "Ball speed should follow the hit count, got {}",
            ball.vel.length()
        );
    }

    #[test]
    fn test_ball_speed_caps_at_max() {
        let config = Config::new();
        assert_eq!(speed_multiplier(20, &config), 4.0);
        assert_eq!(speed_multiplier(1_000, &config), 4.0);
    }

    #[test]
    fn test_ball_trajectory_affected_by_hit_position() {
        let (mut world, config, mut rally, mut events) = setup_world();
        create_paddle(&mut world, Side::Bottom, &config);
        let pos = ball_at_paddle(&config, Side::Bottom, -config.paddle_width / 2.0);
        create_ball(&mut world, pos, Vec2::new(0.0, 4.0), &config);

        check_collisions(&mut world, &config, &mut rally, &mut events);

        let ball = only_ball(&world);
        let angle = ball.vel.x.atan2(-ball.vel.y).to_degrees();
        assert!(
            (angle + 60.0).abs() < 1e-3,
            "Edge hit should leave at -60°, got {angle}"
        );
    }

    #[test]
    fn test_ball_does_not_bounce_when_moving_away_from_paddle() {
        let (mut world, config, mut rally, mut events) = setup_world();
        create_paddle(&mut world, Side::Top, &config);
        let pos = ball_at_paddle(&config, Side::Top, 0.0);
        let ball_vel = Vec2::new(0.0, 4.0); // already leaving the top paddle
        create_ball(&mut world, pos, ball_vel, &config);

        check_collisions(&mut world, &config, &mut rally, &mut events);

        assert_eq!(only_ball(&world).vel, ball_vel, "Ball should not bounce when moving away");
        assert_eq!(events.paddle_hit, None);
        assert_eq!(rally.hits, 0);
    }

    #[test]
    fn test_no_collision_when_no_ball() {
        let (mut world, config, mut rally, mut events) = setup_world();
        create_paddle(&mut world, Side::Top, &config);

        check_collisions(&mut world, &config, &mut rally, &mut events);

        assert_eq!(events, Events::new());
    }

    #[test]
    fn test_straight_shot_caps_angle_once() {
        let (mut world, config, mut rally, mut events) = setup_world();
        let paddle_entity = create_paddle(&mut world, Side::Top, &config);
        world.get::<&mut ShotEffect>(paddle_entity).unwrap().armed = Some(Technique::Straight);
        let pos = ball_at_paddle(&config, Side::Top, config.paddle_width / 2.0);
        create_ball(&mut world, pos, Vec2::new(0.0, -4.0), &config);

        check_collisions(&mut world, &config, &mut rally, &mut events);

        let ball = only_ball(&world);
        let angle = ball.vel.x.atan2(ball.vel.y).to_degrees();
        assert!((angle - 15.0).abs() < 1e-3, "Straight shot capped at 15°, got {angle}");
        assert_eq!(
            world.get::<&ShotEffect>(paddle_entity).unwrap().armed,
            None,
            "Effect is consumed by the contact"
        );
    }

    #[test]
    fn test_zero_width_paddle_is_no_contact() {
        let paddle = Paddle {
            side: Side::Top,
            x: 100.0,
            y: 20.0,
            width: 0.0,
            height: 12.0,
        };
        assert_eq!(hit_position(100.0, &paddle), None);
    }

    proptest! {
        #[test]
        fn prop_speed_multiplier_monotonic_and_capped(hits in 0u32..10_000) {
            let config = Config::new();
            let m = speed_multiplier(hits, &config);
            prop_assert!((m - (1.0 + 0.15 * hits as f32).min(4.0)).abs() < 1e-4);
            prop_assert!(m <= 4.0);
            prop_assert!(speed_multiplier(hits + 1, &config) >= m);
        }

        #[test]
        fn prop_reflection_angle_and_direction(p in -1.0f32..=1.0, top in any::<bool>()) {
            let side = if top { Side::Top } else { Side::Bottom };
            let vel = bounce_velocity(4.0, p * 60.0, side);
            let angle = vel.x.atan2(vel.y * side.outgoing_sign()).to_degrees();
            prop_assert!((angle - p * 60.0).abs() < 1e-3);
            prop_assert!(vel.y * side.outgoing_sign() > 0.0, "vertical component points away");
            prop_assert!((vel.length() - 4.0).abs() < 1e-4);
        }
    }
}
