use crate::params::Params;
use crate::Side;
use serde::{Deserialize, Serialize};

/// Game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub field_width: f32,
    pub field_height: f32,
    pub paddle_width: f32,
    pub paddle_height: f32,
    pub paddle_speed: f32,
    pub paddle_margin: f32,
    pub ball_radius: f32,
    pub ball_base_speed: f32,
    pub speed_step_per_hit: f32,
    pub max_speed_multiplier: f32,
    pub max_bounce_angle_deg: f32,
    pub win_score: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            field_width: Params::FIELD_WIDTH,
            field_height: Params::FIELD_HEIGHT,
            paddle_width: Params::PADDLE_WIDTH,
            paddle_height: Params::PADDLE_HEIGHT,
            paddle_speed: Params::PADDLE_SPEED,
            paddle_margin: Params::PADDLE_MARGIN,
            ball_radius: Params::BALL_RADIUS,
            ball_base_speed: Params::BALL_BASE_SPEED,
            speed_step_per_hit: Params::SPEED_STEP_PER_HIT,
            max_speed_multiplier: Params::MAX_SPEED_MULTIPLIER,
            max_bounce_angle_deg: Params::MAX_BOUNCE_ANGLE_DEG,
            win_score: Params::WIN_SCORE,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace non-finite or non-positive values with their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        let fix = |value: &mut f32, default: f32| {
            if !value.is_finite() || *value <= 0.0 {
                *value = default;
            }
        };
        fix(&mut self.field_width, defaults.field_width);
        fix(&mut self.field_height, defaults.field_height);
        fix(&mut self.paddle_width, defaults.paddle_width);
        fix(&mut self.paddle_height, defaults.paddle_height);
        fix(&mut self.paddle_speed, defaults.paddle_speed);
        fix(&mut self.ball_radius, defaults.ball_radius);
        fix(&mut self.ball_base_speed, defaults.ball_base_speed);
        fix(&mut self.max_speed_multiplier, defaults.max_speed_multiplier);
        fix(&mut self.max_bounce_angle_deg, defaults.max_bounce_angle_deg);
        if !self.paddle_margin.is_finite() || self.paddle_margin < 0.0 {
            self.paddle_margin = defaults.paddle_margin;
        }
        if !self.speed_step_per_hit.is_finite() || self.speed_step_per_hit < 0.0 {
            self.speed_step_per_hit = defaults.speed_step_per_hit;
        }
        if self.paddle_width > self.field_width {
            self.paddle_width = self.field_width;
        }
        if self.win_score == 0 {
            self.win_score = defaults.win_score;
        }
        self
    }

    /// Y of the paddle's top-left corner for a side
    pub fn paddle_y(&self, side: Side) -> f32 {
        match side {
            Side::Top => self.paddle_margin,
            Side::Bottom => self.field_height - self.paddle_margin - self.paddle_height,
        }
    }

    /// X of a paddle centred in the field
    pub fn paddle_start_x(&self) -> f32 {
        (self.field_width - self.paddle_width) / 2.0
    }

    /// Clamp paddle X so the paddle stays inside the field
    pub fn clamp_paddle_x(&self, x: f32) -> f32 {
        x.clamp(0.0, (self.field_width - self.paddle_width).max(0.0))
    }

    pub fn center(&self) -> glam::Vec2 {
        glam::Vec2::new(self.field_width / 2.0, self.field_height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paddle_y() {
        let config = Config::new();
        assert_eq!(config.paddle_y(Side::Top), 20.0, "Top paddle Y position");
        assert_eq!(
            config.paddle_y(Side::Bottom),
            368.0,
            "Bottom paddle Y position"
        );
    }

    #[test]
    fn test_config_clamp_paddle_x() {
        let config = Config::new();
        assert_eq!(config.clamp_paddle_x(-10.0), 0.0);
        assert_eq!(
            config.clamp_paddle_x(10_000.0),
            config.field_width - config.paddle_width
        );
        let valid_x = 300.0;
        assert_eq!(config.clamp_paddle_x(valid_x), valid_x);
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "win_score": 5 }"#).unwrap();
        assert_eq!(config.win_score, 5);
        assert_eq!(config.field_width, Params::FIELD_WIDTH);
        assert_eq!(config.ball_base_speed, Params::BALL_BASE_SPEED);
    }

    #[test]
    fn test_sanitized_replaces_bad_values() {
        let config = Config {
            field_width: f32::NAN,
            paddle_speed: -3.0,
            win_score: 0,
            ..Config::default()
        }
        .sanitized();
        assert_eq!(config.field_width, Params::FIELD_WIDTH);
        assert_eq!(config.paddle_speed, Params::PADDLE_SPEED);
        assert_eq!(config.win_score, Params::WIN_SCORE);
    }
}
