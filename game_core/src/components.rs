use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::params::Params;
use crate::Config;

/// Which end of the field a paddle defends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,    // goal line at y = 0
    Bottom, // goal line at y = field height
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Top, Side::Bottom];

    pub fn opponent(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::Top => 0,
            Side::Bottom => 1,
        }
    }

    /// Sign of the vertical velocity of a ball travelling away from this side
    pub fn outgoing_sign(self) -> f32 {
        match self {
            Side::Top => 1.0,
            Side::Bottom => -1.0,
        }
    }

    /// True if a ball with vertical velocity `dy` is heading at this side
    pub fn is_incoming(self, dy: f32) -> bool {
        dy * self.outgoing_sign() < 0.0
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Top => write!(f, "top"),
            Side::Bottom => write!(f, "bottom"),
        }
    }
}

/// Shot archetypes the technician can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
    Course,
    Straight,
    Bounce,
    DoubleBounce,
}

impl Technique {
    pub const ALL: [Technique; 4] = [
        Technique::Course,
        Technique::Straight,
        Technique::Bounce,
        Technique::DoubleBounce,
    ];

    pub fn index(self) -> usize {
        match self {
            Technique::Course => 0,
            Technique::Straight => 1,
            Technique::Bounce => 2,
            Technique::DoubleBounce => 3,
        }
    }

    /// Reflection angle cap this technique imposes on the next contact
    pub fn max_angle_deg(self) -> Option<f32> {
        match self {
            Technique::Straight => Some(Params::STRAIGHT_SHOT_MAX_ANGLE_DEG),
            _ => None,
        }
    }
}

/// Paddle component - x moves, y is fixed per side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    pub side: Side,
    pub x: f32, // top-left corner
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Paddle {
    pub fn new(side: Side, config: &Config) -> Self {
        Self {
            side,
            x: config.paddle_start_x(),
            y: config.paddle_y(side),
            width: config.paddle_width,
            height: config.paddle_height,
        }
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    /// Y of the face that meets the ball
    pub fn face_y(&self) -> f32 {
        match self.side {
            Side::Top => self.y + self.height,
            Side::Bottom => self.y,
        }
    }

    /// Ball-centre y at which a ball of `radius` touches the face
    pub fn contact_line(&self, radius: f32) -> f32 {
        self.face_y() + self.side.outgoing_sign() * radius
    }
}

/// Ball component - the pong ball
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub base_speed: f32,
    pub multiplier: f32,
}

impl Ball {
    pub fn new(pos: Vec2, vel: Vec2, config: &Config) -> Self {
        Self {
            pos,
            vel,
            radius: config.ball_radius,
            base_speed: config.ball_base_speed,
            multiplier: 1.0,
        }
    }

    pub fn target_speed(&self) -> f32 {
        self.base_speed * self.multiplier
    }

    /// Reset ball to centre with a random launch 15°-45° off vertical
    pub fn reset(&mut self, config: &Config, rng: &mut crate::GameRng) {
        use rand::Rng;

        self.pos = config.center();
        self.multiplier = 1.0;

        let angle = rng
            .0
            .gen_range(Params::LAUNCH_ANGLE_MIN_DEG..=Params::LAUNCH_ANGLE_MAX_DEG)
            .to_radians();
        let horizontal = if rng.0.gen_bool(0.5) { 1.0 } else { -1.0 };
        let vertical = if rng.0.gen_bool(0.5) { 1.0 } else { -1.0 };

        let speed = self.target_speed();
        self.vel = Vec2::new(
            horizontal * speed * angle.sin(),
            vertical * speed * angle.cos(),
        );
    }
}

/// Movement intent for paddle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaddleIntent {
    pub dx: f32, // signed horizontal move this tick
}

impl PaddleIntent {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Technique armed on a paddle, consumed by its next contact
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShotEffect {
    pub armed: Option<Technique>,
}
