/// Game tuning parameters for Pong
#[derive(Debug, Clone, Copy)]
pub struct Params;

impl Params {
    // Field
    pub const FIELD_WIDTH: f32 = 800.0;
    pub const FIELD_HEIGHT: f32 = 400.0;

    // Paddle
    pub const PADDLE_WIDTH: f32 = 80.0;
    pub const PADDLE_HEIGHT: f32 = 12.0;
    pub const PADDLE_SPEED: f32 = 8.0; // units per tick
    pub const PADDLE_MARGIN: f32 = 20.0; // inset from the goal line

    // Ball
    pub const BALL_RADIUS: f32 = 8.0;
    pub const BALL_BASE_SPEED: f32 = 4.0; // units per tick
    pub const SPEED_STEP_PER_HIT: f32 = 0.15;
    pub const MAX_SPEED_MULTIPLIER: f32 = 4.0;

    // Angles (degrees, measured from vertical)
    pub const MAX_BOUNCE_ANGLE_DEG: f32 = 60.0;
    pub const STRAIGHT_SHOT_MAX_ANGLE_DEG: f32 = 15.0;
    pub const LAUNCH_ANGLE_MIN_DEG: f32 = 15.0;
    pub const LAUNCH_ANGLE_MAX_DEG: f32 = 45.0;

    // Score
    pub const WIN_SCORE: u8 = 11;

    // Timing
    pub const TICK_HZ: u32 = 60;

    // Prediction
    pub const MAX_UNFOLD_ITERATIONS: usize = 64;
    pub const MIN_VERTICAL_SPEED: f32 = 1e-3;
}
