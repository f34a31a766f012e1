//! Autonomous paddle controllers.
//!
//! Every strategy implements [`Controller`]; the session owns one boxed
//! controller per NPC side and hands it a read-only [`GameView`] each tick.

pub mod deferred;
pub mod difficulty;
pub mod heuristic;
pub mod pid;
pub mod planner;
pub mod technician;

pub use deferred::Deferred;
pub use difficulty::*;
pub use heuristic::HeuristicController;
pub use pid::{Pid, PidController};
pub use planner::{Action, TechniqueHistory};
pub use technician::{TechnicianController, TechnicianTuning};

use rand::{Rng, RngCore};

use crate::prediction::predict_arrival_x;
use crate::{Ball, Paddle, PaddleCommand, Rally, Side};

/// What one side's controller can see this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameView {
    pub side: Side,
    pub ball: Ball,
    pub own: Paddle,
    pub opponent: Paddle,
    pub field_width: f32,
    pub field_height: f32,
    pub paddle_speed: f32,
    pub max_bounce_angle_deg: f32,
    pub rally: Rally,
    pub now_ms: u64,
}

impl GameView {
    pub fn ball_incoming(&self) -> bool {
        self.side.is_incoming(self.ball.vel.y)
    }

    /// Predicted x where the ball meets this side's paddle face
    pub fn predicted_arrival_x(&self) -> f32 {
        predict_arrival_x(
            &self.ball,
            self.own.contact_line(self.ball.radius),
            self.field_width,
        )
    }

    /// Vertical distance the ball travels between the two paddle faces
    pub fn court_length(&self) -> f32 {
        (self.own.contact_line(self.ball.radius) - self.opponent.contact_line(self.ball.radius))
            .abs()
            .max(1.0)
    }
}

pub trait Controller: Send {
    fn kind(&self) -> ControllerKind;

    /// Movement command for this tick
    fn decide(&mut self, view: &GameView, rng: &mut dyn RngCore) -> PaddleCommand;

    /// Swap in new tuning; accumulated state is kept
    fn reconfigure(&mut self, params: DifficultyParams);

    /// Drop any scheduled-but-unfired work
    fn cancel_pending(&mut self) {}

    /// Forget everything learned in the current match
    fn reset(&mut self);
}

/// Build the controller a config selects
pub fn build_controller(config: &ControllerConfig) -> Box<dyn Controller> {
    let params = config.resolve();
    match config.kind {
        ControllerKind::Heuristic => Box::new(HeuristicController::new(params)),
        ControllerKind::Pid => Box::new(PidController::new(params)),
        ControllerKind::Technician => Box::new(TechnicianController::new(params)),
    }
}

/// Aim offset for one approach: small tracking jitter, or a deliberate miss
/// with probability `1 - return_rate`.
pub(crate) fn approach_offset(
    rng: &mut dyn RngCore,
    return_rate: f32,
    tracking_noise: f32,
    arrival_x: f32,
    view: &GameView,
) -> f32 {
    let half_width = view.own.half_width();
    if rng.gen::<f32>() >= return_rate {
        // Miss away from the nearer wall so clamping can't save the shot
        let away = if arrival_x < view.field_width / 2.0 { 1.0 } else { -1.0 };
        away * (half_width + view.ball.radius + rng.gen_range(8.0..24.0))
    } else {
        rng.gen_range(-1.0f32..=1.0) * tracking_noise * half_width
    }
}

/// Signed step toward `distance`, capped at `max_step`; zero inside `dead_zone`
pub(crate) fn step_toward(distance: f32, max_step: f32, dead_zone: f32) -> f32 {
    if !distance.is_finite() || distance.abs() < dead_zone {
        0.0
    } else {
        distance.clamp(-max_step, max_step)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameRng;
    use glam::Vec2;

    #[test]
    fn test_build_controller_selects_kind() {
        for kind in [
            ControllerKind::Heuristic,
            ControllerKind::Pid,
            ControllerKind::Technician,
        ] {
            let controller = build_controller(&ControllerConfig::new(kind, Difficulty::Hard));
            assert_eq!(controller.kind(), kind);
        }
    }

    #[test]
    fn test_step_toward() {
        assert_eq!(step_toward(100.0, 7.0, 15.0), 7.0);
        assert_eq!(step_toward(-100.0, 7.0, 15.0), -7.0);
        assert_eq!(step_toward(10.0, 7.0, 15.0), 0.0);
        assert_eq!(step_toward(f32::NAN, 7.0, 0.0), 0.0);
    }

    #[test]
    fn test_miss_offset_clears_the_paddle() {
        let view = test_support::view(Side::Bottom, Vec2::new(100.0, 200.0), Vec2::new(0.0, 4.0));
        let mut rng = GameRng::new(1);
        for _ in 0..50 {
            let offset = approach_offset(&mut rng.0, 0.0, 0.1, 100.0, &view);
            assert!(offset > view.own.half_width() + view.ball.radius);
        }
    }

    #[test]
    fn test_perfect_return_rate_only_jitters() {
        let view = test_support::view(Side::Top, Vec2::new(400.0, 200.0), Vec2::new(0.0, -4.0));
        let mut rng = GameRng::new(2);
        for _ in 0..50 {
            let offset = approach_offset(&mut rng.0, 1.0, 0.1, 400.0, &view);
            assert!(offset.abs() <= 0.1 * view.own.half_width() + 1e-4);
        }
    }
}
