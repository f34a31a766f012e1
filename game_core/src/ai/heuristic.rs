use rand::RngCore;

use super::{approach_offset, step_toward, Controller, ControllerKind, DifficultyParams, GameView};
use crate::PaddleCommand;

const DEAD_ZONE: f32 = 2.0;

/// Chases the ball's current x with noisy aim and a reaction delay
#[derive(Debug, Clone)]
pub struct HeuristicController {
    params: DifficultyParams,
    incoming: Option<bool>,
    direction_changed_at: u64,
    offset: f32,
}

impl HeuristicController {
    pub fn new(params: DifficultyParams) -> Self {
        Self {
            params,
            incoming: None,
            direction_changed_at: 0,
            offset: 0.0,
        }
    }

    fn reacting(&self, now_ms: u64) -> bool {
        (now_ms.saturating_sub(self.direction_changed_at) as f32) < self.params.reaction_delay_ms
    }
}

impl Controller for HeuristicController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Heuristic
    }

    fn decide(&mut self, view: &GameView, rng: &mut dyn RngCore) -> PaddleCommand {
        let incoming = view.ball_incoming();
        if self.incoming != Some(incoming) {
            self.incoming = Some(incoming);
            self.direction_changed_at = view.now_ms;
            self.offset = if incoming {
                approach_offset(
                    rng,
                    self.params.return_rate,
                    self.params.tracking_noise,
                    view.ball.pos.x,
                    view,
                )
            } else {
                0.0
            };
        }

        // Still registering the new direction
        if self.reacting(view.now_ms) {
            return PaddleCommand::hold();
        }

        let target = view.ball.pos.x + self.offset;
        let max_step = self.params.max_speed * view.paddle_speed;
        PaddleCommand::move_by(step_toward(target - view.own.center_x(), max_step, DEAD_ZONE))
    }

    fn reconfigure(&mut self, params: DifficultyParams) {
        self.params = params;
    }

    fn reset(&mut self) {
        self.incoming = None;
        self.direction_changed_at = 0;
        self.offset = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::test_support::view;
    use crate::ai::Difficulty;
    use crate::{GameRng, Side};
    use glam::Vec2;

    fn perfect() -> DifficultyParams {
        DifficultyParams {
            return_rate: 1.0,
            tracking_noise: 0.0,
            reaction_delay_ms: 100.0,
            ..Difficulty::Normal.preset()
        }
    }

    #[test]
    fn test_waits_out_reaction_delay() {
        let mut controller = HeuristicController::new(perfect());
        let mut rng = GameRng::new(3);
        let mut v = view(Side::Bottom, Vec2::new(700.0, 200.0), Vec2::new(1.0, 4.0));

        assert_eq!(controller.decide(&v, &mut rng.0).dx, 0.0);
        v.now_ms = 99;
        assert_eq!(controller.decide(&v, &mut rng.0).dx, 0.0);
        v.now_ms = 100;
        let command = controller.decide(&v, &mut rng.0);
        assert!(command.dx > 0.0, "moves toward the ball once reacted");
    }

    #[test]
    fn test_speed_capped_by_max_speed() {
        let params = perfect();
        let mut controller = HeuristicController::new(params);
        let mut rng = GameRng::new(4);
        let mut v = view(Side::Top, Vec2::new(10.0, 200.0), Vec2::new(0.0, -4.0));
        controller.decide(&v, &mut rng.0);
        v.now_ms = 1_000;

        let command = controller.decide(&v, &mut rng.0);
        assert!((command.dx + params.max_speed * v.paddle_speed).abs() < 1e-5);
    }

    #[test]
    fn test_holds_when_aligned() {
        let mut controller = HeuristicController::new(perfect());
        let mut rng = GameRng::new(5);
        let mut v = view(Side::Top, Vec2::new(400.0, 200.0), Vec2::new(0.0, -4.0));
        controller.decide(&v, &mut rng.0);
        v.now_ms = 500;
        assert_eq!(controller.decide(&v, &mut rng.0).dx, 0.0);
    }
}
