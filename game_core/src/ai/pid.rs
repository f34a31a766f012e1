use rand::RngCore;

use super::{approach_offset, Controller, ControllerKind, DifficultyParams, GameView, PidGains};
use crate::PaddleCommand;

/// PID accumulator state, private to one paddle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pid {
    pub integral: f32,
    pub filtered_derivative: f32,
    last_error: Option<f32>,
}

impl Pid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one error sample; returns the per-tick move toward the target.
    ///
    /// The integral only accumulates while the output is unsaturated, and the
    /// move never points away from the target or steps past it.
    pub fn update(&mut self, error: f32, gains: &PidGains) -> f32 {
        if !error.is_finite() {
            return 0.0;
        }

        // First sample after a reset has no derivative
        let raw = self.last_error.map_or(0.0, |last| error - last);
        self.filtered_derivative =
            gains.derivative_filter * self.filtered_derivative + (1.0 - gains.derivative_filter) * raw;
        self.last_error = Some(error);

        let damping = gains.kd * self.filtered_derivative;
        let integral = (self.integral + error).clamp(-gains.max_integral, gains.max_integral);
        if (gains.kp * error + gains.ki * integral + damping).abs() < gains.max_output {
            self.integral = integral;
        }

        let mut output = gains.kp * error + gains.ki * self.integral + damping;
        if output * error < 0.0 {
            // Damping may brake, never reverse
            output = gains.kp * error;
        }
        let reach = error.abs().min(gains.max_output);
        output.clamp(-reach, reach)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Closed-loop tracking of the predicted arrival point
#[derive(Debug, Clone)]
pub struct PidController {
    params: DifficultyParams,
    pid: Pid,
    rally_id: Option<u32>,
    incoming: Option<bool>,
    direction_changed_at: u64,
    offset: f32,
    target_x: Option<f32>,
}

impl PidController {
    pub fn new(params: DifficultyParams) -> Self {
        Self {
            params,
            pid: Pid::new(),
            rally_id: None,
            incoming: None,
            direction_changed_at: 0,
            offset: 0.0,
            target_x: None,
        }
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }
}

impl Controller for PidController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Pid
    }

    fn decide(&mut self, view: &GameView, rng: &mut dyn RngCore) -> PaddleCommand {
        // No windup across rallies
        if self.rally_id != Some(view.rally.id) {
            self.rally_id = Some(view.rally.id);
            self.pid.reset();
        }

        let incoming = view.ball_incoming();
        if self.incoming != Some(incoming) {
            self.incoming = Some(incoming);
            self.direction_changed_at = view.now_ms;
            self.offset = if incoming {
                approach_offset(
                    rng,
                    self.params.return_rate,
                    self.params.tracking_noise,
                    view.predicted_arrival_x(),
                    view,
                )
            } else {
                0.0
            };
        }

        let reacted = view.now_ms.saturating_sub(self.direction_changed_at) as f32
            >= self.params.reaction_delay_ms;
        if reacted || self.target_x.is_none() {
            self.target_x = Some(if incoming && reacted {
                view.predicted_arrival_x() + self.offset
            } else {
                view.field_width / 2.0
            });
        }

        let target = self.target_x.unwrap_or(view.field_width / 2.0);
        let output = self.pid.update(target - view.own.center_x(), &self.params.pid);
        PaddleCommand::move_by(output.clamp(-view.paddle_speed, view.paddle_speed))
    }

    fn reconfigure(&mut self, params: DifficultyParams) {
        self.params = params;
    }

    fn reset(&mut self) {
        self.pid.reset();
        self.rally_id = None;
        self.incoming = None;
        self.direction_changed_at = 0;
        self.offset = 0.0;
        self.target_x = None;
    }
}
