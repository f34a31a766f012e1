use rand::{Rng, RngCore};

use super::planner::{
    choose, resolve_target, score_actions, shot_target, AimDraw, TechniqueHistory,
};
use super::{
    approach_offset, step_toward, Controller, ControllerKind, Deferred, DifficultyParams, GameView,
};
use crate::{PaddleCommand, Technique};

/// Timing and movement constants of the technician
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechnicianTuning {
    /// Permission to plan is granted once per window
    pub permission_window_ms: u64,
    /// Drift toward centre allowed this long into a rally before any plan
    pub initial_grace_ms: u64,
    pub move_speed: f32,
    pub dead_zone: f32,
    /// Distance from target at which the shot effect is armed
    pub closing_distance: f32,
}

impl Default for TechnicianTuning {
    fn default() -> Self {
        Self {
            permission_window_ms: 1000,
            initial_grace_ms: 2000,
            move_speed: 7.0,
            dead_zone: 15.0,
            closing_distance: 25.0,
        }
    }
}

/// Payload of a scheduled planning pass
#[derive(Debug, Clone, Copy, PartialEq)]
struct PlanRequest {
    scheduled_at_ms: u64,
}

/// A planned shot being executed. Only the choice and its random draws are
/// kept; the target itself is resolved again on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveShot {
    technique: Technique,
    /// Sampled prediction error, fixed for the whole approach
    arrival_error: f32,
    draw: AimDraw,
    armed: bool,
}

impl ActiveShot {
    fn target_x(&self, view: &GameView) -> f32 {
        let arrival_x = view.predicted_arrival_x() + self.arrival_error;
        let target = shot_target(self.technique, view, arrival_x, &self.draw);
        target.min(view.field_width).max(0.0)
    }
}

/// Utility-based shot planner with permission windows and delayed planning
#[derive(Debug, Clone)]
pub struct TechnicianController {
    params: DifficultyParams,
    tuning: TechnicianTuning,
    history: TechniqueHistory,
    pending: Deferred<PlanRequest>,
    active: Option<ActiveShot>,
    rally_id: Option<u32>,
    rally_started_at: u64,
    window_started_at: u64,
    permission: bool,
    planned_this_rally: bool,
}

impl TechnicianController {
    pub fn new(params: DifficultyParams) -> Self {
        Self::with_tuning(params, TechnicianTuning::default())
    }

    pub fn with_tuning(params: DifficultyParams, tuning: TechnicianTuning) -> Self {
        Self {
            params,
            tuning,
            history: TechniqueHistory::new(),
            pending: Deferred::new(),
            active: None,
            rally_id: None,
            rally_started_at: 0,
            window_started_at: 0,
            permission: false,
            planned_this_rally: false,
        }
    }

    pub fn history(&self) -> &TechniqueHistory {
        &self.history
    }

    pub fn has_pending_plan(&self) -> bool {
        self.pending.is_pending()
    }

    /// Technique currently being executed, if any
    pub fn active_technique(&self) -> Option<Technique> {
        self.active.map(|shot| shot.technique)
    }

    /// Paddle-centre target of the active shot as seen in `view`
    pub fn target_x(&self, view: &GameView) -> Option<f32> {
        self.active.map(|shot| shot.target_x(view))
    }

    fn update_permission(&mut self, view: &GameView) {
        let now = view.now_ms;
        if self.rally_id != Some(view.rally.id) {
            self.rally_id = Some(view.rally.id);
            self.pending.cancel();
            self.active = None;
            self.rally_started_at = now;
            self.window_started_at = now;
            self.permission = true;
            self.planned_this_rally = false;
        } else if now.saturating_sub(self.window_started_at) >= self.tuning.permission_window_ms {
            self.window_started_at = now;
            self.permission = true;
        }
    }

    fn plan(&mut self, view: &GameView, rng: &mut dyn RngCore, request: PlanRequest) {
        let predicted = view.predicted_arrival_x();
        let tech = self.params.technician;

        let spread = (1.0 - tech.prediction_accuracy).max(0.0) * 60.0;
        let noise = if spread > 0.0 {
            rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        let arrival_error = noise + approach_offset(rng, tech.return_rate(), 0.0, predicted, view);
        let arrival_x = predicted + arrival_error;

        let mut actions = score_actions(view, rng);
        let Some(mut action) = choose(&mut actions, &mut self.history) else {
            return;
        };
        let draw = resolve_target(&mut action, view, arrival_x, tech.course_accuracy, rng);
        let target_x = action.target_x.min(view.field_width).max(0.0);

        tracing::debug!(
            side = %view.side,
            technique = ?action.technique,
            utility = action.utility,
            arrival_x,
            target_x,
            latency_ms = view.now_ms.saturating_sub(request.scheduled_at_ms),
            "technician planned a shot"
        );

        self.active = Some(ActiveShot {
            technique: action.technique,
            arrival_error,
            draw,
            armed: false,
        });
        self.permission = false;
        self.planned_this_rally = true;
    }

    fn speed(&self, view: &GameView) -> f32 {
        self.tuning.move_speed.min(view.paddle_speed)
    }
}

impl Controller for TechnicianController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Technician
    }

    fn decide(&mut self, view: &GameView, rng: &mut dyn RngCore) -> PaddleCommand {
        self.update_permission(view);

        if !view.ball_incoming() {
            // Approach over: the shot has been played or missed
            self.active = None;
            self.pending.cancel();
        } else if self.permission && self.active.is_none() && !self.pending.is_pending() {
            let due = view.now_ms + self.params.reaction_delay_ms.max(0.0) as u64;
            self.pending.schedule(
                due,
                view.rally.id,
                PlanRequest {
                    scheduled_at_ms: view.now_ms,
                },
            );
        }

        if let Some(request) = self.pending.take_due(view.now_ms, view.rally.id) {
            self.plan(view, rng, request);
        }

        let speed = self.speed(view);
        let dead_zone = self.tuning.dead_zone;
        let closing = self.tuning.closing_distance;
        if let Some(shot) = self.active.as_mut() {
            let distance = shot.target_x(view) - view.own.center_x();
            let mut command = PaddleCommand::move_by(step_toward(distance, speed, dead_zone));
            if !shot.armed && distance.abs() <= closing {
                shot.armed = true;
                command.shot = Some(shot.technique);
            }
            return command;
        }

        let in_grace =
            view.now_ms.saturating_sub(self.rally_started_at) < self.tuning.initial_grace_ms;
        if !self.planned_this_rally && in_grace {
            let distance = view.field_width / 2.0 - view.own.center_x();
            return PaddleCommand::move_by(step_toward(distance, speed, dead_zone));
        }
        PaddleCommand::hold()
    }

    fn reconfigure(&mut self, params: DifficultyParams) {
        self.params = params;
    }

    fn cancel_pending(&mut self) {
        self.pending.cancel();
    }

    fn reset(&mut self) {
        *self = Self::with_tuning(self.params, self.tuning);
    }
}
