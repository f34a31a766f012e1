//! Utility scoring and aim resolution for the technician.
//!
//! A planning pass scores one candidate per [`Technique`], penalises recent
//! choices, picks a winner and turns its aim point into a paddle-centre target.

use std::collections::VecDeque;

use rand::{Rng, RngCore};

use super::GameView;
use crate::prediction::unfold_reflections;
use crate::Technique;

const HISTORY_LEN: usize = 5;
const UTILITY_JITTER: f32 = 0.1;
const MIN_UTILITY: f32 = 0.1;
const MAX_UTILITY: f32 = 1.0;
const REPEAT_PENALTY: f32 = 0.15;
const MIN_REPEAT_FACTOR: f32 = 0.5;
/// Hit offset limit as a fraction of paddle half-width
const MAX_HIT_OFFSET: f32 = 0.85;
/// Paddle-width fraction that deflects a ball about 5° off vertical
const STRAIGHT_OFFSET_FACTOR: f32 = 0.087;
const AIM_ERROR_SCALE: f32 = 40.0;

/// One scored candidate shot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Action {
    pub technique: Technique,
    /// Paddle-centre x to reach before contact; filled in by [`resolve_target`]
    pub target_x: f32,
    pub utility: f32,
}

impl Action {
    pub fn new(technique: Technique, utility: f32) -> Self {
        Self {
            technique,
            target_x: 0.0,
            utility,
        }
    }
}

/// Rolling record of the last few chosen techniques
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TechniqueHistory {
    recent: VecDeque<Technique>,
}

impl TechniqueHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, technique: Technique) {
        if self.recent.len() == HISTORY_LEN {
            self.recent.pop_front();
        }
        self.recent.push_back(technique);
    }

    pub fn last(&self) -> Option<Technique> {
        self.recent.back().copied()
    }

    pub fn count(&self, technique: Technique) -> usize {
        self.recent.iter().filter(|&&t| t == technique).count()
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }
}

fn near_center(view: &GameView) -> bool {
    (view.own.center_x() - view.field_width / 2.0).abs() < view.field_width * 0.25
}

fn near_edge(view: &GameView) -> bool {
    (view.own.center_x() - view.field_width / 2.0).abs() > view.field_width * 0.3
}

/// Aim for a course shot: the half the opponent isn't covering
fn course_aim(view: &GameView) -> f32 {
    if view.opponent.center_x() < view.field_width / 2.0 {
        view.field_width * 0.8
    } else {
        view.field_width * 0.2
    }
}

/// Base utilities for every technique, before jitter
pub fn base_utilities(view: &GameView) -> [Action; 4] {
    let width = view.field_width.max(1.0);

    let away = (course_aim(view) - view.opponent.center_x()).abs() / width;
    let course = 0.4 + 0.4 * away + if near_center(view) { 0.2 } else { 0.0 };

    let slope = if view.ball.vel.y.abs() > f32::EPSILON {
        (view.ball.vel.x / view.ball.vel.y).abs().min(1.0)
    } else {
        1.0
    };
    let straight = 0.45 + 0.3 * (1.0 - slope) + if near_edge(view) { 0.2 } else { 0.0 };

    let double_bounce = 0.3 + if near_edge(view) { 0.25 } else { 0.0 };

    [
        Action::new(Technique::Course, course),
        Action::new(Technique::Straight, straight),
        Action::new(Technique::Bounce, 0.35),
        Action::new(Technique::DoubleBounce, double_bounce),
    ]
}

/// Scored candidates with bounded jitter, clamped to the utility range
pub fn score_actions(view: &GameView, rng: &mut dyn RngCore) -> [Action; 4] {
    let mut actions = base_utilities(view);
    for action in &mut actions {
        let jitter = rng.gen_range(-UTILITY_JITTER..=UTILITY_JITTER);
        action.utility = (action.utility + jitter).clamp(MIN_UTILITY, MAX_UTILITY);
    }
    actions
}

/// Zero the previous technique and damp anything used recently
pub fn apply_diversity(actions: &mut [Action], history: &TechniqueHistory) {
    let last = history.last();
    for action in actions.iter_mut() {
        if Some(action.technique) == last {
            action.utility = 0.0;
        } else {
            let uses = history.count(action.technique) as f32;
            action.utility *= (1.0 - REPEAT_PENALTY * uses).max(MIN_REPEAT_FACTOR);
        }
    }
}

fn best(actions: impl Iterator<Item = Action>) -> Option<Action> {
    actions.fold(None, |best: Option<Action>, action| match best {
        Some(b) if b.utility >= action.utility => Some(b),
        _ => Some(action),
    })
}

/// Highest positive utility; otherwise the best that isn't the previous pick
pub fn select_action(actions: &[Action], history: &TechniqueHistory) -> Option<Action> {
    best(actions.iter().copied().filter(|a| a.utility > 0.0)).or_else(|| {
        let last = history.last();
        best(
            actions
                .iter()
                .copied()
                .filter(|a| Some(a.technique) != last),
        )
    })
}

/// Full selection step: diversity penalty, pick, record
pub fn choose(actions: &mut [Action], history: &mut TechniqueHistory) -> Option<Action> {
    apply_diversity(actions, history);
    let chosen = select_action(actions, history)?;
    history.record(chosen.technique);
    Some(chosen)
}

/// Random draws behind a planned shot, taken once so the target can be
/// re-resolved against every later view without touching the rng again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimDraw {
    /// DoubleBounce side when the ball is in the middle third
    pub prefer_right: bool,
    /// Course error added to every non-Straight target
    pub course_error: f32,
}

impl AimDraw {
    pub const NONE: Self = Self {
        prefer_right: false,
        course_error: 0.0,
    };

    pub fn sample(course_accuracy: f32, rng: &mut dyn RngCore) -> Self {
        let prefer_right = rng.gen_bool(0.5);
        let spread = (1.0 - course_accuracy).max(0.0) * AIM_ERROR_SCALE;
        let course_error = if spread > 0.0 {
            rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        Self {
            prefer_right,
            course_error,
        }
    }
}

/// Where on the opponent's line the technique wants the ball, mirror-unfolded
/// so that a straight line from the arrival point reaches it.
pub fn virtual_aim(
    technique: Technique,
    view: &GameView,
    arrival_x: f32,
    prefer_right: bool,
) -> f32 {
    let width = view.field_width;
    let ball_x = view.ball.pos.x;
    match technique {
        Technique::Straight => arrival_x,
        Technique::Course => course_aim(view),
        Technique::Bounce => {
            // Land on the far side after one rebound off the wall beyond it
            let aim = if ball_x < width / 2.0 { width * 0.85 } else { width * 0.15 };
            if aim > width / 2.0 {
                2.0 * width - aim
            } else {
                -aim
            }
        }
        Technique::DoubleBounce => {
            let aim = if ball_x < width / 3.0 {
                width * 0.9
            } else if ball_x > width * 2.0 / 3.0 {
                width * 0.1
            } else if prefer_right {
                width * 0.9
            } else {
                width * 0.1
            };
            // Two reflections: shift a full period either way, take the shorter
            let (left, right) = (aim - 2.0 * width, aim + 2.0 * width);
            if (left - arrival_x).abs() <= (right - arrival_x).abs() {
                left
            } else {
                right
            }
        }
    }
}

/// Paddle centre that sends a ball arriving at `arrival_x` toward `aim_x`
/// over `distance` of court, given the paddle's maximum bounce angle.
pub fn paddle_target_for_aim(
    arrival_x: f32,
    aim_x: f32,
    distance: f32,
    half_width: f32,
    max_bounce_angle_deg: f32,
) -> f32 {
    if max_bounce_angle_deg <= 0.0 || distance <= 0.0 {
        return arrival_x;
    }
    let angle = ((aim_x - arrival_x) / distance).atan().to_degrees();
    let hit = (angle / max_bounce_angle_deg).clamp(-MAX_HIT_OFFSET, MAX_HIT_OFFSET);
    if !hit.is_finite() {
        return arrival_x;
    }
    // Contact offset is (ball - centre) / half_width
    arrival_x - hit * half_width
}

/// Shift the paddle against a slanted ball's drift, keeping contact within
/// the offset that deflects about 5° off vertical.
pub fn straight_target(arrival_x: f32, view: &GameView) -> f32 {
    let vel = view.ball.vel;
    if vel.y.abs() <= f32::EPSILON {
        return arrival_x;
    }
    let slope = (vel.x / vel.y).abs().min(1.0);
    arrival_x - vel.x.signum() * slope * view.own.width * STRAIGHT_OFFSET_FACTOR
}

/// Paddle-centre target for `technique` against the current view. Pure in
/// its inputs, so it can be re-run every tick of an approach.
pub fn shot_target(
    technique: Technique,
    view: &GameView,
    arrival_x: f32,
    draw: &AimDraw,
) -> f32 {
    match technique {
        Technique::Straight => straight_target(arrival_x, view),
        technique => {
            let aim = virtual_aim(technique, view, arrival_x, draw.prefer_right);
            let target = paddle_target_for_aim(
                arrival_x,
                unfold_guard(aim, view.field_width),
                view.court_length(),
                view.own.half_width(),
                view.max_bounce_angle_deg,
            );
            target + draw.course_error
        }
    }
}

/// Sample the action's draws and resolve its paddle-centre target for `view`
pub fn resolve_target(
    action: &mut Action,
    view: &GameView,
    arrival_x: f32,
    course_accuracy: f32,
    rng: &mut dyn RngCore,
) -> AimDraw {
    let draw = match action.technique {
        Technique::Straight => AimDraw::NONE,
        _ => AimDraw::sample(course_accuracy, rng),
    };
    action.target_x = shot_target(action.technique, view, arrival_x, &draw);
    draw
}

/// Virtual aims may sit outside the field but must still fold back into it
fn unfold_guard(aim: f32, width: f32) -> f32 {
    if unfold_reflections(aim, width).settled {
        aim
    } else {
        width / 2.0
    }
}
