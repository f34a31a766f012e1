//! Where will the ball cross a paddle's line?
//!
//! The straight-line projection is folded back into the field by mirroring it
//! across the side walls, which is equivalent to following every wall bounce.

use crate::params::Params;
use crate::Ball;

/// Result of folding a projected x back into `[0, width]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unfolded {
    pub x: f32,
    pub reflections: u32,
    /// False when the iteration bound was hit before the value settled
    pub settled: bool,
}

/// Mirror `x` across the field walls until it lies inside `[0, width]`.
///
/// The loop is capped at [`Params::MAX_UNFOLD_ITERATIONS`]; on overrun the last
/// value is returned clamped to the field.
pub fn unfold_reflections(mut x: f32, width: f32) -> Unfolded {
    if !x.is_finite() || width <= 0.0 || !width.is_finite() {
        return Unfolded {
            x: if x.is_finite() { x.clamp(0.0, width.max(0.0)) } else { 0.0 },
            reflections: 0,
            settled: false,
        };
    }

    let mut reflections = 0;
    for _ in 0..Params::MAX_UNFOLD_ITERATIONS {
        if x < 0.0 {
            x = -x;
        } else if x > width {
            x = 2.0 * width - x;
        } else {
            return Unfolded {
                x,
                reflections,
                settled: true,
            };
        }
        reflections += 1;
    }

    tracing::debug!(x, width, "reflection unfolding hit its iteration bound");
    Unfolded {
        x: x.clamp(0.0, width),
        reflections,
        settled: false,
    }
}

/// Ticks until a ball reaches `target_y`, or None if it isn't heading there
pub fn time_to_reach(ball: &Ball, target_y: f32) -> Option<f32> {
    let dy = ball.vel.y;
    if dy.abs() < Params::MIN_VERTICAL_SPEED || !dy.is_finite() {
        return None;
    }
    let distance = target_y - ball.pos.y;
    // Moving away from the line (or already past it)
    if distance * dy < 0.0 {
        return None;
    }
    Some((distance / dy).abs())
}

/// X at which `ball` will cross `target_y`, following wall reflections.
///
/// A ball that isn't heading for the line yields its current x.
pub fn predict_arrival_x(ball: &Ball, target_y: f32, field_width: f32) -> f32 {
    match time_to_reach(ball, target_y) {
        Some(ticks) => {
            let future_x = ball.pos.x + ball.vel.x * ticks;
            unfold_reflections(future_x, field_width).x
        }
        None => ball.pos.x,
    }
}
