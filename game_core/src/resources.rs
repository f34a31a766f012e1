use serde::{Deserialize, Serialize};

use crate::{Side, Technique};

/// Simulated clock, advanced once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub tick: u64,
    pub tick_hz: u32,
}

impl Time {
    pub fn new(tick_hz: u32) -> Self {
        Self {
            tick: 0,
            tick_hz: tick_hz.max(1),
        }
    }

    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Elapsed simulated milliseconds
    pub fn now_ms(&self) -> u64 {
        self.tick * 1000 / u64::from(self.tick_hz)
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new(crate::params::Params::TICK_HZ)
    }
}

/// Game score tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub top: u8,
    pub bottom: u8,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, side: Side) {
        match side {
            Side::Top => self.top = self.top.saturating_add(1),
            Side::Bottom => self.bottom = self.bottom.saturating_add(1),
        }
    }

    pub fn get(&self, side: Side) -> u8 {
        match side {
            Side::Top => self.top,
            Side::Bottom => self.bottom,
        }
    }

    pub fn has_winner(&self, win_score: u8) -> Option<Side> {
        if self.top >= win_score {
            Some(Side::Top)
        } else if self.bottom >= win_score {
            Some(Side::Bottom)
        } else {
            None
        }
    }
}

/// Paddle hits in the current rally and the rally's ordinal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rally {
    pub hits: u32,
    pub id: u32,
}

impl Rally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the next rally, clearing the hit counter
    pub fn next(&mut self) {
        self.hits = 0;
        self.id = self.id.wrapping_add(1);
    }
}

/// Random number generator
pub struct GameRng(pub rand::rngs::StdRng);

impl GameRng {
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        Self(rand::rngs::StdRng::seed_from_u64(seed))
    }

    /// Independent generator derived from this one
    pub fn fork(&mut self) -> Self {
        use rand::Rng;
        Self::new(self.0.gen())
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new(12345)
    }
}

/// Events that occurred during this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Events {
    pub scored: Option<Side>,
    pub paddle_hit: Option<Side>,
    pub wall_hit: bool,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.scored = None;
        self.paddle_hit = None;
        self.wall_hit = false;
    }
}

/// One paddle command: horizontal move plus an optional shot to arm
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaddleCommand {
    pub dx: f32,
    pub shot: Option<Technique>,
}

impl PaddleCommand {
    pub fn hold() -> Self {
        Self::default()
    }

    pub fn move_by(dx: f32) -> Self {
        Self { dx, shot: None }
    }
}

/// Commands waiting to be applied on the next step
#[derive(Debug, Clone, Default)]
pub struct IntentQueue {
    pub commands: Vec<(Side, PaddleCommand)>,
}

impl IntentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn push(&mut self, side: Side, command: PaddleCommand) {
        self.commands.push((side, command));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_increment() {
        let mut score = Score::new();
        score.increment(Side::Top);
        score.increment(Side::Top);
        score.increment(Side::Bottom);
        assert_eq!(score.top, 2);
        assert_eq!(score.bottom, 1);
        assert_eq!(score.get(Side::Bottom), 1);
    }

    #[test]
    fn test_score_has_winner() {
        let mut score = Score::new();
        for _ in 0..10 {
            score.increment(Side::Bottom);
        }
        assert_eq!(score.has_winner(11), None, "No winner below threshold");
        score.increment(Side::Bottom);
        assert_eq!(score.has_winner(11), Some(Side::Bottom));
    }

    #[test]
    fn test_rally_next_resets_hits() {
        let mut rally = Rally::new();
        rally.hits = 7;
        rally.next();
        assert_eq!(rally.hits, 0);
        assert_eq!(rally.id, 1);
    }

    #[test]
    fn test_time_now_ms() {
        let mut time = Time::new(60);
        for _ in 0..60 {
            time.advance();
        }
        assert_eq!(time.now_ms(), 1000);
        assert_eq!(Time::new(0).tick_hz, 1, "zero rate is clamped");
    }

    #[test]
    fn test_events_clear() {
        let mut events = Events {
            scored: Some(Side::Top),
            paddle_hit: Some(Side::Bottom),
            wall_hit: true,
        };
        events.clear();
        assert_eq!(events, Events::new());
    }

    #[test]
    fn test_intent_queue_keeps_order() {
        let mut queue = IntentQueue::new();
        queue.push(Side::Top, PaddleCommand::move_by(-3.0));
        queue.push(Side::Bottom, PaddleCommand::move_by(5.0));
        assert_eq!(queue.commands[1], (Side::Bottom, PaddleCommand::move_by(5.0)));

        queue.clear();
        assert!(queue.commands.is_empty());
    }
}
