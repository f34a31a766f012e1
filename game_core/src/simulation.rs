use glam::Vec2;
use hecs::World;
use serde::{Deserialize, Serialize};

use crate::ai::GameView;
use crate::{
    create_ball, create_paddle, step, Ball, Config, Events, GameRng, IntentQueue, Paddle,
    PaddleCommand, Rally, Score, ShotEffect, Side, Time,
};

/// What one call to [`Simulation::step`] produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub tick: u64,
    pub events: Events,
    pub winner: Option<Side>,
}

/// Serializable picture of a match at one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub tick: u64,
    pub time_ms: u64,
    pub ball: Ball,
    pub top: Paddle,
    pub bottom: Paddle,
    pub score: Score,
    pub rally: Rally,
    pub winner: Option<Side>,
}

/// One match: the ECS world plus every resource the systems need
pub struct Simulation {
    world: World,
    time: Time,
    config: Config,
    score: Score,
    rally: Rally,
    events: Events,
    intents: IntentQueue,
    rng: GameRng,
    winner: Option<Side>,
}

impl Simulation {
    pub fn new(config: Config, seed: u64) -> Self {
        Self::with_tick_hz(config, seed, crate::params::Params::TICK_HZ)
    }

    pub fn with_tick_hz(config: Config, seed: u64, tick_hz: u32) -> Self {
        let mut sim = Self {
            world: World::new(),
            time: Time::new(tick_hz),
            config: config.sanitized(),
            score: Score::new(),
            rally: Rally::new(),
            events: Events::new(),
            intents: IntentQueue::new(),
            rng: GameRng::new(seed),
            winner: None,
        };
        sim.spawn_entities();
        sim
    }

    fn spawn_entities(&mut self) {
        create_paddle(&mut self.world, Side::Top, &self.config);
        create_paddle(&mut self.world, Side::Bottom, &self.config);

        let mut ball = Ball::new(self.config.center(), Vec2::ZERO, &self.config);
        ball.reset(&self.config, &mut self.rng);
        create_ball(&mut self.world, ball.pos, ball.vel, &self.config);
    }

    /// Advance one tick with the given paddle commands.
    ///
    /// A finished match is frozen: further steps change nothing.
    pub fn step(&mut self, commands: &[(Side, PaddleCommand)]) -> TickOutcome {
        if self.winner.is_some() {
            return TickOutcome {
                tick: self.time.tick,
                events: Events::new(),
                winner: self.winner,
            };
        }

        for (side, command) in commands {
            self.intents.push(*side, *command);
        }

        step(
            &mut self.world,
            &mut self.time,
            &self.config,
            &mut self.score,
            &mut self.rally,
            &mut self.events,
            &mut self.intents,
            &mut self.rng,
        );

        self.winner = self.score.has_winner(self.config.win_score);

        TickOutcome {
            tick: self.time.tick,
            events: self.events,
            winner: self.winner,
        }
    }

    /// New match on the same world: zero score, fresh serve, centred paddles
    pub fn reset(&mut self) {
        self.world.clear();
        self.time = Time::new(self.time.tick_hz);
        self.score = Score::new();
        self.rally = Rally::new();
        self.events = Events::new();
        self.intents.clear();
        self.winner = None;
        self.spawn_entities();
    }

    pub fn paddle(&self, side: Side) -> Paddle {
        self.world
            .query::<&Paddle>()
            .iter()
            .find(|(_e, p)| p.side == side)
            .map(|(_e, p)| *p)
            .unwrap_or_else(|| Paddle::new(side, &self.config))
    }

    pub fn ball(&self) -> Ball {
        self.world
            .query::<&Ball>()
            .iter()
            .next()
            .map(|(_e, b)| *b)
            .unwrap_or_else(|| Ball::new(self.config.center(), Vec2::ZERO, &self.config))
    }

    /// Armed technique on a side's paddle
    pub fn armed_shot(&self, side: Side) -> Option<crate::Technique> {
        self.world
            .query::<(&Paddle, &ShotEffect)>()
            .iter()
            .find(|(_e, (p, _))| p.side == side)
            .and_then(|(_e, (_, s))| s.armed)
    }

    /// Place a paddle directly, clamped to the field
    pub fn set_paddle_x(&mut self, side: Side, x: f32) {
        let x = self.config.clamp_paddle_x(x);
        for (_e, paddle) in self.world.query_mut::<&mut Paddle>() {
            if paddle.side == side {
                paddle.x = x;
            }
        }
    }

    /// Place the ball directly; speed is renormalised on the next step
    pub fn set_ball(&mut self, pos: Vec2, vel: Vec2) {
        for (_e, ball) in self.world.query_mut::<&mut Ball>() {
            ball.pos = pos;
            ball.vel = vel;
        }
    }

    /// Read-only view for one side's controller
    pub fn view(&self, side: Side) -> GameView {
        GameView {
            side,
            ball: self.ball(),
            own: self.paddle(side),
            opponent: self.paddle(side.opponent()),
            field_width: self.config.field_width,
            field_height: self.config.field_height,
            paddle_speed: self.config.paddle_speed,
            max_bounce_angle_deg: self.config.max_bounce_angle_deg,
            rally: self.rally,
            now_ms: self.time.now_ms(),
        }
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            tick: self.time.tick,
            time_ms: self.time.now_ms(),
            ball: self.ball(),
            top: self.paddle(Side::Top),
            bottom: self.paddle(Side::Bottom),
            score: self.score,
            rally: self.rally,
            winner: self.winner,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn rally(&self) -> Rally {
        self.rally
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }
}
