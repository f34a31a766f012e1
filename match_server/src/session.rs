use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use game_core::ai::{build_controller, Controller, ControllerConfig, ControllerKind};
use game_core::{GameRng, MatchSnapshot, PaddleCommand, Score, Side, Simulation};
use proto::{Wire, C2S, S2C, SIDE_BOTTOM, SIDE_TOP};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::{SessionConfig, SideControl};
use crate::error::{SessionError, SessionId, SinkClosed};

/// Server-side match lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    /// Game in progress
    Playing,
    /// A side reached the winning score
    GameOver,
    /// Stopped before a winner
    Stopped,
}

/// Outbound connection for snapshots and match events
pub trait SnapshotSink: Send + Sync {
    fn send_bytes(&self, bytes: &[u8]) -> Result<(), SinkClosed>;
}

/// Sink backed by a tokio channel
pub struct ChannelSink(pub mpsc::UnboundedSender<Vec<u8>>);

impl SnapshotSink for ChannelSink {
    fn send_bytes(&self, bytes: &[u8]) -> Result<(), SinkClosed> {
        self.0.send(bytes.to_vec()).map_err(|_| SinkClosed)
    }
}

/// Millisecond clock used for idle tracking
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock measured from scheduler start
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Clock that only moves when told to
#[derive(Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self(AtomicU64::new(start_ms))
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Held direction keys for a human paddle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HumanIntent {
    pub left: bool,
    pub right: bool,
}

impl HumanIntent {
    pub fn command(self, paddle_speed: f32) -> PaddleCommand {
        match (self.left, self.right) {
            (true, false) => PaddleCommand::move_by(-paddle_speed),
            (false, true) => PaddleCommand::move_by(paddle_speed),
            _ => PaddleCommand::hold(),
        }
    }
}

/// Result of one session tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickReport {
    pub id: SessionId,
    pub tick: u64,
    pub scored: Option<Side>,
    pub winner: Option<Side>,
    pub score: Score,
}

/// Queryable session state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub id: SessionId,
    pub state: MatchState,
    pub top: Option<ControllerKind>,
    pub bottom: Option<ControllerKind>,
    pub snapshot: MatchSnapshot,
    /// Clock time of the most recent tick; None before the first one
    pub last_tick_ms: Option<u64>,
}

fn side_code(side: Side) -> u8 {
    match side {
        Side::Top => SIDE_TOP,
        Side::Bottom => SIDE_BOTTOM,
    }
}

fn side_from_code(code: u8) -> Option<Side> {
    match code {
        SIDE_TOP => Some(Side::Top),
        SIDE_BOTTOM => Some(Side::Bottom),
        _ => None,
    }
}

/// One match and everything that drives it.
///
/// Controllers, their random streams and the held human intents are owned
/// here and never shared with another session.
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    sim: Simulation,
    controllers: [Option<Box<dyn Controller>>; 2],
    controller_rngs: [GameRng; 2],
    held: [HumanIntent; 2],
    sinks: Vec<Box<dyn SnapshotSink>>,
    state: MatchState,
    last_activity_ms: u64,
    last_tick_ms: Option<u64>,
}

impl Session {
    pub fn new(id: SessionId, config: SessionConfig, now_ms: u64) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let sim = Simulation::with_tick_hz(config.game.clone(), seed, config.tick_hz);

        let mut root = GameRng::new(seed.wrapping_add(1));
        let controller_rngs = [root.fork(), root.fork()];
        let controllers = Side::BOTH.map(|side| match config.control(side) {
            SideControl::Npc(npc) => Some(build_controller(npc)),
            SideControl::Human => None,
        });

        tracing::info!(
            session = %id,
            seed,
            tick_hz = config.tick_hz,
            top = ?config.top,
            bottom = ?config.bottom,
            "session created"
        );

        Self {
            id,
            config,
            sim,
            controllers,
            controller_rngs,
            held: [HumanIntent::default(); 2],
            sinks: Vec::new(),
            state: MatchState::Playing,
            last_activity_ms: now_ms,
            last_tick_ms: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.config.tick_hz.max(1)))
    }

    /// Controllers decide, physics steps, then the terminal check runs
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        if self.state != MatchState::Playing {
            return self.report(None);
        }
        self.last_tick_ms = Some(now_ms);

        let speed = self.sim.config().paddle_speed;
        let mut commands = Vec::with_capacity(2);
        for side in Side::BOTH {
            let i = side.index();
            let command = match self.controllers[i].as_mut() {
                Some(controller) => {
                    controller.decide(&self.sim.view(side), &mut self.controller_rngs[i].0)
                }
                None => self.held[i].command(speed),
            };
            commands.push((side, command));
        }

        let outcome = self.sim.step(&commands);

        if let Some(scorer) = outcome.events.scored {
            let score = self.sim.score();
            self.relay(&S2C::PointScored {
                scorer: side_code(scorer),
                score_top: score.top,
                score_bottom: score.bottom,
            });
        }

        if outcome.tick % u64::from(self.config.snapshot_every.max(1)) == 0 {
            self.relay(&self.state_message());
        }

        if let Some(winner) = outcome.winner {
            self.state = MatchState::GameOver;
            self.cancel_pending();
            self.relay(&S2C::GameOver {
                winner: side_code(winner),
            });
            tracing::info!(
                session = %self.id,
                %winner,
                top = self.sim.score().top,
                bottom = self.sim.score().bottom,
                ticks = outcome.tick,
                "match finished"
            );
        }

        self.report(outcome.events.scored)
    }

    fn report(&self, scored: Option<Side>) -> TickReport {
        TickReport {
            id: self.id,
            tick: self.sim.time().tick,
            scored,
            winner: self.sim.winner(),
            score: self.sim.score(),
        }
    }

    pub fn submit_input(
        &mut self,
        side: Side,
        intent: HumanIntent,
        now_ms: u64,
    ) -> Result<(), SessionError> {
        if !self.config.control(side).is_human() {
            return Err(SessionError::NotHuman(side));
        }
        self.held[side.index()] = intent;
        self.last_activity_ms = now_ms;
        Ok(())
    }

    pub fn handle_message(&mut self, msg: C2S, now_ms: u64) -> Result<(), SessionError> {
        match msg {
            C2S::Input {
                side,
                left,
                right,
                seq,
            } => {
                // Unknown side codes are dropped like stale packets
                let Some(side) = side_from_code(side) else {
                    tracing::debug!(session = %self.id, side, seq, "input for unknown side");
                    return Ok(());
                };
                self.submit_input(side, HumanIntent { left, right }, now_ms)
            }
            C2S::Ping { t_ms } => {
                self.relay(&S2C::Pong { t_ms });
                Ok(())
            }
        }
    }

    /// Swap a side's controller config; a different kind builds a new controller
    pub fn update_controller(&mut self, side: Side, npc: ControllerConfig) {
        let i = side.index();
        match self.controllers[i].as_mut() {
            Some(controller) if controller.kind() == npc.kind => {
                controller.cancel_pending();
                controller.reconfigure(npc.resolve());
            }
            _ => {
                if let Some(mut old) = self.controllers[i].take() {
                    old.cancel_pending();
                }
                self.controllers[i] = Some(build_controller(&npc));
                self.held[i] = HumanIntent::default();
            }
        }
        tracing::info!(session = %self.id, %side, kind = ?npc.kind, "controller updated");
        *self.config.control_mut(side) = SideControl::Npc(npc);
    }

    /// Fresh score and serve; controllers forget the previous match
    pub fn reset(&mut self) {
        self.sim.reset();
        for controller in self.controllers.iter_mut().flatten() {
            controller.cancel_pending();
            controller.reset();
        }
        self.held = [HumanIntent::default(); 2];
        self.state = MatchState::Playing;
        self.last_tick_ms = None;
        tracing::info!(session = %self.id, "session reset");
    }

    pub fn stop(&mut self) {
        self.cancel_pending();
        if self.state == MatchState::Playing {
            self.state = MatchState::Stopped;
        }
    }

    fn cancel_pending(&mut self) {
        for controller in self.controllers.iter_mut().flatten() {
            controller.cancel_pending();
        }
    }

    pub fn attach_sink(&mut self, sink: Box<dyn SnapshotSink>) {
        self.sinks.push(sink);
    }

    /// True when a human side exists and nobody has sent input for `timeout`
    pub fn is_idle(&self, now_ms: u64, timeout: Duration) -> bool {
        let has_human = Side::BOTH
            .iter()
            .any(|&side| self.config.control(side).is_human());
        has_human && now_ms.saturating_sub(self.last_activity_ms) >= timeout.as_millis() as u64
    }

    pub fn status(&self) -> SessionStatus {
        let kind = |side: Side| self.controllers[side.index()].as_ref().map(|c| c.kind());
        SessionStatus {
            id: self.id,
            state: self.state,
            top: kind(Side::Top),
            bottom: kind(Side::Bottom),
            snapshot: self.sim.snapshot(),
            last_tick_ms: self.last_tick_ms,
        }
    }

    pub fn state_message(&self) -> S2C {
        let snapshot = self.sim.snapshot();
        S2C::GameState {
            tick: snapshot.tick.min(u64::from(u32::MAX)) as u32,
            ball_x: snapshot.ball.pos.x,
            ball_y: snapshot.ball.pos.y,
            ball_vx: snapshot.ball.vel.x,
            ball_vy: snapshot.ball.vel.y,
            paddle_top_x: snapshot.top.x,
            paddle_bottom_x: snapshot.bottom.x,
            score_top: snapshot.score.top,
            score_bottom: snapshot.score.bottom,
        }
    }

    /// Send to every sink, dropping the ones that have gone away
    fn relay(&mut self, msg: &S2C) {
        if self.sinks.is_empty() {
            return;
        }
        let bytes = match msg.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "failed to encode message");
                return;
            }
        };
        let id = self.id;
        self.sinks.retain(|sink| match sink.send_bytes(&bytes) {
            Ok(()) => true,
            Err(SinkClosed) => {
                tracing::debug!(session = %id, "dropping closed sink");
                false
            }
        });
    }
}
