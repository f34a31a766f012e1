//! Session scheduler
//!
//! Owns the session map. Creation, release and lookup go through the map's
//! lock; each session then ticks under its own mutex, so independent sessions
//! never contend with each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use game_core::ai::ControllerConfig;
use game_core::{MatchSnapshot, Side};
use proto::{Wire, C2S};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};

use crate::config::{SchedulerConfig, SessionConfig};
use crate::error::{SessionError, SessionId};
use crate::session::{
    Clock, HumanIntent, Session, SessionStatus, SnapshotSink, SystemClock, TickReport,
};

const FINISHED_CHANNEL_CAPACITY: usize = 256;

struct SessionHandle {
    session: Arc<Mutex<Session>>,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    next_id: AtomicU64,
    finished: broadcast::Sender<TickReport>,
}

/// Cheaply cloneable handle to the shared scheduler
#[derive(Clone)]
pub struct SessionScheduler {
    inner: Arc<Inner>,
}

impl SessionScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        let (finished, _) = broadcast::channel(FINISHED_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                clock,
                sessions: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                finished,
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Final tick reports of sessions that ended with a winner
    pub fn subscribe_finished(&self) -> broadcast::Receiver<TickReport> {
        self.inner.finished.subscribe()
    }

    pub async fn create(&self, config: SessionConfig) -> Result<SessionId, SessionError> {
        let config = config.with_defaults(&self.inner.config);
        let mut sessions = self.inner.sessions.write().await;
        let max = self.inner.config.max_sessions;
        if sessions.len() >= max {
            tracing::warn!(max, "session limit reached");
            return Err(SessionError::CapacityReached { max });
        }

        let id = SessionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let session = Session::new(id, config, self.inner.clock.now_ms());
        sessions.insert(
            id,
            SessionHandle {
                session: Arc::new(Mutex::new(session)),
                task: None,
            },
        );
        Ok(id)
    }

    async fn get(&self, id: SessionId) -> Result<Arc<Mutex<Session>>, SessionError> {
        self.inner
            .sessions
            .read()
            .await
            .get(&id)
            .map(|handle| handle.session.clone())
            .ok_or(SessionError::NotFound(id))
    }

    /// Remove a session from the map, aborting its loop if it has one
    async fn release(&self, id: SessionId) -> Option<Arc<Mutex<Session>>> {
        let handle = self.inner.sessions.write().await.remove(&id)?;
        if let Some(task) = handle.task {
            task.abort();
        }
        Some(handle.session)
    }

    /// Drop a session that just finished and announce its result
    async fn finish(&self, report: TickReport) {
        if report.winner.is_some() && self.release(report.id).await.is_some() {
            // No subscribers is fine
            let _ = self.inner.finished.send(report);
        }
    }

    /// Advance one session by one tick. Sessions with a running loop are
    /// left to it.
    pub async fn tick(&self, id: SessionId) -> Result<TickReport, SessionError> {
        let session = {
            let sessions = self.inner.sessions.read().await;
            let handle = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
            if handle.task.is_some() {
                return Err(SessionError::LoopDriven(id));
            }
            handle.session.clone()
        };
        let now = self.inner.clock.now_ms();
        let report = session.lock().await.tick(now);
        self.finish(report).await;
        Ok(report)
    }

    /// Release a session, cancelling its pending controller work
    pub async fn stop(&self, id: SessionId) -> Result<MatchSnapshot, SessionError> {
        let session = self.release(id).await.ok_or(SessionError::NotFound(id))?;
        let mut session = session.lock().await;
        session.stop();
        tracing::info!(session = %id, "session stopped");
        Ok(session.simulation().snapshot())
    }

    pub async fn query(&self, id: SessionId) -> Result<SessionStatus, SessionError> {
        let session = self.get(id).await?;
        let status = session.lock().await.status();
        Ok(status)
    }

    pub async fn reset(&self, id: SessionId) -> Result<(), SessionError> {
        self.get(id).await?.lock().await.reset();
        Ok(())
    }

    pub async fn update_controller(
        &self,
        id: SessionId,
        side: Side,
        config: ControllerConfig,
    ) -> Result<(), SessionError> {
        self.get(id).await?.lock().await.update_controller(side, config);
        Ok(())
    }

    pub async fn submit_input(
        &self,
        id: SessionId,
        side: Side,
        intent: HumanIntent,
    ) -> Result<(), SessionError> {
        let now = self.inner.clock.now_ms();
        self.get(id).await?.lock().await.submit_input(side, intent, now)
    }

    /// Decode and apply a raw client message
    pub async fn handle_c2s(&self, id: SessionId, bytes: &[u8]) -> Result<(), SessionError> {
        let session = self.get(id).await?;
        let msg = C2S::from_bytes(bytes)?;
        let now = self.inner.clock.now_ms();
        let result = session.lock().await.handle_message(msg, now);
        result
    }

    pub async fn attach_sink(
        &self,
        id: SessionId,
        sink: Box<dyn SnapshotSink>,
    ) -> Result<(), SessionError> {
        self.get(id).await?.lock().await.attach_sink(sink);
        Ok(())
    }

    /// Tick a session on its own timer until it finishes or is stopped
    pub async fn spawn_loop(&self, id: SessionId) -> Result<(), SessionError> {
        let mut sessions = self.inner.sessions.write().await;
        let handle = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        if handle.task.is_some() {
            return Ok(());
        }

        let session = handle.session.clone();
        let period = session.lock().await.tick_interval();
        let scheduler = self.clone();

        handle.task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(session = %id, ?period, "session loop started");

            loop {
                ticker.tick().await;
                let now = scheduler.inner.clock.now_ms();
                let report = session.lock().await.tick(now);
                if report.winner.is_some() {
                    scheduler.finish(report).await;
                    break;
                }
            }
        }));
        Ok(())
    }

    /// Tick every session without its own loop once, in parallel
    pub async fn tick_all(&self) -> Vec<TickReport> {
        let batch: Vec<Arc<Mutex<Session>>> = self
            .inner
            .sessions
            .read()
            .await
            .values()
            .filter(|handle| handle.task.is_none())
            .map(|handle| handle.session.clone())
            .collect();

        let now = self.inner.clock.now_ms();
        let mut set = JoinSet::new();
        for session in batch {
            set.spawn(async move { session.lock().await.tick(now) });
        }

        let mut reports = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => tracing::warn!(error = %e, "session tick task failed"),
            }
        }

        for report in &reports {
            self.finish(*report).await;
        }
        reports.sort_by_key(|report| report.id);
        reports
    }

    /// Release sessions whose human players have gone quiet
    pub async fn sweep_idle(&self) -> Vec<SessionId> {
        let now = self.inner.clock.now_ms();
        let timeout = self.inner.config.idle_timeout;

        let candidates: Vec<(SessionId, Arc<Mutex<Session>>)> = self
            .inner
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, handle)| (*id, handle.session.clone()))
            .collect();

        let mut released = Vec::new();
        for (id, session) in candidates {
            let idle = session.lock().await.is_idle(now, timeout);
            if idle && self.stop(id).await.is_ok() {
                tracing::info!(session = %id, "released idle session");
                released.push(id);
            }
        }
        released
    }

    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    pub async fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.inner.sessions.read().await.keys().copied().collect();
        ids.sort();
        ids
    }
}
