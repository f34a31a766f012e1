use std::env;
use std::time::Duration;

use game_core::ai::ControllerConfig;
use game_core::{Config, Params, Side};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_SESSIONS: usize = 256;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 5 * 60;
/// Snapshots go out every third tick, about 20 Hz at the default rate
pub const DEFAULT_SNAPSHOT_EVERY: u32 = 3;

/// Process-wide scheduler limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub max_sessions: usize,
    pub default_tick_hz: u32,
    pub idle_timeout: Duration,
    pub snapshot_every: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            default_tick_hz: Params::TICK_HZ,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let mut default_tick_hz = read_env_u32("DEFAULT_TICK_HZ", Params::TICK_HZ);
        if default_tick_hz > 1_000 {
            tracing::warn!(
                "DEFAULT_TICK_HZ ({}) is above 1000. Falling back to {}.",
                default_tick_hz,
                Params::TICK_HZ
            );
            default_tick_hz = Params::TICK_HZ;
        }

        Self {
            max_sessions: read_env_usize("MAX_SESSIONS", DEFAULT_MAX_SESSIONS),
            default_tick_hz,
            idle_timeout: Duration::from_secs(read_env_u64(
                "IDLE_TIMEOUT_SECS",
                DEFAULT_IDLE_TIMEOUT_SECS,
            )),
            snapshot_every: read_env_u32("SNAPSHOT_EVERY", DEFAULT_SNAPSHOT_EVERY),
        }
    }
}

/// Who drives a paddle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideControl {
    Human,
    Npc(ControllerConfig),
}

impl SideControl {
    pub fn is_human(&self) -> bool {
        matches!(self, Self::Human)
    }
}

/// Everything needed to start one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub game: Config,
    pub top: SideControl,
    pub bottom: SideControl,
    /// Physics and controller seed; random when absent
    pub seed: Option<u64>,
    /// Own tick cadence; 0 means the scheduler default
    pub tick_hz: u32,
    /// Relay a snapshot every N ticks; 0 means the scheduler default
    pub snapshot_every: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            game: Config::default(),
            top: SideControl::Npc(ControllerConfig::default()),
            bottom: SideControl::Human,
            seed: None,
            tick_hz: 0,
            snapshot_every: 0,
        }
    }
}

impl SessionConfig {
    pub fn npc_vs_npc(top: ControllerConfig, bottom: ControllerConfig) -> Self {
        Self {
            top: SideControl::Npc(top),
            bottom: SideControl::Npc(bottom),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn control(&self, side: Side) -> &SideControl {
        match side {
            Side::Top => &self.top,
            Side::Bottom => &self.bottom,
        }
    }

    pub fn control_mut(&mut self, side: Side) -> &mut SideControl {
        match side {
            Side::Top => &mut self.top,
            Side::Bottom => &mut self.bottom,
        }
    }

    /// Fill unset cadences from the scheduler
    pub(crate) fn with_defaults(mut self, scheduler: &SchedulerConfig) -> Self {
        if self.tick_hz == 0 {
            self.tick_hz = scheduler.default_tick_hz;
        }
        if self.snapshot_every == 0 {
            self.snapshot_every = scheduler.snapshot_every.max(1);
        }
        self
    }
}

pub(crate) fn read_env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

pub(crate) fn read_env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

pub(crate) fn read_env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::ai::{ControllerKind, Difficulty};

    #[test]
    fn test_session_config_from_json() {
        let json = r#"{
            "top": {"npc": {"kind": "technician", "difficulty": "hard"}},
            "bottom": "human",
            "seed": 7,
            "tick_hz": 30
        }"#;
        let config: SessionConfig = serde_json::from_str(json).expect("valid config");
        assert_eq!(
            config.top,
            SideControl::Npc(ControllerConfig::new(
                ControllerKind::Technician,
                Difficulty::Hard
            ))
        );
        assert!(config.bottom.is_human());
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.tick_hz, 30);
        assert_eq!(config.game, Config::default());
    }

    #[test]
    fn test_defaults_fill_cadence() {
        let scheduler = SchedulerConfig::default();
        let config = SessionConfig::default().with_defaults(&scheduler);
        assert_eq!(config.tick_hz, 60);
        assert_eq!(config.snapshot_every, 3);
    }

    #[test]
    fn test_env_fallback_ignores_garbage() {
        assert_eq!(read_env_u32("MATCH_SERVER_TEST_UNSET_VAR", 9), 9);
    }
}
