//! Difficulty tiers and the numeric parameters they resolve to.
//!
//! Configuration is read leniently: any field that is missing, mistyped or
//! out of range falls back to the tier preset instead of failing the session.

use std::ops::RangeInclusive;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Nightmare,
    Hard,
    #[default]
    Normal,
    Easy,
    Custom,
}

impl Difficulty {
    /// Case-insensitive parse; unknown names resolve to Normal
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "nightmare" => Self::Nightmare,
            "hard" => Self::Hard,
            "easy" => Self::Easy,
            "custom" => Self::Custom,
            _ => Self::Normal,
        }
    }

    pub fn preset(self) -> DifficultyParams {
        match self {
            Self::Nightmare => DifficultyParams {
                return_rate: 0.97,
                reaction_delay_ms: 60.0,
                tracking_noise: 0.02,
                max_speed: 1.0,
                pid: PidGains {
                    kp: 0.9,
                    ki: 0.01,
                    kd: 0.25,
                    max_integral: 200.0,
                    derivative_filter: 0.3,
                    max_output: 8.0,
                },
                technician: TechnicianParams {
                    prediction_accuracy: 0.98,
                    course_accuracy: 0.95,
                },
            },
            Self::Hard => DifficultyParams {
                return_rate: 0.9,
                reaction_delay_ms: 120.0,
                tracking_noise: 0.06,
                max_speed: 0.95,
                pid: PidGains {
                    kp: 0.7,
                    ki: 0.008,
                    kd: 0.2,
                    max_integral: 200.0,
                    derivative_filter: 0.4,
                    max_output: 7.5,
                },
                technician: TechnicianParams {
                    prediction_accuracy: 0.9,
                    course_accuracy: 0.85,
                },
            },
            Self::Normal | Self::Custom => DifficultyParams {
                return_rate: 0.8,
                reaction_delay_ms: 200.0,
                tracking_noise: 0.12,
                max_speed: 0.85,
                pid: PidGains {
                    kp: 0.5,
                    ki: 0.005,
                    kd: 0.15,
                    max_integral: 150.0,
                    derivative_filter: 0.5,
                    max_output: 6.5,
                },
                technician: TechnicianParams {
                    prediction_accuracy: 0.8,
                    course_accuracy: 0.75,
                },
            },
            Self::Easy => DifficultyParams {
                return_rate: 0.6,
                reaction_delay_ms: 320.0,
                tracking_noise: 0.22,
                max_speed: 0.7,
                pid: PidGains {
                    kp: 0.3,
                    ki: 0.003,
                    kd: 0.1,
                    max_integral: 100.0,
                    derivative_filter: 0.6,
                    max_output: 5.0,
                },
                technician: TechnicianParams {
                    prediction_accuracy: 0.65,
                    course_accuracy: 0.6,
                },
            },
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Loose::<String>::deserialize(deserializer)? {
            Loose::Value(name) => Self::parse(&name),
            Loose::Other(_) => Self::Normal,
        })
    }
}

/// PID gains for the closed-loop controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub max_integral: f32,
    /// Weight kept from the previous derivative, in [0, 1)
    pub derivative_filter: f32,
    /// Per-tick movement cap
    pub max_output: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicianParams {
    pub prediction_accuracy: f32,
    pub course_accuracy: f32,
}

impl TechnicianParams {
    /// Probability a planned return is executed without an injected miss
    pub fn return_rate(&self) -> f32 {
        (self.prediction_accuracy * self.course_accuracy * 0.95).min(0.98)
    }
}

/// Fully resolved tuning for one controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyParams {
    /// Target fraction of approaches returned
    pub return_rate: f32,
    pub reaction_delay_ms: f32,
    /// Aim jitter as a fraction of paddle half-width
    pub tracking_noise: f32,
    /// Fraction of paddle speed the heuristic may use
    pub max_speed: f32,
    pub pid: PidGains,
    pub technician: TechnicianParams,
}

impl Default for DifficultyParams {
    fn default() -> Self {
        Difficulty::Normal.preset()
    }
}

/// Which strategy drives the paddle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    Heuristic,
    #[default]
    Pid,
    Technician,
}

impl ControllerKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "heuristic" => Some(Self::Heuristic),
            "pid" => Some(Self::Pid),
            "technician" => Some(Self::Technician),
            _ => None,
        }
    }
}

impl std::str::FromStr for ControllerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown controller kind: {s}"))
    }
}

impl<'de> Deserialize<'de> for ControllerKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Loose::<String>::deserialize(deserializer)? {
            Loose::Value(name) => Self::parse(&name).unwrap_or_default(),
            Loose::Other(_) => Self::default(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidOverrides {
    #[serde(deserialize_with = "lenient_f32")]
    pub kp: Option<f32>,
    #[serde(deserialize_with = "lenient_f32")]
    pub ki: Option<f32>,
    #[serde(deserialize_with = "lenient_f32")]
    pub kd: Option<f32>,
    #[serde(deserialize_with = "lenient_f32")]
    pub max_integral: Option<f32>,
    #[serde(deserialize_with = "lenient_f32")]
    pub derivative_filter: Option<f32>,
    #[serde(deserialize_with = "lenient_f32")]
    pub max_output: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicianOverrides {
    #[serde(deserialize_with = "lenient_f32")]
    pub prediction_accuracy: Option<f32>,
    #[serde(deserialize_with = "lenient_f32")]
    pub course_accuracy: Option<f32>,
}

/// Controller selection plus optional per-field overrides of the tier preset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub kind: ControllerKind,
    pub difficulty: Difficulty,
    #[serde(deserialize_with = "lenient_f32")]
    pub return_rate: Option<f32>,
    #[serde(deserialize_with = "lenient_f32")]
    pub reaction_delay_ms: Option<f32>,
    #[serde(deserialize_with = "lenient_f32")]
    pub tracking_noise: Option<f32>,
    #[serde(deserialize_with = "lenient_f32")]
    pub max_speed: Option<f32>,
    #[serde(deserialize_with = "lenient_section")]
    pub pid: PidOverrides,
    #[serde(deserialize_with = "lenient_section")]
    pub technician: TechnicianOverrides,
}

impl ControllerConfig {
    pub fn new(kind: ControllerKind, difficulty: Difficulty) -> Self {
        Self {
            kind,
            difficulty,
            ..Self::default()
        }
    }

    /// Tier preset with every valid override applied
    pub fn resolve(&self) -> DifficultyParams {
        let base = self.difficulty.preset();
        let pid = &self.pid;
        let tech = &self.technician;

        DifficultyParams {
            return_rate: pick("return_rate", self.return_rate, base.return_rate, 0.0..=1.0),
            reaction_delay_ms: pick(
                "reaction_delay_ms",
                self.reaction_delay_ms,
                base.reaction_delay_ms,
                0.0..=5_000.0,
            ),
            tracking_noise: pick(
                "tracking_noise",
                self.tracking_noise,
                base.tracking_noise,
                0.0..=1.0,
            ),
            max_speed: pick("max_speed", self.max_speed, base.max_speed, 0.05..=1.5),
            pid: PidGains {
                kp: pick("pid.kp", pid.kp, base.pid.kp, 0.0..=10.0),
                ki: pick("pid.ki", pid.ki, base.pid.ki, 0.0..=1.0),
                kd: pick("pid.kd", pid.kd, base.pid.kd, 0.0..=10.0),
                max_integral: pick(
                    "pid.max_integral",
                    pid.max_integral,
                    base.pid.max_integral,
                    0.0..=100_000.0,
                ),
                derivative_filter: pick(
                    "pid.derivative_filter",
                    pid.derivative_filter,
                    base.pid.derivative_filter,
                    0.0..=0.99,
                ),
                max_output: pick(
                    "pid.max_output",
                    pid.max_output,
                    base.pid.max_output,
                    0.1..=100.0,
                ),
            },
            technician: TechnicianParams {
                prediction_accuracy: pick(
                    "technician.prediction_accuracy",
                    tech.prediction_accuracy,
                    base.technician.prediction_accuracy,
                    0.0..=1.0,
                ),
                course_accuracy: pick(
                    "technician.course_accuracy",
                    tech.course_accuracy,
                    base.technician.course_accuracy,
                    0.0..=1.0,
                ),
            },
        }
    }
}

fn pick(field: &str, value: Option<f32>, default: f32, range: RangeInclusive<f32>) -> f32 {
    match value {
        Some(v) if v.is_finite() && range.contains(&v) => v,
        Some(v) => {
            tracing::warn!(field, value = v, default, "override out of range, using preset");
            default
        }
        None => default,
    }
}

/// Accepts `T` or anything else, so malformed values can be replaced later
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose<T> {
    Value(T),
    Other(serde::de::IgnoredAny),
}

fn lenient_f32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f32>, D::Error> {
    Ok(match Loose::<f64>::deserialize(deserializer)? {
        Loose::Value(v) => Some(v as f32),
        Loose::Other(_) => None,
    })
}

/// Override block: only an object is taken field by field
#[derive(Deserialize)]
#[serde(untagged)]
enum Section<T> {
    // Arrays would otherwise fill fields positionally
    List(Vec<serde::de::IgnoredAny>),
    Fields(T),
    Other(serde::de::IgnoredAny),
}

/// An override block that isn't an object is dropped as a whole
fn lenient_section<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(match Section::<T>::deserialize(deserializer)? {
        Section::Fields(section) => section,
        Section::List(_) | Section::Other(_) => {
            tracing::warn!(
                section = std::any::type_name::<T>(),
                "malformed override block, using preset"
            );
            T::default()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_are_ordered_by_skill() {
        let tiers = [
            Difficulty::Nightmare,
            Difficulty::Hard,
            Difficulty::Normal,
            Difficulty::Easy,
        ];
        for pair in tiers.windows(2) {
            let (better, worse) = (pair[0].preset(), pair[1].preset());
            assert!(better.return_rate > worse.return_rate);
            assert!(better.reaction_delay_ms < worse.reaction_delay_ms);
            assert!(better.tracking_noise < worse.tracking_noise);
        }
    }

    #[test]
    fn test_technician_return_rate_is_capped() {
        let perfect = TechnicianParams {
            prediction_accuracy: 1.0,
            course_accuracy: 1.0,
        };
        assert_eq!(perfect.return_rate(), 0.95);
        let normal = Difficulty::Normal.preset().technician;
        assert!((normal.return_rate() - 0.8 * 0.75 * 0.95).abs() < 1e-6);
        assert!(perfect.return_rate() <= 0.98);
    }

    #[test]
    fn test_full_json_config() {
        let config: ControllerConfig = serde_json::from_str(
            r#"{ "kind": "technician", "difficulty": "hard", "reaction_delay_ms": 90,
                 "technician": { "course_accuracy": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.kind, ControllerKind::Technician);
        assert_eq!(config.difficulty, Difficulty::Hard);

        let params = config.resolve();
        assert_eq!(params.reaction_delay_ms, 90.0);
        assert_eq!(params.technician.course_accuracy, 0.5);
        assert_eq!(params.return_rate, Difficulty::Hard.preset().return_rate);
    }

    #[test]
    fn test_malformed_fields_fall_back_per_field() {
        let config: ControllerConfig = serde_json::from_str(
            r#"{ "kind": 42, "difficulty": "impossible", "return_rate": "high",
                 "tracking_noise": -3, "max_speed": null,
                 "pid": { "kp": 2.0, "ki": [1, 2], "derivative_filter": 7 } }"#,
        )
        .unwrap();
        assert_eq!(config.kind, ControllerKind::Pid);
        assert_eq!(config.difficulty, Difficulty::Normal);

        let preset = Difficulty::Normal.preset();
        let params = config.resolve();
        assert_eq!(params.return_rate, preset.return_rate);
        assert_eq!(params.tracking_noise, preset.tracking_noise);
        assert_eq!(params.max_speed, preset.max_speed);
        assert_eq!(params.pid.kp, 2.0);
        assert_eq!(params.pid.ki, preset.pid.ki);
        assert_eq!(params.pid.derivative_filter, preset.pid.derivative_filter);

        for json in [
            r#"{ "difficulty": "hard", "pid": null }"#,
            r#"{ "difficulty": "hard", "technician": 5 }"#,
            r#"{ "difficulty": "hard", "pid": "fast", "technician": [0.9] }"#,
        ] {
            let config: ControllerConfig = serde_json::from_str(json).unwrap();
            assert_eq!(config.pid, PidOverrides::default());
            assert_eq!(config.technician, TechnicianOverrides::default());
            assert_eq!(config.resolve(), Difficulty::Hard.preset());
        }
    }

    #[test]
    fn test_empty_config_is_normal_pid() {
        let config: ControllerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.resolve(), Difficulty::Normal.preset());
    }

    #[test]
    fn test_custom_without_overrides_uses_normal() {
        let config = ControllerConfig::new(ControllerKind::Heuristic, Difficulty::Custom);
        assert_eq!(config.resolve(), Difficulty::Normal.preset());
    }
}
