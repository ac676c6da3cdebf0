//! Timer configuration - validated input for one exercise attempt

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order in which sets and sides are traversed for bilateral exercises
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SideStrategy {
    /// Left then right within each set
    #[default]
    Alternate,
    /// All sets on the left, then all sets on the right
    Sequential,
}

impl SideStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SideStrategy::Alternate => "alternate",
            SideStrategy::Sequential => "sequential",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "alternate" => Some(SideStrategy::Alternate),
            "sequential" => Some(SideStrategy::Sequential),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("exercise duration must be positive, got {0}s")]
    NonPositiveDuration(i64),

    #[error("at least one set is required, got {0}")]
    NoSets(i64),

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

/// Raw timer parameters as the host assembles them (exercise record + settings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSettings {
    pub exercise_secs: i64,
    pub rest_secs: i64,
    pub sets: i64,
    #[serde(default)]
    pub has_sides: bool,
    #[serde(default)]
    pub side_strategy: SideStrategy,
}

/// Validated, immutable timer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfiguration {
    exercise_duration: u32,
    rest_duration: u32,
    total_sets: u32,
    has_sides: bool,
    side_strategy: SideStrategy,
}

impl TimerConfiguration {
    pub fn new(
        exercise_secs: i64,
        rest_secs: i64,
        sets: i64,
        has_sides: bool,
        side_strategy: SideStrategy,
    ) -> Result<Self, ConfigError> {
        if exercise_secs <= 0 {
            return Err(ConfigError::NonPositiveDuration(exercise_secs));
        }
        if sets <= 0 {
            return Err(ConfigError::NoSets(sets));
        }

        let exercise_duration = to_u32("exercise duration", exercise_secs)?;
        let rest_duration = to_u32("rest duration", rest_secs.max(0))?;
        let total_sets = to_u32("sets", sets)?;

        Ok(Self {
            exercise_duration,
            rest_duration,
            total_sets,
            has_sides,
            side_strategy,
        })
    }

    pub fn exercise_duration(&self) -> u32 {
        self.exercise_duration
    }

    pub fn rest_duration(&self) -> u32 {
        self.rest_duration
    }

    pub fn total_sets(&self) -> u32 {
        self.total_sets
    }

    pub fn has_sides(&self) -> bool {
        self.has_sides
    }

    pub fn side_strategy(&self) -> SideStrategy {
        self.side_strategy
    }
}

impl TryFrom<&TimerSettings> for TimerConfiguration {
    type Error = ConfigError;

    fn try_from(s: &TimerSettings) -> Result<Self, Self::Error> {
        Self::new(s.exercise_secs, s.rest_secs, s.sets, s.has_sides, s.side_strategy)
    }
}

impl TryFrom<TimerSettings> for TimerConfiguration {
    type Error = ConfigError;

    fn try_from(s: TimerSettings) -> Result<Self, Self::Error> {
        Self::try_from(&s)
    }
}

fn to_u32(field: &'static str, value: i64) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::OutOfRange { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_configuration() {
        let config = TimerConfiguration::new(30, 10, 3, true, SideStrategy::Sequential).unwrap();
        assert_eq!(config.exercise_duration(), 30);
        assert_eq!(config.rest_duration(), 10);
        assert_eq!(config.total_sets(), 3);
        assert!(config.has_sides());
        assert_eq!(config.side_strategy(), SideStrategy::Sequential);
    }

    #[test]
    fn test_rejects_zero_duration() {
        let err = TimerConfiguration::new(0, 10, 3, false, SideStrategy::Alternate).unwrap_err();
        assert_eq!(err, ConfigError::NonPositiveDuration(0));
        assert!(TimerConfiguration::new(-5, 10, 3, false, SideStrategy::Alternate).is_err());
    }

    #[test]
    fn test_rejects_zero_sets() {
        let err = TimerConfiguration::new(30, 10, 0, false, SideStrategy::Alternate).unwrap_err();
        assert_eq!(err, ConfigError::NoSets(0));
    }

    #[test]
    fn test_negative_rest_clamped() {
        let config = TimerConfiguration::new(30, -15, 2, false, SideStrategy::Alternate).unwrap();
        assert_eq!(config.rest_duration(), 0);
    }

    #[test]
    fn test_overflow_rejected() {
        let err = TimerConfiguration::new(i64::MAX, 0, 1, false, SideStrategy::Alternate).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "exercise duration", .. }));
    }

    #[test]
    fn test_settings_deserialize_defaults() {
        let settings: TimerSettings =
            serde_json::from_str(r#"{"exercise_secs": 20, "rest_secs": 5, "sets": 2}"#).unwrap();
        assert!(!settings.has_sides);
        assert_eq!(settings.side_strategy, SideStrategy::Alternate);

        let config = TimerConfiguration::try_from(settings).unwrap();
        assert_eq!(config.total_sets(), 2);
    }

    #[test]
    fn test_side_strategy_parse() {
        assert_eq!(SideStrategy::parse("Sequential"), Some(SideStrategy::Sequential));
        assert_eq!(SideStrategy::parse(" alternate "), Some(SideStrategy::Alternate));
        assert_eq!(SideStrategy::parse("both"), None);
    }
}
