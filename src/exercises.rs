//! Exercise definitions - prescribed rehab exercises and their timer mapping

use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::timer::{ConfigError, SideStrategy, TimerConfiguration, TimerSettings};

/// Exercise category (knee, shoulder, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: Option<i64>,
    pub name: String,
}

/// Prescribed exercise as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: Option<i64>,
    pub name: String,
    pub category_id: Option<i64>,
    pub sets: i32,
    pub reps: Option<i32>,
    pub hold_secs: Option<i32>,    // Isometric hold per set
    pub duration_secs: Option<i32>, // Fixed block per set
    pub rest_secs: Option<i32>,    // None = use settings
    pub is_paired: bool,           // Left and right side
    pub side_strategy: Option<SideStrategy>,
    pub notes: Option<String>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, sets: i32) -> Self {
        Self {
            id: None,
            name: name.into(),
            category_id: None,
            sets,
            reps: None,
            hold_secs: None,
            duration_secs: None,
            rest_secs: None,
            is_paired: false,
            side_strategy: None,
            notes: None,
        }
    }

    /// Seconds in one exercise phase: hold, then fixed duration, then reps
    pub fn phase_secs(&self, settings: &Settings) -> i64 {
        self.hold_secs
            .or(self.duration_secs)
            .map(i64::from)
            .or_else(|| self.reps.map(|r| i64::from(r) * i64::from(settings.secs_per_rep)))
            .unwrap_or(0)
    }

    /// Timer parameters with settings filled in where the exercise is silent
    pub fn timer_settings(&self, settings: &Settings) -> TimerSettings {
        TimerSettings {
            exercise_secs: self.phase_secs(settings),
            rest_secs: self
                .rest_secs
                .map(i64::from)
                .unwrap_or_else(|| i64::from(settings.default_rest_secs)),
            sets: i64::from(self.sets),
            has_sides: self.is_paired,
            side_strategy: self.side_strategy.unwrap_or(settings.default_side_strategy),
        }
    }

    pub fn timer_config(&self, settings: &Settings) -> Result<TimerConfiguration, ConfigError> {
        TimerConfiguration::try_from(self.timer_settings(settings))
    }

    /// Short prescription, e.g. "3x10" or "2x30s hold (L/R)"
    pub fn prescription(&self) -> String {
        let body = match (self.hold_secs, self.duration_secs, self.reps) {
            (Some(hold), _, _) => format!("{}x{}s hold", self.sets, hold),
            (None, Some(secs), _) => format!("{}x{}s", self.sets, secs),
            (None, None, Some(reps)) => format!("{}x{}", self.sets, reps),
            (None, None, None) => format!("{} sets", self.sets),
        };
        if self.is_paired { format!("{} (L/R)", body) } else { body }
    }
}

/// Built-in exercise for seeding an empty database
#[derive(Debug, Clone)]
pub struct Template {
    pub name: &'static str,
    pub category: &'static str,
    pub sets: i32,
    pub reps: Option<i32>,
    pub hold_secs: Option<i32>,
    pub is_paired: bool,
    pub description: Option<&'static str>,
}

impl Template {
    pub fn to_exercise(&self, category_id: Option<i64>) -> Exercise {
        Exercise {
            category_id,
            reps: self.reps,
            hold_secs: self.hold_secs,
            is_paired: self.is_paired,
            notes: self.description.map(str::to_string),
            ..Exercise::new(self.name, self.sets)
        }
    }
}

/// Common starter exercises
pub const STARTER_EXERCISES: &[Template] = &[
    Template {
        name: "quad sets",
        category: "knee",
        sets: 3,
        reps: None,
        hold_secs: Some(10),
        is_paired: true,
        description: Some("Seated, leg straight. Tighten the thigh and press the knee down into the floor"),
    },
    Template {
        name: "heel slides",
        category: "knee",
        sets: 2,
        reps: Some(10),
        hold_secs: None,
        is_paired: true,
        description: Some("Lying on your back, slide the heel towards the buttock and back"),
    },
    Template {
        name: "wall sit",
        category: "knee",
        sets: 3,
        reps: None,
        hold_secs: Some(30),
        is_paired: false,
        description: None,
    },
    Template {
        name: "clamshells",
        category: "hip",
        sets: 3,
        reps: Some(12),
        hold_secs: None,
        is_paired: true,
        description: Some("Side lying, knees bent. Lift the top knee keeping the feet together"),
    },
    Template {
        name: "glute bridge hold",
        category: "hip",
        sets: 3,
        reps: None,
        hold_secs: Some(20),
        is_paired: false,
        description: None,
    },
    Template {
        name: "pendulum swings",
        category: "shoulder",
        sets: 2,
        reps: None,
        hold_secs: Some(30),
        is_paired: true,
        description: Some("Lean on a table, let the arm hang and draw small circles"),
    },
    Template {
        name: "scapular squeezes",
        category: "shoulder",
        sets: 3,
        reps: Some(10),
        hold_secs: None,
        is_paired: false,
        description: None,
    },
    Template {
        name: "calf raises",
        category: "ankle",
        sets: 3,
        reps: Some(15),
        hold_secs: None,
        is_paired: false,
        description: Some("Stand on a step edge, rise onto the toes and lower below the step"),
    },
];

/// Distinct starter categories, in catalogue order
pub fn starter_categories() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Vec::new();
    for t in STARTER_EXERCISES {
        if !names.contains(&t.category) {
            names.push(t.category);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_secs_precedence() {
        let settings = Settings::default();
        let mut exercise = Exercise::new("bridge", 3);
        assert_eq!(exercise.phase_secs(&settings), 0);

        exercise.reps = Some(10);
        assert_eq!(exercise.phase_secs(&settings), 30);

        exercise.duration_secs = Some(45);
        assert_eq!(exercise.phase_secs(&settings), 45);

        exercise.hold_secs = Some(20);
        assert_eq!(exercise.phase_secs(&settings), 20);
    }

    #[test]
    fn test_timer_settings_use_defaults() {
        let settings = Settings {
            default_rest_secs: 15,
            default_side_strategy: SideStrategy::Sequential,
            secs_per_rep: 2,
        };
        let mut exercise = Exercise::new("clamshells", 2);
        exercise.reps = Some(12);
        exercise.is_paired = true;

        let timer = exercise.timer_settings(&settings);
        assert_eq!(timer.exercise_secs, 24);
        assert_eq!(timer.rest_secs, 15);
        assert_eq!(timer.sets, 2);
        assert!(timer.has_sides);
        assert_eq!(timer.side_strategy, SideStrategy::Sequential);

        exercise.rest_secs = Some(0);
        exercise.side_strategy = Some(SideStrategy::Alternate);
        let timer = exercise.timer_settings(&settings);
        assert_eq!(timer.rest_secs, 0);
        assert_eq!(timer.side_strategy, SideStrategy::Alternate);
    }

    #[test]
    fn test_timer_config_rejects_empty_exercise() {
        let exercise = Exercise::new("nothing", 3);
        let err = exercise.timer_config(&Settings::default()).unwrap_err();
        assert_eq!(err, ConfigError::NonPositiveDuration(0));

        let mut no_sets = Exercise::new("no sets", 0);
        no_sets.hold_secs = Some(10);
        assert!(no_sets.timer_config(&Settings::default()).is_err());
    }

    #[test]
    fn test_prescription() {
        let mut exercise = Exercise::new("quad sets", 3);
        exercise.hold_secs = Some(10);
        exercise.is_paired = true;
        assert_eq!(exercise.prescription(), "3x10s hold (L/R)");

        let mut raises = Exercise::new("calf raises", 3);
        raises.reps = Some(15);
        assert_eq!(raises.prescription(), "3x15");
    }

    #[test]
    fn test_starter_catalogue_is_valid() {
        let settings = Settings::default();
        for template in STARTER_EXERCISES {
            let exercise = template.to_exercise(None);
            assert!(exercise.timer_config(&settings).is_ok(), "{}", template.name);
        }
        assert_eq!(starter_categories(), vec!["knee", "hip", "shoulder", "ankle"]);
    }
}
