use serde::{Deserialize, Serialize};
use std::fmt;

use super::exercise::Exercise;
use super::routine::{Routine, RoutineExercise};

/// Seconds allotted to an exercise whose relation carries no duration.
pub const DEFAULT_STEP_SECS: u32 = 60;

/// One exercise of a workout session, as the session runner consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutStep {
    pub exercise_id: i64,
    pub name: String,
    pub gif_url: Option<String>,
    pub series: i32,
    pub reps: i32,
    pub duration_secs: u32,
}

impl WorkoutStep {
    pub fn new(exercise: &Exercise, relation: Option<&RoutineExercise>) -> Self {
        let duration_secs = relation
            .and_then(|r| r.duration)
            .map(|minutes| (minutes * 60.0) as u32)
            .unwrap_or(DEFAULT_STEP_SECS);

        Self {
            exercise_id: exercise.id,
            name: exercise.name.clone(),
            gif_url: exercise.gif_url.clone(),
            series: relation.map(|r| r.series).unwrap_or(0),
            reps: relation.map(|r| r.reps).unwrap_or(0),
            duration_secs,
        }
    }
}

/// The ordered steps of a routine ready to be executed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutPlan {
    pub routine: Routine,
    pub steps: Vec<WorkoutStep>,
}

impl WorkoutPlan {
    /// Total planned time in minutes, as logged on completion.
    pub fn total_minutes(&self) -> f64 {
        self.steps
            .iter()
            .map(|s| f64::from(s.duration_secs) / 60.0)
            .sum()
    }

    /// Local keys of every exercise in the plan.
    pub fn exercise_ids(&self) -> Vec<i64> {
        self.steps.iter().map(|s| s.exercise_id).collect()
    }
}

impl fmt::Display for WorkoutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Workout: {}", self.routine.name)?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(
                f,
                "  {}. {:<24} {}x{}  {}s",
                i + 1,
                step.name,
                step.series,
                step.reps,
                step.duration_secs
            )?;
        }
        writeln!(f, "Total: {:.1} min", self.total_minutes())
    }
}
