use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::exercise::Exercise;

/// A workout routine owned by one user.
///
/// `remote_id` is the identifier the document store assigned to the routine
/// and is the join key between the two stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Routine {
    pub id: i64,
    pub remote_id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Routine {
    pub fn new(
        remote_id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            remote_id: remote_id.into(),
            user_id: user_id.into(),
            name: name.into(),
            created_at,
        }
    }
}

/// Junction row linking a routine to an exercise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutineExercise {
    pub routine_id: i64,
    pub exercise_id: i64,
    pub series: i32,
    pub reps: i32,
    pub duration: Option<f64>, // minutes
}

impl RoutineExercise {
    pub fn new(routine_id: i64, exercise_id: i64, series: i32, reps: i32) -> Self {
        Self {
            routine_id,
            exercise_id,
            series,
            reps,
            duration: None,
        }
    }

    pub fn with_duration(mut self, minutes: f64) -> Self {
        self.duration = Some(minutes);
        self
    }
}

/// A routine together with the exercises linked to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutineWithExercises {
    pub routine: Routine,
    pub exercises: Vec<Exercise>,
}

impl fmt::Display for RoutineWithExercises {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.routine.name)?;
        writeln!(f, "{}", "=".repeat(self.routine.name.len().max(1)))?;
        writeln!(f, "Key:     {}", self.routine.id)?;
        writeln!(f, "Remote:  {}", self.routine.remote_id)?;
        writeln!(
            f,
            "Created: {}",
            self.routine.created_at.format("%Y-%m-%d %H:%M")
        )?;

        if !self.exercises.is_empty() {
            writeln!(f, "\nExercises:")?;
            for exercise in &self.exercises {
                writeln!(f, "  - {}", exercise)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_routine_new() {
        let created_at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let routine = Routine::new("r1", "uid-1", "Push Day", created_at);

        assert_eq!(routine.id, 0);
        assert_eq!(routine.remote_id, "r1");
        assert_eq!(routine.user_id, "uid-1");
        assert_eq!(routine.created_at, created_at);
    }

    #[test]
    fn test_relation_with_duration() {
        let relation = RoutineExercise::new(1, 2, 3, 10).with_duration(1.5);
        assert_eq!(relation.series, 3);
        assert_eq!(relation.reps, 10);
        assert_eq!(relation.duration, Some(1.5));
    }

    #[test]
    fn test_routine_with_exercises_display() {
        let created_at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let view = RoutineWithExercises {
            routine: Routine::new("r1", "uid-1", "Push Day", created_at),
            exercises: vec![Exercise::new("Bench Press").with_category("chest")],
        };

        let output = format!("{}", view);
        assert!(output.contains("Push Day"));
        assert!(output.contains("2025-03-01 09:00"));
        assert!(output.contains("  - Bench Press [chest]"));
    }
}
